pub mod error;
pub mod value;
pub mod types;
pub mod constraint;
pub mod call;
pub mod scope;
pub mod specification;
pub mod matcher;
pub mod rule;
pub mod manager;
pub mod fake;
pub mod assertion;
pub mod ports;
