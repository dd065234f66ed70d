pub mod arg;
pub mod configure;
pub mod dto;
pub mod fake;
pub mod faker;
pub mod recording;
pub mod settings;
