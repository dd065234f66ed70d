//! fakecall library: fakes, call rules, argument constraints and call assertions.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;

pub use app::arg;
pub use app::configure::{CallConfiguration, call_to, call_to_any, call_to_on, call_to_set};
pub use app::fake::Fake;
pub use app::faker::{FakeOptions, Faker};
pub use app::recording::RecordingSession;
pub use app::settings::FakerSettings;
pub use domain::assertion::{OrderedAssertionScope, Repeated, ordered_assertions};
pub use domain::error::{FakeError, FakeResult};
pub use domain::fake::{CallOutcome, FakeObject, Faked};
pub use domain::scope::FakeScope;
pub use domain::types::{MethodInfo, ParameterInfo, TypeInfo};
pub use domain::value::{FromValue, Value, ValueKind};
