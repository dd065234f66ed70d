use crate::domain::call::{CompletedCall, RecordedCall, WritableCall};
use crate::domain::error::FakeResult;
use crate::domain::fake::FakeObject;
use crate::domain::manager::FakeManager;
use crate::domain::types::{MethodInfo, TypeInfo};
use crate::domain::value::{Value, ValueKind};
use anyhow::Result;
use std::sync::Arc;

/// Everything the proxy engine needs to build one fake.
pub struct ProxyRequest {
    pub type_info: Arc<TypeInfo>,
    pub additional_interfaces: Vec<Arc<TypeInfo>>,
    pub constructor_arguments: Option<Vec<Value>>,
    pub manager: FakeManager,
    pub base: Option<Arc<dyn BaseImplementation>>,
}

pub struct ProxyResult {
    pub instance: Option<FakeObject>,
    pub failure_reason: Option<String>,
}

impl ProxyResult {
    pub fn success(instance: FakeObject) -> Self {
        Self {
            instance: Some(instance),
            failure_reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            instance: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Proxy generation port (implemented by Infrastructure)
pub trait ProxyGenerator: Send + Sync {
    fn generate_proxy(&self, request: ProxyRequest) -> ProxyResult;

    /// `Err(reason)` when calls to `method` cannot be routed through a proxy of
    /// `type_info`.
    fn can_intercept(&self, type_info: &TypeInfo, method: &MethodInfo) -> Result<(), String>;
}

/// Dummy value port, used by the default fallback
pub trait DummyValueResolver: Send + Sync {
    fn try_create_dummy(&self, kind: &ValueKind) -> Option<Value>;
}

/// Call recording storage port
pub trait CallStorage: Send + Sync {
    /// `None` when nothing has been recorded yet.
    fn load(&self) -> Result<Option<Vec<RecordedCall>>>;

    fn save(&self, calls: &[RecordedCall]) -> Result<()>;
}

/// Renders a call log for failure messages
pub trait CallWriter: Send + Sync {
    fn write_calls(&self, calls: &[Arc<CompletedCall>], out: &mut String);
}

/// Hooks around every intercepted call of one fake
pub trait InterceptionListener: Send + Sync {
    fn on_before_call_intercepted(&self, _call: &WritableCall) {}

    fn on_after_call_intercepted(&self, _call: &CompletedCall) {}
}

/// The implementation a proxy falls back to for base calls: the class's own
/// code, or the wrapped object.
pub trait BaseImplementation: Send + Sync {
    fn invoke(&self, call: &mut WritableCall) -> FakeResult<()>;
}

impl<F> BaseImplementation for F
where
    F: Fn(&mut WritableCall) -> FakeResult<()> + Send + Sync,
{
    fn invoke(&self, call: &mut WritableCall) -> FakeResult<()> {
        self(call)
    }
}
