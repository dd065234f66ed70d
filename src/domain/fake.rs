//! Faked objects: the proxy instance every shim forwards to.
//!
//! A [`FakeObject`] is a cheap handle. It knows its runtime type, the members
//! its proxy cannot intercept, its optional base implementation, and the
//! [`FakeManager`] that owns its rules and call log.

use crate::domain::call::{ArgumentCollection, CompletedCall, FakeCall, WritableCall};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::manager::FakeManager;
use crate::domain::ports::BaseImplementation;
use crate::domain::scope;
use crate::domain::specification;
use crate::domain::types::{MethodId, MethodInfo, TypeInfo};
use crate::domain::value::{FromValue, Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub type FakeId = u64;

static NEXT_FAKE: AtomicU64 = AtomicU64::new(1);

/// What a proxy engine assembles into a [`FakeObject`].
pub struct ProxyParts {
    pub type_info: Arc<TypeInfo>,
    pub additional_interfaces: Vec<Arc<TypeInfo>>,
    pub manager: FakeManager,
    pub base: Option<Arc<dyn BaseImplementation>>,
    /// Members the proxy routes straight to the base, with the reason.
    pub non_interceptable: HashMap<MethodId, String>,
    pub constructor_arguments: Vec<Value>,
}

struct FakeInner {
    id: FakeId,
    type_info: Arc<TypeInfo>,
    additional_interfaces: Vec<Arc<TypeInfo>>,
    manager: FakeManager,
    base: Option<Arc<dyn BaseImplementation>>,
    non_interceptable: HashMap<MethodId, String>,
    constructor_arguments: Vec<Value>,
}

#[derive(Clone)]
pub struct FakeObject {
    inner: Arc<FakeInner>,
}

impl FakeObject {
    pub fn from_parts(parts: ProxyParts) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                id: NEXT_FAKE.fetch_add(1, Ordering::Relaxed),
                type_info: parts.type_info,
                additional_interfaces: parts.additional_interfaces,
                manager: parts.manager,
                base: parts.base,
                non_interceptable: parts.non_interceptable,
                constructor_arguments: parts.constructor_arguments,
            }),
        }
    }

    pub fn id(&self) -> FakeId {
        self.inner.id
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.inner.type_info
    }

    pub fn additional_interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.inner.additional_interfaces
    }

    pub fn manager(&self) -> &FakeManager {
        &self.inner.manager
    }

    pub fn constructor_arguments(&self) -> &[Value] {
        &self.inner.constructor_arguments
    }

    pub fn has_base(&self) -> bool {
        self.inner.base.is_some()
    }

    pub fn implements(&self, type_name: &str) -> bool {
        self.inner.type_info.implements(type_name)
            || self
                .inner
                .additional_interfaces
                .iter()
                .any(|i| i.implements(type_name))
    }

    fn types(&self) -> impl Iterator<Item = &Arc<TypeInfo>> {
        std::iter::once(&self.inner.type_info).chain(self.inner.additional_interfaces.iter())
    }

    pub fn find_method(&self, name: &str, arity: usize) -> Option<Arc<MethodInfo>> {
        self.types().find_map(|t| t.find_method(name, arity))
    }

    pub fn find_getter(&self, property: &str) -> Option<Arc<MethodInfo>> {
        self.types().find_map(|t| t.getter(property))
    }

    pub fn find_setter(&self, property: &str) -> Option<Arc<MethodInfo>> {
        self.types().find_map(|t| t.setter(property))
    }

    /// `Err(reason)` for members the proxy cannot route through the manager.
    pub fn can_intercept(&self, method: &MethodInfo) -> Result<(), String> {
        match self.inner.non_interceptable.get(&method.id) {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    /// Route a call through the fake. Inside a call specification the call is
    /// captured instead and a placeholder outcome comes back.
    pub fn try_invoke(
        &self,
        method: &Arc<MethodInfo>,
        arguments: Vec<Value>,
    ) -> FakeResult<CallOutcome> {
        let arguments = ArgumentCollection::new(Arc::clone(method), arguments)?;

        if specification::is_recording() {
            let values = arguments.values().to_vec();
            specification::capture(self, method, values.clone());
            return Ok(CallOutcome {
                return_value: method.return_kind.placeholder(),
                arguments_after_call: values,
                by_ref: method.by_ref_positions(),
            });
        }

        if let Err(reason) = self.can_intercept(method) {
            debug!(method = %method.id, %reason, "member is not interceptable, calling base");
            return self.invoke_unintercepted(arguments);
        }

        let call = WritableCall::new(self.clone(), arguments, scope::active_scope_ids());
        let completed = self.inner.manager.process(call)?;
        Ok(CallOutcome::from_completed(&completed))
    }

    /// Like [`try_invoke`](Self::try_invoke) but panics with the error's
    /// message, the way an exception surfaces in the calling test.
    pub fn invoke(&self, method: &Arc<MethodInfo>, arguments: Vec<Value>) -> CallOutcome {
        self.try_invoke(method, arguments)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    fn invoke_unintercepted(&self, arguments: ArgumentCollection) -> FakeResult<CallOutcome> {
        let mut call = WritableCall::new(self.clone(), arguments, Vec::new());
        if self.has_base() {
            self.call_base(&mut call)?;
        }
        if call.return_value().is_none() {
            let kind = call.method().return_kind.clone();
            call.set_return_value(self.inner.manager.fallback_value(&kind));
        }
        Ok(CallOutcome::from_completed(&call.freeze()))
    }

    fn lookup(&self, name: &str, arity: usize) -> FakeResult<Arc<MethodInfo>> {
        self.find_method(name, arity).ok_or_else(|| {
            FakeError::Argument(format!(
                "{} has no method {} taking {} argument(s)",
                self.inner.type_info.name, name, arity
            ))
        })
    }

    /// Call a method by name.
    pub fn try_call(&self, name: &str, arguments: Vec<Value>) -> FakeResult<CallOutcome> {
        let method = self.lookup(name, arguments.len())?;
        self.try_invoke(&method, arguments)
    }

    pub fn call(&self, name: &str, arguments: Vec<Value>) -> CallOutcome {
        self.try_call(name, arguments)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// Call a generic method closed over `type_arguments`.
    pub fn try_call_generic(
        &self,
        name: &str,
        type_arguments: Vec<ValueKind>,
        arguments: Vec<Value>,
    ) -> FakeResult<CallOutcome> {
        let method = self.lookup(name, arguments.len())?;
        if method.generic_parameter_count != type_arguments.len() {
            return Err(FakeError::Argument(format!(
                "{} takes {} type argument(s) but {} were supplied",
                method.id,
                method.generic_parameter_count,
                type_arguments.len()
            )));
        }
        self.try_invoke(&method.instantiate(type_arguments), arguments)
    }

    pub fn call_generic(
        &self,
        name: &str,
        type_arguments: Vec<ValueKind>,
        arguments: Vec<Value>,
    ) -> CallOutcome {
        self.try_call_generic(name, type_arguments, arguments)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_get(&self, property: &str) -> FakeResult<CallOutcome> {
        let getter = self.find_getter(property).ok_or_else(|| {
            FakeError::Argument(format!(
                "{} has no readable property {}",
                self.inner.type_info.name, property
            ))
        })?;
        self.try_invoke(&getter, Vec::new())
    }

    pub fn get(&self, property: &str) -> CallOutcome {
        self.try_get(property).unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn try_set(&self, property: &str, value: impl Into<Value>) -> FakeResult<()> {
        let setter = self.find_setter(property).ok_or_else(|| {
            FakeError::Argument(format!(
                "{} has no writable property {}",
                self.inner.type_info.name, property
            ))
        })?;
        self.try_invoke(&setter, vec![value.into()]).map(|_| ())
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) {
        self.try_set(property, value)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// Invoke a faked delegate.
    pub fn try_invoke_delegate(&self, arguments: Vec<Value>) -> FakeResult<CallOutcome> {
        let invoke = self.inner.type_info.delegate_invoke().ok_or_else(|| {
            FakeError::Argument(format!("{} is not a delegate", self.inner.type_info.name))
        })?;
        self.try_invoke(&invoke, arguments)
    }

    pub fn invoke_delegate(&self, arguments: Vec<Value>) -> CallOutcome {
        self.try_invoke_delegate(arguments)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    pub(crate) fn call_base(&self, call: &mut WritableCall) -> FakeResult<()> {
        match &self.inner.base {
            Some(base) => base.invoke(call),
            None => Err(FakeError::Configuration(format!(
                "{} can not call the base method of {}: the fake has no base implementation.",
                self.inner.type_info.name,
                call.method().id
            ))),
        }
    }
}

impl fmt::Debug for FakeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeObject")
            .field("id", &self.inner.id)
            .field("type", &self.inner.type_info.name)
            .finish()
    }
}

/// Access to the fake behind a shim.
pub trait Faked {
    fn fake_object(&self) -> &FakeObject;
}

impl Faked for FakeObject {
    fn fake_object(&self) -> &FakeObject {
        self
    }
}

/// What a shim gets back from a fake: the return value plus the final values
/// of `out`/`ref` slots.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    return_value: Value,
    arguments_after_call: Vec<Value>,
    by_ref: Vec<usize>,
}

impl CallOutcome {
    fn from_completed(call: &CompletedCall) -> Self {
        Self {
            return_value: call.return_value().clone(),
            arguments_after_call: call.arguments_after_call().to_vec(),
            by_ref: call.method().by_ref_positions(),
        }
    }

    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    pub fn into_value(self) -> Value {
        self.return_value
    }

    pub fn try_returns<T: FromValue>(&self) -> Option<T> {
        self.return_value.to::<T>()
    }

    /// The return value as `T`. Panics when the configured value has another
    /// shape, which is a configuration mistake in the test.
    pub fn returns<T: FromValue>(&self) -> T {
        match self.try_returns() {
            Some(value) => value,
            None => panic!(
                "the fake returned {} which can not be converted to {}",
                self.return_value,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Final value of the `index`-th `out`/`ref` parameter.
    pub fn output<T: FromValue>(&self, index: usize) -> Option<T> {
        self.by_ref
            .get(index)
            .and_then(|&position| self.arguments_after_call.get(position))
            .and_then(|v| v.to::<T>())
    }

    pub fn argument_after_call(&self, position: usize) -> Option<&Value> {
        self.arguments_after_call.get(position)
    }
}
