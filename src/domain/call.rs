//! Call records: the writable in-flight call and the frozen completed call.

use crate::domain::error::{FakeError, FakeResult};
use crate::domain::fake::{FakeId, FakeObject};
use crate::domain::scope::ScopeId;
use crate::domain::types::{MemberKind, MethodId, MethodInfo, ParameterInfo, TypeInfo};
use crate::domain::value::{FromValue, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide interception order.
pub type SequenceNumber = u64;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_sequence_number() -> SequenceNumber {
    NEXT_SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// Positional and named view over a call's arguments.
#[derive(Debug, Clone)]
pub struct ArgumentCollection {
    method: Arc<MethodInfo>,
    values: Vec<Value>,
}

impl ArgumentCollection {
    pub fn new(method: Arc<MethodInfo>, values: Vec<Value>) -> FakeResult<Self> {
        if values.len() != method.parameters.len() {
            return Err(FakeError::Argument(format!(
                "{} expects {} argument(s) but {} were supplied",
                method.id,
                method.parameters.len(),
                values.len()
            )));
        }
        Ok(Self { method, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.method
            .parameters
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_as<T: FromValue>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|v| v.to::<T>())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.method.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterInfo, &Value)> {
        self.method.parameters.iter().zip(self.values.iter())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Read access shared by in-flight and completed calls; matchers and
/// assertions work against this.
pub trait FakeCall {
    fn method(&self) -> &Arc<MethodInfo>;
    fn arguments(&self) -> &ArgumentCollection;
    fn fake_id(&self) -> FakeId;
    fn fake_type(&self) -> &Arc<TypeInfo>;
    fn sequence_number(&self) -> SequenceNumber;
}

/// A call while it is being processed. Rules may change by-ref argument slots
/// and the return value; the arguments as passed in stay untouched.
pub struct WritableCall {
    fake: FakeObject,
    method: Arc<MethodInfo>,
    arguments: ArgumentCollection,
    current: Vec<Value>,
    return_value: Option<Value>,
    sequence: SequenceNumber,
    scopes: Vec<ScopeId>,
}

impl WritableCall {
    pub(crate) fn new(
        fake: FakeObject,
        arguments: ArgumentCollection,
        scopes: Vec<ScopeId>,
    ) -> Self {
        Self {
            method: Arc::clone(&arguments.method),
            current: arguments.values.clone(),
            fake,
            arguments,
            return_value: None,
            sequence: next_sequence_number(),
            scopes,
        }
    }

    pub fn fake(&self) -> &FakeObject {
        &self.fake
    }

    /// Argument values including any assignment made so far.
    pub fn argument_values(&self) -> &[Value] {
        &self.current
    }

    pub fn set_argument_value(&mut self, index: usize, value: Value) -> FakeResult<()> {
        let slot = self.current.get_mut(index).ok_or_else(|| {
            FakeError::Argument(format!(
                "{} has no argument at position {}",
                self.method.id, index
            ))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = Some(value);
    }

    /// Forward to the proxy's base implementation.
    pub fn call_base_method(&mut self) -> FakeResult<()> {
        let fake = self.fake.clone();
        fake.call_base(self)
    }

    pub(crate) fn scopes(&self) -> &[ScopeId] {
        &self.scopes
    }

    pub(crate) fn freeze(self) -> CompletedCall {
        let return_value = self.return_value.unwrap_or(Value::Unit);
        CompletedCall {
            sequence: self.sequence,
            fake_id: self.fake.id(),
            fake_type: Arc::clone(self.fake.type_info()),
            method: self.method,
            arguments: self.arguments,
            arguments_after_call: self.current,
            return_value,
            scopes: self.scopes,
        }
    }
}

impl FakeCall for WritableCall {
    fn method(&self) -> &Arc<MethodInfo> {
        &self.method
    }

    fn arguments(&self) -> &ArgumentCollection {
        &self.arguments
    }

    fn fake_id(&self) -> FakeId {
        self.fake.id()
    }

    fn fake_type(&self) -> &Arc<TypeInfo> {
        self.fake.type_info()
    }

    fn sequence_number(&self) -> SequenceNumber {
        self.sequence
    }
}

/// A frozen call in a fake's call log.
#[derive(Debug, Clone)]
pub struct CompletedCall {
    sequence: SequenceNumber,
    fake_id: FakeId,
    fake_type: Arc<TypeInfo>,
    method: Arc<MethodInfo>,
    arguments: ArgumentCollection,
    arguments_after_call: Vec<Value>,
    return_value: Value,
    scopes: Vec<ScopeId>,
}

impl CompletedCall {
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    pub fn arguments_after_call(&self) -> &[Value] {
        &self.arguments_after_call
    }

    /// Final values of the `out`/`ref` slots, in declaration order.
    pub fn output_arguments(&self) -> Vec<Value> {
        self.method
            .by_ref_positions()
            .into_iter()
            .map(|i| self.arguments_after_call[i].clone())
            .collect()
    }

    pub fn was_made_in_scope(&self, scope: ScopeId) -> bool {
        self.scopes.contains(&scope)
    }
}

impl FakeCall for CompletedCall {
    fn method(&self) -> &Arc<MethodInfo> {
        &self.method
    }

    fn arguments(&self) -> &ArgumentCollection {
        &self.arguments
    }

    fn fake_id(&self) -> FakeId {
        self.fake_id
    }

    fn fake_type(&self) -> &Arc<TypeInfo> {
        &self.fake_type
    }

    fn sequence_number(&self) -> SequenceNumber {
        self.sequence
    }
}

/// Persisted form of a completed call, as kept by call storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub method: MethodId,
    #[serde(default)]
    pub output_arguments: Vec<Value>,
    pub return_value: Value,
}

impl From<&CompletedCall> for RecordedCall {
    fn from(call: &CompletedCall) -> Self {
        Self {
            method: call.method.id.clone(),
            output_arguments: call.output_arguments(),
            return_value: call.return_value.clone(),
        }
    }
}

/// `IFoo.Bar(x: 1)`, `IFoo.Name`, `IFoo.Name = "v"`, `IFoo.Item[1]`.
pub(crate) fn render_member(method: &MethodInfo, arguments: &[String]) -> String {
    let owner = &method.id.declaring_type;
    let generic = if method.generic_arguments.is_empty() {
        String::new()
    } else {
        let kinds: Vec<String> = method
            .generic_arguments
            .iter()
            .map(|k| k.to_string())
            .collect();
        format!("<{}>", kinds.join(", "))
    };
    match &method.member {
        MemberKind::PropertyGetter { property } if arguments.is_empty() => {
            format!("{}.{}", owner, property)
        }
        MemberKind::PropertyGetter { property } => {
            format!("{}.{}[{}]", owner, property, arguments.join(", "))
        }
        MemberKind::PropertySetter { property } => {
            let (index, value) = arguments.split_at(arguments.len().saturating_sub(1));
            let value = value.first().map(String::as_str).unwrap_or("");
            if index.is_empty() {
                format!("{}.{} = {}", owner, property, value)
            } else {
                format!("{}.{}[{}] = {}", owner, property, index.join(", "), value)
            }
        }
        MemberKind::Method | MemberKind::DelegateInvoke => {
            let named: Vec<String> = method
                .parameters
                .iter()
                .zip(arguments)
                .map(|(p, a)| format!("{}: {}", p.name, a))
                .collect();
            format!("{}.{}{}({})", owner, method.name, generic, named.join(", "))
        }
    }
}

/// Human-readable rendering of a call with its argument values.
pub fn describe_call(call: &dyn FakeCall) -> String {
    let args: Vec<String> = call
        .arguments()
        .values()
        .iter()
        .map(|v| v.to_string())
        .collect();
    render_member(call.method(), &args)
}
