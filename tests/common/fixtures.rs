//! Type descriptors and shims shared by the integration tests.
#![allow(dead_code)]

use fakecall::{FakeObject, FakeResult, Faked, MethodInfo, ParameterInfo, TypeInfo, Value, ValueKind};
use std::sync::Arc;

/// `IFoo`: the interface most scenarios are written against.
pub fn foo_type() -> Arc<TypeInfo> {
    TypeInfo::interface("IFoo")
        .method(MethodInfo::new("Bar").returns(ValueKind::Int))
        .method(
            MethodInfo::new("Baz")
                .param(ParameterInfo::new("a", ValueKind::Str))
                .param(ParameterInfo::new("b", ValueKind::Str))
                .returns(ValueKind::Int),
        )
        .method(
            MethodInfo::new("TryGetValue")
                .param(ParameterInfo::new("key", ValueKind::Str))
                .param(ParameterInfo::out("value", ValueKind::Str))
                .returns(ValueKind::Bool),
        )
        .method(MethodInfo::new("Run"))
        .method(
            MethodInfo::new("Log")
                .param(ParameterInfo::params("parts", ValueKind::Str)),
        )
        .method(MethodInfo::new("Child").returns(ValueKind::Fake("IBar".to_string())))
        .property("Name", ValueKind::Str)
        .build()
}

/// `IBar`: a collaborator returned by `IFoo.Child()`.
pub fn bar_type() -> Arc<TypeInfo> {
    TypeInfo::interface("IBar")
        .method(MethodInfo::new("Ping").returns(ValueKind::Str))
        .build()
}

/// `Widget`: a class with a virtual and a non-virtual member.
pub fn widget_type() -> Arc<TypeInfo> {
    TypeInfo::class("Widget")
        .constructor(vec![])
        .constructor(vec![ParameterInfo::new("size", ValueKind::Int)])
        .method(MethodInfo::new("Render").returns(ValueKind::Str))
        .method(MethodInfo::new("Id").returns(ValueKind::Int).non_virtual())
        .build()
}

/// Hand-written shim forwarding `IFoo` members to its fake.
pub struct FooFake(FakeObject);

impl FooFake {
    pub fn bar(&self) -> i64 {
        self.0.call("Bar", vec![]).returns()
    }

    pub fn try_bar(&self) -> FakeResult<i64> {
        Ok(self.0.try_call("Bar", vec![])?.returns())
    }

    pub fn baz(&self, a: impl Into<Value>, b: impl Into<Value>) -> i64 {
        self.0.call("Baz", vec![a.into(), b.into()]).returns()
    }

    pub fn try_get_value(&self, key: &str, value: &mut String) -> bool {
        let outcome = self
            .0
            .call("TryGetValue", vec![key.into(), value.clone().into()]);
        if let Some(assigned) = outcome.output::<String>(0) {
            *value = assigned;
        }
        outcome.returns()
    }

    pub fn run(&self) {
        self.0.call("Run", vec![]);
    }

    pub fn try_run(&self) -> FakeResult<()> {
        self.0.try_call("Run", vec![]).map(|_| ())
    }

    pub fn log(&self, parts: &[&str]) {
        let parts: Vec<Value> = parts.iter().map(|p| Value::from(*p)).collect();
        self.0.call("Log", vec![Value::List(parts)]);
    }

    pub fn child(&self) -> Value {
        self.0.call("Child", vec![]).into_value()
    }

    pub fn name(&self) -> String {
        self.0.get("Name").returns()
    }

    pub fn set_name(&self, name: &str) {
        self.0.set("Name", name);
    }
}

impl Faked for FooFake {
    fn fake_object(&self) -> &FakeObject {
        &self.0
    }
}

impl From<FakeObject> for FooFake {
    fn from(fake: FakeObject) -> Self {
        FooFake(fake)
    }
}
