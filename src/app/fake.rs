use crate::app::configure::{CallConfiguration, call_to_any, call_to_on};
use crate::domain::call::CompletedCall;
use crate::domain::error::FakeResult;
use crate::domain::fake::{FakeObject, Faked};
use crate::domain::manager::FakeManager;
use std::ops::Deref;
use std::sync::Arc;

/// A typed fake: a shim `S` plus configuration helpers keyed on it.
///
/// Derefs to the shim, so the fake is used exactly like the real type.
pub struct Fake<S: Faked> {
    shim: S,
}

impl<S: Faked> Fake<S> {
    pub fn new(shim: S) -> Self {
        Self { shim }
    }

    pub fn shim(&self) -> &S {
        &self.shim
    }

    pub fn into_shim(self) -> S {
        self.shim
    }

    pub fn fake_object(&self) -> &FakeObject {
        self.shim.fake_object()
    }

    pub fn manager(&self) -> &FakeManager {
        self.fake_object().manager()
    }

    /// Configure the call made on the shim inside `spec`.
    pub fn calls_to(&self, spec: impl FnOnce(&S)) -> FakeResult<CallConfiguration> {
        call_to_on(&self.shim, spec)
    }

    pub fn any_call(&self) -> CallConfiguration {
        call_to_any(&self.shim)
    }

    pub fn recorded_calls(&self) -> Vec<Arc<CompletedCall>> {
        self.manager().recorded_calls()
    }

    pub fn clear_recorded_calls(&self) {
        self.manager().clear_recorded_calls();
    }

    /// Drop every configured rule and stored property value.
    pub fn reset(&self) {
        self.manager().reset();
    }
}

impl<S: Faked> Deref for Fake<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.shim
    }
}

impl<S: Faked> Faked for Fake<S> {
    fn fake_object(&self) -> &FakeObject {
        self.shim.fake_object()
    }
}
