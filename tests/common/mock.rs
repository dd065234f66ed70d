//! Collaborator doubles for integration tests.
#![allow(dead_code)]

use fakecall::domain::call::{CompletedCall, FakeCall, WritableCall, describe_call};
use fakecall::domain::ports::InterceptionListener;
use std::sync::{Arc, Mutex};

/// Listener that keeps a log of the hooks it saw.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl InterceptionListener for RecordingListener {
    fn on_before_call_intercepted(&self, call: &WritableCall) {
        self.events
            .lock()
            .unwrap()
            .push(format!("before {}", call.method().name));
    }

    fn on_after_call_intercepted(&self, call: &CompletedCall) {
        self.events
            .lock()
            .unwrap()
            .push(format!("after {}", describe_call(call)));
    }
}
