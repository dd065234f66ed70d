//! The per-fake state owner and call dispatcher.
//!
//! A [`FakeManager`] holds the fake's rules (highest priority first), its call
//! log and the values stored through unconfigured property setters. Every
//! intercepted call goes through [`FakeManager::process`].

use crate::domain::call::{CompletedCall, FakeCall, WritableCall, describe_call};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::ports::{CallWriter, DummyValueResolver, InterceptionListener};
use crate::domain::rule::{CallRule, RuleId};
use crate::domain::scope;
use crate::domain::types::{MemberKind, MethodInfo};
use crate::domain::value::{Value, ValueKind};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace};

/// How a fake treats calls no rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerSettings {
    /// Unconfigured calls fail with an expectation error.
    pub strict: bool,
    /// Unconfigured calls are forwarded to the base implementation.
    pub calls_base_by_default: bool,
}

#[derive(Default)]
struct ManagerState {
    rules: Vec<Arc<CallRule>>,
    recorded: Vec<Arc<CompletedCall>>,
    properties: HashMap<String, Value>,
}

struct ManagerShared {
    state: Mutex<ManagerState>,
    listeners: Mutex<Vec<Arc<dyn InterceptionListener>>>,
    settings: ManagerSettings,
    dummies: Arc<dyn DummyValueResolver>,
    writer: Arc<dyn CallWriter>,
}

/// Shared handle; clones address the same fake.
#[derive(Clone)]
pub struct FakeManager {
    shared: Arc<ManagerShared>,
}

impl FakeManager {
    pub fn new(
        settings: ManagerSettings,
        dummies: Arc<dyn DummyValueResolver>,
        writer: Arc<dyn CallWriter>,
    ) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                state: Mutex::new(ManagerState::default()),
                listeners: Mutex::new(Vec::new()),
                settings,
                dummies,
                writer,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> ManagerSettings {
        self.shared.settings
    }

    pub fn call_writer(&self) -> &Arc<dyn CallWriter> {
        &self.shared.writer
    }

    pub fn dummies(&self) -> &Arc<dyn DummyValueResolver> {
        &self.shared.dummies
    }

    /// Highest priority: consulted before every existing rule.
    pub fn add_rule_first(&self, rule: Arc<CallRule>) {
        let id = rule.id();
        trace!(rule = id, call = %rule.describe(), "adding rule first");
        self.state().rules.insert(0, rule);
        self.remove_rule_when_scope_closes(id);
    }

    /// Lowest priority: consulted only when no other rule applies.
    pub fn add_rule_last(&self, rule: Arc<CallRule>) {
        let id = rule.id();
        trace!(rule = id, call = %rule.describe(), "adding rule last");
        self.state().rules.push(rule);
        self.remove_rule_when_scope_closes(id);
    }

    fn remove_rule_when_scope_closes(&self, id: RuleId) {
        let weak: Weak<ManagerShared> = Arc::downgrade(&self.shared);
        scope::register_cleanup(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                FakeManager { shared }.remove_rule(id);
            }
        }));
    }

    pub fn remove_rule(&self, id: RuleId) -> bool {
        let mut state = self.state();
        let before = state.rules.len();
        state.rules.retain(|r| r.id() != id);
        let removed = state.rules.len() != before;
        if removed {
            trace!(rule = id, "removed rule");
        }
        removed
    }

    /// Rules in priority order.
    pub fn rules(&self) -> Vec<Arc<CallRule>> {
        self.state().rules.clone()
    }

    /// Every completed call, in interception order.
    pub fn recorded_calls(&self) -> Vec<Arc<CompletedCall>> {
        self.state().recorded.clone()
    }

    /// Calls made inside the innermost open fake scope; all calls when no
    /// scope is open.
    pub fn recorded_calls_in_scope(&self) -> Vec<Arc<CompletedCall>> {
        let calls = self.recorded_calls();
        match scope::current_scope() {
            Some(id) => calls.into_iter().filter(|c| c.was_made_in_scope(id)).collect(),
            None => calls,
        }
    }

    pub fn clear_recorded_calls(&self) {
        self.state().recorded.clear();
    }

    /// Drop every configured rule and stored property value.
    pub fn reset(&self) {
        let mut state = self.state();
        state.rules.clear();
        state.properties.clear();
    }

    pub fn add_listener(&self, listener: Arc<dyn InterceptionListener>) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn listeners(&self) -> Vec<Arc<dyn InterceptionListener>> {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Dispatch an intercepted call and record it. The call is recorded even
    /// when a rule fails or panics.
    pub fn process(&self, mut call: WritableCall) -> FakeResult<Arc<CompletedCall>> {
        let listeners = self.listeners();
        for listener in &listeners {
            listener.on_before_call_intercepted(&call);
        }

        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&mut call))) {
            Ok(result) => result,
            Err(payload) => {
                self.record(Arc::new(call.freeze()));
                panic::resume_unwind(payload);
            }
        };

        let completed = Arc::new(call.freeze());
        for listener in listeners.iter().rev() {
            listener.on_after_call_intercepted(&completed);
        }
        self.record(Arc::clone(&completed));
        result.map(|_| completed)
    }

    fn record(&self, call: Arc<CompletedCall>) {
        let mut state = self.state();
        let sequence = call.sequence_number();
        let at = state
            .recorded
            .partition_point(|c| c.sequence_number() <= sequence);
        state.recorded.insert(at, call);
    }

    fn dispatch(&self, call: &mut WritableCall) -> FakeResult<()> {
        // Snapshot so rule code may re-enter this manager.
        let rules = self.rules();
        let winner = rules
            .iter()
            .find(|rule| rule.is_applicable_to(&*call) && rule.try_consume());

        match winner {
            Some(rule) => {
                debug!(rule = rule.id(), call = %describe_call(&*call), "applying rule");
                rule.apply(call)?;
            }
            None => {
                debug!(call = %describe_call(&*call), "no rule matched, using default behavior");
                self.apply_default(call)?;
            }
        }
        self.complete_return_value(call)
    }

    fn apply_default(&self, call: &mut WritableCall) -> FakeResult<()> {
        let settings = self.shared.settings;
        if settings.strict {
            return Err(FakeError::Expectation(format!(
                "Call to unconfigured method of strict fake: {}.",
                describe_call(&*call)
            )));
        }
        if settings.calls_base_by_default {
            return call.call_base_method();
        }

        let method = Arc::clone(call.method());
        match &method.member {
            MemberKind::PropertySetter { property } => {
                let values = call.argument_values();
                let (index, value) = values.split_at(values.len().saturating_sub(1));
                let key = property_key(property, index);
                let value = value.first().cloned().unwrap_or(Value::Null);
                self.state().properties.insert(key, value);
            }
            MemberKind::PropertyGetter { property } => {
                let key = property_key(property, call.argument_values());
                let stored = self.state().properties.get(&key).cloned();
                match stored {
                    Some(value) => call.set_return_value(value),
                    None if method.return_kind.is_fakeable() => {
                        let value = self.default_return(&method.return_kind);
                        self.state().properties.insert(key, value.clone());
                        call.set_return_value(value);
                    }
                    None => {}
                }
            }
            MemberKind::Method | MemberKind::DelegateInvoke => {}
        }
        Ok(())
    }

    fn complete_return_value(&self, call: &mut WritableCall) -> FakeResult<()> {
        let method: Arc<MethodInfo> = Arc::clone(call.method());
        match call.return_value() {
            None if method.is_void() => call.set_return_value(Value::Unit),
            None => {
                let value = self.default_return(&method.return_kind);
                call.set_return_value(value);
            }
            Some(value) if !method.return_kind.accepts(value) => {
                return Err(FakeError::Configuration(format!(
                    "The value {} returned for {} is not of type {}.",
                    value,
                    describe_call(&*call),
                    method.return_kind
                )));
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn default_return(&self, kind: &ValueKind) -> Value {
        self.shared
            .dummies
            .try_create_dummy(kind)
            .unwrap_or_else(|| kind.default_value())
    }

    /// Value produced for a fake member nobody configured, used for
    /// non-interceptable calls without a base.
    pub(crate) fn fallback_value(&self, kind: &ValueKind) -> Value {
        self.default_return(kind)
    }
}

fn property_key(property: &str, index: &[Value]) -> String {
    if index.is_empty() {
        property.to_string()
    } else {
        let parts: Vec<String> = index.iter().map(|v| v.to_string()).collect();
        format!("{}[{}]", property, parts.join(", "))
    }
}

impl std::fmt::Debug for FakeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("FakeManager")
            .field("rules", &state.rules.len())
            .field("recorded", &state.recorded.len())
            .field("settings", &self.shared.settings)
            .finish()
    }
}
