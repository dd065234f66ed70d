//! Call rules: a matcher, a configured behavior and a repeat budget.

use crate::domain::call::{FakeCall, WritableCall};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::matcher::{ArgumentsPredicate, CallMatcher, RuleMatcher};
use crate::domain::value::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub type RuleId = u64;

static NEXT_RULE: AtomicU64 = AtomicU64::new(1);

pub type CallAction = Arc<dyn Fn(&WritableCall) + Send + Sync>;
pub type ThrowFactory = Arc<dyn Fn(&WritableCall) -> anyhow::Error + Send + Sync>;
pub type ValueFactory = Arc<dyn Fn(&WritableCall) -> Value + Send + Sync>;
pub type OutputFactory = Arc<dyn Fn(&WritableCall) -> Vec<Value> + Send + Sync>;
pub type CallPredicate = Arc<dyn Fn(&dyn FakeCall) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct Behavior {
    pub actions: Vec<CallAction>,
    pub calls_base_method: bool,
    pub throws: Option<ThrowFactory>,
    pub out_and_ref: Option<OutputFactory>,
    pub returns: Option<ValueFactory>,
}

#[derive(Clone)]
pub struct WhereClause {
    pub predicate: CallPredicate,
    pub description: String,
}

#[derive(Clone)]
struct RuleConfig {
    matcher: RuleMatcher,
    wheres: Vec<WhereClause>,
    behavior: Behavior,
}

/// One configured behavior.
///
/// The configuration is copy-on-write: dispatch works on a snapshot, so user
/// closures may call back into the fake (or reconfigure this rule) freely.
pub struct CallRule {
    id: RuleId,
    is_assertion: AtomicBool,
    remaining: Mutex<Option<usize>>,
    config: Mutex<Arc<RuleConfig>>,
}

impl CallRule {
    pub fn new(matcher: RuleMatcher) -> Self {
        Self {
            id: NEXT_RULE.fetch_add(1, Ordering::Relaxed),
            is_assertion: AtomicBool::new(true),
            remaining: Mutex::new(None),
            config: Mutex::new(Arc::new(RuleConfig {
                matcher,
                wheres: Vec::new(),
                behavior: Behavior::default(),
            })),
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    /// True until a behavior has been configured.
    pub fn is_assertion(&self) -> bool {
        self.is_assertion.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Arc<RuleConfig> {
        Arc::clone(&self.config.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut RuleConfig)) {
        let mut guard = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut guard));
    }

    fn update_behavior(&self, f: impl FnOnce(&mut Behavior)) {
        self.is_assertion.store(false, Ordering::Release);
        self.update(|c| f(&mut c.behavior));
    }

    pub fn matcher(&self) -> RuleMatcher {
        self.snapshot().matcher.clone()
    }

    pub fn add_where(&self, clause: WhereClause) {
        self.update(|c| c.wheres.push(clause));
    }

    pub fn use_predicate_to_validate_arguments(
        &self,
        predicate: ArgumentsPredicate,
    ) -> FakeResult<()> {
        let mut result = Ok(());
        self.update(|c| match &mut c.matcher {
            RuleMatcher::Expression(m) => m.use_predicate_to_validate_arguments(predicate),
            RuleMatcher::Any(_) => {
                result = Err(FakeError::Configuration(
                    "argument predicates need a call to a specific method".to_string(),
                ))
            }
        });
        result
    }

    pub fn with_any_arguments(&self) {
        self.update(|c| {
            if let RuleMatcher::Expression(m) = &mut c.matcher {
                m.ignore_arguments();
            }
        });
    }

    pub fn add_action(&self, action: CallAction) {
        self.update_behavior(|b| b.actions.push(action));
    }

    pub fn set_calls_base_method(&self) {
        self.update_behavior(|b| b.calls_base_method = true);
    }

    pub fn set_throws(&self, factory: ThrowFactory) {
        self.update_behavior(|b| b.throws = Some(factory));
    }

    pub fn set_out_and_ref(&self, factory: OutputFactory) {
        self.update_behavior(|b| b.out_and_ref = Some(factory));
    }

    pub fn set_returns(&self, factory: ValueFactory) {
        self.update_behavior(|b| b.returns = Some(factory));
    }

    /// Mark the rule configured without adding behavior (`does_nothing`).
    pub fn mark_configured(&self) {
        self.update_behavior(|_| {});
    }

    /// Limit the rule to `times` further applications; `None` is unbounded.
    pub fn set_remaining(&self, times: Option<usize>) {
        *self.remaining.lock().unwrap_or_else(PoisonError::into_inner) = times;
    }

    pub fn remaining(&self) -> Option<usize> {
        *self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Matcher and where clauses, ignoring the repeat budget.
    pub fn matches_call(&self, call: &dyn FakeCall) -> bool {
        let config = self.snapshot();
        config.matcher.matches(call) && config.wheres.iter().all(|w| (w.predicate)(call))
    }

    /// Pure: never consumes the budget.
    pub fn is_applicable_to(&self, call: &dyn FakeCall) -> bool {
        !self.is_exhausted() && self.matches_call(call)
    }

    /// Take one application from the budget. False once exhausted.
    pub fn try_consume(&self) -> bool {
        let mut remaining = self.remaining.lock().unwrap_or_else(PoisonError::into_inner);
        match remaining.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }

    /// Run the configured behavior. A configured error aborts the rest and
    /// is returned to the caller; the base method is then skipped.
    pub fn apply(&self, call: &mut WritableCall) -> FakeResult<()> {
        let config = self.snapshot();
        let behavior = &config.behavior;

        for action in &behavior.actions {
            action(call);
        }
        if let Some(throws) = &behavior.throws {
            return Err(FakeError::thrown(throws(call)));
        }
        if behavior.calls_base_method {
            call.call_base_method()?;
        }

        let outputs = match &behavior.out_and_ref {
            Some(factory) => Some(factory(call)),
            None if behavior.calls_base_method => None,
            None => config.matcher.implicit_out_and_ref_values().map(<[Value]>::to_vec),
        };
        if let Some(values) = outputs {
            assign_out_and_ref(call, values)?;
        }

        if let Some(returns) = &behavior.returns {
            let value = returns(call);
            call.set_return_value(value);
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        let config = self.snapshot();
        let mut out = config.matcher.description();
        for clause in &config.wheres {
            out.push_str(" where ");
            out.push_str(&clause.description);
        }
        out
    }
}

fn assign_out_and_ref(call: &mut WritableCall, values: Vec<Value>) -> FakeResult<()> {
    let positions = call.method().by_ref_positions();
    if positions.len() != values.len() {
        return Err(FakeError::Configuration(format!(
            "The number of values for out and ref parameters specified does not match the \
             number of out and ref parameters in the call ({} given, {} expected).",
            values.len(),
            positions.len()
        )));
    }
    for (position, value) in positions.into_iter().zip(values) {
        call.set_argument_value(position, value)?;
    }
    Ok(())
}

impl std::fmt::Debug for CallRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallRule")
            .field("id", &self.id)
            .field("call", &self.describe())
            .field("remaining", &self.remaining())
            .finish()
    }
}
