//! Call matchers decide whether an intercepted call fits a rule or assertion.

use crate::domain::call::{ArgumentCollection, FakeCall, render_member};
use crate::domain::constraint::{Constraint, PredicatedMarker, ignored};
use crate::domain::specification::CallSpecification;
use crate::domain::types::MethodInfo;
use crate::domain::value::{Value, ValueKind};
use std::sync::Arc;

pub trait CallMatcher: Send + Sync {
    fn matches(&self, call: &dyn FakeCall) -> bool;

    fn describe_call_on(&self, out: &mut String);

    fn description(&self) -> String {
        let mut out = String::new();
        self.describe_call_on(&mut out);
        out
    }
}

pub type ArgumentsPredicate = Arc<dyn Fn(&ArgumentCollection) -> bool + Send + Sync>;

/// Matches calls to one method whose arguments satisfy per-argument
/// constraints, or a whole-argument-list predicate once one is set.
#[derive(Clone)]
pub struct ExpressionCallMatcher {
    method: Arc<MethodInfo>,
    constraints: Vec<Constraint>,
    predicate: Option<ArgumentsPredicate>,
    implicit_outputs: Option<Vec<Value>>,
}

impl ExpressionCallMatcher {
    pub fn new(specification: &CallSpecification) -> Self {
        let constraints = specification.argument_constraints();
        let method = Arc::clone(&specification.method);
        let positions = method.by_ref_positions();
        let implicit_outputs = if positions.is_empty() {
            None
        } else {
            positions
                .iter()
                .map(|&i| constraints.get(i).and_then(|c| c.output_value()).cloned())
                .collect()
        };
        Self {
            method,
            constraints,
            predicate: None,
            implicit_outputs,
        }
    }

    pub fn method(&self) -> &Arc<MethodInfo> {
        &self.method
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Replace argument checking with `predicate`.
    pub fn use_predicate_to_validate_arguments(&mut self, predicate: ArgumentsPredicate) {
        let marker: Constraint = Arc::new(PredicatedMarker);
        self.constraints = vec![marker; self.constraints.len()];
        self.predicate = Some(predicate);
    }

    /// Accept any argument values.
    pub fn ignore_arguments(&mut self) {
        self.constraints = vec![ignored(); self.constraints.len()];
        self.predicate = None;
    }

    /// Values the call specification passed for `out`/`ref` parameters.
    pub fn implicit_out_and_ref_values(&self) -> Option<&[Value]> {
        self.implicit_outputs.as_deref()
    }

    fn is_same_method(&self, call: &dyn FakeCall) -> bool {
        let target = call.fake_type();
        let called = call.method();
        target.resolve(&self.method.id) == target.resolve(&called.id)
            && self.method.generic_arguments == called.generic_arguments
    }

    fn arguments_match(&self, arguments: &ArgumentCollection) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(arguments),
            None => self
                .constraints
                .iter()
                .zip(arguments.values())
                .all(|(c, v)| c.is_valid(v)),
        }
    }
}

impl CallMatcher for ExpressionCallMatcher {
    fn matches(&self, call: &dyn FakeCall) -> bool {
        self.is_same_method(call) && self.arguments_match(call.arguments())
    }

    fn describe_call_on(&self, out: &mut String) {
        let arguments: Vec<String> = self.constraints.iter().map(|c| c.description()).collect();
        out.push_str(&render_member(&self.method, &arguments));
    }
}

/// Matches every call on the fake, optionally only those returning `kind`.
#[derive(Clone, Default)]
pub struct AnyCallMatcher {
    return_kind: Option<ValueKind>,
}

impl AnyCallMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_return_kind(mut self, kind: ValueKind) -> Self {
        self.return_kind = Some(kind);
        self
    }
}

impl CallMatcher for AnyCallMatcher {
    fn matches(&self, call: &dyn FakeCall) -> bool {
        self.return_kind
            .as_ref()
            .is_none_or(|k| &call.method().return_kind == k)
    }

    fn describe_call_on(&self, out: &mut String) {
        match &self.return_kind {
            Some(kind) => {
                out.push_str(&format!("Any call with return type {} to the fake object.", kind))
            }
            None => out.push_str("Any call made to the fake object."),
        }
    }
}

/// The matcher a rule or assertion is built around.
#[derive(Clone)]
pub enum RuleMatcher {
    Expression(ExpressionCallMatcher),
    Any(AnyCallMatcher),
}

impl RuleMatcher {
    pub fn implicit_out_and_ref_values(&self) -> Option<&[Value]> {
        match self {
            RuleMatcher::Expression(m) => m.implicit_out_and_ref_values(),
            RuleMatcher::Any(_) => None,
        }
    }
}

impl CallMatcher for RuleMatcher {
    fn matches(&self, call: &dyn FakeCall) -> bool {
        match self {
            RuleMatcher::Expression(m) => m.matches(call),
            RuleMatcher::Any(m) => m.matches(call),
        }
    }

    fn describe_call_on(&self, out: &mut String) {
        match self {
            RuleMatcher::Expression(m) => m.describe_call_on(out),
            RuleMatcher::Any(m) => m.describe_call_on(out),
        }
    }
}
