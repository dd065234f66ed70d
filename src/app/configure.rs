//! The fluent configuration and assertion surface.
//!
//! ```ignore
//! call_to(|| { foo.bar(); })?.returns(42);
//! call_to(|| { foo.baz(arg::any(), arg::any()); })?.must_have_happened()?;
//! ```
//!
//! A [`CallConfiguration`] wraps one unregistered rule. The rule is added to
//! the fake (ahead of every older rule) the first time a behavior is
//! configured, so a configuration used only for assertions never changes how
//! the fake behaves.

use crate::domain::assertion::{Repeated, assert_was_called};
use crate::domain::call::{FakeCall, WritableCall};
use crate::domain::constraint::Constraint;
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::fake::{FakeObject, Faked};
use crate::domain::matcher::{AnyCallMatcher, ExpressionCallMatcher, RuleMatcher};
use crate::domain::rule::{CallRule, WhereClause};
use crate::domain::specification::{CallExpressionParser, CallSpecification};
use crate::domain::types::MemberKind;
use crate::domain::value::{Value, ValueKind};
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

/// Configure (or assert on) the single fake call made inside `spec`.
pub fn call_to(spec: impl FnOnce()) -> FakeResult<CallConfiguration> {
    let specification = CallExpressionParser::parse(spec)?;
    CallConfiguration::for_specification(specification)
}

/// Like [`call_to`], with the fake handed to the closure.
pub fn call_to_on<S: Faked + ?Sized>(
    fake: &S,
    spec: impl FnOnce(&S),
) -> FakeResult<CallConfiguration> {
    let specification = CallExpressionParser::parse_on(fake, spec)?;
    CallConfiguration::for_specification(specification)
}

/// Configure assignments to the property read inside `spec`. Any assigned
/// value matches until narrowed with [`CallConfiguration::to`].
pub fn call_to_set(spec: impl FnOnce()) -> FakeResult<CallConfiguration> {
    let specification = CallExpressionParser::parse(spec)?.into_property_setter()?;
    CallConfiguration::for_specification(specification)
}

/// Configure every call made to `fake`.
pub fn call_to_any(fake: &(impl Faked + ?Sized)) -> CallConfiguration {
    CallConfiguration::new(
        fake.fake_object().clone(),
        None,
        CallRule::new(RuleMatcher::Any(AnyCallMatcher::new())),
    )
}

pub struct CallConfiguration {
    fake: FakeObject,
    specification: Option<CallSpecification>,
    rule: Arc<CallRule>,
    registered: bool,
}

impl CallConfiguration {
    fn new(fake: FakeObject, specification: Option<CallSpecification>, rule: CallRule) -> Self {
        Self {
            fake,
            specification,
            rule: Arc::new(rule),
            registered: false,
        }
    }

    fn for_specification(specification: CallSpecification) -> FakeResult<Self> {
        let target = specification.target.clone();
        if let Err(reason) = target.can_intercept(&specification.method) {
            return Err(FakeError::Configuration(format!(
                "The current proxy generator can not intercept the method {} for the following reason:\n    - {}",
                specification.method.id, reason
            )));
        }
        let matcher = RuleMatcher::Expression(ExpressionCallMatcher::new(&specification));
        Ok(Self::new(target, Some(specification), CallRule::new(matcher)))
    }

    pub fn fake(&self) -> &FakeObject {
        &self.fake
    }

    pub fn rule(&self) -> &Arc<CallRule> {
        &self.rule
    }

    fn register(mut self) -> Self {
        if !self.registered {
            self.fake.manager().add_rule_first(Arc::clone(&self.rule));
            self.registered = true;
        }
        self
    }

    // Argument narrowing.

    /// Match whatever arguments are passed.
    pub fn with_any_arguments(self) -> Self {
        self.rule.with_any_arguments();
        self
    }

    /// Match only calls whose arguments satisfy `predicate`.
    pub fn when_arguments_match(
        self,
        predicate: impl Fn(&crate::domain::call::ArgumentCollection) -> bool + Send + Sync + 'static,
    ) -> FakeResult<Self> {
        self.rule.use_predicate_to_validate_arguments(Arc::new(predicate))?;
        Ok(self)
    }

    /// Extra condition on the call, shown in descriptions as "where ...".
    pub fn where_call(
        self,
        description: impl Into<String>,
        predicate: impl Fn(&dyn FakeCall) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rule.add_where(WhereClause {
            predicate: Arc::new(predicate),
            description: description.into(),
        });
        self
    }

    /// Match only calls to members returning `kind`.
    pub fn with_return_type(self, kind: ValueKind) -> Self {
        let description = format!("return type is {}", kind);
        self.where_call(description, move |call| call.method().return_kind == kind)
    }

    /// Narrow a property setter configuration to assigned values matching
    /// `constraint`.
    pub fn to_matching(self, constraint: Constraint) -> FakeResult<Self> {
        let Some(mut specification) = self.specification.clone() else {
            return Err(FakeError::InvalidOperation(
                "only property setter configurations can be narrowed by value".to_string(),
            ));
        };
        if !matches!(specification.method.member, MemberKind::PropertySetter { .. }) {
            return Err(FakeError::InvalidOperation(format!(
                "{} is not a property setter",
                specification.method.id
            )));
        }
        if self.registered {
            return Err(FakeError::InvalidOperation(
                "the assigned value must be narrowed before a behavior is configured".to_string(),
            ));
        }
        if let Some(value) = specification.arguments.last_mut() {
            value.trapped = vec![constraint];
        }
        Self::for_specification(specification)
    }

    pub fn to(self, value: impl Into<Value>) -> FakeResult<Self> {
        self.to_matching(crate::domain::constraint::eq(value))
    }

    // Behaviors. Each registers the rule on first use.

    pub fn invokes(self, action: impl Fn(&WritableCall) + Send + Sync + 'static) -> Self {
        self.rule.add_action(Arc::new(action));
        self.register()
    }

    pub fn returns(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.rule.set_returns(Arc::new(move |_| value.clone()));
        self.register()
    }

    pub fn returns_lazily<V: Into<Value>>(
        self,
        factory: impl Fn(&WritableCall) -> V + Send + Sync + 'static,
    ) -> Self {
        self.rule.set_returns(Arc::new(move |call| factory(call).into()));
        self.register()
    }

    /// Return each value once, in order; the rule is exhausted afterwards.
    pub fn returns_next_from_sequence<V: Into<Value>>(self, values: Vec<V>) -> Self {
        let queue: VecDeque<Value> = values.into_iter().map(Into::into).collect();
        let count = queue.len();
        let queue = Mutex::new(queue);
        self.rule.set_returns(Arc::new(move |_| {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(Value::Null)
        }));
        self.rule.set_remaining(Some(count));
        self.register()
    }

    pub fn throws(
        self,
        factory: impl Fn(&WritableCall) -> anyhow::Error + Send + Sync + 'static,
    ) -> Self {
        self.rule.set_throws(Arc::new(factory));
        self.register()
    }

    pub fn throws_message(self, message: impl Display + Send + Sync + 'static) -> Self {
        let message = message.to_string();
        self.throws(move |_| anyhow::anyhow!(message.clone()))
    }

    pub fn calls_base_method(self) -> Self {
        self.rule.set_calls_base_method();
        self.register()
    }

    /// Forward to the wrapped object; the same as the base method for a
    /// wrapping fake.
    pub fn calls_wrapped_method(self) -> Self {
        self.calls_base_method()
    }

    pub fn does_nothing(self) -> Self {
        self.rule.mark_configured();
        self.register()
    }

    pub fn assigns_out_and_ref_parameters(self, values: Vec<Value>) -> Self {
        self.rule.set_out_and_ref(Arc::new(move |_| values.clone()));
        self.register()
    }

    pub fn assigns_out_and_ref_parameters_lazily(
        self,
        factory: impl Fn(&WritableCall) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        self.rule.set_out_and_ref(Arc::new(factory));
        self.register()
    }

    // Repeat budget.

    pub fn number_of_times(self, times: usize) -> Self {
        self.rule.set_remaining(Some(times));
        self
    }

    pub fn once(self) -> Self {
        self.number_of_times(1)
    }

    pub fn twice(self) -> Self {
        self.number_of_times(2)
    }

    // Assertions.

    pub fn must_have_happened_times(&self, repeat: Repeated) -> FakeResult<()> {
        let calls = self.fake.manager().recorded_calls_in_scope();
        let rule = Arc::clone(&self.rule);
        assert_was_called(
            &calls,
            &|call| rule.matches_call(call),
            &self.rule.describe(),
            &repeat,
            self.fake.manager().call_writer().as_ref(),
        )
    }

    pub fn must_have_happened(&self) -> FakeResult<()> {
        self.must_have_happened_times(Repeated::at_least(1))
    }

    pub fn must_have_happened_once_exactly(&self) -> FakeResult<()> {
        self.must_have_happened_times(Repeated::once())
    }

    pub fn must_not_have_happened(&self) -> FakeResult<()> {
        self.must_have_happened_times(Repeated::never())
    }
}
