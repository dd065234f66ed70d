//! Call specifications and the recorder that captures them.
//!
//! A specification is captured by running a closure while a thread-local
//! recording session is open: the (single) call it makes on a fake is recorded
//! instead of processed. Argument helpers evaluated while building that call
//! drop their constraints into the session's trap.

use crate::domain::constraint::{
    AggregateConstraint, Constraint, OutArgumentConstraint, RefArgumentConstraint, eq, ignored,
};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::fake::{FakeObject, Faked};
use crate::domain::types::{MemberKind, MethodInfo, ParameterDirection, ParameterInfo};
use crate::domain::value::Value;
use std::cell::RefCell;
use std::sync::Arc;

struct CapturedCall {
    target: FakeObject,
    method: Arc<MethodInfo>,
    arguments: Vec<Value>,
    trapped: Vec<Constraint>,
}

#[derive(Default)]
struct RecordingSession {
    captured: Vec<CapturedCall>,
    trap: Vec<Constraint>,
}

thread_local! {
    static RECORDING: RefCell<Option<RecordingSession>> = const { RefCell::new(None) };
}

struct SessionGuard;

impl SessionGuard {
    fn begin() -> FakeResult<Self> {
        RECORDING.with(|r| {
            let mut slot = r.borrow_mut();
            if slot.is_some() {
                return Err(FakeError::Argument(
                    "call specifications cannot be nested".to_string(),
                ));
            }
            *slot = Some(RecordingSession::default());
            Ok(SessionGuard)
        })
    }

    fn finish(self) -> RecordingSession {
        RECORDING
            .with(|r| r.borrow_mut().take())
            .unwrap_or_default()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        RECORDING.with(|r| r.borrow_mut().take());
    }
}

pub(crate) fn is_recording() -> bool {
    RECORDING.with(|r| r.borrow().is_some())
}

/// Record a call made on a fake while a specification is being captured.
pub(crate) fn capture(target: &FakeObject, method: &Arc<MethodInfo>, arguments: Vec<Value>) {
    RECORDING.with(|r| {
        if let Some(session) = r.borrow_mut().as_mut() {
            let trapped = std::mem::take(&mut session.trap);
            session.captured.push(CapturedCall {
                target: target.clone(),
                method: Arc::clone(method),
                arguments,
                trapped,
            });
        }
    });
}

/// Register a constraint produced by an argument helper. Returns false (and the
/// constraint is dropped) when no specification is being captured.
pub fn trap_constraint(constraint: Constraint) -> bool {
    RECORDING.with(|r| match r.borrow_mut().as_mut() {
        Some(session) => {
            session.trap.push(constraint);
            true
        }
        None => false,
    })
}

/// One argument of a specification, paired with its parameter metadata.
#[derive(Clone)]
pub struct SpecifiedArgument {
    pub parameter: ParameterInfo,
    /// The value evaluated when the specification was captured.
    pub value: Value,
    /// Constraints from argument helpers; one per element for `params` arrays.
    pub trapped: Vec<Constraint>,
}

/// "A call matching this shape": target fake, method and arguments.
#[derive(Clone)]
pub struct CallSpecification {
    pub target: FakeObject,
    pub method: Arc<MethodInfo>,
    pub arguments: Vec<SpecifiedArgument>,
}

impl CallSpecification {
    pub fn argument_constraints(&self) -> Vec<Constraint> {
        self.arguments
            .iter()
            .map(ArgumentConstraintFactory::get_argument_constraint)
            .collect()
    }

    /// Turn a property getter specification into the matching setter, with
    /// the assigned value ignored.
    pub fn into_property_setter(self) -> FakeResult<CallSpecification> {
        let MemberKind::PropertyGetter { property } = &self.method.member else {
            return Err(FakeError::Argument(format!(
                "{} is not a property getter",
                self.method.id
            )));
        };
        let setter = self.target.find_setter(property).ok_or_else(|| {
            FakeError::Argument(format!("the property {} has no setter", property))
        })?;

        let mut arguments: Vec<SpecifiedArgument> = self
            .arguments
            .into_iter()
            .zip(setter.parameters.iter())
            .map(|(arg, parameter)| SpecifiedArgument {
                parameter: parameter.clone(),
                ..arg
            })
            .collect();
        if let Some(value_parameter) = setter.parameters.last() {
            arguments.push(SpecifiedArgument {
                parameter: value_parameter.clone(),
                value: Value::Null,
                trapped: vec![ignored()],
            });
        }
        Ok(CallSpecification {
            target: self.target,
            method: setter,
            arguments,
        })
    }
}

/// Captures closures as [`CallSpecification`]s.
pub struct CallExpressionParser;

impl CallExpressionParser {
    /// Natural syntax: the closure calls a method, a property getter or a
    /// delegate on some fake.
    pub fn parse(spec: impl FnOnce()) -> FakeResult<CallSpecification> {
        let captured = Self::capture_single(spec)?;
        Self::structure(captured)
    }

    /// Explicit-instance syntax: the closure receives the fake and must call it.
    pub fn parse_on<S: Faked + ?Sized>(
        instance: &S,
        spec: impl FnOnce(&S),
    ) -> FakeResult<CallSpecification> {
        let captured = Self::capture_single(|| spec(instance))?;
        if captured.target.id() != instance.fake_object().id() {
            return Err(FakeError::Argument(format!(
                "the call to {} was not made on the configured fake",
                captured.method.id
            )));
        }
        Self::structure(captured)
    }

    fn capture_single(spec: impl FnOnce()) -> FakeResult<CapturedCall> {
        let guard = SessionGuard::begin()?;
        spec();
        let session = guard.finish();
        let count = session.captured.len();
        let mut captured = session.captured.into_iter();
        match (captured.next(), count) {
            (None, _) => Err(FakeError::Argument(
                "the specification is not a method call or property getter on a fake"
                    .to_string(),
            )),
            (Some(call), 1) => {
                if matches!(call.method.member, MemberKind::PropertySetter { .. }) {
                    return Err(FakeError::Argument(format!(
                        "{} is a property setter, not a method call or property getter",
                        call.method.id
                    )));
                }
                Ok(call)
            }
            (Some(_), n) => Err(FakeError::Argument(format!(
                "a specification must make exactly one call on a fake, but {} were made",
                n
            ))),
        }
    }

    fn structure(captured: CapturedCall) -> FakeResult<CallSpecification> {
        let CapturedCall {
            target,
            method,
            arguments,
            trapped,
        } = captured;
        let slots = distribute(&method, &arguments, trapped)?;
        let arguments = method
            .parameters
            .iter()
            .zip(arguments)
            .zip(slots)
            .map(|((parameter, value), trapped)| SpecifiedArgument {
                parameter: parameter.clone(),
                value,
                trapped,
            })
            .collect();
        Ok(CallSpecification {
            target,
            method,
            arguments,
        })
    }
}

/// Spread trapped constraints over argument slots. Either every constrainable
/// slot got one or none did.
fn distribute(
    method: &MethodInfo,
    values: &[Value],
    trapped: Vec<Constraint>,
) -> FakeResult<Vec<Vec<Constraint>>> {
    let slot_counts: Vec<usize> = method
        .parameters
        .iter()
        .zip(values)
        .map(|(p, v)| match (p.is_param_array, v.as_list()) {
            (true, Some(items)) => items.len(),
            _ => 1,
        })
        .collect();
    if trapped.is_empty() {
        return Ok(vec![Vec::new(); slot_counts.len()]);
    }

    let all: usize = slot_counts.iter().sum();
    let without_out: usize = method
        .parameters
        .iter()
        .zip(&slot_counts)
        .filter(|(p, _)| !p.is_out())
        .map(|(_, c)| c)
        .sum();
    let include_out = if trapped.len() == without_out {
        false
    } else if trapped.len() == all {
        true
    } else {
        return Err(FakeError::Configuration(format!(
            "{} argument constraint(s) were specified for {} which has {} constrainable argument(s); \
             when one argument uses a constraint, every argument must",
            trapped.len(),
            method.id,
            without_out
        )));
    };

    let mut constraints = trapped.into_iter();
    Ok(method
        .parameters
        .iter()
        .zip(slot_counts)
        .map(|(p, count)| {
            if p.is_out() && !include_out {
                Vec::new()
            } else {
                constraints.by_ref().take(count).collect()
            }
        })
        .collect())
}

/// Builds the constraint for one specified argument.
pub struct ArgumentConstraintFactory;

impl ArgumentConstraintFactory {
    pub fn get_argument_constraint(argument: &SpecifiedArgument) -> Constraint {
        let inner: Constraint = if argument.parameter.is_param_array
            && let Some(items) = argument.value.as_list()
        {
            let per_element = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    argument
                        .trapped
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| eq(item.clone()))
                })
                .collect();
            Arc::new(AggregateConstraint::new(per_element))
        } else {
            argument
                .trapped
                .first()
                .cloned()
                .unwrap_or_else(|| eq(argument.value.clone()))
        };

        match argument.parameter.direction {
            ParameterDirection::In => inner,
            ParameterDirection::Out => Arc::new(OutArgumentConstraint::new(argument.value.clone())),
            ParameterDirection::Ref => {
                Arc::new(RefArgumentConstraint::new(inner, argument.value.clone()))
            }
        }
    }
}
