//! Argument helpers for call specifications.
//!
//! Each helper registers a constraint with the specification being captured
//! and returns a placeholder of the parameter's type, so it can sit where the
//! argument goes:
//!
//! ```ignore
//! call_to(|| { foo.baz(arg::any(), arg::that(|n: &i64| *n > 3)); })?.returns(1);
//! ```
//!
//! Outside a specification the constraint is dropped with a warning.

use crate::domain::constraint::{self, Constraint};
use crate::domain::error::FakeResult;
use crate::domain::specification::trap_constraint;
use crate::domain::value::{FromValue, Value};
use tracing::warn;

fn trap(constraint: Constraint) {
    if !trap_constraint(constraint) {
        warn!("argument constraint used outside of a call specification; it has no effect");
    }
}

/// `T`'s type name with module paths dropped, e.g. `Vec<String>`.
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}

/// Any value.
pub fn any<T: Default>() -> T {
    trap(constraint::ignored());
    T::default()
}

/// Alias of [`any`].
pub fn ignored<T: Default>() -> T {
    any()
}

/// Value equal to `value`.
pub fn eq<T: Into<Value> + Clone>(value: T) -> T {
    trap(constraint::eq(value.clone()));
    value
}

/// Value that converts to `T` and satisfies `predicate`.
pub fn that<T: FromValue + Default + 'static>(
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> T {
    matches(format!("{} matching predicate", short_type_name::<T>()), predicate)
}

/// Like [`that`], with a description used in failure messages.
pub fn matches<T: FromValue + Default + 'static>(
    description: impl Into<String>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> T {
    trap(constraint::that(description, predicate));
    T::default()
}

/// Any prebuilt constraint.
pub fn with<T: Default>(constraint: Constraint) -> T {
    trap(constraint);
    T::default()
}

pub fn is_null<T: Default>() -> T {
    with(constraint::is_null())
}

pub fn not_null<T: Default>() -> T {
    with(constraint::not_null())
}

pub fn contains(fragment: impl Into<String>) -> String {
    with(constraint::contains(fragment))
}

pub fn starts_with(prefix: impl Into<String>) -> String {
    with(constraint::starts_with(prefix))
}

pub fn ends_with(suffix: impl Into<String>) -> String {
    with(constraint::ends_with(suffix))
}

pub fn matches_regex(pattern: &str) -> FakeResult<String> {
    Ok(with(constraint::matches_regex(pattern)?))
}

pub fn greater_than<T: Into<Value> + Default>(bound: T) -> T {
    with(constraint::greater_than(bound))
}

pub fn less_than<T: Into<Value> + Default>(bound: T) -> T {
    with(constraint::less_than(bound))
}

/// An `out` argument. The value is assigned to the parameter when a
/// configured call matches, unless the rule assigns outputs explicitly.
pub fn out<T>(value: T) -> T {
    trap(constraint::ignored());
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::configure::call_to;
    use crate::app::faker::Faker;
    use crate::domain::types::{MethodInfo, ParameterInfo, TypeInfo};
    use crate::domain::value::ValueKind;

    fn calculator() -> crate::domain::fake::FakeObject {
        let t = TypeInfo::interface("ICalculator")
            .method(
                MethodInfo::new("Add")
                    .param(ParameterInfo::new("a", ValueKind::Int))
                    .param(ParameterInfo::new("b", ValueKind::Int))
                    .returns(ValueKind::Int),
            )
            .build();
        Faker::new().fake(&t).unwrap()
    }

    #[test]
    fn test_helpers_outside_specification_return_placeholders() {
        assert_eq!(any::<i64>(), 0);
        assert_eq!(contains("x"), "");
        assert_eq!(eq(5i64), 5);
    }

    #[test]
    fn test_constraint_helpers_drive_matching() {
        let calc = calculator();
        call_to(|| {
            calc.call(
                "Add",
                vec![Value::from(that(|a: &i64| *a > 10)), Value::from(any::<i64>())],
            );
        })
        .unwrap()
        .returns(99);

        assert_eq!(calc.call("Add", vec![11.into(), 0.into()]).returns::<i64>(), 99);
        assert_eq!(calc.call("Add", vec![1.into(), 0.into()]).returns::<i64>(), 0);
    }

    #[test]
    fn test_that_describes_the_argument_type() {
        assert_eq!(short_type_name::<i64>(), "i64");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec<String>");

        let calc = calculator();
        let config = call_to(|| {
            calc.call(
                "Add",
                vec![Value::from(that(|a: &i64| *a > 10)), Value::from(any::<i64>())],
            );
        })
        .unwrap();
        assert!(config.rule().describe().contains("<i64 matching predicate>"));
    }

    #[test]
    fn test_partial_constraints_are_rejected() {
        let calc = calculator();
        let result = call_to(|| {
            calc.call("Add", vec![Value::from(any::<i64>()), 2.into()]);
        });
        assert!(result.is_err());
    }
}
