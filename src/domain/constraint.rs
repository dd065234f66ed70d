//! Argument constraints: a predicate over one argument value plus a description.
//!
//! Constraints are stateless and shared (`Arc`) between the rules and
//! assertions built from the same call specification.

use crate::domain::error::{FakeError, FakeResult};
use crate::domain::value::{FromValue, Value};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// A predicate over a single argument.
///
/// `write_description` must not fail and must write non-empty text; it ends up
/// in failure messages.
pub trait ArgumentConstraint: Send + Sync {
    fn is_valid(&self, argument: &Value) -> bool;

    fn write_description(&self, out: &mut String);

    /// Value to assign to an `out`/`ref` slot when a rule built from this
    /// constraint applies.
    fn output_value(&self) -> Option<&Value> {
        None
    }

    fn description(&self) -> String {
        let mut out = String::new();
        self.write_description(&mut out);
        out
    }
}

pub type Constraint = Arc<dyn ArgumentConstraint>;

impl fmt::Debug for dyn ArgumentConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

type Comparer = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Matches values equal to the expected one.
pub struct EqualityConstraint {
    expected: Value,
    comparer: Option<Comparer>,
}

impl EqualityConstraint {
    pub fn new(expected: Value) -> Self {
        Self {
            expected,
            comparer: None,
        }
    }

    pub fn with_comparer(
        expected: Value,
        comparer: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            expected,
            comparer: Some(Arc::new(comparer)),
        }
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }
}

impl ArgumentConstraint for EqualityConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        match &self.comparer {
            Some(cmp) => cmp(&self.expected, argument),
            None => &self.expected == argument,
        }
    }

    fn write_description(&self, out: &mut String) {
        out.push_str(&self.expected.to_string());
    }
}

/// Wraps an arbitrary predicate.
pub struct PredicateConstraint {
    predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    description: String,
}

impl PredicateConstraint {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }
}

impl ArgumentConstraint for PredicateConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        (self.predicate)(argument)
    }

    fn write_description(&self, out: &mut String) {
        if self.description.is_empty() {
            out.push_str("<Predicate>");
        } else {
            out.push('<');
            out.push_str(&self.description);
            out.push('>');
        }
    }
}

/// Matches anything.
pub struct IgnoredConstraint;

impl ArgumentConstraint for IgnoredConstraint {
    fn is_valid(&self, _argument: &Value) -> bool {
        true
    }

    fn write_description(&self, out: &mut String) {
        out.push_str("<Ignored>");
    }
}

/// Stand-in used for descriptions once a whole-argument-list predicate has
/// replaced the per-argument constraints.
pub struct PredicatedMarker;

impl ArgumentConstraint for PredicatedMarker {
    fn is_valid(&self, _argument: &Value) -> bool {
        true
    }

    fn write_description(&self, out: &mut String) {
        out.push_str("<Predicated>");
    }
}

/// One constraint per element of a `params` array; all must hold and the
/// element counts must agree.
pub struct AggregateConstraint {
    constraints: Vec<Constraint>,
}

impl AggregateConstraint {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }
}

impl ArgumentConstraint for AggregateConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        let Some(items) = argument.as_list() else {
            return false;
        };
        items.len() == self.constraints.len()
            && self
                .constraints
                .iter()
                .zip(items)
                .all(|(c, item)| c.is_valid(item))
    }

    fn write_description(&self, out: &mut String) {
        out.push('[');
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            c.write_description(out);
        }
        out.push(']');
    }
}

/// `out` parameter: ignores the incoming value, carries the value to assign.
pub struct OutArgumentConstraint {
    value: Value,
}

impl OutArgumentConstraint {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl ArgumentConstraint for OutArgumentConstraint {
    fn is_valid(&self, _argument: &Value) -> bool {
        true
    }

    fn write_description(&self, out: &mut String) {
        out.push_str("<out parameter>");
    }

    fn output_value(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

/// `ref` parameter: validates the incoming value and carries the value to assign.
pub struct RefArgumentConstraint {
    inner: Constraint,
    value: Value,
}

impl RefArgumentConstraint {
    pub fn new(inner: Constraint, value: Value) -> Self {
        Self { inner, value }
    }
}

impl ArgumentConstraint for RefArgumentConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        self.inner.is_valid(argument)
    }

    fn write_description(&self, out: &mut String) {
        self.inner.write_description(out);
    }

    fn output_value(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

pub struct NotConstraint(Constraint);

impl ArgumentConstraint for NotConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        !self.0.is_valid(argument)
    }

    fn write_description(&self, out: &mut String) {
        out.push_str("not ");
        self.0.write_description(out);
    }
}

pub struct AndConstraint(Constraint, Constraint);

impl ArgumentConstraint for AndConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        self.0.is_valid(argument) && self.1.is_valid(argument)
    }

    fn write_description(&self, out: &mut String) {
        out.push('(');
        self.0.write_description(out);
        out.push_str(" and ");
        self.1.write_description(out);
        out.push(')');
    }
}

pub struct OrConstraint(Constraint, Constraint);

impl ArgumentConstraint for OrConstraint {
    fn is_valid(&self, argument: &Value) -> bool {
        self.0.is_valid(argument) || self.1.is_valid(argument)
    }

    fn write_description(&self, out: &mut String) {
        out.push('(');
        self.0.write_description(out);
        out.push_str(" or ");
        self.1.write_description(out);
        out.push(')');
    }
}

/// Combinators available on every shared constraint.
pub trait ConstraintExt {
    fn and(self, other: Constraint) -> Constraint;
    fn or(self, other: Constraint) -> Constraint;
}

impl ConstraintExt for Constraint {
    fn and(self, other: Constraint) -> Constraint {
        Arc::new(AndConstraint(self, other))
    }

    fn or(self, other: Constraint) -> Constraint {
        Arc::new(OrConstraint(self, other))
    }
}

// Constructors.

pub fn eq(expected: impl Into<Value>) -> Constraint {
    Arc::new(EqualityConstraint::new(expected.into()))
}

pub fn ignored() -> Constraint {
    Arc::new(IgnoredConstraint)
}

pub fn not(inner: Constraint) -> Constraint {
    Arc::new(NotConstraint(inner))
}

pub fn matches(
    description: impl Into<String>,
    predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
) -> Constraint {
    Arc::new(PredicateConstraint::new(description, predicate))
}

/// Predicate over the argument converted to `T`; conversion failure is a mismatch.
pub fn that<T: FromValue + 'static>(
    description: impl Into<String>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Constraint {
    matches(description, move |v| {
        T::from_value(v.clone()).is_some_and(|t| predicate(&t))
    })
}

pub fn is_null() -> Constraint {
    matches("NULL", Value::is_null)
}

pub fn not_null() -> Constraint {
    matches("NOT NULL", |v| !v.is_null())
}

pub fn contains(fragment: impl Into<String>) -> Constraint {
    let fragment = fragment.into();
    let description = format!("string that contains \"{}\"", fragment);
    matches(description, move |v| {
        v.as_str().is_some_and(|s| s.contains(&fragment))
    })
}

pub fn starts_with(prefix: impl Into<String>) -> Constraint {
    let prefix = prefix.into();
    let description = format!("string that starts with \"{}\"", prefix);
    matches(description, move |v| {
        v.as_str().is_some_and(|s| s.starts_with(&prefix))
    })
}

pub fn ends_with(suffix: impl Into<String>) -> Constraint {
    let suffix = suffix.into();
    let description = format!("string that ends with \"{}\"", suffix);
    matches(description, move |v| {
        v.as_str().is_some_and(|s| s.ends_with(&suffix))
    })
}

pub fn matches_regex(pattern: &str) -> FakeResult<Constraint> {
    let regex = Regex::new(pattern)
        .map_err(|e| FakeError::Argument(format!("invalid pattern {:?}: {}", pattern, e)))?;
    let description = format!("string matching /{}/", pattern);
    Ok(matches(description, move |v| {
        v.as_str().is_some_and(|s| regex.is_match(s))
    }))
}

pub fn is_empty() -> Constraint {
    matches("empty", |v| match v {
        Value::Str(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    })
}

pub fn greater_than(bound: impl Into<Value>) -> Constraint {
    let bound = bound.into();
    let description = format!("greater than {}", bound);
    matches(description, move |v| match (v.as_float(), bound.as_float()) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    })
}

pub fn less_than(bound: impl Into<Value>) -> Constraint {
    let bound = bound.into();
    let description = format!("less than {}", bound);
    matches(description, move |v| match (v.as_float(), bound.as_float()) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    })
}

/// List argument with the same elements in the same order.
pub fn same_sequence_as(expected: impl Into<Value>) -> Constraint {
    let expected = expected.into();
    let description = format!("same sequence as {}", expected);
    matches(description, move |v| match (v.as_list(), expected.as_list()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_constraint_accepts_nan() {
        let c = eq(Value::Float(f64::NAN));
        assert!(c.is_valid(&Value::Float(f64::NAN)));
        assert!(!c.is_valid(&Value::Float(0.0)));
    }

    #[test]
    fn test_equality_constraint() {
        let c = eq(5);
        assert!(c.is_valid(&Value::Int(5)));
        assert!(!c.is_valid(&Value::Int(6)));
        assert!(!c.is_valid(&Value::Null));
        assert_eq!(c.description(), "5");
    }

    #[test]
    fn test_equality_distinguishes_null() {
        let c = eq(Value::Null);
        assert!(c.is_valid(&Value::Null));
        assert!(!c.is_valid(&Value::Str(String::new())));
        assert_eq!(c.description(), "NULL");
    }

    #[test]
    fn test_equality_with_comparer() {
        let c = EqualityConstraint::with_comparer(Value::from("abc"), |a, b| {
            match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
        });
        assert!(c.is_valid(&Value::from("ABC")));
        assert!(!c.is_valid(&Value::from("abd")));
    }

    #[test]
    fn test_combinators() {
        let c = greater_than(1).and(less_than(5));
        assert!(c.is_valid(&Value::Int(3)));
        assert!(!c.is_valid(&Value::Int(5)));
        assert_eq!(c.description(), "(<greater than 1> and <less than 5>)");

        let c = eq(1).or(eq(2));
        assert!(c.is_valid(&Value::Int(2)));
        assert!(!c.is_valid(&Value::Int(3)));

        let c = not(is_null());
        assert!(c.is_valid(&Value::Int(0)));
        assert_eq!(c.description(), "not <NULL>");
    }

    #[test]
    fn test_aggregate_requires_same_length() {
        let c = AggregateConstraint::new(vec![eq(1), ignored()]);
        assert!(c.is_valid(&Value::from(vec![1, 9])));
        assert!(!c.is_valid(&Value::from(vec![1])));
        assert!(!c.is_valid(&Value::from(vec![2, 9])));
        assert!(!c.is_valid(&Value::Int(1)));
        assert_eq!(c.description(), "[1, <Ignored>]");
    }

    #[test]
    fn test_out_and_ref_carry_values() {
        let out = OutArgumentConstraint::new(Value::from("bla"));
        assert!(out.is_valid(&Value::Null));
        assert_eq!(out.output_value(), Some(&Value::from("bla")));

        let r = RefArgumentConstraint::new(eq(1), Value::Int(2));
        assert!(r.is_valid(&Value::Int(1)));
        assert!(!r.is_valid(&Value::Int(2)));
        assert_eq!(r.output_value(), Some(&Value::Int(2)));
        assert_eq!(r.description(), "1");
    }

    #[test]
    fn test_string_constraints() {
        assert!(contains("ell").is_valid(&Value::from("hello")));
        assert!(!contains("ell").is_valid(&Value::Int(1)));
        assert!(starts_with("he").is_valid(&Value::from("hello")));
        assert!(ends_with("lo").is_valid(&Value::from("hello")));
        let re = matches_regex("^h.*o$").unwrap();
        assert!(re.is_valid(&Value::from("hello")));
        assert!(matches_regex("(").is_err());
    }

    #[test]
    fn test_typed_that() {
        let c = that::<i32>("even", |x| x % 2 == 0);
        assert!(c.is_valid(&Value::Int(4)));
        assert!(!c.is_valid(&Value::Int(3)));
        assert!(!c.is_valid(&Value::from("4")));
        assert_eq!(c.description(), "<even>");
    }

    #[test]
    fn test_predicate_description_never_empty() {
        let c = matches("", |_| true);
        assert_eq!(c.description(), "<Predicate>");
    }
}
