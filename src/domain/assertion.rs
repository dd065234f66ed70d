//! The assertion engine: repeat constraints, call log scans and ordered
//! assertion scopes.

use crate::domain::call::{CompletedCall, FakeCall, SequenceNumber};
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::ports::CallWriter;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A predicate over a call count, with its description.
#[derive(Clone)]
pub struct Repeated {
    predicate: Arc<dyn Fn(usize) -> bool + Send + Sync>,
    description: String,
}

impl Repeated {
    pub fn exactly(times: usize) -> Self {
        Self::like(format!("exactly {}", format_times(times)), move |n| n == times)
    }

    pub fn at_least(times: usize) -> Self {
        Self::like(format!("at least {}", format_times(times)), move |n| n >= times)
    }

    pub fn no_more_than(times: usize) -> Self {
        Self::like(format!("no more than {}", format_times(times)), move |n| {
            n <= times
        })
    }

    pub fn never() -> Self {
        Self::like("never", |n| n == 0)
    }

    pub fn once() -> Self {
        Self::exactly(1)
    }

    pub fn twice() -> Self {
        Self::exactly(2)
    }

    pub fn like(
        description: impl Into<String>,
        predicate: impl Fn(usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }

    pub fn matches(&self, count: usize) -> bool {
        (self.predicate)(count)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repeated({})", self.description)
    }
}

impl fmt::Display for Repeated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

fn format_times(n: usize) -> String {
    match n {
        1 => "once".to_string(),
        2 => "twice".to_string(),
        n => format!("{} times", n),
    }
}

struct OrderedContext {
    cursor: SequenceNumber,
    asserted: Vec<String>,
}

thread_local! {
    static ORDERED: RefCell<Option<OrderedContext>> = const { RefCell::new(None) };
    // Where the last closed ordered scope stopped; the next scope starts here.
    static ORDERED_CURSOR: Cell<SequenceNumber> = const { Cell::new(0) };
}

/// Guard for an ordered assertion scope; assertions made while it is alive
/// must match calls in interception order.
#[must_use = "the ordered scope ends as soon as the guard is dropped"]
pub struct OrderedAssertionScope {
    _not_send: PhantomData<*const ()>,
}

/// Open an ordered assertion scope on this thread. Only one may be open.
///
/// Scopes continue from where the previous one on this thread stopped, so a
/// later scope only sees calls after the last call matched before it.
pub fn ordered_assertions() -> FakeResult<OrderedAssertionScope> {
    ORDERED.with(|o| {
        let mut slot = o.borrow_mut();
        if slot.is_some() {
            return Err(FakeError::InvalidOperation(
                "an ordered assertion scope is already open on this thread".to_string(),
            ));
        }
        *slot = Some(OrderedContext {
            cursor: ORDERED_CURSOR.with(Cell::get),
            asserted: Vec::new(),
        });
        Ok(OrderedAssertionScope {
            _not_send: PhantomData,
        })
    })
}

impl Drop for OrderedAssertionScope {
    fn drop(&mut self) {
        if let Some(ctx) = ORDERED.with(|o| o.borrow_mut().take()) {
            ORDERED_CURSOR.with(|c| c.set(ctx.cursor));
        }
    }
}

/// Check that calls satisfying `predicate` occur `repeat` times in `calls`.
///
/// Inside an ordered scope only calls after the previous assertion's last
/// match are considered, and the scan stops as soon as `repeat` holds.
pub fn assert_was_called(
    calls: &[Arc<CompletedCall>],
    predicate: &dyn Fn(&CompletedCall) -> bool,
    call_description: &str,
    repeat: &Repeated,
    writer: &dyn CallWriter,
) -> FakeResult<()> {
    let cursor = ORDERED.with(|o| o.borrow().as_ref().map(|ctx| ctx.cursor));
    let Some(cursor) = cursor else {
        let count = calls.iter().filter(|c| predicate(c)).count();
        if repeat.matches(count) {
            return Ok(());
        }
        return Err(FakeError::Expectation(unordered_failure(
            calls,
            call_description,
            repeat,
            count,
            writer,
        )));
    };

    let mut count = 0;
    let mut last_match = None;
    let mut satisfied = false;
    for call in calls.iter().filter(|c| c.sequence_number() > cursor) {
        if predicate(call) {
            count += 1;
            last_match = Some(call.sequence_number());
            if repeat.matches(count) {
                satisfied = true;
                break;
            }
        }
    }
    let satisfied = satisfied || repeat.matches(count);

    ORDERED.with(|o| {
        let mut slot = o.borrow_mut();
        let ctx = slot.as_mut()?;
        ctx.asserted.push(format!("{} {}", call_description, repeat));
        if let Some(sequence) = last_match {
            ctx.cursor = sequence;
        }
        if satisfied {
            None
        } else {
            Some(ordered_failure(calls, &ctx.asserted, writer))
        }
    })
    .map_or(Ok(()), |message| Err(FakeError::Expectation(message)))
}

fn unordered_failure(
    calls: &[Arc<CompletedCall>],
    call_description: &str,
    repeat: &Repeated,
    count: usize,
    writer: &dyn CallWriter,
) -> String {
    let mut out = format!(
        "Assertion failed for the following call:\n  {}\nExpected to find it {} ",
        call_description, repeat
    );
    if calls.is_empty() {
        out.push_str("but no calls were made to the fake object.");
    } else {
        out.push_str(&format!(
            "but found it {} among the calls:\n",
            format_times(count)
        ));
        writer.write_calls(calls, &mut out);
    }
    out
}

fn ordered_failure(
    calls: &[Arc<CompletedCall>],
    asserted: &[String],
    writer: &dyn CallWriter,
) -> String {
    let mut out = String::from("Assertion failed for the following calls:\n");
    for line in asserted {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("Expected to find them in the given order ");
    if calls.is_empty() {
        out.push_str("but no calls were made to the fake object.");
    } else {
        out.push_str("but they were not found in that order among the calls:\n");
        writer.write_calls(calls, &mut out);
    }
    out
}
