//! Fake scopes: a thread-local stack of nested contexts.
//!
//! Calls remember every scope open at interception time. Rules configured
//! while a scope is open are removed again when it closes.

use crate::domain::error::{FakeError, FakeResult};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

pub type ScopeId = u64;

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

struct ScopeFrame {
    id: ScopeId,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeFrame>> = const { RefCell::new(Vec::new()) };
}

/// Guard for an open scope. Scopes must be closed innermost-first.
#[must_use = "the scope closes as soon as the guard is dropped"]
pub struct FakeScope {
    id: ScopeId,
    closed: bool,
    _not_send: PhantomData<*const ()>,
}

impl FakeScope {
    pub fn create() -> Self {
        let id = NEXT_SCOPE.fetch_add(1, Ordering::Relaxed);
        SCOPES.with(|s| {
            s.borrow_mut().push(ScopeFrame {
                id,
                cleanups: Vec::new(),
            })
        });
        trace!(scope = id, "opened fake scope");
        Self {
            id,
            closed: false,
            _not_send: PhantomData,
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Close explicitly; fails when an inner scope is still open. The scope is
    /// discarded either way.
    pub fn close(mut self) -> FakeResult<()> {
        self.closed = true;
        let result = pop_innermost(self.id);
        if result.is_err() {
            remove_anywhere(self.id);
        }
        result
    }
}

impl Drop for FakeScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = pop_innermost(self.id) {
            remove_anywhere(self.id);
            if !std::thread::panicking() {
                panic!("{}", e);
            }
        }
    }
}

fn pop_innermost(id: ScopeId) -> FakeResult<()> {
    let frame = SCOPES.with(|s| {
        let mut stack = s.borrow_mut();
        match stack.last() {
            Some(top) if top.id == id => Ok(stack.pop()),
            Some(top) => Err(FakeError::InvalidOperation(format!(
                "scope {} closed while inner scope {} is still open",
                id, top.id
            ))),
            None => Err(FakeError::InvalidOperation(format!(
                "scope {} is not open",
                id
            ))),
        }
    })?;
    if let Some(frame) = frame {
        run_cleanups(frame);
    }
    trace!(scope = id, "closed fake scope");
    Ok(())
}

fn remove_anywhere(id: ScopeId) {
    let frame = SCOPES.with(|s| {
        let mut stack = s.borrow_mut();
        stack
            .iter()
            .position(|f| f.id == id)
            .map(|i| stack.remove(i))
    });
    if let Some(frame) = frame {
        run_cleanups(frame);
    }
}

fn run_cleanups(frame: ScopeFrame) {
    for cleanup in frame.cleanups.into_iter().rev() {
        cleanup();
    }
}

/// Ids of all open scopes on this thread, outermost first.
pub(crate) fn active_scope_ids() -> Vec<ScopeId> {
    SCOPES.with(|s| s.borrow().iter().map(|f| f.id).collect())
}

pub(crate) fn current_scope() -> Option<ScopeId> {
    SCOPES.with(|s| s.borrow().last().map(|f| f.id))
}

/// Run `cleanup` when the innermost scope closes. Returns false when no scope
/// is open.
pub(crate) fn register_cleanup(cleanup: Box<dyn FnOnce()>) -> bool {
    SCOPES.with(|s| match s.borrow_mut().last_mut() {
        Some(frame) => {
            frame.cleanups.push(cleanup);
            true
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_scopes_nest() {
        assert_eq!(current_scope(), None);
        let outer = FakeScope::create();
        let inner = FakeScope::create();
        assert_eq!(active_scope_ids(), vec![outer.id(), inner.id()]);
        assert_eq!(current_scope(), Some(inner.id()));
        inner.close().unwrap();
        assert_eq!(current_scope(), Some(outer.id()));
        outer.close().unwrap();
        assert_eq!(current_scope(), None);
    }

    #[test]
    fn test_closing_outer_first_fails() {
        let outer = FakeScope::create();
        let inner = FakeScope::create();
        let inner_id = inner.id();
        let err = outer.close().unwrap_err();
        assert!(matches!(err, FakeError::InvalidOperation(_)));
        assert_eq!(active_scope_ids(), vec![inner_id]);
        inner.close().unwrap();
        assert_eq!(current_scope(), None);
    }

    #[test]
    fn test_cleanups_run_on_close() {
        let ran = Rc::new(Cell::new(false));
        let scope = FakeScope::create();
        let flag = Rc::clone(&ran);
        assert!(register_cleanup(Box::new(move || flag.set(true))));
        assert!(!ran.get());
        drop(scope);
        assert!(ran.get());
        assert!(!register_cleanup(Box::new(|| {})));
    }
}
