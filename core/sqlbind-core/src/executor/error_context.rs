//! Thread-local diagnostic context.
//!
//! Every top-level session operation records which statement and activity it
//! is running so failures can be annotated at the session boundary. The
//! context is reset by a drop guard on every exit path, success or failure.

use std::cell::RefCell;

thread_local! {
    static CONTEXT: RefCell<ErrorContext> = RefCell::new(ErrorContext::default());
}

/// Snapshot of what the current thread is executing.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub statement: Option<String>,
    pub activity: Option<String>,
}

impl ErrorContext {
    /// Install a new context for the current thread and return the guard
    /// that clears it again.
    pub fn enter(statement: &str, activity: &str) -> ErrorContextGuard {
        CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            ctx.statement = Some(statement.to_string());
            ctx.activity = Some(activity.to_string());
        });
        ErrorContextGuard { _private: () }
    }

    /// Read the current thread's context.
    pub fn current() -> ErrorContext {
        CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    fn reset() {
        CONTEXT.with(|ctx| *ctx.borrow_mut() = ErrorContext::default());
    }
}

/// Clears the thread-local context when dropped. Dropping happens on every
/// exit path of the operation that entered the context, including unwinds.
pub struct ErrorContextGuard {
    _private: (),
}

impl Drop for ErrorContextGuard {
    fn drop(&mut self) {
        ErrorContext::reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_visible_while_guard_alive() {
        let guard = ErrorContext::enter("M.find", "query");
        let ctx = ErrorContext::current();
        assert_eq!(ctx.statement.as_deref(), Some("M.find"));
        assert_eq!(ctx.activity.as_deref(), Some("query"));
        drop(guard);
        let ctx = ErrorContext::current();
        assert!(ctx.statement.is_none());
        assert!(ctx.activity.is_none());
    }

    #[test]
    fn context_reset_even_on_early_return() {
        fn failing_op() -> Result<(), ()> {
            let _guard = ErrorContext::enter("M.update", "update");
            Err(())
        }
        let _ = failing_op();
        assert!(ErrorContext::current().statement.is_none());
    }

    #[test]
    fn context_is_per_thread() {
        let _guard = ErrorContext::enter("M.outer", "query");
        std::thread::spawn(|| {
            assert!(ErrorContext::current().statement.is_none());
        })
        .join()
        .unwrap();
        assert_eq!(ErrorContext::current().statement.as_deref(), Some("M.outer"));
    }
}
