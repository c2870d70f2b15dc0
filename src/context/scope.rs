//! Thread-local "current contextual context".

use std::{cell::RefCell, marker::PhantomData};

use crate::context::LoadContext;

thread_local! {
    static CURRENT: RefCell<Option<LoadContext>> = const { RefCell::new(None) };
}

/// Guard returned by [`LoadContext::enter_scope`].
///
/// Restores the previously current context when dropped. Scopes nest and must be
/// dropped on the thread that created them.
#[must_use = "the scope ends when the guard is dropped"]
pub struct ContextScope {
    previous: Option<LoadContext>,
    _not_send: PhantomData<*const ()>,
}

impl ContextScope {
    pub(crate) fn enter(context: LoadContext) -> Self {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(context));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let leaving =
            CURRENT.with(|current| std::mem::replace(&mut *current.borrow_mut(), previous));
        drop(leaving);
    }
}

/// The context made current on this thread by the innermost live [`ContextScope`].
#[must_use]
pub fn current_contextual() -> Option<LoadContext> {
    CURRENT.with(|current| current.borrow().clone())
}
