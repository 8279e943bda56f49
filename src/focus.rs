//! Focus trapping for the open sidebar.
//!
//! While the sidebar is open, Tab on its last focusable element wraps to the first and Shift+Tab
//! on the first wraps to the last. The wrap rule lives in [`wrap_target`] so every page adapter
//! applies the same behaviour; the listener itself is a [`FocusTrapHandle`], acquired on open and
//! consumed on close.

use crate::{
    dom::{DomAdapter, ListenerId},
    error::SiteError,
};

/// CSS selector matching elements that take part in Tab order inside the trap.
pub const FOCUSABLE_SELECTOR: &str =
    "button, [href], input, select, textarea, [tabindex]:not([tabindex=\"-1\"])";

/// Decide where a Tab key press should wrap to.
///
/// `len` is the number of focusable elements in the container and `current` the index of the
/// focused one, if focus is inside. Returns the index to focus (and the caller should prevent the
/// browser default), or `None` to let the key through.
pub fn wrap_target(len: usize, current: Option<usize>, shift: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let last = len - 1;
    match (current, shift) {
        (Some(0), true) => Some(last),
        (Some(i), false) if i == last => Some(0),
        _ => None,
    }
}

/// An installed focus trap listener. Dropping the handle without calling
/// [`FocusTrapHandle::release`] leaks the listener, so the sidebar always releases it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a focus trap must be released when the sidebar closes"]
pub struct FocusTrapHandle {
    listener: ListenerId,
    container: String,
}

impl FocusTrapHandle {
    pub fn acquire(dom: &mut dyn DomAdapter, container: &str) -> Result<FocusTrapHandle, SiteError> {
        let listener = dom.attach_focus_trap(container)?;
        tracing::debug!("focus trap {listener} installed on #{container}");
        Ok(FocusTrapHandle {
            listener,
            container: container.to_string(),
        })
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Remove the listener. Consuming `self` makes a second release impossible; an adapter that
    /// already lost the listener only produces a debug log.
    pub fn release(self, dom: &mut dyn DomAdapter) {
        if dom.detach_focus_trap(self.listener) {
            tracing::debug!("focus trap {} released from #{}", self.listener, self.container);
        } else {
            tracing::debug!(
                "focus trap {} on #{} was already removed",
                self.listener,
                self.container
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDom;
    use test_log::test;

    #[test]
    fn test_wrap_forward_from_last() {
        assert_eq!(wrap_target(4, Some(3), false), Some(0));
        assert_eq!(wrap_target(4, Some(1), false), None);
        assert_eq!(wrap_target(4, None, false), None);
    }

    #[test]
    fn test_wrap_backward_from_first() {
        assert_eq!(wrap_target(4, Some(0), true), Some(3));
        assert_eq!(wrap_target(4, Some(2), true), None);
    }

    #[test]
    fn test_single_focusable_wraps_onto_itself() {
        assert_eq!(wrap_target(1, Some(0), false), Some(0));
        assert_eq!(wrap_target(1, Some(0), true), Some(0));
        assert_eq!(wrap_target(0, None, true), None);
    }

    #[test]
    fn test_release_tolerates_missing_listener() {
        let page = MemoryDom::site_shell();
        let mut dom = page.clone();
        let handle = FocusTrapHandle::acquire(&mut dom, "sidebar").unwrap();
        assert_eq!(handle.container(), "sidebar");
        assert!(page.detach_focus_trap_externally(handle.listener()));
        handle.release(&mut dom);
        assert_eq!(page.traps_acquired(), 1);
        assert_eq!(page.active_traps(), 0);
    }

    #[test]
    fn test_acquire_on_missing_container_fails() {
        let mut dom = MemoryDom::new();
        assert!(matches!(
            FocusTrapHandle::acquire(&mut dom, "sidebar"),
            Err(SiteError::Dom(_))
        ));
    }
}
