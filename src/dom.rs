//! Page adapter traits.
//!
//! The controller never touches a document directly. Everything it needs from the page goes
//! through [`DomAdapter`] (elements, focus, title, announcements) and [`HistoryAdapter`] (the URL
//! fragment and session history). Elements are addressed by their id; the browser binding
//! resolves ids with `getElementById`, the in-memory page in [`crate::memory`] keeps a map.

use crate::error::SiteError;

/// Identifies a listener installed by [`DomAdapter::attach_focus_trap`].
pub type ListenerId = u64;

pub trait DomAdapter {
    fn has_element(&self, id: &str) -> bool;

    fn has_class(&self, id: &str, class: &str) -> bool;

    /// Ids of every element carrying `class`, in document order. Elements without an id are
    /// not addressable and are skipped.
    fn elements_with_class(&self, class: &str) -> Vec<String>;

    fn add_class(&mut self, id: &str, class: &str) -> Result<(), SiteError>;

    fn remove_class(&mut self, id: &str, class: &str) -> Result<(), SiteError>;

    fn set_attribute(&mut self, id: &str, name: &str, value: &str) -> Result<(), SiteError>;

    fn add_body_class(&mut self, class: &str) -> Result<(), SiteError>;

    /// Suppress (or restore) scrolling of the document body.
    fn set_scroll_locked(&mut self, locked: bool) -> Result<(), SiteError>;

    fn focus(&mut self, id: &str) -> Result<(), SiteError>;

    fn set_title(&mut self, title: &str);

    /// Smoothly scroll the viewport back to the top.
    fn scroll_to_top(&mut self);

    /// Current vertical scroll offset in CSS pixels.
    fn scroll_y(&self) -> f64;

    /// Emit a polite live-region announcement for assistive technology.
    fn announce(&mut self, message: &str) -> Result<(), SiteError>;

    /// Install a keydown listener on `container_id` that wraps Tab / Shift+Tab focus between the
    /// container's first and last focusable descendants (see [`crate::focus::wrap_target`]).
    fn attach_focus_trap(&mut self, container_id: &str) -> Result<ListenerId, SiteError>;

    /// Remove a focus trap listener. Returns `false` when the listener was already gone.
    fn detach_focus_trap(&mut self, listener: ListenerId) -> bool;
}

pub trait HistoryAdapter {
    /// The current URL fragment including its `#`, or `None` when the URL has no (or an empty)
    /// fragment.
    fn hash(&self) -> Option<String>;

    /// Add a session history entry pointing at `hash`.
    fn push_hash(&mut self, hash: &str) -> Result<(), SiteError>;

    /// Rewrite the current history entry to `hash` without adding a new one.
    fn replace_hash(&mut self, hash: &str) -> Result<(), SiteError>;
}
