//! Page events delivered to [`crate::controller::SiteController::dispatch`].

use serde::{Deserialize, Serialize};

use crate::schedule::TaskId;

/// A key press, reduced to what the controller inspects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyInput {
    /// `KeyboardEvent.key`, e.g. `"Escape"`, `"Tab"`, `"k"`.
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: &str) -> KeyInput {
        KeyInput {
            key: key.to_string(),
            ..Default::default()
        }
    }

    pub fn escape() -> KeyInput {
        KeyInput::new("Escape")
    }

    pub fn with_ctrl(mut self) -> KeyInput {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> KeyInput {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> KeyInput {
        self.shift = true;
        self
    }

    /// Ctrl or Cmd held together with `key`.
    pub fn is_shortcut(&self, key: &str) -> bool {
        (self.ctrl || self.meta) && self.key == key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// A main navigation link was clicked. `href` is the link's raw `href` attribute.
    NavLinkClick { href: String },
    /// A link inside the sidebar was clicked.
    SidebarLinkClick { href: String },
    MenuTriggerClick,
    SidebarCloseClick,
    OverlayClick,
    /// Document-level keydown.
    KeyDown(KeyInput),
    /// Browser back/forward.
    PopState,
    Scroll,
    VisibilityChange { hidden: bool },
    /// A scheduled task came due.
    TaskDue(TaskId),
    /// An error escaped an event handler or a promise was rejected without a handler.
    UncaughtError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// The platform should suppress the browser's default action for the event.
    pub prevent_default: bool,
}

impl EventOutcome {
    pub fn handled() -> EventOutcome {
        EventOutcome {
            prevent_default: true,
        }
    }

    pub fn pass() -> EventOutcome {
        EventOutcome::default()
    }
}
