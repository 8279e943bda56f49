//! Slide-out navigation panel lifecycle.
//!
//! `Closed ⇄ Open`. Each transition is guarded so repeating it is a no-op: no page mutation and
//! no second announcement. Opening acquires a [`FocusTrapHandle`]; closing releases it. Focus is
//! moved on a deferred task so the CSS transition has begun; starting a new transition cancels the
//! previous transition's pending focus move, so the last transition always decides where focus
//! lands.

use serde::{Deserialize, Serialize};

use crate::{
    focus::FocusTrapHandle,
    platform::PageContext,
    schedule::{DeferredTask, TaskId},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SidebarState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Default)]
pub struct Sidebar {
    state: SidebarState,
    trap: Option<FocusTrapHandle>,
    pending_focus: Option<TaskId>,
}

impl Sidebar {
    pub fn new() -> Sidebar {
        Sidebar::default()
    }

    pub fn state(&self) -> SidebarState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SidebarState::Open
    }

    pub fn pending_focus(&self) -> Option<TaskId> {
        self.pending_focus
    }

    /// Open the panel. Returns `false` if it was already open.
    pub fn open(&mut self, cx: &mut PageContext) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = SidebarState::Open;

        let config = cx.config;
        let ids = &config.elements;
        let active = &config.classes.active;
        let dom = cx.platform.dom.as_mut();
        let result = dom
            .add_class(&ids.sidebar, active)
            .and_then(|_| dom.add_class(&ids.sidebar_overlay, active))
            .and_then(|_| dom.set_scroll_locked(true))
            .and_then(|_| dom.set_attribute(&ids.menu_trigger, "aria-expanded", "true"))
            .and_then(|_| dom.set_attribute(&ids.sidebar, "aria-hidden", "false"));
        if let Err(e) = result {
            tracing::warn!("Sidebar open state incomplete: {e}");
        }

        match FocusTrapHandle::acquire(dom, &ids.sidebar) {
            Ok(trap) => self.trap = Some(trap),
            Err(e) => tracing::warn!("Could not trap focus in sidebar: {e}"),
        }
        self.refocus(cx, ids.sidebar_close.clone());

        cx.announce("Navigation menu opened");
        tracing::debug!("sidebar opened");
        true
    }

    /// Close the panel. Returns `false` if it was already closed.
    pub fn close(&mut self, cx: &mut PageContext) -> bool {
        if !self.is_open() {
            return false;
        }
        self.state = SidebarState::Closed;

        let config = cx.config;
        let ids = &config.elements;
        let active = &config.classes.active;
        let dom = cx.platform.dom.as_mut();
        let result = dom
            .remove_class(&ids.sidebar, active)
            .and_then(|_| dom.remove_class(&ids.sidebar_overlay, active))
            .and_then(|_| dom.set_scroll_locked(false))
            .and_then(|_| dom.set_attribute(&ids.menu_trigger, "aria-expanded", "false"))
            .and_then(|_| dom.set_attribute(&ids.sidebar, "aria-hidden", "true"));
        if let Err(e) = result {
            tracing::warn!("Sidebar close state incomplete: {e}");
        }

        if let Some(trap) = self.trap.take() {
            trap.release(dom);
        }
        self.refocus(cx, ids.menu_trigger.clone());

        cx.announce("Navigation menu closed");
        tracing::debug!("sidebar closed");
        true
    }

    pub fn toggle(&mut self, cx: &mut PageContext) -> SidebarState {
        if self.is_open() {
            self.close(cx);
        } else {
            self.open(cx);
        }
        self.state
    }

    /// A deferred focus task fired. Returns whether it was this sidebar's current one.
    pub fn on_focus_task(&mut self, id: TaskId) -> bool {
        if self.pending_focus == Some(id) {
            self.pending_focus = None;
            true
        } else {
            false
        }
    }

    fn refocus(&mut self, cx: &mut PageContext, target: String) {
        if let Some(previous) = self.pending_focus.take() {
            cx.cancel(previous);
        }
        let delay = cx.config.timing.focus_delay();
        self.pending_focus = cx.schedule(DeferredTask::Focus(target), delay);
    }
}
