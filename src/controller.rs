//! The page session: one [`SiteController`] owns the navigation state, the sidebar and the page
//! adapters, and every page event goes through [`SiteController::dispatch`].
//!
//! ## Event flow
//!
//! ```text
//! click / key / popstate / load ──► dispatch ──► Sidebar (open/close/toggle)
//!                                       │
//!                                       └──────► SectionRouter ──► DomAdapter, HistoryAdapter,
//!                                                                  SectionStore
//! ```
//!
//! History is written only here, never by the router: programmatic navigation and link clicks
//! push an entry after a successful navigation, initialisation may replace the current one, and
//! pop-state never writes.

use serde::Serialize;

use crate::{
    chrome::PageChrome,
    config::SiteConfig,
    error::SiteError,
    event::{EventOutcome, KeyInput, PageEvent},
    platform::{PageContext, Platform},
    router::{InitialSource, NavigationOutcome, SectionRouter},
    schedule::{DeferredTask, TaskId, TaskQueue},
    section::SectionId,
    sidebar::{Sidebar, SidebarState},
};

/// Snapshot of the UI state owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_section: SectionId,
    pub sidebar: SidebarState,
}

impl NavigationState {
    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar == SidebarState::Open
    }
}

pub struct SiteController {
    config: SiteConfig,
    platform: Platform,
    tasks: TaskQueue,
    router: SectionRouter,
    sidebar: Sidebar,
    chrome: PageChrome,
    initialized: bool,
}

macro_rules! page_context {
    ($self:ident) => {
        PageContext {
            config: &$self.config,
            platform: &mut $self.platform,
            tasks: &mut $self.tasks,
        }
    };
}

impl SiteController {
    pub fn new(config: SiteConfig, platform: Platform) -> SiteController {
        let router = SectionRouter::new(config.default_section.clone());
        SiteController {
            config,
            platform,
            tasks: TaskQueue::new(),
            router,
            sidebar: Sidebar::new(),
            chrome: PageChrome::new(),
            initialized: false,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            current_section: self.router.current().clone(),
            sidebar: self.sidebar.state(),
        }
    }

    pub fn current_section(&self) -> &SectionId {
        self.router.current()
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar.is_open()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of deferred tasks scheduled and not yet run or cancelled.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn scroll_evaluations(&self) -> usize {
        self.chrome.scroll_evaluations()
    }

    /// Start the page session: schedule the loader dismissal, restore the initial section and
    /// flag the body as loaded. Calling it again is a no-op that reports the current section.
    pub fn init(&mut self) -> (SectionId, InitialSource) {
        if self.initialized {
            tracing::warn!("SiteController::init called twice");
            return (self.router.current().clone(), InitialSource::Default);
        }
        let mut cx = page_context!(self);
        self.chrome.schedule_loader_dismissal(&mut cx);
        let initial = self.router.init(&mut cx);
        self.chrome.mark_loaded(&mut cx);
        self.initialized = true;
        tracing::info!("Military Essentials website initialized");
        initial
    }

    /// Navigate to `target` (`"tos"` or `"#tos"`) and push a history entry for it. Re-selecting
    /// the active section closes the sidebar if it is open and pushes nothing.
    pub fn show_section(&mut self, target: &str) -> NavigationOutcome {
        let outcome = self.navigate(SectionId::parse(target));
        self.push_history(&outcome);
        outcome
    }

    /// A navigation link was activated. `href` may be a bare fragment or a full URL.
    pub fn handle_link_click(&mut self, href: &str) -> NavigationOutcome {
        let outcome = self.navigate(SectionId::from_href(href));
        self.push_history(&outcome);
        outcome
    }

    /// The browser moved through history. Shows the section named by the new fragment, or the
    /// default one, without writing history.
    pub fn handle_pop_state(&mut self) -> NavigationOutcome {
        let target = match self.platform.history.hash() {
            Some(hash) => SectionId::parse(&hash),
            None => Ok(self.config.default_section.clone()),
        };
        self.navigate(target)
    }

    pub fn open_sidebar(&mut self) -> bool {
        let mut cx = page_context!(self);
        self.sidebar.open(&mut cx)
    }

    pub fn close_sidebar(&mut self) -> bool {
        let mut cx = page_context!(self);
        self.sidebar.close(&mut cx)
    }

    pub fn toggle_sidebar(&mut self) -> SidebarState {
        let mut cx = page_context!(self);
        self.sidebar.toggle(&mut cx)
    }

    pub fn dispatch(&mut self, event: PageEvent) -> EventOutcome {
        match event {
            PageEvent::NavLinkClick { href } => {
                self.handle_link_click(&href);
                EventOutcome::handled()
            }
            PageEvent::SidebarLinkClick { href } => {
                let outcome = self.navigate(SectionId::from_href(&href));
                self.close_sidebar();
                self.push_history(&outcome);
                EventOutcome::handled()
            }
            PageEvent::MenuTriggerClick => {
                self.toggle_sidebar();
                EventOutcome::pass()
            }
            PageEvent::SidebarCloseClick | PageEvent::OverlayClick => {
                self.close_sidebar();
                EventOutcome::pass()
            }
            PageEvent::KeyDown(key) => self.on_key_down(&key),
            PageEvent::PopState => {
                self.handle_pop_state();
                EventOutcome::pass()
            }
            PageEvent::Scroll => {
                let mut cx = page_context!(self);
                self.chrome.on_scroll(&mut cx);
                EventOutcome::pass()
            }
            PageEvent::VisibilityChange { hidden } => {
                self.chrome.on_visibility_change(hidden);
                EventOutcome::pass()
            }
            PageEvent::TaskDue(id) => {
                self.run_task(id);
                EventOutcome::pass()
            }
            PageEvent::UncaughtError { message } => {
                tracing::error!("Global error: {message}");
                EventOutcome::pass()
            }
        }
    }

    /// Run a scheduled task that came due. Cancelled or unknown ids are ignored.
    pub fn run_task(&mut self, id: TaskId) {
        let Some(task) = self.tasks.take(id) else {
            tracing::trace!("{id} was cancelled");
            return;
        };
        let mut cx = page_context!(self);
        match task {
            DeferredTask::Focus(target) => {
                if !self.sidebar.on_focus_task(id) {
                    tracing::debug!("{id} superseded, not focusing #{target}");
                    return;
                }
                if let Err(e) = cx.dom().focus(&target) {
                    tracing::warn!("Could not move focus to #{target}: {e}");
                }
            }
            DeferredTask::EvaluateScroll => self.chrome.evaluate_scroll(&mut cx),
            DeferredTask::DismissLoader => self.chrome.dismiss_loader(&mut cx),
        }
    }

    pub fn run_tasks<I: IntoIterator<Item = TaskId>>(&mut self, ids: I) {
        for id in ids {
            self.run_task(id);
        }
    }

    fn navigate(&mut self, target: Result<SectionId, SiteError>) -> NavigationOutcome {
        let mut cx = page_context!(self);
        let outcome = self.router.show_section(target, &mut cx);
        if let NavigationOutcome::AlreadyActive(_) = outcome {
            self.sidebar.close(&mut cx);
        }
        outcome
    }

    fn push_history(&mut self, outcome: &NavigationOutcome) {
        if let NavigationOutcome::Activated(id) = outcome {
            if let Err(e) = self.platform.history.push_hash(&id.to_hash()) {
                tracing::warn!("Could not push history entry for {id}: {e}");
            }
        }
    }

    fn on_key_down(&mut self, key: &KeyInput) -> EventOutcome {
        if key.key == "Escape" && self.sidebar.is_open() {
            self.close_sidebar();
            return EventOutcome::pass();
        }
        if key.is_shortcut(&self.config.shortcut_key) {
            self.toggle_sidebar();
            return EventOutcome::handled();
        }
        EventOutcome::pass()
    }
}
