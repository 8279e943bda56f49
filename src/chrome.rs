//! Page chrome that is not navigation: navbar scroll styling, the loading overlay, the
//! `page-loaded` body hook and visibility diagnostics.

use crate::{
    platform::PageContext,
    schedule::{DeferredTask, TaskId},
};

#[derive(Debug, Default)]
pub struct PageChrome {
    scroll_task: Option<TaskId>,
    scroll_evaluations: usize,
}

impl PageChrome {
    pub fn new() -> PageChrome {
        PageChrome::default()
    }

    /// A scroll event arrived. Bursts are coalesced: while an evaluation is pending, further
    /// events are absorbed into it.
    pub fn on_scroll(&mut self, cx: &mut PageContext) {
        if self.scroll_task.is_some() {
            return;
        }
        let delay = cx.config.timing.scroll_debounce();
        self.scroll_task = cx.schedule(DeferredTask::EvaluateScroll, delay);
        if self.scroll_task.is_none() {
            // No timer available, evaluate in place
            self.evaluate_scroll(cx);
        }
    }

    /// Toggle the navbar's scrolled class against the configured threshold.
    pub fn evaluate_scroll(&mut self, cx: &mut PageContext) {
        self.scroll_task = None;
        self.scroll_evaluations += 1;
        let config = cx.config;
        let navbar = &config.elements.navbar;
        let dom = cx.dom();
        if !dom.has_element(navbar) {
            return;
        }
        let scrolled = dom.scroll_y() > config.scroll_threshold;
        let result = if scrolled {
            dom.add_class(navbar, &config.classes.scrolled)
        } else {
            dom.remove_class(navbar, &config.classes.scrolled)
        };
        if let Err(e) = result {
            tracing::warn!("Could not update navbar scroll state: {e}");
        }
    }

    pub fn scroll_evaluations(&self) -> usize {
        self.scroll_evaluations
    }

    pub fn schedule_loader_dismissal(&mut self, cx: &mut PageContext) {
        let config = cx.config;
        if !cx.dom().has_element(&config.elements.page_loader) {
            return;
        }
        let delay = config.timing.loader_delay();
        if cx.schedule(DeferredTask::DismissLoader, delay).is_none() {
            self.dismiss_loader(cx);
        }
    }

    pub fn dismiss_loader(&mut self, cx: &mut PageContext) {
        let config = cx.config;
        let loader = &config.elements.page_loader;
        let dom = cx.dom();
        if dom.has_element(loader) {
            if let Err(e) = dom.add_class(loader, &config.classes.hidden) {
                tracing::warn!("Could not hide page loader: {e}");
            }
        }
    }

    pub fn mark_loaded(&mut self, cx: &mut PageContext) {
        let config = cx.config;
        if let Err(e) = cx.dom().add_body_class(&config.classes.page_loaded) {
            tracing::warn!("Could not mark page as loaded: {e}");
        }
    }

    pub fn on_visibility_change(&mut self, hidden: bool) {
        if hidden {
            tracing::debug!("Page hidden");
        } else {
            tracing::debug!("Page visible");
        }
    }
}
