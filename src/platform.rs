//! The bundle of adapters a controller runs against.

use std::time::Duration;

use crate::{
    config::SiteConfig,
    dom::{DomAdapter, HistoryAdapter},
    schedule::{DeferredTask, Scheduler, TaskId, TaskQueue},
    storage::SectionStore,
};

pub struct Platform {
    pub dom: Box<dyn DomAdapter>,
    pub history: Box<dyn HistoryAdapter>,
    pub store: Box<dyn SectionStore>,
    pub scheduler: Box<dyn Scheduler>,
}

impl Platform {
    pub fn new(
        dom: impl DomAdapter + 'static,
        history: impl HistoryAdapter + 'static,
        store: impl SectionStore + 'static,
        scheduler: impl Scheduler + 'static,
    ) -> Platform {
        Platform {
            dom: Box::new(dom),
            history: Box::new(history),
            store: Box::new(store),
            scheduler: Box::new(scheduler),
        }
    }
}

/// Borrowed view handed to the router, sidebar and page chrome for the duration of one
/// operation.
pub struct PageContext<'a> {
    pub config: &'a SiteConfig,
    pub platform: &'a mut Platform,
    pub tasks: &'a mut TaskQueue,
}

impl PageContext<'_> {
    pub fn dom(&mut self) -> &mut dyn DomAdapter {
        self.platform.dom.as_mut()
    }

    pub fn schedule(&mut self, task: DeferredTask, delay: Duration) -> Option<TaskId> {
        self.tasks
            .schedule(self.platform.scheduler.as_mut(), task, delay)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.cancel(self.platform.scheduler.as_mut(), id)
    }

    /// Announce `message`; a failing live region is logged and otherwise ignored.
    pub fn announce(&mut self, message: &str) {
        if let Err(e) = self.platform.dom.announce(message) {
            tracing::warn!("Screen reader announcement failed: {e}");
        }
    }
}
