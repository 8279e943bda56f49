//! Shared fixtures for controller tests

use crate::{
    config::SiteConfig,
    controller::SiteController,
    memory::{ManualScheduler, MemoryDom, MemoryHistory, MemoryStore},
    platform::Platform,
};
use std::time::Duration;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A controller plus inspection handles onto each of its adapters.
pub struct Session {
    pub site: SiteController,
    pub page: MemoryDom,
    pub history: MemoryHistory,
    pub store: MemoryStore,
    pub clock: ManualScheduler,
}

impl Session {
    /// Advance the manual clock and deliver whatever came due.
    pub fn advance(&mut self, ms: u64) {
        let due = self.clock.advance(Duration::from_millis(ms));
        self.site.run_tasks(due);
    }

    /// Sections currently carrying the active class.
    pub fn active(&self) -> Vec<String> {
        let classes = &self.site.config().classes;
        self.page.active_sections(&classes.section, &classes.active)
    }

    pub fn stored_section(&self) -> Option<String> {
        self.store.get(&self.site.config().storage_key)
    }
}

/// Build an uninitialised session from its parts.
pub fn session_with(
    page: MemoryDom,
    history: MemoryHistory,
    store: MemoryStore,
    config: SiteConfig,
) -> Session {
    init_logging();
    let clock = ManualScheduler::new();
    let platform = Platform::new(page.clone(), history.clone(), store.clone(), clock.clone());
    Session {
        site: SiteController::new(config, platform),
        page,
        history,
        store,
        clock,
    }
}

/// The shipped page shell loaded at `hash`, initialised, with the loader and any other startup
/// tasks already run.
pub fn started_session(hash: Option<&str>) -> Session {
    let mut session = session_with(
        MemoryDom::site_shell(),
        MemoryHistory::new(hash),
        MemoryStore::new(),
        SiteConfig::default(),
    );
    session.site.init();
    session.advance(1_000);
    session
}
