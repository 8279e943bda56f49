//! A visitor's session on the page shell, driven only through page events.

mod common;

use essentials_site::{
    config::{ServerConfig, SiteConfig},
    controller::SiteController,
    dom::{DomAdapter, HistoryAdapter},
    event::{KeyInput, PageEvent},
    memory::{ManualScheduler, MemoryDom, MemoryHistory, MemoryStore},
    platform::Platform,
    router::InitialSource,
    SiteError,
};
use std::time::Duration;
use tempfile::TempDir;
use test_log::test;

struct Visit {
    site: SiteController,
    page: MemoryDom,
    history: MemoryHistory,
    store: MemoryStore,
    clock: ManualScheduler,
}

impl Visit {
    fn start(hash: Option<&str>, store: MemoryStore) -> Visit {
        common::init_logging();
        let page = MemoryDom::site_shell();
        let history = MemoryHistory::new(hash);
        let clock = ManualScheduler::new();
        let platform = Platform::new(page.clone(), history.clone(), store.clone(), clock.clone());
        let site = SiteController::new(SiteConfig::default(), platform);
        Visit {
            site,
            page,
            history,
            store,
            clock,
        }
    }

    fn wait(&mut self, ms: u64) {
        let due = self.clock.advance(Duration::from_millis(ms));
        self.site.run_tasks(due);
    }

    fn click(&mut self, href: &str) {
        self.site.dispatch(PageEvent::NavLinkClick {
            href: href.to_string(),
        });
    }
}

#[test]
fn test_first_visit_then_return_visit() {
    let store = MemoryStore::new();
    let mut first = Visit::start(None, store.clone());
    assert_eq!(first.site.init().1, InitialSource::Default);
    first.wait(300);
    assert!(first.page.has_class("pageLoader", "hidden"));

    // Open the menu from the keyboard and pick a section
    first
        .site
        .dispatch(PageEvent::KeyDown(KeyInput::new("k").with_ctrl()));
    first.wait(100);
    assert_eq!(first.page.focused().as_deref(), Some("sidebarClose"));
    first.site.dispatch(PageEvent::SidebarLinkClick {
        href: "#tos".to_string(),
    });
    first.wait(100);
    assert_eq!(first.page.focused().as_deref(), Some("hamburgerMenu"));
    assert!(!first.page.scroll_locked());
    assert_eq!(first.history.hash().as_deref(), Some("#tos"));
    assert_eq!(first.store.get("currentSection").as_deref(), Some("tos"));

    // Coming back without a fragment restores the last section
    let mut second = Visit::start(None, store);
    assert_eq!(second.site.init().1, InitialSource::Persisted);
    assert_eq!(second.site.current_section().as_str(), "tos");
    assert_eq!(second.history.hash().as_deref(), Some("#tos"));
    assert_eq!(second.page.title(), "Terms of Service - Military Essentials");
}

#[test]
fn test_browsing_and_going_back() {
    let mut visit = Visit::start(Some("#home"), MemoryStore::new());
    visit.site.init();
    visit.click("#privacy");
    visit.click("#tos");
    visit.click("#tos");
    assert_eq!(visit.history.push_count(), 2);

    visit.history.back();
    visit.site.dispatch(PageEvent::PopState);
    assert_eq!(visit.site.current_section().as_str(), "privacy");
    visit.history.back();
    visit.site.dispatch(PageEvent::PopState);
    assert_eq!(visit.site.current_section().as_str(), "home");
    assert!(!visit.history.back());

    // A new click after going back drops the forward entries
    visit.click("#tos");
    assert!(!visit.history.forward());
    assert_eq!(visit.history.len(), 2);
}

#[test]
fn test_escape_from_open_menu() {
    let mut visit = Visit::start(None, MemoryStore::new());
    visit.site.init();
    visit.site.dispatch(PageEvent::MenuTriggerClick);
    visit.wait(100);
    assert!(visit.page.press_tab(true));

    visit.site.dispatch(PageEvent::KeyDown(KeyInput::escape()));
    visit.wait(100);
    assert!(!visit.site.is_sidebar_open());
    assert_eq!(visit.page.focused().as_deref(), Some("hamburgerMenu"));
    assert_eq!(visit.page.traps_acquired(), visit.page.traps_released());
}

#[test]
fn test_private_browsing_without_storage() {
    let mut visit = Visit::start(None, MemoryStore::unavailable());
    visit.site.init();
    visit.click("#privacy");
    assert_eq!(visit.site.current_section().as_str(), "privacy");
    assert!(visit.page.has_element("privacy"));
    assert_eq!(visit.store.get("currentSection"), None);
}

#[test]
fn test_config_files_load_from_disk() {
    let temp_dir = TempDir::new().unwrap();

    let site_path = temp_dir.path().join("site.toml");
    std::fs::write(
        &site_path,
        r#"
default_section = "tos"
scroll_threshold = 80.0

[elements]
navbar = "topbar"

[timing]
focus_delay_ms = 50
"#,
    )
    .unwrap();
    let site = SiteConfig::from_toml_path(&site_path).unwrap();
    assert_eq!(site.default_section.as_str(), "tos");
    assert_eq!(site.elements.navbar, "topbar");
    assert_eq!(site.elements.sidebar, "sidebar");
    assert_eq!(site.timing.focus_delay(), Duration::from_millis(50));

    let server_path = temp_dir.path().join("server.toml");
    std::fs::write(&server_path, "port = 8080\nenvironment = \"production\"\n").unwrap();
    let server = ServerConfig::from_toml_path(&server_path).unwrap();
    assert_eq!(server.port, 8080);
    assert!(!server.is_development());
    assert_eq!(server.host, "0.0.0.0");

    let missing = SiteConfig::from_toml_path(temp_dir.path().join("nope.toml"));
    assert!(matches!(missing, Err(SiteError::NotFound(_))));
}
