//! In-memory page adapters.
//!
//! These implement the adapter traits without a browser: a page model with elements, classes,
//! attributes and focus; a session history; a key/value store that can be told to fail; and a
//! scheduler driven by a manual clock. Each type is a cheap handle around shared state, so a test
//! keeps one clone for inspection and moves another into the controller's
//! [`Platform`](crate::platform::Platform).

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
    time::Duration,
};

use crate::{
    dom::{DomAdapter, HistoryAdapter, ListenerId},
    error::SiteError,
    focus::wrap_target,
    schedule::{Scheduler, TaskId},
    storage::SectionStore,
};

#[derive(Debug, Default, Clone)]
struct ElementModel {
    classes: BTreeSet<String>,
    attributes: BTreeMap<String, String>,
    focusables: Vec<String>,
}

#[derive(Debug, Default)]
struct PageModel {
    order: Vec<String>,
    elements: HashMap<String, ElementModel>,
    body_classes: BTreeSet<String>,
    scroll_locked: bool,
    scroll_y: f64,
    scroll_to_top_count: usize,
    title: String,
    focused: Option<String>,
    announcements: Vec<String>,
    traps: BTreeMap<ListenerId, String>,
    next_listener: ListenerId,
    traps_acquired: usize,
    traps_released: usize,
    mutations: usize,
}

impl PageModel {
    fn element_mut(&mut self, id: &str) -> Result<&mut ElementModel, SiteError> {
        self.elements
            .get_mut(id)
            .ok_or_else(|| SiteError::Dom(format!("no element with id {id:?}")))
    }

    fn insert(&mut self, id: &str, classes: &[&str]) {
        if !self.elements.contains_key(id) {
            self.order.push(id.to_string());
        }
        let element = self.elements.entry(id.to_string()).or_default();
        element.classes.extend(classes.iter().map(|c| c.to_string()));
    }
}

/// A document model for headless use and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDom {
    inner: Rc<RefCell<PageModel>>,
}

impl MemoryDom {
    pub fn new() -> MemoryDom {
        MemoryDom::default()
    }

    /// The page shell the site ships: navbar, menu trigger, overlay, sidebar with its close
    /// control and one link per section, page loader, and the three sections with `home`
    /// marked active.
    pub fn site_shell() -> MemoryDom {
        MemoryDom::new()
            .with_element("navbar", &["navbar"])
            .with_element("hamburgerMenu", &["hamburger-menu"])
            .with_element("sidebarOverlay", &["sidebar-overlay"])
            .with_element("sidebar", &["sidebar"])
            .with_element("sidebarClose", &["sidebar-close"])
            .with_element("sidebar-link-home", &["sidebar-link"])
            .with_element("sidebar-link-tos", &["sidebar-link"])
            .with_element("sidebar-link-privacy", &["sidebar-link"])
            .with_focusables(
                "sidebar",
                &[
                    "sidebarClose",
                    "sidebar-link-home",
                    "sidebar-link-tos",
                    "sidebar-link-privacy",
                ],
            )
            .with_element("pageLoader", &["page-loader"])
            .with_element("home", &["section", "active"])
            .with_element("tos", &["section"])
            .with_element("privacy", &["section"])
    }

    pub fn with_element(self, id: &str, classes: &[&str]) -> MemoryDom {
        self.inner.borrow_mut().insert(id, classes);
        self
    }

    /// Declare the Tab order inside `container`. Missing elements are created.
    pub fn with_focusables(self, container: &str, ids: &[&str]) -> MemoryDom {
        {
            let mut page = self.inner.borrow_mut();
            page.insert(container, &[]);
            for id in ids {
                page.insert(id, &[]);
            }
            if let Some(element) = page.elements.get_mut(container) {
                element.focusables = ids.iter().map(|id| id.to_string()).collect();
            }
        }
        self
    }

    pub fn remove_element(&self, id: &str) {
        let mut page = self.inner.borrow_mut();
        page.elements.remove(id);
        page.order.retain(|existing| existing != id);
    }

    pub fn attribute(&self, id: &str, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .elements
            .get(id)
            .and_then(|e| e.attributes.get(name).cloned())
    }

    /// Ids of sections (per `section_class`) that currently carry `active_class`.
    pub fn active_sections(&self, section_class: &str, active_class: &str) -> Vec<String> {
        self.elements_with_class(section_class)
            .into_iter()
            .filter(|id| self.has_class(id, active_class))
            .collect()
    }

    pub fn title(&self) -> String {
        self.inner.borrow().title.clone()
    }

    pub fn announcements(&self) -> Vec<String> {
        self.inner.borrow().announcements.clone()
    }

    pub fn focused(&self) -> Option<String> {
        self.inner.borrow().focused.clone()
    }

    /// Simulate the user moving focus.
    pub fn set_focus(&self, id: Option<&str>) {
        self.inner.borrow_mut().focused = id.map(str::to_string);
    }

    pub fn scroll_locked(&self) -> bool {
        self.inner.borrow().scroll_locked
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.inner.borrow_mut().scroll_y = y;
    }

    pub fn scroll_to_top_count(&self) -> usize {
        self.inner.borrow().scroll_to_top_count
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        self.inner.borrow().body_classes.contains(class)
    }

    pub fn traps_acquired(&self) -> usize {
        self.inner.borrow().traps_acquired
    }

    pub fn traps_released(&self) -> usize {
        self.inner.borrow().traps_released
    }

    pub fn active_traps(&self) -> usize {
        self.inner.borrow().traps.len()
    }

    /// Remove a trap listener behind the controller's back.
    pub fn detach_focus_trap_externally(&self, listener: ListenerId) -> bool {
        self.inner.borrow_mut().traps.remove(&listener).is_some()
    }

    /// Number of state-changing calls the page has received.
    pub fn mutation_count(&self) -> usize {
        self.inner.borrow().mutations
    }

    /// Simulate a Tab (or Shift+Tab) key press. Installed traps get to wrap focus first;
    /// otherwise focus moves to the neighbouring focusable of the enclosing container, if any.
    /// Returns whether a trap consumed the key.
    pub fn press_tab(&self, shift: bool) -> bool {
        let mut page = self.inner.borrow_mut();
        let Some(focused) = page.focused.clone() else {
            return false;
        };
        let trapped: Vec<String> = page.traps.values().cloned().collect();
        for container in trapped {
            let Some(element) = page.elements.get(&container) else {
                continue;
            };
            let focusables = element.focusables.clone();
            let current = focusables.iter().position(|id| *id == focused);
            if let Some(target) = wrap_target(focusables.len(), current, shift) {
                page.focused = Some(focusables[target].clone());
                return true;
            }
        }
        let neighbour = page.elements.values().find_map(|element| {
            let i = element.focusables.iter().position(|id| *id == focused)?;
            let next = if shift { i.checked_sub(1)? } else { i + 1 };
            element.focusables.get(next).cloned()
        });
        if let Some(next) = neighbour {
            page.focused = Some(next);
        }
        false
    }
}

impl DomAdapter for MemoryDom {
    fn has_element(&self, id: &str) -> bool {
        self.inner.borrow().elements.contains_key(id)
    }

    fn has_class(&self, id: &str, class: &str) -> bool {
        self.inner
            .borrow()
            .elements
            .get(id)
            .map(|e| e.classes.contains(class))
            .unwrap_or(false)
    }

    fn elements_with_class(&self, class: &str) -> Vec<String> {
        let page = self.inner.borrow();
        page.order
            .iter()
            .filter(|id| {
                page.elements
                    .get(*id)
                    .map(|e| e.classes.contains(class))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn add_class(&mut self, id: &str, class: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.element_mut(id)?.classes.insert(class.to_string());
        page.mutations += 1;
        Ok(())
    }

    fn remove_class(&mut self, id: &str, class: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.element_mut(id)?.classes.remove(class);
        page.mutations += 1;
        Ok(())
    }

    fn set_attribute(&mut self, id: &str, name: &str, value: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.element_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        page.mutations += 1;
        Ok(())
    }

    fn add_body_class(&mut self, class: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.body_classes.insert(class.to_string());
        page.mutations += 1;
        Ok(())
    }

    fn set_scroll_locked(&mut self, locked: bool) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.scroll_locked = locked;
        page.mutations += 1;
        Ok(())
    }

    fn focus(&mut self, id: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.element_mut(id)?;
        page.focused = Some(id.to_string());
        page.mutations += 1;
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        let mut page = self.inner.borrow_mut();
        page.title = title.to_string();
        page.mutations += 1;
    }

    fn scroll_to_top(&mut self) {
        let mut page = self.inner.borrow_mut();
        page.scroll_y = 0.0;
        page.scroll_to_top_count += 1;
        page.mutations += 1;
    }

    fn scroll_y(&self) -> f64 {
        self.inner.borrow().scroll_y
    }

    fn announce(&mut self, message: &str) -> Result<(), SiteError> {
        let mut page = self.inner.borrow_mut();
        page.announcements.push(message.to_string());
        page.mutations += 1;
        Ok(())
    }

    fn attach_focus_trap(&mut self, container_id: &str) -> Result<ListenerId, SiteError> {
        let mut page = self.inner.borrow_mut();
        page.element_mut(container_id)?;
        page.next_listener += 1;
        let listener = page.next_listener;
        page.traps.insert(listener, container_id.to_string());
        page.traps_acquired += 1;
        page.mutations += 1;
        Ok(listener)
    }

    fn detach_focus_trap(&mut self, listener: ListenerId) -> bool {
        let mut page = self.inner.borrow_mut();
        let removed = page.traps.remove(&listener).is_some();
        if removed {
            page.traps_released += 1;
            page.mutations += 1;
        }
        removed
    }
}

#[derive(Debug, Default)]
struct HistoryModel {
    entries: Vec<String>,
    index: usize,
    pushes: usize,
    replaces: usize,
}

/// Session history with a cursor, like the browser's back/forward stack.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    inner: Rc<RefCell<HistoryModel>>,
}

impl MemoryHistory {
    /// Start with a single entry whose fragment is `hash` (`"#tos"`), or no fragment.
    pub fn new(hash: Option<&str>) -> MemoryHistory {
        MemoryHistory {
            inner: Rc::new(RefCell::new(HistoryModel {
                entries: vec![hash.unwrap_or_default().to_string()],
                ..Default::default()
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn push_count(&self) -> usize {
        self.inner.borrow().pushes
    }

    pub fn replace_count(&self) -> usize {
        self.inner.borrow().replaces
    }

    /// Move the cursor back one entry. The caller then delivers a pop-state event.
    pub fn back(&self) -> bool {
        let mut history = self.inner.borrow_mut();
        if history.index == 0 {
            return false;
        }
        history.index -= 1;
        true
    }

    pub fn forward(&self) -> bool {
        let mut history = self.inner.borrow_mut();
        if history.index + 1 >= history.entries.len() {
            return false;
        }
        history.index += 1;
        true
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        MemoryHistory::new(None)
    }
}

impl HistoryAdapter for MemoryHistory {
    fn hash(&self) -> Option<String> {
        let history = self.inner.borrow();
        history
            .entries
            .get(history.index)
            .filter(|hash| hash.len() > 1)
            .cloned()
    }

    fn push_hash(&mut self, hash: &str) -> Result<(), SiteError> {
        let mut history = self.inner.borrow_mut();
        let keep = history.index + 1;
        history.entries.truncate(keep);
        history.entries.push(hash.to_string());
        history.index = keep;
        history.pushes += 1;
        Ok(())
    }

    fn replace_hash(&mut self, hash: &str) -> Result<(), SiteError> {
        let mut history = self.inner.borrow_mut();
        let index = history.index;
        history.entries[index] = hash.to_string();
        history.replaces += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoreModel {
    values: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Key/value store standing in for `localStorage`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<StoreModel>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// A store whose every access fails, like storage disabled by privacy settings.
    pub fn unavailable() -> MemoryStore {
        let store = MemoryStore::new();
        store.set_failing(true, true);
        store
    }

    pub fn with_value(self, key: &str, value: &str) -> MemoryStore {
        self.inner
            .borrow_mut()
            .values
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.borrow().values.get(key).cloned()
    }

    pub fn set_failing(&self, reads: bool, writes: bool) {
        let mut store = self.inner.borrow_mut();
        store.fail_reads = reads;
        store.fail_writes = writes;
    }
}

impl SectionStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, SiteError> {
        let store = self.inner.borrow();
        if store.fail_reads {
            return Err(SiteError::Storage("SecurityError: access denied".to_string()));
        }
        Ok(store.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), SiteError> {
        let mut store = self.inner.borrow_mut();
        if store.fail_writes {
            return Err(SiteError::Storage("QuotaExceededError".to_string()));
        }
        store.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ClockModel {
    now: Duration,
    timers: BTreeMap<TaskId, Duration>,
    refuse: bool,
    cancelled: usize,
}

/// Scheduler driven by an explicit clock. Nothing fires until [`ManualScheduler::advance`].
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ClockModel>>,
}

impl ManualScheduler {
    pub fn new() -> ManualScheduler {
        ManualScheduler::default()
    }

    /// Make subsequent `schedule` calls fail.
    pub fn set_refuse(&self, refuse: bool) {
        self.inner.borrow_mut().refuse = refuse;
    }

    /// Move the clock forward and return the tasks that came due, earliest first.
    pub fn advance(&self, by: Duration) -> Vec<TaskId> {
        let mut clock = self.inner.borrow_mut();
        clock.now += by;
        let now = clock.now;
        let mut due: Vec<(Duration, TaskId)> = clock
            .timers
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort();
        for (_, id) in &due {
            clock.timers.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn cancelled(&self) -> usize {
        self.inner.borrow().cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, task: TaskId, delay: Duration) -> Result<(), SiteError> {
        let mut clock = self.inner.borrow_mut();
        if clock.refuse {
            return Err(SiteError::Dom("setTimeout unavailable".to_string()));
        }
        let at = clock.now + delay;
        clock.timers.insert(task, at);
        Ok(())
    }

    fn cancel(&mut self, task: TaskId) -> bool {
        let mut clock = self.inner.borrow_mut();
        let removed = clock.timers.remove(&task).is_some();
        if removed {
            clock.cancelled += 1;
        }
        removed
    }
}
