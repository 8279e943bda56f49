//! Browser binding.
//!
//! Implements the page adapters on top of `web-sys` and exposes [`SiteApp`], which mounts a
//! [`SiteController`] onto the live document.
//!
//! ## Usage
//!
//! ```javascript,ignore
//! import init, { SiteApp } from './pkg/essentials_site.js';
//!
//! await init();
//! const app = new SiteApp();          // or new SiteApp(JSON.stringify(config))
//! window.MilitaryEssentials = app;    // debugging handle
//! app.show_section('#privacy');
//! ```
//!
//! ## Ownership
//!
//! The controller lives in an `Rc<RefCell<_>>` owned by [`SiteApp`]. DOM listeners and timer
//! callbacks hold only a `Weak` to it, so dropping the app (or `app.free()` from JavaScript)
//! detaches everything. Events are dispatched one at a time by the browser; an event that arrives
//! while the controller is borrowed is logged and dropped rather than panicking.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
    time::Duration,
};

use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    console, AddEventListenerOptions, Document, Element, ErrorEvent, Event, EventTarget,
    HtmlElement, KeyboardEvent, PromiseRejectionEvent, ScrollBehavior, ScrollToOptions, Storage,
    Window,
};

use crate::{
    config::SiteConfig,
    controller::SiteController,
    dom::{DomAdapter, HistoryAdapter, ListenerId},
    error::SiteError,
    event::{EventOutcome, KeyInput, PageEvent},
    focus::{wrap_target, FOCUSABLE_SELECTOR},
    platform::Platform,
    schedule::{Scheduler, TaskId, TimerSlots},
    storage::SectionStore,
};

/// How long a live-region announcement stays in the document.
const ANNOUNCEMENT_LIFETIME_MS: i32 = 1000;
const ANNOUNCEMENT_STYLE: &str =
    "position:absolute;left:-10000px;width:1px;height:1px;overflow:hidden;";

impl From<SiteError> for JsValue {
    fn from(error: SiteError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

fn window() -> Result<Window, SiteError> {
    web_sys::window().ok_or_else(|| SiteError::Dom("no global window".to_string()))
}

fn document(window: &Window) -> Result<Document, SiteError> {
    window
        .document()
        .ok_or_else(|| SiteError::Dom("window has no document".to_string()))
}

fn set_timeout(window: &Window, callback: &JsValue, delay_ms: i32) -> Result<i32, SiteError> {
    Ok(window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay_ms,
    )?)
}

type TrapListener = (Element, Closure<dyn FnMut(KeyboardEvent)>);

pub struct BrowserDom {
    window: Window,
    document: Document,
    traps: HashMap<ListenerId, TrapListener>,
    next_listener: ListenerId,
}

impl BrowserDom {
    pub fn new(window: Window) -> Result<BrowserDom, SiteError> {
        let document = document(&window)?;
        Ok(BrowserDom {
            window,
            document,
            traps: HashMap::new(),
            next_listener: 0,
        })
    }

    fn element(&self, id: &str) -> Result<Element, SiteError> {
        self.document
            .get_element_by_id(id)
            .ok_or_else(|| SiteError::Dom(format!("no element with id {id:?}")))
    }

    fn body(&self) -> Result<HtmlElement, SiteError> {
        self.document
            .body()
            .ok_or_else(|| SiteError::Dom("document has no body".to_string()))
    }
}

impl DomAdapter for BrowserDom {
    fn has_element(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn has_class(&self, id: &str, class: &str) -> bool {
        self.document
            .get_element_by_id(id)
            .map(|element| element.class_list().contains(class))
            .unwrap_or(false)
    }

    fn elements_with_class(&self, class: &str) -> Vec<String> {
        let Ok(list) = self.document.query_selector_all(&format!(".{class}")) else {
            tracing::warn!("Invalid class selector {class:?}");
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| element.id())
            .filter(|id| !id.is_empty())
            .collect()
    }

    fn add_class(&mut self, id: &str, class: &str) -> Result<(), SiteError> {
        Ok(self.element(id)?.class_list().add_1(class)?)
    }

    fn remove_class(&mut self, id: &str, class: &str) -> Result<(), SiteError> {
        Ok(self.element(id)?.class_list().remove_1(class)?)
    }

    fn set_attribute(&mut self, id: &str, name: &str, value: &str) -> Result<(), SiteError> {
        Ok(self.element(id)?.set_attribute(name, value)?)
    }

    fn add_body_class(&mut self, class: &str) -> Result<(), SiteError> {
        Ok(self.body()?.class_list().add_1(class)?)
    }

    fn set_scroll_locked(&mut self, locked: bool) -> Result<(), SiteError> {
        let overflow = if locked { "hidden" } else { "" };
        Ok(self.body()?.style().set_property("overflow", overflow)?)
    }

    fn focus(&mut self, id: &str) -> Result<(), SiteError> {
        let element = self
            .element(id)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| SiteError::Dom(format!("#{id} is not focusable")))?;
        Ok(element.focus()?)
    }

    fn set_title(&mut self, title: &str) {
        self.document.set_title(title);
    }

    fn scroll_to_top(&mut self) {
        let options = ScrollToOptions::new();
        options.set_top(0.0);
        options.set_behavior(ScrollBehavior::Smooth);
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn announce(&mut self, message: &str) -> Result<(), SiteError> {
        let announcement = self.document.create_element("div")?;
        announcement.set_attribute("role", "status")?;
        announcement.set_attribute("aria-live", "polite")?;
        announcement.set_attribute("aria-atomic", "true")?;
        announcement.set_attribute("style", ANNOUNCEMENT_STYLE)?;
        announcement.set_class_name("sr-only");
        announcement.set_text_content(Some(message));
        self.body()?.append_child(&announcement)?;

        let remove = Closure::once_into_js(move || announcement.remove());
        set_timeout(&self.window, &remove, ANNOUNCEMENT_LIFETIME_MS)?;
        Ok(())
    }

    fn attach_focus_trap(&mut self, container_id: &str) -> Result<ListenerId, SiteError> {
        let container = self.element(container_id)?;
        let scope = container.clone();
        let document = self.document.clone();
        let handler = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if event.key() != "Tab" {
                return;
            }
            let Ok(list) = scope.query_selector_all(FOCUSABLE_SELECTOR) else {
                return;
            };
            let focusables: Vec<HtmlElement> = (0..list.length())
                .filter_map(|i| list.item(i))
                .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
                .collect();
            let active = document.active_element();
            let current = active.as_ref().and_then(|active| {
                focusables.iter().position(|candidate| {
                    let candidate: &Element = candidate;
                    candidate == active
                })
            });
            if let Some(next) = wrap_target(focusables.len(), current, event.shift_key()) {
                event.prevent_default();
                let _ = focusables[next].focus();
            }
        });
        container.add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())?;

        self.next_listener += 1;
        let listener = self.next_listener;
        self.traps.insert(listener, (container, handler));
        Ok(listener)
    }

    fn detach_focus_trap(&mut self, listener: ListenerId) -> bool {
        match self.traps.remove(&listener) {
            Some((container, handler)) => {
                let _ = container
                    .remove_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref());
                true
            }
            None => false,
        }
    }
}

pub struct BrowserHistory {
    window: Window,
}

impl BrowserHistory {
    pub fn new(window: Window) -> BrowserHistory {
        BrowserHistory { window }
    }
}

impl HistoryAdapter for BrowserHistory {
    fn hash(&self) -> Option<String> {
        self.window
            .location()
            .hash()
            .ok()
            .filter(|hash| hash.len() > 1)
    }

    fn push_hash(&mut self, hash: &str) -> Result<(), SiteError> {
        Ok(self
            .window
            .history()?
            .push_state_with_url(&JsValue::NULL, "", Some(hash))?)
    }

    fn replace_hash(&mut self, hash: &str) -> Result<(), SiteError> {
        Ok(self
            .window
            .history()?
            .replace_state_with_url(&JsValue::NULL, "", Some(hash))?)
    }
}

/// `window.localStorage`, which may be missing or throw (private browsing, disabled storage,
/// quota).
pub struct LocalSectionStore {
    window: Window,
}

impl LocalSectionStore {
    pub fn new(window: Window) -> LocalSectionStore {
        LocalSectionStore { window }
    }

    fn storage(&self) -> Result<Storage, SiteError> {
        self.window
            .local_storage()
            .map_err(|e| SiteError::Storage(format!("{e:?}")))?
            .ok_or_else(|| SiteError::Storage("localStorage is disabled".to_string()))
    }
}

impl SectionStore for LocalSectionStore {
    fn load(&self, key: &str) -> Result<Option<String>, SiteError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| SiteError::Storage(format!("{e:?}")))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), SiteError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| SiteError::Storage(format!("{e:?}")))
    }
}

type Delivery = Rc<RefCell<Option<Box<dyn Fn(TaskId)>>>>;

/// A pending `setTimeout`: the handle to clear it with and the callback it will run. Dropping
/// the slot frees the callback.
struct Timer {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

type Timers = Rc<RefCell<TimerSlots<Timer>>>;

/// `setTimeout`-backed scheduler. Fired tasks are handed to the delivery callback, which
/// [`SiteApp`] points at its controller once that exists.
pub struct TimeoutScheduler {
    window: Window,
    timers: Timers,
    deliver: Delivery,
}

impl TimeoutScheduler {
    pub fn new(window: Window) -> TimeoutScheduler {
        TimeoutScheduler {
            window,
            timers: Rc::new(RefCell::new(TimerSlots::new())),
            deliver: Rc::new(RefCell::new(None)),
        }
    }

    fn delivery(&self) -> Delivery {
        self.deliver.clone()
    }
}

impl Scheduler for TimeoutScheduler {
    fn schedule(&mut self, task: TaskId, delay: Duration) -> Result<(), SiteError> {
        let timers = Rc::downgrade(&self.timers);
        let deliver = self.deliver.clone();
        let callback = Closure::once(move || {
            // Held until delivery returns; the callback is freed once this call unwinds.
            let finished = timers
                .upgrade()
                .and_then(|timers| timers.borrow_mut().release(task));
            if let Some(deliver) = deliver.borrow().as_ref() {
                deliver(task);
            }
            drop(finished);
        });
        let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let handle = set_timeout(&self.window, callback.as_ref(), delay_ms)?;
        let replaced = self.timers.borrow_mut().insert(
            task,
            Timer {
                handle,
                _callback: callback,
            },
        );
        if let Some(stale) = replaced {
            self.window.clear_timeout_with_handle(stale.handle);
        }
        Ok(())
    }

    fn cancel(&mut self, task: TaskId) -> bool {
        let timer = self.timers.borrow_mut().release(task);
        match timer {
            Some(timer) => {
                self.window.clear_timeout_with_handle(timer.handle);
                true
            }
            None => false,
        }
    }
}

fn dispatch(controller: &Weak<RefCell<SiteController>>, event: PageEvent) -> EventOutcome {
    let Some(controller) = controller.upgrade() else {
        return EventOutcome::pass();
    };
    let borrowed = controller.try_borrow_mut();
    match borrowed {
        Ok(mut controller) => controller.dispatch(event),
        Err(_) => {
            tracing::warn!("Dropping {event:?}: controller is busy");
            EventOutcome::pass()
        }
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    handler: Closure<dyn FnMut(Event)>,
}

/// The mounted site. Exposed to JavaScript for debugging and programmatic navigation.
#[wasm_bindgen]
pub struct SiteApp {
    controller: Rc<RefCell<SiteController>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl SiteApp {
    /// Mount the controller on the current document and restore the initial section.
    ///
    /// # JavaScript Example
    /// ```javascript,ignore
    /// const app = new SiteApp(JSON.stringify({ storage_key: "lastSection" }));
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<SiteApp, JsValue> {
        tracing_wasm::try_set_as_global_default().ok();

        let config = match config_json {
            Some(json) => SiteConfig::from_json_str(&json).map_err(|e| {
                let msg = format!("Failed to parse site config: {e}");
                console::error_1(&msg.clone().into());
                JsValue::from_str(&msg)
            })?,
            None => SiteConfig::default(),
        };

        let window = window()?;
        let document = document(&window)?;
        let scheduler = TimeoutScheduler::new(window.clone());
        let delivery = scheduler.delivery();
        let platform = Platform::new(
            BrowserDom::new(window.clone())?,
            BrowserHistory::new(window.clone()),
            LocalSectionStore::new(window.clone()),
            scheduler,
        );
        let controller = Rc::new(RefCell::new(SiteController::new(config, platform)));

        let weak = Rc::downgrade(&controller);
        *delivery.borrow_mut() = Some(Box::new(move |task| {
            dispatch(&weak, PageEvent::TaskDue(task));
        }));

        let mut app = SiteApp {
            controller,
            listeners: Vec::new(),
        };
        app.wire(&window, &document)?;
        app.controller.borrow_mut().init();
        Ok(app)
    }

    pub fn version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Navigate to a section (`"tos"` or `"#tos"`). Returns whether the id named a section.
    pub fn show_section(&self, target: &str) -> bool {
        let outcome = self.controller.borrow_mut().show_section(target);
        outcome.section().is_some()
    }

    pub fn open_sidebar(&self) -> bool {
        self.controller.borrow_mut().open_sidebar()
    }

    pub fn close_sidebar(&self) -> bool {
        self.controller.borrow_mut().close_sidebar()
    }

    pub fn toggle_sidebar(&self) -> bool {
        self.controller.borrow_mut().toggle_sidebar();
        self.controller.borrow().is_sidebar_open()
    }

    #[wasm_bindgen(getter)]
    pub fn current_section(&self) -> String {
        self.controller.borrow().current_section().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn is_sidebar_open(&self) -> bool {
        self.controller.borrow().is_sidebar_open()
    }

    /// Returns `{ current_section: string, sidebar: "Open" | "Closed" }`.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let state = self.controller.borrow().state();
        serde_wasm_bindgen::to_value(&state).map_err(|e| JsValue::from(SiteError::from(e)))
    }
}

impl SiteApp {
    fn listen<F>(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        passive: bool,
        handler: F,
    ) -> Result<(), SiteError>
    where
        F: FnMut(Event) + 'static,
    {
        let handler = Closure::<dyn FnMut(Event)>::new(handler);
        if passive {
            let options = AddEventListenerOptions::new();
            options.set_passive(true);
            target.add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                handler.as_ref().unchecked_ref(),
                &options,
            )?;
        } else {
            target.add_event_listener_with_callback(kind, handler.as_ref().unchecked_ref())?;
        }
        self.listeners.push(Listener {
            target: target.clone(),
            kind,
            handler,
        });
        Ok(())
    }

    /// Listen for clicks on the element with `id`, if the page has one.
    fn listen_click(
        &mut self,
        document: &Document,
        id: &str,
        event: PageEvent,
    ) -> Result<(), SiteError> {
        let Some(element) = document.get_element_by_id(id) else {
            tracing::debug!("No #{id} on this page");
            return Ok(());
        };
        let weak = Rc::downgrade(&self.controller);
        self.listen(&element, "click", false, move |_| {
            dispatch(&weak, event.clone());
        })
    }

    fn listen_links<F>(
        &mut self,
        document: &Document,
        class: &str,
        event: F,
    ) -> Result<(), SiteError>
    where
        F: Fn(String) -> PageEvent + Clone + 'static,
    {
        let links = document.query_selector_all(&format!(".{class}"))?;
        for i in 0..links.length() {
            let Some(link) = links.item(i).and_then(|node| node.dyn_into::<Element>().ok()) else {
                continue;
            };
            let weak = Rc::downgrade(&self.controller);
            let href_source = link.clone();
            let event = event.clone();
            self.listen(&link, "click", false, move |e: Event| {
                let href = href_source.get_attribute("href").unwrap_or_default();
                if dispatch(&weak, event(href)).prevent_default {
                    e.prevent_default();
                }
            })?;
        }
        Ok(())
    }

    fn wire(&mut self, window: &Window, document: &Document) -> Result<(), SiteError> {
        let config = self.controller.borrow().config().clone();
        let ids = &config.elements;

        self.listen_click(document, &ids.menu_trigger, PageEvent::MenuTriggerClick)?;
        self.listen_click(document, &ids.sidebar_close, PageEvent::SidebarCloseClick)?;
        self.listen_click(document, &ids.sidebar_overlay, PageEvent::OverlayClick)?;
        self.listen_links(document, &config.classes.sidebar_link, |href| {
            PageEvent::SidebarLinkClick { href }
        })?;
        self.listen_links(document, &config.classes.nav_link, |href| {
            PageEvent::NavLinkClick { href }
        })?;

        let weak = Rc::downgrade(&self.controller);
        self.listen(document, "keydown", false, move |e: Event| {
            let Some(key) = e.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            let input = KeyInput {
                key: key.key(),
                shift: key.shift_key(),
                ctrl: key.ctrl_key(),
                meta: key.meta_key(),
            };
            if dispatch(&weak, PageEvent::KeyDown(input)).prevent_default {
                e.prevent_default();
            }
        })?;

        let weak = Rc::downgrade(&self.controller);
        self.listen(window, "popstate", false, move |_| {
            dispatch(&weak, PageEvent::PopState);
        })?;

        let weak = Rc::downgrade(&self.controller);
        self.listen(window, "scroll", true, move |_| {
            dispatch(&weak, PageEvent::Scroll);
        })?;

        let weak = Rc::downgrade(&self.controller);
        let visibility_source = document.clone();
        self.listen(document, "visibilitychange", false, move |_| {
            let hidden = visibility_source.hidden();
            dispatch(&weak, PageEvent::VisibilityChange { hidden });
        })?;

        let weak = Rc::downgrade(&self.controller);
        self.listen(window, "error", false, move |e: Event| {
            let message = e
                .dyn_ref::<ErrorEvent>()
                .map(|e| e.message())
                .unwrap_or_else(|| "unknown error".to_string());
            dispatch(&weak, PageEvent::UncaughtError { message });
        })?;

        let weak = Rc::downgrade(&self.controller);
        self.listen(window, "unhandledrejection", false, move |e: Event| {
            let message = e
                .dyn_ref::<PromiseRejectionEvent>()
                .map(|e| format!("Unhandled promise rejection: {:?}", e.reason()))
                .unwrap_or_else(|| "Unhandled promise rejection".to_string());
            dispatch(&weak, PageEvent::UncaughtError { message });
        })?;

        Ok(())
    }
}

impl Drop for SiteApp {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.handler.as_ref().unchecked_ref(),
            );
        }
    }
}
