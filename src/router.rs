//! Section router: keeps exactly one section visible and in sync with the URL, document title,
//! persisted state and screen-reader announcements.
//!
//! The router does not know about the sidebar. Callers that need "navigating to the current
//! section closes the menu" get that from [`crate::controller::SiteController`], which inspects
//! the returned [`NavigationOutcome`].

use serde::Serialize;

use crate::{
    error::SiteError,
    platform::PageContext,
    section::SectionId,
    storage::{load_section, save_section},
};

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// The target became the active section.
    Activated(SectionId),
    /// The target was already active; nothing on the page changed.
    AlreadyActive(SectionId),
    /// The target could not be resolved. The page is untouched.
    Rejected(SiteError),
}

impl NavigationOutcome {
    pub fn is_activated(&self) -> bool {
        matches!(self, NavigationOutcome::Activated(_))
    }

    /// The section that is active after the navigation attempt, if it named one.
    pub fn section(&self) -> Option<&SectionId> {
        match self {
            NavigationOutcome::Activated(id) | NavigationOutcome::AlreadyActive(id) => Some(id),
            NavigationOutcome::Rejected(_) => None,
        }
    }
}

/// Where the initial section came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InitialSource {
    Hash,
    Persisted,
    Default,
}

#[derive(Debug, Clone)]
pub struct SectionRouter {
    current: SectionId,
}

impl SectionRouter {
    pub fn new(initial: SectionId) -> SectionRouter {
        SectionRouter { current: initial }
    }

    pub fn current(&self) -> &SectionId {
        &self.current
    }

    /// Check that `id` names a section element on the page.
    pub fn resolve(&self, id: &SectionId, cx: &PageContext) -> Result<(), SiteError> {
        let dom = cx.platform.dom.as_ref();
        if dom.has_element(id.as_str()) && dom.has_class(id.as_str(), &cx.config.classes.section) {
            Ok(())
        } else {
            Err(SiteError::SectionNotFound(id.to_string()))
        }
    }

    /// Make `target` the active section.
    ///
    /// Navigating to the section that is already active is a no-op. Invalid or unknown targets
    /// are logged and reported as [`NavigationOutcome::Rejected`]; they never change the page.
    /// History is not touched here.
    pub fn show_section(
        &mut self,
        target: Result<SectionId, SiteError>,
        cx: &mut PageContext,
    ) -> NavigationOutcome {
        let id = match target {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Invalid section ID: {e}");
                return NavigationOutcome::Rejected(e);
            }
        };
        if let Err(e) = self.resolve(&id, cx) {
            tracing::error!("{e}");
            return NavigationOutcome::Rejected(e);
        }
        if id == self.current {
            tracing::debug!("section {id} already active");
            return NavigationOutcome::AlreadyActive(id);
        }
        self.activate(&id, cx);
        NavigationOutcome::Activated(id)
    }

    /// Pick and activate the first section of the page load: the URL fragment, else the persisted
    /// section, else the configured default (or the first section on the page when the default
    /// is missing).
    ///
    /// Only the persisted path writes history, replacing the current entry so the URL matches
    /// what is shown. An unusable fragment falls back to the default section and the URL is
    /// replaced likewise.
    pub fn init(&mut self, cx: &mut PageContext) -> (SectionId, InitialSource) {
        let default = cx.config.default_section.clone();
        let hash = cx.platform.history.hash();

        let (target, source, rewrite) = if let Some(hash) = hash {
            match SectionId::parse(&hash).and_then(|id| self.resolve(&id, cx).map(|_| id)) {
                Ok(id) => (id, InitialSource::Hash, false),
                Err(e) => {
                    tracing::error!("Ignoring URL fragment {hash:?}: {e}");
                    (default, InitialSource::Default, true)
                }
            }
        } else {
            let persisted = load_section(cx.platform.store.as_ref(), &cx.config.storage_key)
                .filter(|id| match self.resolve(id, cx) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Persisted section is not on this page: {e}");
                        false
                    }
                });
            match persisted {
                Some(id) => (id, InitialSource::Persisted, true),
                None => (default, InitialSource::Default, false),
            }
        };

        let target = if source == InitialSource::Default {
            match self.resolve_default(target, cx) {
                Some(id) => id,
                None => {
                    tracing::error!("No section on the page to show");
                    return (self.current.clone(), source);
                }
            }
        } else {
            target
        };

        self.activate(&target, cx);
        if rewrite {
            if let Err(e) = cx.platform.history.replace_hash(&target.to_hash()) {
                tracing::warn!("Could not rewrite URL to {}: {e}", target.to_hash());
            }
        }
        tracing::debug!("initial section {target} from {source:?}");
        (target, source)
    }

    /// The configured default if it is on the page, else the first section element.
    fn resolve_default(&self, default: SectionId, cx: &PageContext) -> Option<SectionId> {
        match self.resolve(&default, cx) {
            Ok(()) => return Some(default),
            Err(e) => tracing::warn!("Default section is not on this page: {e}"),
        }
        cx.platform
            .dom
            .elements_with_class(&cx.config.classes.section)
            .into_iter()
            .find_map(|id| SectionId::parse(&id).ok())
    }

    fn activate(&mut self, id: &SectionId, cx: &mut PageContext) {
        let config = cx.config;
        let classes = &config.classes;
        let dom = cx.platform.dom.as_mut();
        for section in dom.elements_with_class(&classes.section) {
            let result = dom
                .remove_class(&section, &classes.active)
                .and_then(|_| dom.set_attribute(&section, "aria-hidden", "true"));
            if let Err(e) = result {
                tracing::warn!("Could not hide section {section}: {e}");
            }
        }
        let result = dom
            .add_class(id.as_str(), &classes.active)
            .and_then(|_| dom.set_attribute(id.as_str(), "aria-hidden", "false"));
        if let Err(e) = result {
            tracing::error!("Could not show section {id}: {e}");
        }

        self.current = id.clone();
        save_section(cx.platform.store.as_mut(), &config.storage_key, id);

        dom.scroll_to_top();
        dom.set_title(config.title_for(id));
        let message = format!("Navigated to {}", config.name_for(id));
        cx.announce(&message);
        tracing::info!("showing section {id}");
    }
}
