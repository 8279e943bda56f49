//! Best-effort persistence of the last active section.
//!
//! Storage may be disabled, full, or throw on access. None of that is allowed to reach the
//! navigation code: failures are logged at warn level and read as "nothing persisted".

use crate::{error::SiteError, section::SectionId};

pub trait SectionStore {
    fn load(&self, key: &str) -> Result<Option<String>, SiteError>;

    fn save(&mut self, key: &str, value: &str) -> Result<(), SiteError>;
}

/// Read the persisted section id. Unavailable storage and unparseable values both yield `None`.
pub fn load_section(store: &dyn SectionStore, key: &str) -> Option<SectionId> {
    match store.load(key) {
        Ok(Some(raw)) => match SectionId::parse(&raw) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Ignoring persisted section {raw:?}: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("localStorage not available: {e}");
            None
        }
    }
}

/// Persist the active section id. Returns whether the write succeeded.
pub fn save_section(store: &mut dyn SectionStore, key: &str, section: &SectionId) -> bool {
    match store.save(key, section.as_str()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("localStorage not available: {e}");
            false
        }
    }
}
