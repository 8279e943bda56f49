//! Section identifiers and href parsing.
//!
//! A [`SectionId`] names one of the mutually-exclusive content regions of the page. Navigation
//! requests arrive in several shapes (`"tos"`, `"#tos"`, `"/privacy#tos"`,
//! `"https://example.com/#tos"`); all of them normalize to the bare id here so the router only ever
//! compares validated ids.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SiteError;

/// Id of the landing section, used whenever nothing else resolves.
pub const HOME: &str = "home";
/// Id of the terms-of-service section.
pub const TOS: &str = "tos";
/// Id of the privacy-policy section.
pub const PRIVACY: &str = "privacy";

/// Sections shipped with the site shell, in document order.
pub const BUILTIN_SECTIONS: [&str; 3] = [HOME, TOS, PRIVACY];

// Relative hrefs are resolved against this base purely to extract their fragment.
const HREF_BASE: &str = "http://localhost/";

/// Validated, normalized section identifier (never carries the leading `#`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(String);

impl SectionId {
    /// Parse a section id given either raw (`tos`) or as a fragment (`#tos`).
    pub fn parse(raw: &str) -> Result<SectionId, SiteError> {
        let id = raw.strip_prefix('#').unwrap_or(raw);
        if id.is_empty() {
            return Err(SiteError::InvalidSection(raw.to_string()));
        }
        let valid = id
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '#' | '/' | '?'));
        if !valid {
            return Err(SiteError::InvalidSection(raw.to_string()));
        }
        Ok(SectionId(id.to_string()))
    }

    /// Extract the target section from a link destination.
    ///
    /// Bare fragments are parsed directly. Anything else is treated as a URL (absolute, or
    /// relative to the current document) and its fragment is used. A destination without a
    /// fragment does not name a section.
    pub fn from_href(href: &str) -> Result<SectionId, SiteError> {
        let href = href.trim();
        if href.starts_with('#') {
            return SectionId::parse(href);
        }
        let url = Url::parse(HREF_BASE)?.join(href)?;
        match url.fragment() {
            Some(fragment) => SectionId::parse(fragment),
            None => Err(SiteError::InvalidSection(href.to_string())),
        }
    }

    pub fn home() -> SectionId {
        SectionId(HOME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `#id` form written to the URL.
    pub fn to_hash(&self) -> String {
        format!("#{}", self.0)
    }

    pub fn is_builtin(&self) -> bool {
        BUILTIN_SECTIONS.contains(&self.0.as_str())
    }
}

impl Default for SectionId {
    fn default() -> Self {
        SectionId::home()
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SectionId {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::parse(s)
    }
}

impl TryFrom<String> for SectionId {
    type Error = SiteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SectionId::parse(&value)
    }
}

impl From<SectionId> for String {
    fn from(id: SectionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
