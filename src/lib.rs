//! # essentials-site
//!
//! Client-side navigation and a static file server for the Military Essentials website.
//!
//! ## Overview
//!
//! The site is a single HTML document with three mutually-exclusive sections (`home`, `tos`,
//! `privacy`) addressed by URL fragment, and a slide-out sidebar menu. This crate implements the
//! logic behind it:
//!
//! - **[`router`]**: keeps exactly one section visible and in sync with the URL, the document
//!   title, `localStorage` and screen-reader announcements
//! - **[`sidebar`]**: open/close lifecycle of the menu, ARIA state, focus trapping and deferred
//!   focus moves
//! - **[`controller`]**: one [`controller::SiteController`] per page session, the single entry
//!   point for page events
//! - **[`chrome`]**: navbar scroll styling, page loader, load/visibility hooks
//!
//! The controller never touches a document directly. It runs against the adapter traits in
//! [`dom`], [`storage`] and [`schedule`], bundled in a [`platform::Platform`]. The browser binding
//! lives in [`wasm`] (feature `wasm`); [`memory`] provides in-process adapters for headless use
//! and tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use essentials_site::{
//!     config::SiteConfig,
//!     controller::SiteController,
//!     event::{KeyInput, PageEvent},
//!     memory::{ManualScheduler, MemoryDom, MemoryHistory, MemoryStore},
//!     platform::Platform,
//! };
//!
//! let page = MemoryDom::site_shell();
//! let platform = Platform::new(
//!     page.clone(),
//!     MemoryHistory::new(Some("#tos")),
//!     MemoryStore::new(),
//!     ManualScheduler::new(),
//! );
//! let mut site = SiteController::new(SiteConfig::default(), platform);
//! site.init();
//! assert_eq!(site.current_section().as_str(), "tos");
//!
//! site.dispatch(PageEvent::KeyDown(KeyInput::new("k").with_ctrl()));
//! assert!(site.is_sidebar_open());
//! ```
//!
//! ## Features
//!
//! - **default**: controller, adapters, in-memory page
//! - **wasm**: browser binding (`wasm-pack build --target web -- --features wasm`)
//! - **service**: the static file server in [`server`]
//! - **bin**: the `essentials` CLI

pub mod chrome;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod event;
pub mod focus;
pub mod memory;
pub mod platform;
pub mod router;
pub mod schedule;
pub mod section;
#[cfg(all(feature = "service", not(target_arch = "wasm32")))]
pub mod server;
pub mod sidebar;
pub mod storage;
#[cfg(test)]
mod tests;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::*;
