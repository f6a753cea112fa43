//! Core types and utilities for ctxmenu.
//!
//! This crate provides the collaborators around the context menu controller:
//!
//! - **error**: Error handling shared by every crate
//! - **config**: Application configuration and data directory
//! - **locale**: Qt Linguist catalogs and plural rules
//! - **notifications**: Desktop notification toggle and auto-cancel
//! - **logging**: Structured logging setup

pub mod config;
pub mod error;
pub mod locale;
pub mod logging;
pub mod notifications;

pub use config::AppConfig;
pub use error::{CtxMenuError, ErrorInfo};
pub use locale::{LocaleCatalog, PluralRules, Translator};
pub use notifications::{
    NotificationBackend, NotificationHandle, Notifications, Permission, TorrentEvent,
};
