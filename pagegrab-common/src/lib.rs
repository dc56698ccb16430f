//! Common types and utilities shared across pagegrab crates.
//!
//! This crate is deliberately small: it holds the logging initializer and the
//! path helpers that both the config loader and the binaries rely on, so that
//! every crate can depend on it without pulling in the HTTP or browser stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`paths`]: `~` expansion and default data directories
//!
//! # Examples
//!
//! ```rust
//! use pagegrab_common::paths::expand_home;
//! use std::path::Path;
//!
//! let p = expand_home(Path::new("/tmp/out"));
//! assert_eq!(p, Path::new("/tmp/out"));
//! ```

pub mod observability;
pub mod paths;

/// Name used for log files and default data directories.
pub const APP_NAME: &str = "pagegrab";

/// Browser-like identity sent with page and image requests unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
