#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Configuration for the catalog console, read once at startup.
//!
//! Layout:
//! - `defaults.rs`: fallback values and environment variable names
//! - `loader.rs`: `AppConfig` and the environment loader
//! - `error.rs`: configuration errors

pub mod defaults;
pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::AppConfig;
