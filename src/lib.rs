//! Freelancelot Library
//!
//! Freelance job alert pipeline: ingest listings, deduplicate, match them
//! against subscriber filters and notify.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod external;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
