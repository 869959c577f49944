//! # pdscreen Common Library
//!
//! Shared code for the pdscreen workspace:
//! - Error type used by configuration loading
//! - TOML configuration schema, defaults and validation
//! - Config-file resolution (CLI → ENV → user dir → system dir → defaults)

pub mod config;
pub mod error;

pub use config::TomlConfig;
pub use error::{Error, Result};
