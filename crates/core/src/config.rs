//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! services. Request handling never reads process-wide environment variables,
//! which keeps behaviour consistent across multi-threaded runtimes and test
//! harnesses.

use crate::error::{CoaError, CoaResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    font_dir: PathBuf,
    logo_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(data_dir: PathBuf, font_dir: PathBuf, logo_dir: PathBuf) -> CoaResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(CoaError::InvalidInput("data_dir cannot be empty".into()));
        }
        Ok(Self {
            data_dir,
            font_dir,
            logo_dir,
        })
    }

    /// Resolve configuration from the environment. Intended to be called only
    /// from `main`/CLI entry points.
    ///
    /// # Environment Variables
    /// - `COA_DATA_DIR`: record/user store directory (default: `./data`)
    /// - `COA_FONT_DIR`: TTF font directory (default: `./fonts`)
    /// - `COA_LOGO_DIR`: brand logo directory (default: `./static/image`)
    pub fn from_env() -> CoaResult<Self> {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_owned())
        };
        Self::new(
            PathBuf::from(var("COA_DATA_DIR", "data")),
            PathBuf::from(var("COA_FONT_DIR", "fonts")),
            PathBuf::from(var("COA_LOGO_DIR", "static/image")),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn font_dir(&self) -> &Path {
        &self.font_dir
    }

    pub fn logo_dir(&self) -> &Path {
        &self.logo_dir
    }
}
