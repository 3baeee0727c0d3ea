use config::{Config, Environment, File};
use serde::Deserialize;

use crate::column::MAX_VARS;
use crate::error::Result;

/// Engine settings, layered from defaults, an optional settings file and
/// `BINDMERGE_*` environment variables (in that order of precedence).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub max_vars: usize,
    pub restricted: bool,
    pub soft_limit: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_vars: MAX_VARS,
            restricted: false,
            soft_limit: 0,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads `path` when given, otherwise an optional `bindmerge.{toml,json,..}`
    /// in the working directory.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let defaults = Self::default();
        let file = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name("bindmerge").required(false),
        };
        let settings = Config::builder()
            .set_default("max_vars", defaults.max_vars as i64)?
            .set_default("restricted", defaults.restricted)?
            .set_default("soft_limit", defaults.soft_limit as i64)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(file)
            .add_source(Environment::with_prefix("BINDMERGE"))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
