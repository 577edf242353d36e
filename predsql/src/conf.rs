//! Compiler configuration.
//!
//! ```yaml
//! schema: app_demo
//! user-record-type: user
//! placeholder: dollar
//! log-level: debug
//! ```
use crate::result::{PqError, PqResult};
use std::fs;
use yaml_rust::YamlLoader;

/// Record type whose rows are users.  Discovery predicates only make
/// sense when querying this type.
pub const DEFAULT_USER_RECORD_TYPE: &str = "user";

/// Name of the authentication table holding user contact data.  Joins
/// against it always use this name as their alias.
pub const USER_TABLE: &str = "_user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderFormat {
    /// Leave `?` placeholders in place.
    Question,
    /// Number placeholders `$1`, `$2`, ... as PG expects.
    Dollar,
}

impl TryFrom<&str> for PlaceholderFormat {
    type Error = PqError;

    fn try_from(s: &str) -> PqResult<Self> {
        match s.to_lowercase().as_str() {
            "question" | "?" => Ok(Self::Question),
            "dollar" | "$" => Ok(Self::Dollar),
            _ => Err(PqError::Config(format!("Invalid placeholder format: {s}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    schema: Option<String>,
    user_record_type: String,
    placeholder: PlaceholderFormat,
    log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        Config {
            schema: None,
            user_record_type: DEFAULT_USER_RECORD_TYPE.to_string(),
            placeholder: PlaceholderFormat::Question,
            log_level: log::LevelFilter::Info,
        }
    }

    /// PG schema used to qualify table names.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }
    pub fn set_schema(&mut self, schema: &str) {
        self.schema = Some(schema.to_string());
    }
    pub fn user_record_type(&self) -> &str {
        &self.user_record_type
    }
    pub fn set_user_record_type(&mut self, record_type: &str) {
        self.user_record_type = record_type.to_string();
    }
    pub fn placeholder(&self) -> PlaceholderFormat {
        self.placeholder
    }
    pub fn set_placeholder(&mut self, format: PlaceholderFormat) {
        self.placeholder = format;
    }
    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
    }

    /// Parse a YAML configuration file.
    pub fn read_yaml(&mut self, filename: &str) -> PqResult<()> {
        let yaml_text = fs::read_to_string(filename)
            .map_err(|e| PqError::Config(format!("Error reading configuration file: {e}")))?;

        self.load_str(&yaml_text)
    }

    /// Apply settings from YAML text.  Missing keys keep their
    /// current values.
    pub fn load_str(&mut self, yaml_text: &str) -> PqResult<()> {
        let yaml_docs = YamlLoader::load_from_str(yaml_text).map_err(|e| {
            PqError::Config(format!("Error parsing configuration as YAML: {e}"))
        })?;

        let root = match yaml_docs.first() {
            Some(r) => r,
            None => return Ok(()),
        };

        if let Some(v) = root["schema"].as_str() {
            self.schema = Some(v.to_string());
        }

        if let Some(v) = root["user-record-type"].as_str() {
            if v.is_empty() {
                return Err(PqError::Config("user-record-type may not be empty".into()));
            }
            self.user_record_type = v.to_string();
        }

        if let Some(v) = root["placeholder"].as_str() {
            self.placeholder = PlaceholderFormat::try_from(v)?;
        }

        if let Some(v) = root["log-level"].as_str() {
            self.log_level = Config::log_level_from_str(v)?;
        }

        Ok(())
    }

    pub fn log_level_from_str(level: &str) -> PqResult<log::LevelFilter> {
        match level {
            "off" => Ok(log::LevelFilter::Off),
            "1" | "error" => Ok(log::LevelFilter::Error),
            "2" | "warn" => Ok(log::LevelFilter::Warn),
            "3" | "info" => Ok(log::LevelFilter::Info),
            "4" | "debug" => Ok(log::LevelFilter::Debug),
            "5" | "trace" => Ok(log::LevelFilter::Trace),
            _ => Err(PqError::Config(format!("Invalid log level: {level}"))),
        }
    }
}
