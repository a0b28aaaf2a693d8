use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Setting '{0}' is required")]
    MissingField(&'static str),

    #[error("People and appointments must come from different sources")]
    SameSource,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Row filter selecting which appointments form the batch under consideration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    pub field: String,
    pub value: String,
}

/// Which sources and columns the record source reads from.
///
/// The people table needs a name column and a column linking to
/// appointment ids; the appointments table needs id, start and end columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub people_source: String,
    pub people_id_field: Option<String>, // row number when absent
    pub people_name_field: String,
    pub people_appointments_link_field: String,
    pub appointments_source: String,
    pub appointments_id_field: String,
    pub appointments_start_field: String,
    pub appointments_end_field: String,
    pub view: Option<ViewFilter>,
    pub link_separator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            people_source: String::new(),
            people_id_field: None,
            people_name_field: String::new(),
            people_appointments_link_field: String::new(),
            appointments_source: String::new(),
            appointments_id_field: String::new(),
            appointments_start_field: String::new(),
            appointments_end_field: String::new(),
            view: None,
            link_separator: ",".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&raw)?;
        debug!(path = %path.as_ref().display(), "Loaded settings");
        Ok(settings)
    }

    /// Writes settings to a JSON file, replacing any previous content
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    fn required_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("people_source", self.people_source.as_str()),
            ("people_name_field", self.people_name_field.as_str()),
            ("people_appointments_link_field", self.people_appointments_link_field.as_str()),
            ("appointments_source", self.appointments_source.as_str()),
            ("appointments_id_field", self.appointments_id_field.as_str()),
            ("appointments_start_field", self.appointments_start_field.as_str()),
            ("appointments_end_field", self.appointments_end_field.as_str()),
        ]
    }

    /// Names of the required settings that are still empty, in setup order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.required_fields()
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// True once every required source and column has been chosen
    pub fn is_setup_done(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validates the settings before any records are read
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.missing_fields().first() {
            return Err(ConfigError::MissingField(*name));
        }

        if same_source(&self.people_source, &self.appointments_source) {
            return Err(ConfigError::SameSource);
        }

        if self.link_separator.is_empty() {
            return Err(ConfigError::MissingField("link_separator"));
        }

        Ok(())
    }

    /// Clears the people column choices, which depend on the chosen people source
    pub fn reset_people_fields(&mut self) {
        self.people_id_field = None;
        self.people_name_field.clear();
        self.people_appointments_link_field.clear();
    }

    /// Clears the appointment column choices and the view
    pub fn reset_appointment_fields(&mut self) {
        self.appointments_id_field.clear();
        self.appointments_start_field.clear();
        self.appointments_end_field.clear();
        self.view = None;
    }

    /// Changes the people source. Choosing the appointments source is refused and
    /// clears the people source; otherwise the people columns are reset.
    pub fn select_people_source(&mut self, source: impl Into<String>) -> Result<(), ConfigError> {
        let source = source.into();
        if same_source(&source, &self.appointments_source) {
            self.people_source.clear();
            return Err(ConfigError::SameSource);
        }
        self.people_source = source;
        self.reset_people_fields();
        Ok(())
    }

    /// Changes the appointments source, with the same rule as `select_people_source`
    pub fn select_appointments_source(
        &mut self,
        source: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let source = source.into();
        if same_source(&source, &self.people_source) {
            self.appointments_source.clear();
            self.view = None;
            return Err(ConfigError::SameSource);
        }
        self.appointments_source = source;
        self.reset_appointment_fields();
        Ok(())
    }
}

fn same_source(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
