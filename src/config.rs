// Report settings: branding strings and page geometry, with an optional
// JSON overlay file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReportError, Result};
use crate::layout::PageGeometry;
use crate::verification::{DEFAULT_PREFIX, is_valid_prefix};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub title: String,
    pub department: String,
    pub locality: String,
    pub footer: String,
    pub report_label: String,
    pub id_prefix: String,
    pub watermark: String,
    // Printed on the last page only.
    pub signature: String,
    pub geometry: PageGeometry,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: "Excise Taxation Vehicle Registration & Number Plate Section Hyderabad".into(),
            department: "Excise, Taxation & Narcotics Control Dept.".into(),
            locality: "Hyderabad, Sindh".into(),
            footer: "Excise, Taxation & Narcotics Control Department, Government of Sindh".into(),
            report_label: "Excise_Taxation_Vehicle_List".into(),
            id_prefix: DEFAULT_PREFIX.into(),
            watermark: "Verified Copy".into(),
            signature: "Approved by: ___________________".into(),
            geometry: PageGeometry::default(),
        }
    }
}

impl ReportSettings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        info!(path = %path.display(), "Loaded report settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_prefix(&self.id_prefix) {
            return Err(ReportError::Config(format!(
                "identifier prefix must be ASCII letters or digits, got {:?}",
                self.id_prefix
            )));
        }
        if self.report_label.trim().is_empty() {
            return Err(ReportError::Config("report label must not be empty".into()));
        }
        if self
            .report_label
            .chars()
            .any(|c| std::path::is_separator(c) || c.is_control())
        {
            return Err(ReportError::Config(format!(
                "report label {:?} is not a valid file name stem",
                self.report_label
            )));
        }
        self.geometry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        ReportSettings::default().validate().unwrap();
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"id_prefix": "LHR", "geometry": {{"records_per_page": 100}}}}"#
        )
        .unwrap();

        let settings = ReportSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.id_prefix, "LHR");
        assert_eq!(settings.geometry.records_per_page, 100);
        assert_eq!(settings.geometry.columns, 4);
        assert_eq!(settings.locality, "Hyderabad, Sindh");
    }

    #[test]
    fn bad_prefix_is_rejected() {
        let settings = ReportSettings {
            id_prefix: "ET-NCH".into(),
            ..ReportSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ReportError::Config(_))));
    }

    #[test]
    fn label_with_path_separator_is_rejected() {
        let settings = ReportSettings {
            report_label: "../escape".into(),
            ..ReportSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ReportSettings::from_file(file.path()),
            Err(ReportError::Json(_))
        ));
    }
}
