use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_DEPARTMENT: &str = "运营业务开发科";

/// Zero-based column positions in the exported tracking sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub id: usize,
    pub system_name: usize,
    pub business_department: usize,
    pub responsible_department: usize,
    pub previous_agreement_expiry: usize,
    pub planned_approval_date: usize,
    pub planned_purchase_date: usize,
    pub planned_contract_date: usize,
    pub responsible_person: usize,
    pub current_progress: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            id: 0,
            system_name: 1,
            business_department: 2,
            responsible_department: 3,
            previous_agreement_expiry: 12,
            planned_approval_date: 13,
            planned_purchase_date: 14,
            planned_contract_date: 15,
            responsible_person: 16,
            current_progress: 17,
        }
    }
}

impl ColumnLayout {
    pub fn positions(&self) -> [(&'static str, usize); 10] {
        [
            ("id", self.id),
            ("system_name", self.system_name),
            ("business_department", self.business_department),
            ("responsible_department", self.responsible_department),
            ("previous_agreement_expiry", self.previous_agreement_expiry),
            ("planned_approval_date", self.planned_approval_date),
            ("planned_purchase_date", self.planned_purchase_date),
            ("planned_contract_date", self.planned_contract_date),
            ("responsible_person", self.responsible_person),
            ("current_progress", self.current_progress),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Only records owned by this department are analysed. Empty means all.
    pub department: String,
    /// Title and header rows above the first record.
    pub skip_rows: usize,
    pub delimiter: char,
    /// Cell values that mean "no date" rather than a malformed date.
    pub blank_date_markers: Vec<String>,
    pub columns: ColumnLayout,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            department: DEFAULT_DEPARTMENT.to_string(),
            skip_rows: 2,
            delimiter: ',',
            blank_date_markers: vec!["上期未签订".to_string(), "N/A".to_string()],
            columns: ColumnLayout::default(),
        }
    }
}

impl AlertConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.delimiter_byte()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConfigError::InvalidDelimiter(self.delimiter))
    }

    pub fn department_filter(&self) -> Option<&str> {
        let department = self.department.trim();
        (!department.is_empty()).then_some(department)
    }
}
