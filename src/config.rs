//! Config module: engine-wide page defaults and limits.

use serde::{Deserialize, Serialize};

use crate::{QueryError, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Page used when a request omits `pageNumber`.
    pub default_page_number: u32,
    /// Page size used when a request omits `pageSize`.
    pub default_page_size: u32,
    /// Largest page size a request may ask for.
    pub max_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_number: 1,
            default_page_size: 10,
            max_page_size: 1000,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> QueryResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| QueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.default_page_number == 0 {
            return Err(QueryError::InvalidConfig("defaultPageNumber must be at least 1".into()));
        }
        if self.default_page_size == 0 {
            return Err(QueryError::InvalidConfig("defaultPageSize must be at least 1".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(QueryError::InvalidConfig(format!(
                "defaultPageSize {} exceeds maxPageSize {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }
}
