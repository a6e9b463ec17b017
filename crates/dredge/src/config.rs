//! Configuration file for dredge entities and data sources

use crate::context::{EntityContext, Value, Variables};
use crate::error::{DredgeError, Result};
use crate::processor::SourceProperties;
use crate::resolver::{BASE_PATH, ENCODING};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DredgeConfig {
    /// Variables visible to every entity through `${name}`
    #[serde(default)]
    pub variables: BTreeMap<String, toml::Value>,

    /// File-list entities
    #[serde(default)]
    pub entities: Vec<EntityConfig>,

    /// Archive-aware data sources
    #[serde(default)]
    pub data_sources: Vec<DataSourceConfig>,
}

/// One file-list entity; `attributes` holds `baseDir`, `fileName`, ...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    #[serde(rename = "basePath", default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl DataSourceConfig {
    pub fn properties(&self) -> SourceProperties {
        let mut props = SourceProperties::new();
        if let Some(base) = &self.base_path {
            props.insert(BASE_PATH.to_string(), base.clone());
        }
        if let Some(encoding) = &self.encoding {
            props.insert(ENCODING.to_string(), encoding.clone());
        }
        props
    }
}

impl DredgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DredgeError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DredgeError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DredgeError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| DredgeError::io(path, e))?;
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn data_source(&self, name: &str) -> Option<&DataSourceConfig> {
        self.data_sources.iter().find(|s| s.name == name)
    }

    /// Typed variable scope built from `[variables]`.
    pub fn variables(&self) -> Result<Variables> {
        self.variables
            .iter()
            .map(|(name, raw)| Ok((name.clone(), convert_value(name, raw)?)))
            .collect()
    }

    /// Host context for one entity, sharing `variables`.
    pub fn context_for(&self, entity: &EntityConfig, variables: Arc<Variables>) -> EntityContext {
        EntityContext::new(entity.attributes.clone(), variables)
    }
}

fn convert_value(name: &str, raw: &toml::Value) -> Result<Value> {
    let value = match raw {
        toml::Value::String(s) => Value::Text(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::Date(convert_datetime(name, &dt.to_string())?),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            return Err(DredgeError::Config(format!(
                "variable '{}' must be a string, number, boolean or datetime",
                name
            )));
        }
    };
    Ok(value)
}

/// TOML datetimes without an offset are read as local time.
fn convert_datetime(name: &str, text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    let invalid = || DredgeError::Config(format!("variable '{}': unsupported datetime '{}'", name, text));
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| invalid())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(invalid)
}
