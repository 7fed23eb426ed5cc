//! usage estimates
//!
//! Some costs depend on consumption that cannot be read from the configuration (e.g. processed data volume).
//! Users provide estimates in a usage file:
//!
//! ```yaml
//! version: 0.1
//! resource_usage:
//!   google_dataproc_cluster.analytics:
//!     monthly_data_processed_gb: 200.5
//! ```
//!
//! A resource declares which keys it understands ([UsageItem]) and how each key is stored on it ([UsageField]).
//! Both lists are static and checked against each other once, when the registry is built.
use crate::error::{TranslationError, TranslationResult};
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use std::path::Path;

/// Declared usage key of a resource type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageItem {
    pub key: &'static str,
    pub default_value: DefaultValue,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Float(f64),
    String(&'static str),
}

/// Stores a usage value on a resource `R`
pub enum Setter<R> {
    Integer(fn(&mut R, i64)),
    Float(fn(&mut R, f64)),
    String(fn(&mut R, String)),
}

impl<R> Setter<R> {
    pub fn value_type(&self) -> ValueType {
        match self {
            Setter::Integer(_) => ValueType::Integer,
            Setter::Float(_) => ValueType::Float,
            Setter::String(_) => ValueType::String,
        }
    }
}

pub struct UsageField<R: 'static> {
    pub key: &'static str,
    pub setter: Setter<R>,
}

/// Resources that accept usage estimates
pub trait PopulateUsage: Sized + 'static {
    const RESOURCE_TYPE: &'static str;
    const USAGE_SCHEMA: &'static [UsageItem];
    const USAGE_FIELDS: &'static [UsageField<Self>];

    /// Sets every registered field that has a value in `usage`. Fields without a value are left untouched.
    fn populate_usage(&mut self, usage: Option<&UsageData>) -> TranslationResult<()> {
        let Some(usage) = usage else {
            return Ok(());
        };

        for (key, _) in usage.iter() {
            if !Self::USAGE_FIELDS.iter().any(|field| field.key == key) {
                tracing::trace!(resource_type = Self::RESOURCE_TYPE, key, "ignoring unknown usage key");
            }
        }

        for field in Self::USAGE_FIELDS {
            let Some(value) = usage.get(field.key) else {
                continue;
            };

            let invalid = || TranslationError::invalid(field.key, field.setter.value_type(), value.raw());
            match &field.setter {
                Setter::Integer(set) => set(&mut *self, value.as_i64().ok_or_else(invalid)?),
                Setter::Float(set) => set(&mut *self, value.as_f64().ok_or_else(invalid)?),
                Setter::String(set) => {
                    set(&mut *self, value.as_str().ok_or_else(invalid)?.to_string())
                }
            }
            tracing::trace!(resource_type = Self::RESOURCE_TYPE, key = field.key, "usage applied");
        }

        Ok(())
    }

    /// Every usage field must be declared in the usage schema with the same type
    fn validate_usage() -> Result<(), UsageSchemaError> {
        validate_usage_fields(Self::RESOURCE_TYPE, Self::USAGE_SCHEMA, Self::USAGE_FIELDS)
    }
}

pub fn validate_usage_fields<R>(
    resource_type: &str,
    schema: &[UsageItem],
    fields: &[UsageField<R>],
) -> Result<(), UsageSchemaError> {
    for field in fields {
        let Some(item) = schema.iter().find(|item| item.key == field.key) else {
            return Err(UsageSchemaError::Undeclared {
                resource_type: resource_type.to_string(),
                key: field.key,
            });
        };

        if item.value_type != field.setter.value_type() {
            return Err(UsageSchemaError::TypeMismatch {
                resource_type: resource_type.to_string(),
                key: field.key,
                declared: item.value_type,
                populated: field.setter.value_type(),
            });
        }
    }

    Ok(())
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum UsageSchemaError {
    #[error("{resource_type}: usage field `{key}` is not declared in the usage schema")]
    Undeclared {
        resource_type: String,
        key: &'static str,
    },
    #[error("{resource_type}: usage field `{key}` is declared as {declared} but stored as {populated}")]
    TypeMismatch {
        resource_type: String,
        key: &'static str,
        declared: ValueType,
        populated: ValueType,
    },
}

/// Usage values of a single resource
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(transparent)]
pub struct UsageData(IndexMap<String, Value>);

impl UsageData {
    /// Value for `key`, `null` counts as not set
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for UsageData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Contents of a usage file
#[derive(Debug, Default, serde::Deserialize)]
pub struct UsageFile {
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub resource_usage: IndexMap<String, UsageData>,
}

impl UsageFile {
    pub fn load(path: &Path) -> Result<Self, UsageFileError> {
        tracing::info!(path=%path.display(), "loading usage file");
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, UsageFileError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Usage for a resource address
    ///
    /// An exact match wins over a wildcard entry: `google_dataproc_cluster.x[2]` falls back to
    /// `google_dataproc_cluster.x[*]`.
    pub fn for_address(&self, address: &str) -> Option<&UsageData> {
        if let Some(usage) = self.resource_usage.get(address) {
            return Some(usage);
        }

        let (base, index) = address.rsplit_once('[')?;
        if !index.ends_with(']') {
            return None;
        }
        self.resource_usage.get(&format!("{base}[*]"))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UsageFileError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse usage file")]
    YamlParseFailed(#[from] serde_yaml::Error),
}
