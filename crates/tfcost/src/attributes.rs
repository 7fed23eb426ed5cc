//! path addressable, read-only view over an attribute tree
//!
//! Paths are dot separated. A numeric segment indexes into a list, any other segment looks up an object key:
//! `cluster_config.0.master_config.0.machine_type`.
//!
//! Missing attributes are expected input. Every lookup on an absent node yields another absent node, so callers can
//! walk arbitrarily deep paths and only decide at the leaf whether to fall back to a default.
use crate::error::{TranslationError, TranslationResult};
use crate::hcl_documents::Source;
use crate::value::{Value, ValueType};

/// A node in an attribute tree, or the absent node
#[derive(Debug, Clone, Copy)]
pub struct AttributeNode<'a> {
    value: Option<&'a Value>,
}

impl<'a> AttributeNode<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value: Some(value) }
    }

    pub fn absent() -> Self {
        Self { value: None }
    }

    /// The node itself, `null` counts as absent
    pub fn value(&self) -> Option<&'a Value> {
        self.value.filter(|value| !value.is_null())
    }

    pub fn is_absent(&self) -> bool {
        self.value().is_none()
    }

    /// Node at `path`, absent if any segment along the way is missing
    pub fn get(&self, path: &str) -> AttributeNode<'a> {
        let mut current = self.value();
        for segment in path.split('.').filter(|segment| !segment.is_empty()) {
            current = current.and_then(|value| child(value, segment));
        }

        AttributeNode { value: current }
    }

    pub fn exists(&self, path: &str) -> bool {
        !self.get(path).is_absent()
    }

    /// All elements of the list at `path`. A single object is treated as a list of one.
    pub fn list(&self, path: &str) -> Vec<AttributeNode<'a>> {
        match self.get(path).value() {
            Some(Value::Array(items)) => items.iter().map(AttributeNode::new).collect(),
            Some(object @ Value::Object(_)) => vec![AttributeNode::new(object)],
            _ => vec![],
        }
    }

    pub fn string(&self, path: &str) -> TranslationResult<Option<String>> {
        self.read(path, ValueType::String, |value| {
            value.as_str().map(ToString::to_string)
        })
    }

    pub fn int(&self, path: &str) -> TranslationResult<Option<i64>> {
        self.read(path, ValueType::Integer, Value::as_i64)
    }

    pub fn float(&self, path: &str) -> TranslationResult<Option<f64>> {
        self.read(path, ValueType::Float, Value::as_f64)
    }

    pub fn bool(&self, path: &str) -> TranslationResult<Option<bool>> {
        self.read(path, ValueType::Boolean, Value::as_bool)
    }

    fn read<T>(
        &self,
        path: &str,
        expected_type: ValueType,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> TranslationResult<Option<T>> {
        let Some(value) = self.get(path).value() else {
            return Ok(None);
        };

        match convert(value) {
            Some(converted) => Ok(Some(converted)),
            None => Err(TranslationError::invalid(path, expected_type, value.raw())),
        }
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    }
    .filter(|value| !value.is_null())
}

/// A single terraform resource and its attribute tree
#[derive(Debug, Clone, derive_new::new)]
pub struct ResourceData {
    /// Unique name, e.g. `google_dataproc_cluster.analytics`
    pub address: String,
    /// Terraform type, e.g. `google_dataproc_cluster`
    pub resource_type: String,
    pub values: Value,
    #[new(default)]
    pub source: Source,
}

impl ResourceData {
    pub fn attributes(&self) -> AttributeNode<'_> {
        AttributeNode::new(&self.values)
    }
}
