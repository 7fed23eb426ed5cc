//! supported resource types and batch translation
use crate::attributes::ResourceData;
use crate::error::TranslationResult;
use crate::schema::Resource;
use crate::usage::{UsageData, UsageFile, UsageSchemaError};
use indexmap::IndexMap;
use serde::Serialize;

/// Builds the cost model of one resource type
pub struct RegistryItem {
    pub name: &'static str,
    pub build: fn(&ResourceData, Option<&UsageData>) -> TranslationResult<Resource>,
    pub validate_usage: fn() -> Result<(), UsageSchemaError>,
}

impl std::fmt::Debug for RegistryItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryItem").field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    items: IndexMap<&'static str, RegistryItem>,
}

impl Registry {
    /// Registry with all supported resource types
    ///
    /// Fails if a resource stores usage that its usage schema does not declare.
    pub fn new() -> Result<Self, UsageSchemaError> {
        let mut registry = Self::default();
        for item in crate::google::registry_items() {
            registry.register(item)?;
        }

        Ok(registry)
    }

    pub fn register(&mut self, item: RegistryItem) -> Result<(), UsageSchemaError> {
        (item.validate_usage)()?;

        tracing::trace!(name = item.name, "registered");
        self.items.insert(item.name, item);
        Ok(())
    }

    pub fn get(&self, resource_type: &str) -> Option<&RegistryItem> {
        self.items.get(resource_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.items.keys().copied()
    }
}

/// Result of translating a batch of resources
#[derive(Debug, Default, Serialize)]
pub struct Breakdown {
    pub resources: Vec<Resource>,
    /// Addresses of resources without a registered type
    pub unsupported: Vec<String>,
    pub failed: Vec<FailedResource>,
}

#[derive(Debug, Serialize, derive_new::new)]
pub struct FailedResource {
    pub address: String,
    pub error: String,
}

/// Translates every supported resource. A failing resource is recorded and does not affect the others.
pub fn breakdown(registry: &Registry, resources: &[ResourceData], usage: &UsageFile) -> Breakdown {
    let mut result = Breakdown::default();

    for resource in resources {
        let Some(item) = registry.get(&resource.resource_type) else {
            tracing::debug!(address = %resource.address, resource_type = %resource.resource_type, "unsupported resource type");
            result.unsupported.push(resource.address.clone());
            continue;
        };

        match (item.build)(resource, usage.for_address(&resource.address)) {
            Ok(built) => result.resources.push(built),
            Err(error) => {
                tracing::warn!(address = %resource.address, %error, "unable to translate resource");
                result
                    .failed
                    .push(FailedResource::new(resource.address.clone(), error.to_string()));
            }
        }
    }

    result
}
