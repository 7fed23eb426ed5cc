//! resources from `terraform show -json <planfile>`
//!
//! Only `planned_values` is read. Modules are walked depth first, in the order terraform lists them.
use crate::attributes::ResourceData;
use crate::hcl_documents::LoadError;
use crate::value::Value;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Plan {
    planned_values: PlannedValues,
}

#[derive(Debug, Deserialize)]
struct PlannedValues {
    root_module: Module,
}

#[derive(Debug, Deserialize)]
struct Module {
    #[serde(default)]
    resources: Vec<PlanResource>,
    #[serde(default)]
    child_modules: Vec<Module>,
}

#[derive(Debug, Deserialize)]
struct PlanResource {
    address: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default = "empty_values")]
    values: Value,
}

fn empty_values() -> Value {
    Value::Object(Default::default())
}

pub fn load_plan(path: &Path) -> Result<Vec<ResourceData>, LoadError> {
    let path = path.canonicalize()?;
    tracing::info!(path=%path.display(), "loading plan");

    let contents = std::fs::read_to_string(&path)?;
    let mut resources = parse_plan(&contents)?;
    for resource in &mut resources {
        resource.source = Some(path.clone());
    }

    Ok(resources)
}

pub fn parse_plan(json: &str) -> Result<Vec<ResourceData>, LoadError> {
    let plan: Plan = serde_json::from_str(json)?;

    let mut resources = vec![];
    collect(plan.planned_values.root_module, &mut resources);
    Ok(resources)
}

fn collect(module: Module, resources: &mut Vec<ResourceData>) {
    for resource in module.resources {
        if resource.mode.as_deref().is_some_and(|mode| mode != "managed") {
            tracing::trace!(address = %resource.address, "skipping data source");
            continue;
        }

        resources.push(ResourceData::new(
            resource.address,
            resource.resource_type,
            resource.values,
        ));
    }

    for child in module.child_modules {
        collect(child, resources);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn walks_child_modules() {
        let resources = parse_plan(
            r#"{
              "format_version": "1.2",
              "planned_values": {
                "root_module": {
                  "resources": [
                    {
                      "address": "google_dataproc_cluster.analytics",
                      "mode": "managed",
                      "type": "google_dataproc_cluster",
                      "name": "analytics",
                      "values": { "region": "us-central1", "cluster_config": [{ "master_config": [] }] }
                    },
                    {
                      "address": "data.google_project.current",
                      "mode": "data",
                      "type": "google_project",
                      "name": "current",
                      "values": {}
                    }
                  ],
                  "child_modules": [
                    {
                      "address": "module.etl",
                      "resources": [
                        {
                          "address": "module.etl.google_dataproc_cluster.etl",
                          "mode": "managed",
                          "type": "google_dataproc_cluster",
                          "name": "etl",
                          "values": { "region": "europe-west1" }
                        }
                      ]
                    }
                  ]
                }
              }
            }"#,
        )
        .unwrap();

        let addresses: Vec<_> = resources.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "google_dataproc_cluster.analytics",
                "module.etl.google_dataproc_cluster.etl"
            ]
        );
        assert_eq!(
            resources[1].attributes().string("region"),
            Ok(Some("europe-west1".to_string()))
        );
        assert!(!resources[0]
            .attributes()
            .exists("cluster_config.0.master_config.0"));
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            parse_plan("{"),
            Err(LoadError::JsonParseFailed(_))
        ));
    }
}
