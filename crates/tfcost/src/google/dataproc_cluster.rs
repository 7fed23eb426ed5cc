//! `google_dataproc_cluster`
//!
//! A Dataproc cluster consists of three node groups:
//! - master (`cluster_config.0.master_config.0`)
//! - worker (`cluster_config.0.worker_config.0`)
//! - preemptible worker (`cluster_config.0.preemptible_worker_config.0`)
//!
//! Every group has a machine configuration and a `disk_config.0` block. A group that is not configured at all still
//! exists and is priced with default values.
//!
//! Only the master group is priced per instance. Worker groups are priced as a rate for a single node, scaling them is
//! left to whoever multiplies the result.
use super::{compute_cost_component, disk_cost_component, scratch_disk_cost_component};
use crate::attributes::{AttributeNode, ResourceData};
use crate::error::{TranslationError, TranslationResult};
use crate::registry::RegistryItem;
use crate::schema::{PurchaseOption, Resource};
use crate::usage::{DefaultValue, PopulateUsage, Setter, UsageData, UsageField, UsageItem};
use crate::value::ValueType;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

pub const RESOURCE_TYPE: &str = "google_dataproc_cluster";

const DEFAULT_MACHINE_TYPE: &str = "e2-medium";
const DEFAULT_DISK_TYPE: &str = "pd-standard";
const DEFAULT_DISK_SIZE_GB: Decimal = Decimal::ONE_HUNDRED;
const DEFAULT_USAGE_TYPE: &str = "default";
const DISK_CONFIG: &str = "disk_config.0";

/// Boot disks are priced per disk, never for the whole group
const POOL_SIZE: i64 = 1;

pub fn registry_item() -> RegistryItem {
    RegistryItem {
        name: RESOURCE_TYPE,
        build: new_dataproc_cluster,
        validate_usage: DataprocCluster::validate_usage,
    }
}

fn new_dataproc_cluster(
    resource: &ResourceData,
    usage: Option<&UsageData>,
) -> TranslationResult<Resource> {
    DataprocCluster::new(resource, usage).map(|cluster| cluster.build_resource())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataprocCluster {
    pub address: String,
    pub region: String,
    pub usage_type: String,
    pub master: NodeGroup,
    pub worker: NodeGroup,
    pub preemptible_worker: NodeGroup,

    // usage
    pub monthly_data_processed_gb: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeGroup {
    pub config: NodeConfig,
    pub disk: DiskConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeConfig {
    pub machine_type: String,
    pub purchase_option: PurchaseOption,
    pub num_instances: i64,
    pub accelerators: Vec<Accelerator>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            purchase_option: PurchaseOption::OnDemand,
            num_instances: 0,
            accelerators: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accelerator {
    pub accelerator_type: String,
    pub accelerator_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskConfig {
    pub boot_disk_type: String,
    pub boot_disk_size_gb: Decimal,
    pub num_local_ssds: i64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            boot_disk_type: DEFAULT_DISK_TYPE.to_string(),
            boot_disk_size_gb: DEFAULT_DISK_SIZE_GB,
            num_local_ssds: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroupRole {
    Master,
    Worker,
    PreemptibleWorker,
}

impl NodeGroupRole {
    /// Emission order of the cost components
    pub const ALL: [NodeGroupRole; 3] = [
        NodeGroupRole::Master,
        NodeGroupRole::Worker,
        NodeGroupRole::PreemptibleWorker,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            NodeGroupRole::Master => "cluster_config.0.master_config.0",
            NodeGroupRole::Worker => "cluster_config.0.worker_config.0",
            NodeGroupRole::PreemptibleWorker => "cluster_config.0.preemptible_worker_config.0",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeGroupRole::Master => "Master",
            NodeGroupRole::Worker => "Worker",
            NodeGroupRole::PreemptibleWorker => "Preemptible Worker",
        }
    }

    /// Number of instances the compute component is priced for
    pub fn compute_quantity(&self, config: &NodeConfig) -> i64 {
        match self {
            NodeGroupRole::Master => config.num_instances,
            NodeGroupRole::Worker | NodeGroupRole::PreemptibleWorker => 1,
        }
    }
}

/// Reads a node group block (`master_config`, `worker_config`, ...). Works on the absent node.
pub fn extract_node_config(node: AttributeNode) -> TranslationResult<NodeConfig> {
    let machine_type = node
        .string("machine_type")?
        .filter(|machine_type| !machine_type.is_empty())
        .unwrap_or_else(|| DEFAULT_MACHINE_TYPE.to_string());

    let preemptible = node.bool("preemptible")?.unwrap_or(false);
    let num_instances = non_negative(&node, "num_instances")?.unwrap_or(0);

    let mut accelerators = vec![];
    for accelerator in node.list("accelerators") {
        let Some(accelerator_type) = accelerator.string("accelerator_type")? else {
            tracing::trace!("accelerator without type, skipping");
            continue;
        };

        accelerators.push(Accelerator {
            accelerator_type,
            accelerator_count: non_negative(&accelerator, "accelerator_count")?.unwrap_or(1),
        });
    }

    Ok(NodeConfig {
        machine_type,
        purchase_option: PurchaseOption::from_preemptible(preemptible),
        num_instances,
        accelerators,
    })
}

/// Reads a `disk_config` block. Works on the absent node.
pub fn extract_disk_config(node: AttributeNode) -> TranslationResult<DiskConfig> {
    let boot_disk_type = node
        .string("boot_disk_type")?
        .filter(|disk_type| !disk_type.is_empty())
        .unwrap_or_else(|| DEFAULT_DISK_TYPE.to_string());

    let boot_disk_size_gb = match node.float("boot_disk_size_gb")? {
        Some(size) => Decimal::from_f64(size)
            .filter(|size| *size >= Decimal::ZERO)
            .ok_or_else(|| {
                TranslationError::invalid("boot_disk_size_gb", ValueType::Float, size.to_string())
            })?,
        None => DEFAULT_DISK_SIZE_GB,
    };

    let num_local_ssds = non_negative(&node, "num_local_ssds")?.unwrap_or(0);

    Ok(DiskConfig {
        boot_disk_type,
        boot_disk_size_gb,
        num_local_ssds,
    })
}

fn non_negative(node: &AttributeNode, path: &str) -> TranslationResult<Option<i64>> {
    match node.int(path)? {
        Some(value) if value < 0 => Err(TranslationError::invalid(
            path,
            ValueType::Integer,
            value.to_string(),
        )),
        value => Ok(value),
    }
}

impl NodeGroup {
    fn extract(root: AttributeNode, role: NodeGroupRole) -> TranslationResult<Self> {
        let path = role.path();
        let config = extract_node_config(root.get(path)).map_err(|e| e.within(path))?;

        let disk_path = format!("{path}.{DISK_CONFIG}");
        let disk = extract_disk_config(root.get(&disk_path)).map_err(|e| e.within(&disk_path))?;

        tracing::trace!(role = role.label(), ?config, ?disk, "node group");
        Ok(Self { config, disk })
    }
}

impl DataprocCluster {
    /// Reads the cluster from its attributes and applies `usage`
    pub fn new(resource: &ResourceData, usage: Option<&UsageData>) -> TranslationResult<Self> {
        if resource.address.is_empty() {
            return Err(TranslationError::missing("address", ""));
        }

        let root = resource.attributes();
        let region = root
            .string("region")?
            .filter(|region| !region.is_empty())
            .ok_or_else(|| TranslationError::missing("region", &resource.address))?;

        let usage_type = root
            .string("usageType")?
            .unwrap_or_else(|| DEFAULT_USAGE_TYPE.to_string());

        let mut cluster = Self {
            address: resource.address.clone(),
            region,
            usage_type,
            master: NodeGroup::extract(root, NodeGroupRole::Master)?,
            worker: NodeGroup::extract(root, NodeGroupRole::Worker)?,
            preemptible_worker: NodeGroup::extract(root, NodeGroupRole::PreemptibleWorker)?,
            monthly_data_processed_gb: None,
        };
        cluster.populate_usage(usage)?;

        Ok(cluster)
    }

    pub fn node_group(&self, role: NodeGroupRole) -> &NodeGroup {
        match role {
            NodeGroupRole::Master => &self.master,
            NodeGroupRole::Worker => &self.worker,
            NodeGroupRole::PreemptibleWorker => &self.preemptible_worker,
        }
    }

    /// Cost components per node group, in [NodeGroupRole::ALL] order:
    /// compute, boot disk and, if the group has local SSDs, scratch disk.
    pub fn build_resource(&self) -> Resource {
        let mut cost_components = vec![];

        for role in NodeGroupRole::ALL {
            let NodeGroup { config, disk } = self.node_group(role);
            let label = role.label();

            let quantity = role.compute_quantity(config);
            if quantity == 0 {
                tracing::debug!(address = %self.address, role = label, "node group has no instances");
            }

            cost_components.push(compute_cost_component(
                &self.region,
                &config.machine_type,
                config.purchase_option,
                quantity,
                &format!("{label} Node"),
            ));

            cost_components.push(disk_cost_component(
                &self.region,
                &disk.boot_disk_type,
                disk.boot_disk_size_gb,
                POOL_SIZE,
                &format!("{label} Boot Disk"),
            ));

            if disk.num_local_ssds > 0 {
                cost_components.push(scratch_disk_cost_component(
                    &self.region,
                    config.purchase_option,
                    disk.num_local_ssds,
                    &format!("{label} Scratch Disk"),
                ));
            }
        }

        Resource {
            name: self.address.clone(),
            resource_type: RESOURCE_TYPE.to_string(),
            usage_schema: Self::USAGE_SCHEMA,
            cost_components,
        }
    }
}

fn set_monthly_data_processed_gb(cluster: &mut DataprocCluster, value: f64) {
    cluster.monthly_data_processed_gb = Some(value);
}

impl PopulateUsage for DataprocCluster {
    const RESOURCE_TYPE: &'static str = RESOURCE_TYPE;
    const USAGE_SCHEMA: &'static [UsageItem] = &[UsageItem {
        key: "monthly_data_processed_gb",
        default_value: DefaultValue::Float(0.0),
        value_type: ValueType::Float,
    }];
    const USAGE_FIELDS: &'static [UsageField<Self>] = &[UsageField {
        key: "monthly_data_processed_gb",
        setter: Setter::Float(set_monthly_data_processed_gb),
    }];
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{AttributeFilter, CostComponent, Quantity};
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn resource(json: &str) -> ResourceData {
        let values: Value = serde_json::from_str(json).expect("valid json");
        ResourceData::new(
            "google_dataproc_cluster.analytics".to_string(),
            RESOURCE_TYPE.to_string(),
            values,
        )
    }

    fn cluster(json: &str) -> DataprocCluster {
        DataprocCluster::new(&resource(json), None).expect("valid cluster")
    }

    fn names(components: &[CostComponent]) -> Vec<&str> {
        components.iter().map(|c| c.name.as_str()).collect()
    }

    fn hourly(quantity: i64) -> Quantity {
        Quantity::Hourly(Decimal::from(quantity))
    }

    fn monthly(quantity: i64) -> Quantity {
        Quantity::Monthly(Decimal::from(quantity))
    }

    #[test]
    fn absent_blocks_resolve_to_defaults() {
        let cluster = cluster(r#"{"region": "us-central1"}"#);

        for role in NodeGroupRole::ALL {
            assert_eq!(cluster.node_group(role), &NodeGroup::default());
        }
        assert_eq!(cluster.usage_type, "default");
    }

    #[test]
    fn defaults_are_priced() {
        let resource = cluster(r#"{"region": "us-central1"}"#).build_resource();

        assert_eq!(
            names(&resource.cost_components),
            vec![
                "Master Node (on-demand, e2-medium)",
                "Master Boot Disk (pd-standard)",
                "Worker Node (on-demand, e2-medium)",
                "Worker Boot Disk (pd-standard)",
                "Preemptible Worker Node (on-demand, e2-medium)",
                "Preemptible Worker Boot Disk (pd-standard)",
            ]
        );

        let master = &resource.cost_components[0];
        assert_eq!(master.quantity, hourly(0));
        assert_eq!(master.price_filter.purchase_option, PurchaseOption::OnDemand);
        assert_eq!(
            master.product_filter.attribute_filters,
            vec![AttributeFilter::regex("machineType", "/^e2-medium$/i")]
        );

        let master_disk = &resource.cost_components[1];
        assert_eq!(master_disk.quantity, monthly(100));
        assert_eq!(
            master_disk.product_filter.attribute_filters,
            vec![AttributeFilter::regex("description", "/^Storage PD Capacity/")]
        );
        assert_eq!(master_disk.product_filter.region, "us-central1");
    }

    #[test]
    fn configured_master() {
        let resource = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{
                "master_config": [{
                  "machine_type": "n2-standard-4",
                  "preemptible": true,
                  "num_instances": 3,
                  "disk_config": [{
                    "boot_disk_type": "pd-ssd",
                    "boot_disk_size_gb": 500,
                    "num_local_ssds": 2
                  }]
                }]
              }]
            }"#,
        )
        .build_resource();

        let components = &resource.cost_components;
        assert_eq!(components.len(), 7);

        assert_eq!(components[0].name, "Master Node (preemptible, n2-standard-4)");
        assert_eq!(components[0].quantity, hourly(3));
        assert_eq!(
            components[0].price_filter.purchase_option,
            PurchaseOption::Preemptible
        );

        assert_eq!(components[1].name, "Master Boot Disk (pd-ssd)");
        assert_eq!(components[1].quantity, monthly(500));

        assert_eq!(components[2].name, "Master Scratch Disk (preemptible)");
        assert_eq!(components[2].quantity, monthly(2));
        assert_eq!(
            components[2].price_filter.purchase_option,
            PurchaseOption::Preemptible
        );

        assert_eq!(components[3].name, "Worker Node (on-demand, e2-medium)");
    }

    #[test]
    fn workers_are_priced_per_node() {
        let resource = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{
                "worker_config": [{ "num_instances": 10 }],
                "preemptible_worker_config": [{ "num_instances": 4, "preemptible": true }]
              }]
            }"#,
        )
        .build_resource();

        assert_eq!(resource.cost_components[2].name, "Worker Node (on-demand, e2-medium)");
        assert_eq!(resource.cost_components[2].quantity, hourly(1));
        assert_eq!(
            resource.cost_components[4].name,
            "Preemptible Worker Node (preemptible, e2-medium)"
        );
        assert_eq!(resource.cost_components[4].quantity, hourly(1));
    }

    #[test]
    fn scratch_disks_only_when_present() {
        for count in [0, 1, 4] {
            let resource = cluster(&format!(
                r#"{{
                  "region": "us-central1",
                  "cluster_config": [{{
                    "worker_config": [{{ "disk_config": [{{ "num_local_ssds": {count} }}] }}]
                  }}]
                }}"#
            ))
            .build_resource();

            let scratch: Vec<_> = resource
                .cost_components
                .iter()
                .filter(|c| c.name.starts_with("Worker Scratch Disk"))
                .collect();

            if count == 0 {
                assert!(scratch.is_empty());
                assert_eq!(resource.cost_components.len(), 6);
            } else {
                assert_eq!(scratch.len(), 1);
                assert_eq!(scratch[0].quantity, monthly(count));
                assert_eq!(resource.cost_components.len(), 7);
            }
        }
    }

    #[test]
    fn preemptible_worker_scratch_disk_uses_its_own_disk_config() {
        let resource = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{
                "worker_config": [{ "disk_config": [{ "num_local_ssds": 0 }] }],
                "preemptible_worker_config": [{
                  "preemptible": true,
                  "disk_config": [{ "num_local_ssds": 3 }]
                }]
              }]
            }"#,
        )
        .build_resource();

        assert_eq!(resource.cost_components.len(), 7);
        assert_eq!(
            resource.cost_components[6].name,
            "Preemptible Worker Scratch Disk (preemptible)"
        );
        assert_eq!(resource.cost_components[6].quantity, monthly(3));
    }

    #[test]
    fn emission_order() {
        let resource = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{
                "master_config": [{ "disk_config": [{ "num_local_ssds": 1 }] }],
                "worker_config": [{ "disk_config": [{ "num_local_ssds": 1 }] }],
                "preemptible_worker_config": [{ "disk_config": [{ "num_local_ssds": 1 }] }]
              }]
            }"#,
        )
        .build_resource();

        assert_eq!(
            names(&resource.cost_components),
            vec![
                "Master Node (on-demand, e2-medium)",
                "Master Boot Disk (pd-standard)",
                "Master Scratch Disk (on-demand)",
                "Worker Node (on-demand, e2-medium)",
                "Worker Boot Disk (pd-standard)",
                "Worker Scratch Disk (on-demand)",
                "Preemptible Worker Node (on-demand, e2-medium)",
                "Preemptible Worker Boot Disk (pd-standard)",
                "Preemptible Worker Scratch Disk (on-demand)",
            ]
        );
    }

    #[test]
    fn composing_is_deterministic() {
        let cluster = cluster(
            r#"{
              "region": "europe-west1",
              "cluster_config": [{ "master_config": [{ "num_instances": 1 }] }]
            }"#,
        );

        assert_eq!(cluster.build_resource(), cluster.build_resource());
        assert_eq!(
            serde_json::to_string(&cluster.build_resource()).unwrap(),
            serde_json::to_string(&cluster.build_resource()).unwrap()
        );
    }

    #[test]
    fn accelerators_are_read() {
        let cluster = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{
                "master_config": [{
                  "accelerators": [
                    { "accelerator_type": "nvidia-tesla-t4", "accelerator_count": 2 },
                    { "accelerator_count": 1 }
                  ]
                }]
              }]
            }"#,
        );

        assert_eq!(
            cluster.master.config.accelerators,
            vec![Accelerator {
                accelerator_type: "nvidia-tesla-t4".to_string(),
                accelerator_count: 2,
            }]
        );
    }

    #[test]
    fn usage_overlay() {
        let usage = UsageData::from_iter([("monthly_data_processed_gb", 200.5)]);
        let cluster = DataprocCluster::new(&resource(r#"{"region": "us-central1"}"#), Some(&usage)).unwrap();
        assert_eq!(cluster.monthly_data_processed_gb, Some(200.5));

        let cluster = DataprocCluster::new(&resource(r#"{"region": "us-central1"}"#), None).unwrap();
        assert_eq!(cluster.monthly_data_processed_gb, None);

        let empty = UsageData::default();
        let cluster = DataprocCluster::new(&resource(r#"{"region": "us-central1"}"#), Some(&empty)).unwrap();
        assert_eq!(cluster.monthly_data_processed_gb, None);
    }

    #[test]
    fn usage_registry_matches_schema() {
        assert_eq!(DataprocCluster::validate_usage(), Ok(()));
    }

    #[test]
    fn missing_region() {
        let error = DataprocCluster::new(&resource("{}"), None).unwrap_err();

        assert_eq!(
            error,
            TranslationError::MissingRequiredField {
                field: "region".to_string(),
                address: "google_dataproc_cluster.analytics".to_string(),
            }
        );
    }

    #[test]
    fn invalid_field_type_names_the_full_path() {
        let error = DataprocCluster::new(
            &resource(
                r#"{
                  "region": "us-central1",
                  "cluster_config": [{ "worker_config": [{ "num_instances": "ten" }] }]
                }"#,
            ),
            None,
        )
        .unwrap_err();

        assert_eq!(
            error,
            TranslationError::InvalidFieldType {
                field: "cluster_config.0.worker_config.0.num_instances".to_string(),
                expected_type: ValueType::Integer,
                raw_value: "\"ten\"".to_string(),
            }
        );
    }

    #[test]
    fn negative_counts_are_invalid() {
        let error = DataprocCluster::new(
            &resource(
                r#"{
                  "region": "us-central1",
                  "cluster_config": [{ "master_config": [{ "disk_config": [{ "num_local_ssds": -1 }] }] }]
                }"#,
            ),
            None,
        )
        .unwrap_err();

        assert_eq!(
            error,
            TranslationError::InvalidFieldType {
                field: "cluster_config.0.master_config.0.disk_config.0.num_local_ssds".to_string(),
                expected_type: ValueType::Integer,
                raw_value: "-1".to_string(),
            }
        );
    }

    fn invalid_field(json: &str) -> (String, ValueType) {
        match DataprocCluster::new(&resource(json), None) {
            Err(TranslationError::InvalidFieldType {
                field,
                expected_type,
                ..
            }) => (field, expected_type),
            other => panic!("expected invalid field type, got {other:?}"),
        }
    }

    #[test]
    fn unrepresentable_disk_size_is_invalid() {
        let (field, expected_type) = invalid_field(
            r#"{
              "region": "us-central1",
              "cluster_config": [{ "worker_config": [{ "disk_config": [{ "boot_disk_size_gb": 1e29 }] }] }]
            }"#,
        );

        assert_eq!(field, "cluster_config.0.worker_config.0.disk_config.0.boot_disk_size_gb");
        assert_eq!(expected_type, ValueType::Float);
    }

    #[test]
    fn large_disk_size_is_priced_exactly() {
        let resource = cluster(
            r#"{
              "region": "us-central1",
              "cluster_config": [{ "master_config": [{ "disk_config": [{ "boot_disk_size_gb": 65536 }] }] }]
            }"#,
        )
        .build_resource();

        assert_eq!(resource.cost_components[1].quantity, monthly(65536));
    }

    #[test]
    fn out_of_range_instance_count_is_invalid() {
        let (field, expected_type) = invalid_field(
            r#"{
              "region": "us-central1",
              "cluster_config": [{ "master_config": [{ "num_instances": 1e20 }] }]
            }"#,
        );

        assert_eq!(field, "cluster_config.0.master_config.0.num_instances");
        assert_eq!(expected_type, ValueType::Integer);
    }
}
