//! google cloud resources
//!
//! The functions in here build the cost components shared by google resources. They only describe *what* to price
//! (catalog filters plus quantity), the price itself is looked up later by the pricing layer.
use crate::registry::RegistryItem;
use crate::schema::{AttributeFilter, CostComponent, PriceFilter, ProductFilter, PurchaseOption, Quantity};
use rust_decimal::Decimal;

pub mod dataproc_cluster;

const VENDOR_NAME: &str = "gcp";
const COMPUTE_ENGINE: &str = "Compute Engine";

pub fn registry_items() -> Vec<RegistryItem> {
    vec![dataproc_cluster::registry_item()]
}

/// Instance hours of `quantity` machines of type `machine_type`
pub fn compute_cost_component(
    region: &str,
    machine_type: &str,
    purchase_option: PurchaseOption,
    quantity: i64,
    label: &str,
) -> CostComponent {
    CostComponent {
        name: format!("{label} ({}, {machine_type})", purchase_option.label()),
        unit: "hours".to_string(),
        unit_multiplier: Decimal::ONE,
        quantity: Quantity::Hourly(Decimal::from(quantity)),
        product_filter: ProductFilter {
            vendor_name: VENDOR_NAME.to_string(),
            region: region.to_string(),
            service: COMPUTE_ENGINE.to_string(),
            product_family: "Compute Instance".to_string(),
            attribute_filters: vec![AttributeFilter::regex(
                "machineType",
                format!("/^{machine_type}$/i"),
            )],
        },
        price_filter: PriceFilter { purchase_option },
    }
}

/// Provisioned persistent disk storage, `disk_size_gb` per disk for `pool_size` disks
pub fn disk_cost_component(
    region: &str,
    disk_type: &str,
    disk_size_gb: Decimal,
    pool_size: i64,
    label: &str,
) -> CostComponent {
    let description = match disk_type {
        "pd-balanced" => "/^Balanced PD Capacity/",
        "pd-ssd" => "/^SSD backed PD Capacity/",
        "pd-extreme" => "/^Extreme PD Capacity/",
        "pd-standard" => "/^Storage PD Capacity/",
        other => {
            tracing::debug!(disk_type = other, "unknown disk type, pricing as pd-standard");
            "/^Storage PD Capacity/"
        }
    };

    CostComponent {
        name: format!("{label} ({disk_type})"),
        unit: "GB".to_string(),
        unit_multiplier: Decimal::ONE,
        quantity: Quantity::Monthly((disk_size_gb * Decimal::from(pool_size)).normalize()),
        product_filter: storage_filter(region, description),
        price_filter: PriceFilter {
            purchase_option: PurchaseOption::OnDemand,
        },
    }
}

/// Local SSDs attached to a machine. Their price follows the purchase option of the machine.
pub fn scratch_disk_cost_component(
    region: &str,
    purchase_option: PurchaseOption,
    count: i64,
    label: &str,
) -> CostComponent {
    let description = match purchase_option {
        PurchaseOption::OnDemand => "/^SSD backed Local Storage( in .*)?$/",
        PurchaseOption::Preemptible => "/^SSD backed Local Storage attached to Preemptible VMs/",
    };

    CostComponent {
        name: format!("{label} ({})", purchase_option.label()),
        unit: "disks".to_string(),
        unit_multiplier: Decimal::ONE,
        quantity: Quantity::Monthly(Decimal::from(count)),
        product_filter: storage_filter(region, description),
        price_filter: PriceFilter { purchase_option },
    }
}

fn storage_filter(region: &str, description: &str) -> ProductFilter {
    ProductFilter {
        vendor_name: VENDOR_NAME.to_string(),
        region: region.to_string(),
        service: COMPUTE_ENGINE.to_string(),
        product_family: "Storage".to_string(),
        attribute_filters: vec![AttributeFilter::regex("description", description)],
    }
}
