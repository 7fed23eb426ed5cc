//! cost model handed to the pricing layer
//!
//! A [Resource] is an ordered list of [CostComponent]s. Each component carries a quantity and the filters that
//! identify its unit price in the price catalog. Nothing in here looks up or multiplies prices.
use crate::usage::UsageItem;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    pub resource_type: String,
    #[serde(skip)]
    pub usage_schema: &'static [UsageItem],
    pub cost_components: Vec<CostComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComponent {
    pub name: String,
    pub unit: String,
    pub unit_multiplier: Decimal,
    pub quantity: Quantity,
    pub product_filter: ProductFilter,
    pub price_filter: PriceFilter,
}

/// Quantity per hour or per month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Hourly(Decimal),
    Monthly(Decimal),
}

impl Quantity {
    pub fn value(&self) -> Decimal {
        match self {
            Quantity::Hourly(quantity) | Quantity::Monthly(quantity) => *quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFilter {
    pub vendor_name: String,
    pub region: String,
    pub service: String,
    pub product_family: String,
    pub attribute_filters: Vec<AttributeFilter>,
}

/// Matches a product attribute by regex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeFilter {
    pub key: String,
    pub value_regex: String,
}

impl AttributeFilter {
    pub fn regex(key: impl Into<String>, value_regex: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_regex: value_regex.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceFilter {
    pub purchase_option: PurchaseOption,
}

/// Pricing discount class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOption {
    #[default]
    OnDemand,
    Preemptible,
}

impl PurchaseOption {
    /// Derived solely from a terraform `preemptible` flag
    pub fn from_preemptible(preemptible: bool) -> Self {
        if preemptible {
            PurchaseOption::Preemptible
        } else {
            PurchaseOption::OnDemand
        }
    }

    /// Human readable label used in component names
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseOption::OnDemand => "on-demand",
            PurchaseOption::Preemptible => "preemptible",
        }
    }
}
