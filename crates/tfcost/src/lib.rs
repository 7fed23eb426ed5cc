//! # tfcost - cost components for terraform resources
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfcost` works internally.
//!
//! `tfcost` does not know any prices. It reads terraform configuration, figures out *what* has to be paid for and
//! describes each line item as a [schema::CostComponent]: a quantity plus the filters needed to look up its unit price
//! in a price catalog.
//!
//! ### Loading resources
//!
//! Resources are either read from `.tf` files ([hcl_documents::HclDocuments]) or from the JSON output of
//! `terraform show -json` ([plan_json]). Both end up as a list of [attributes::ResourceData]: an address, a resource
//! type and a tree of [value::Value]s.
//!
//! Nested blocks are stored as lists, so a block is always addressed with an index:
//!
//! ```hcl
//! resource "google_dataproc_cluster" "analytics" {
//!   region = "us-central1"
//!
//!   cluster_config {
//!     master_config {
//!       machine_type = "n2-standard-4"
//!     }
//!   }
//! }
//! ```
//!
//! | **path**                                          | **value**         |
//! |---------------------------------------------------|-------------------|
//! | `region`                                          | `"us-central1"`   |
//! | `cluster_config.0.master_config.0.machine_type`   | `"n2-standard-4"` |
//! | `cluster_config.0.worker_config.0.machine_type`   | _absent_          |
//!
//! ### Reading attributes
//!
//! [attributes::AttributeNode] is the only way resources read their configuration. Missing attributes are not an
//! error, every resource decides on its own default. A value of the wrong type is an error
//! ([error::TranslationError::InvalidFieldType]) and so is a missing required field.
//!
//! ### Usage
//!
//! Costs like processed data volume can not be read from configuration. A usage file ([usage::UsageFile]) provides
//! estimates per resource address. Each resource declares the keys it accepts and where to store them
//! ([usage::PopulateUsage]).
//!
//! ### Translation
//!
//! [registry::Registry] maps a terraform resource type to the function that builds its [schema::Resource].
//! [registry::breakdown] runs it for every resource. A resource that fails to translate is reported and skipped,
//! the remaining resources are not affected.
//!
//! Supported resources:
//! - `google_dataproc_cluster` ([google::dataproc_cluster])
//!
pub mod attributes;
pub mod error;
pub mod google;
pub mod hcl_documents;
pub mod plan_json;
pub mod registry;
pub mod schema;
pub mod usage;
pub mod value;
