//! collection of terraform (hcl) documents ([Body] and path to source file)
//!
//! [HclDocuments] tracks
//! - the source path
//! - the root blocks
//! and defines a numeric index for each. Once added those indices are stable (removal is not possible)
//!
//! Root blocks are interpreted the way terraform does, as far as cost estimation needs it:
//! - `variable "name" { default = ... }` is available as `var.name`
//! - `locals { name = ... }` is available as `local.name`
//! - `provider "google" { region = ... }` supplies the region for `google_*` resources that have none
//! - `resource "type" "name" { ... }` becomes a [ResourceData] addressed `type.name`
//!
//! Nested blocks are turned into lists of objects, the same shape `terraform show -json` uses. That's why
//! `cluster_config { master_config { } }` is addressed as `cluster_config.0.master_config.0`.
use crate::attributes::ResourceData;
use crate::value::Value;
use hcl::eval::{Context, Evaluate};
use hcl_edit::structure::{Attribute, Block, Body, Structure};
use indexmap::IndexMap;
use std::path::Path;

#[derive(Default, Debug)]
pub struct HclDocuments {
    sources: Vec<Source>,
    root_blocks: Vec<(usize, Block)>,
}

impl HclDocuments {
    /// Inserts and indexes an hcl document
    pub fn insert(&mut self, document: Body, path: impl Into<Option<std::path::PathBuf>>) {
        let source_index = self.sources.len();
        self.sources.push(path.into());

        for structure in document.into_iter() {
            match structure {
                Structure::Block(block) => self.root_blocks.push((source_index, block)),
                Structure::Attribute(attribute) => {
                    tracing::warn!(
                        key = attribute.key.value().as_str(),
                        "ignoring attribute outside of a block"
                    )
                }
            }
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = SourceBlock> {
        self.root_blocks
            .iter()
            .enumerate()
            .map(|(index, (source_index, block))| (index, &self.sources[*source_index], block))
    }

    fn blocks_of<'a>(&'a self, ident: &'a str) -> impl Iterator<Item = SourceBlock<'a>> {
        self.blocks()
            .filter(move |(_, _, block)| block.ident.value().as_str() == ident)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl HclDocuments {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path)?;
        let body = hcl_edit::parser::parse_body(&file_contents)?;

        self.insert(body, Some(file_path));
        Ok(())
    }

    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut any_files_loaded = false;

        let mut file_paths = vec![];
        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let is_tf_file = dir_entry.file_name().to_string_lossy().ends_with(".tf");
            if !is_tf_file {
                continue;
            }

            file_paths.push(dir_entry.path());
        }

        // read_dir order is platform dependent
        file_paths.sort();
        for file_path in file_paths {
            self.load_file(&file_path)?;
            any_files_loaded = true;
        }

        if !any_files_loaded {
            return Err(LoadError::NoFilesFound);
        }

        Ok(())
    }
}

impl HclDocuments {
    /// All `resource` blocks, with expressions evaluated as far as possible
    ///
    /// Attributes that cannot be evaluated (references to other resources, unknown functions, ...) are left out and
    /// therefore treated like they were never set.
    pub fn resources(&self) -> Vec<ResourceData> {
        let context = self.context();
        let provider_regions = self.provider_regions(&context);

        let mut resources = vec![];
        for (index, source, block) in self.blocks_of("resource") {
            let [resource_type, name] = block.labels.as_slice() else {
                tracing::warn!(index, "resource block needs exactly two labels, skipping");
                continue;
            };

            let resource_type = resource_type.as_str();
            let address = format!("{resource_type}.{}", name.as_str());
            let mut values = body_value(&block.body, &context, &address);

            let provider = resource_type.split('_').next().unwrap_or_default();
            if let (Value::Object(object), Some(region)) = (&mut values, provider_regions.get(provider)) {
                if object.get("region").map_or(true, Value::is_null) {
                    tracing::debug!(%address, %region, "using provider region");
                    object.insert("region".to_string(), region.as_str().into());
                }
            }

            let count = match &values {
                Value::Object(object) => object.get("count").and_then(Value::as_i64),
                _ => None,
            };

            match count {
                None => resources.push(ResourceData {
                    address,
                    resource_type: resource_type.to_string(),
                    values,
                    source: source.clone(),
                }),
                Some(count) => {
                    tracing::trace!(%address, count, "expanding count");
                    for instance in 0..count.max(0) {
                        resources.push(ResourceData {
                            address: format!("{address}[{instance}]"),
                            resource_type: resource_type.to_string(),
                            values: values.clone(),
                            source: source.clone(),
                        });
                    }
                }
            }
        }

        resources
    }

    /// Evaluation context providing `var.*` and `local.*`
    fn context(&self) -> Context<'static> {
        let empty = Context::new();
        let mut variables = hcl::value::Map::new();
        for (_, _, block) in self.blocks_of("variable") {
            let Some(name) = block.labels.first() else {
                continue;
            };

            let default = attribute(&block.body, "default")
                .and_then(|attribute| evaluate(&attribute.value, &empty).ok())
                .unwrap_or(hcl::Value::Null);

            variables.insert(name.as_str().to_string(), default);
        }

        let mut context = Context::new();
        context.declare_var(hcl::Identifier::unchecked("var"), hcl::Value::Object(variables));

        let mut locals = hcl::value::Map::new();
        for (_, _, block) in self.blocks_of("locals") {
            for attribute in attributes(&block.body) {
                let key = attribute.key.value().as_str();
                match evaluate(&attribute.value, &context) {
                    Ok(value) => {
                        locals.insert(key.to_string(), value);
                    }
                    Err(errors) => tracing::warn!(key, %errors, "unable to evaluate local"),
                }
            }
        }
        context.declare_var(hcl::Identifier::unchecked("local"), hcl::Value::Object(locals));

        context
    }

    /// Region configured per provider, the first provider block wins
    fn provider_regions(&self, context: &Context) -> IndexMap<String, String> {
        let mut regions = IndexMap::new();
        for (_, _, block) in self.blocks_of("provider") {
            let Some(provider) = block.labels.first() else {
                continue;
            };

            let region = attribute(&block.body, "region")
                .and_then(|attribute| evaluate(&attribute.value, context).ok());

            if let Some(hcl::Value::String(region)) = region {
                regions
                    .entry(provider.as_str().to_string())
                    .or_insert(region);
            }
        }

        regions
    }
}

fn attributes(body: &Body) -> impl Iterator<Item = &Attribute> {
    body.iter().filter_map(|structure| match structure {
        Structure::Attribute(attribute) => Some(attribute),
        Structure::Block(_) => None,
    })
}

fn attribute<'a>(body: &'a Body, key: &str) -> Option<&'a Attribute> {
    attributes(body).find(|attribute| attribute.key.value().as_str() == key)
}

fn evaluate(
    expression: &hcl_edit::expr::Expression,
    context: &Context,
) -> Result<hcl::Value, hcl::eval::Errors> {
    let expression: hcl::Expression = expression.clone().into();
    Ok(expression.evaluate(context)?)
}

/// Converts a block body into an object. Blocks are collected into lists by their identifier.
fn body_value(body: &Body, context: &Context, address: &str) -> Value {
    let mut object = IndexMap::new();
    for structure in body.iter() {
        match structure {
            Structure::Attribute(attribute) => {
                let key = attribute.key.value().as_str();
                match evaluate(&attribute.value, context) {
                    Ok(value) => {
                        object.insert(key.to_string(), value.into());
                    }
                    Err(errors) => tracing::warn!(
                        address,
                        key,
                        %errors,
                        "unable to evaluate attribute, treating it as unset"
                    ),
                }
            }
            Structure::Block(block) => {
                let ident = block.ident.value().as_str();
                let nested = body_value(&block.body, context, address);
                match object
                    .entry(ident.to_string())
                    .or_insert_with(|| Value::Array(vec![]))
                {
                    Value::Array(items) => items.push(nested),
                    _ => tracing::warn!(address, ident, "block collides with attribute, skipping"),
                }
            }
        }
    }

    Value::Object(object)
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse hcl file")]
    HclParseFailed(#[from] hcl_edit::parser::Error),
    #[error("Unable to parse plan json")]
    JsonParseFailed(#[from] serde_json::Error),
}

impl From<Body> for HclDocuments {
    fn from(value: Body) -> Self {
        let mut tree = HclDocuments::default();
        tree.insert(value, None);
        tree
    }
}

/// Utility macro to create [HclDocuments]
///
/// Create from a single document
/// ```
/// # use tfcost::hcl_documents;
/// hcl_documents!(r#"resource "google_dataproc_cluster" "one" {}"#);
/// ```
///
/// Create from multiple documents (path required)
/// ```
/// # use tfcost::hcl_documents;
/// hcl_documents! {
///   "variables.tf" => r#"variable "region" { default = "us-central1" }"#,
///   "main.tf" => r#"resource "google_dataproc_cluster" "one" { region = var.region }"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use tfcost::hcl_documents;
/// hcl_documents!("not = valid = hcl");
/// ```
#[macro_export]
macro_rules! hcl_documents {
    // single document without source
    { $expr:expr } => {
        $crate::hcl_documents::HclDocuments::from(hcl_edit::parser::parse_body($expr).expect("body must parse"))
    };
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {{
        let mut docs = $crate::hcl_documents::HclDocuments::default();
        $(
            docs.insert(hcl_edit::parser::parse_body($expr).expect("body must parse"), Some($source.into()));
        )+

        docs
    }};
}

pub type Source = Option<std::path::PathBuf>;
pub type SourceBlock<'a> = (usize, &'a Source, &'a Block);
