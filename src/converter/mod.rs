mod assembler;
mod base_types;
mod builtin;
mod constraint_tree;
mod context;
mod diagnostics;
mod element_converter;
mod path_resolver;
mod urls;
mod value_converter;
mod writer;

pub use assembler::*;
pub use base_types::*;
pub use builtin::{ENTRY_ID, ENTRY_TYPE, SHR_ID, builtin_document};
pub use constraint_tree::*;
pub use context::*;
pub use diagnostics::*;
pub use element_converter::*;
pub use path_resolver::*;
pub use urls::*;
pub use value_converter::*;
pub use writer::*;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SchemaDocument, ShrSchemaError, Specifications};

/// Exports expanded specifications as schema documents.
pub trait SpecificationExporter {
    fn export(&self, specs: &Specifications) -> Result<ExportResult>;
    fn export_with_context(
        &self,
        specs: &Specifications,
        context: &mut ConversionContext,
    ) -> Result<ExportResult>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One document per namespace, elements composed from their bases by reference
    #[default]
    Hierarchical,
    /// Every element self-contained, identity properties inlined
    Flattened,
}

pub const DEFAULT_SCHEMA_URL: &str = "https://standardhealthrecord.org/schema";
pub const DEFAULT_TYPE_URL: &str = "https://standardhealthrecord.org/test";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExporterConfig {
    /// Prefix of every document id
    pub base_schema_url: String,
    /// Prefix of entry type URLs
    pub base_type_url: String,
    pub mode: OutputMode,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            base_schema_url: DEFAULT_SCHEMA_URL.to_string(),
            base_type_url: DEFAULT_TYPE_URL.to_string(),
            mode: OutputMode::Hierarchical,
        }
    }
}

impl ExporterConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_base_schema_url(mut self, url: impl Into<String>) -> Self {
        self.base_schema_url = url.into();
        self
    }

    pub fn with_base_type_url(mut self, url: impl Into<String>) -> Self {
        self.base_type_url = url.into();
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn flattened(self) -> Self {
        self.with_mode(OutputMode::Flattened)
    }

    pub fn validate(&self) -> Result<()> {
        let schema_url = Url::parse(&self.base_schema_url)?;
        if schema_url.fragment().is_some() || schema_url.query().is_some() {
            return Err(ShrSchemaError::configuration(format!(
                "base schema URL must not carry a query or fragment: {}",
                self.base_schema_url
            )));
        }
        Url::parse(&self.base_type_url)?;
        Ok(())
    }

    pub fn url_builder(&self) -> Result<UrlBuilder> {
        let schema_url = Url::parse(&self.base_schema_url)?;
        Ok(UrlBuilder::new(&schema_url, &self.base_type_url))
    }
}

/// Documents keyed by id, plus everything reported while producing them.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub schemas: IndexMap<String, SchemaDocument>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ExportStats,
}

impl ExportResult {
    pub fn document(&self, namespace: &str) -> Option<&SchemaDocument> {
        self.schemas.values().find(|doc| doc.namespace == namespace)
    }

    pub fn diagnostics_with(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonSchemaExporter {
    config: ExporterConfig,
}

impl JsonSchemaExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExporterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Export a single namespace.
    pub fn export_namespace(
        &self,
        specs: &Specifications,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> Result<SchemaDocument> {
        let ns = specs
            .namespace(namespace)
            .ok_or_else(|| ShrSchemaError::UnknownNamespace {
                namespace: namespace.to_string(),
            })?;
        self.config.validate()?;
        let urls = self.config.url_builder()?;
        let base_types = BaseTypeResolver::new(specs);
        let elements = ElementConverter::new(specs, &urls, self.config.mode, &base_types);
        elements.convert_namespace(ns, &specs.elements_in(namespace), context)
    }
}

impl SpecificationExporter for JsonSchemaExporter {
    fn export(&self, specs: &Specifications) -> Result<ExportResult> {
        let mut context = ConversionContext::new(&self.config);
        self.export_with_context(specs, &mut context)
    }

    fn export_with_context(
        &self,
        specs: &Specifications,
        context: &mut ConversionContext,
    ) -> Result<ExportResult> {
        self.config.validate()?;
        context.begin_export();

        let urls = self.config.url_builder()?;
        let base_types = BaseTypeResolver::new(specs);
        let elements = ElementConverter::new(specs, &urls, self.config.mode, &base_types);

        let mut schemas = IndexMap::new();
        if self.config.mode == OutputMode::Hierarchical {
            let builtin = builtin_document(&urls);
            schemas.insert(builtin.id.clone(), builtin);
        }

        for namespace in specs.namespaces() {
            if namespace.namespace == BUILTIN_NAMESPACE {
                return Err(ShrSchemaError::conversion(format!(
                    "namespace {BUILTIN_NAMESPACE} is reserved for builtin definitions"
                )));
            }
            let document = elements.convert_namespace(
                namespace,
                &specs.elements_in(&namespace.namespace),
                context,
            )?;
            schemas.insert(document.id.clone(), document);
        }

        context.end_export();
        Ok(ExportResult {
            schemas,
            diagnostics: context.take_diagnostics(),
            stats: context.stats.clone(),
        })
    }
}
