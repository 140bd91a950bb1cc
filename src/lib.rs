//! # SHR JSON Schema
//!
//! Exports expanded Standard Health Record specifications as JSON-Schema
//! (draft-04) documents, one per namespace.
//!
//! ## Features
//!
//! - **Constraint resolution**: constraint paths are resolved against the type
//!   graph, including choice options and inherited types
//! - **Minimal output**: constraints are grafted onto each value's schema and
//!   the result collapsed to its smallest equivalent form
//! - **Two output modes**: hierarchical documents composed from their bases, or
//!   flattened self-contained definitions
//! - **Diagnostics**: every dropped or unsupported construct is reported, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shr_jsonschema::*;
//!
//! # fn example() -> Result<()> {
//! let specs = Specifications::from_json(&std::fs::read_to_string("specs.json")?)?;
//! let exporter = JsonSchemaExporter::with_config(ExporterConfig::default());
//! let result = exporter.export(&specs)?;
//!
//! for diagnostic in &result.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! write_schemas(&result, "out")?;
//! # Ok(())
//! # }
//! ```

pub mod converter;
pub mod error;
pub mod types;

pub use converter::*;
pub use error::Result;
pub use error::ShrSchemaError;
pub use types::*;
