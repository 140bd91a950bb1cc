use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::ExporterConfig;
use super::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::{Result, ShrSchemaError};

/// Per-run state threaded through every conversion step: the diagnostics
/// collector, statistics, and the element/field currently being converted.
pub struct ConversionContext {
    pub config: ExporterConfig,
    pub stats: ExportStats,
    diagnostics: Vec<Diagnostic>,
    current_element: Option<String>,
    current_field: Option<String>,
    start_time: Option<Instant>,
    muted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportStats {
    pub namespaces: usize,
    pub elements: usize,
    pub properties: usize,
    pub constraints_applied: usize,
    pub constraints_dropped: usize,
    #[serde(skip)]
    pub duration: Option<Duration>,
}

impl ConversionContext {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            config: config.clone(),
            stats: ExportStats::default(),
            diagnostics: Vec::new(),
            current_element: None,
            current_field: None,
            start_time: None,
            muted: false,
        }
    }

    /// A scratch context for re-converting values whose problems were
    /// already reported. Nothing recorded in it reaches the log.
    pub fn muted(&self) -> Self {
        Self {
            current_element: self.current_element.clone(),
            current_field: self.current_field.clone(),
            muted: true,
            ..Self::new(&self.config)
        }
    }

    pub fn begin_export(&mut self) {
        self.start_time = Some(Instant::now());
        self.stats = ExportStats::default();
        self.diagnostics.clear();
    }

    pub fn end_export(&mut self) {
        if let Some(start_time) = self.start_time {
            self.stats.duration = Some(start_time.elapsed());
        }
        info!(
            namespaces = self.stats.namespaces,
            elements = self.stats.elements,
            properties = self.stats.properties,
            constraints_applied = self.stats.constraints_applied,
            constraints_dropped = self.stats.constraints_dropped,
            diagnostics = self.diagnostics.len(),
            "Export completed"
        );
    }

    pub fn begin_namespace(&mut self, namespace: &str) {
        debug!("Converting namespace {namespace}");
        self.stats.namespaces += 1;
    }

    pub fn begin_element(&mut self, element: &str) {
        debug!("Converting element {element}");
        self.current_element = Some(element.to_string());
        self.current_field = None;
        self.stats.elements += 1;
    }

    pub fn end_element(&mut self) {
        self.current_element = None;
        self.current_field = None;
    }

    pub fn set_field(&mut self, field: Option<&str>) {
        self.current_field = field.map(str::to_string);
    }

    pub fn current_element(&self) -> Option<&str> {
        self.current_element.as_deref()
    }

    /// Record a diagnostic scoped to the current element and field, mirroring
    /// it to the log.
    pub fn report(&mut self, code: DiagnosticCode, message: impl Into<String>) -> &mut Diagnostic {
        let mut diagnostic = Diagnostic::new(code, message);
        diagnostic.element = self.current_element.clone();
        diagnostic.field = self.current_field.clone();
        self.push(diagnostic)
    }

    /// Like [`report`](Self::report), naming the constraint involved and
    /// counting it as dropped.
    pub fn drop_constraint(
        &mut self,
        code: DiagnosticCode,
        constraint: &crate::Constraint,
        message: impl Into<String>,
    ) {
        self.stats.constraints_dropped += 1;
        let mut diagnostic = Diagnostic::new(code, message).with_constraint(constraint.to_string());
        diagnostic.element = self.current_element.clone();
        diagnostic.field = self.current_field.clone();
        self.push(diagnostic);
    }

    fn push(&mut self, diagnostic: Diagnostic) -> &mut Diagnostic {
        if !self.muted {
            match diagnostic.severity {
                Severity::Warning => warn!("{diagnostic}"),
                Severity::Error => error!("{diagnostic}"),
                Severity::Internal => error!("Internal error: {diagnostic}"),
            }
        }
        self.diagnostics.push(diagnostic);
        let last = self.diagnostics.len() - 1;
        &mut self.diagnostics[last]
    }

    pub fn constraint_applied(&mut self) {
        self.stats.constraints_applied += 1;
    }

    pub fn property_emitted(&mut self) {
        self.stats.properties += 1;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error)
    }

    pub fn validate_state(&self) -> Result<()> {
        if self.current_element.is_none() {
            return Err(ShrSchemaError::conversion(
                "No current element in conversion context",
            ));
        }
        Ok(())
    }
}

impl ExportStats {
    pub fn total_constraints(&self) -> usize {
        self.constraints_applied + self.constraints_dropped
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total_constraints();
        if total == 0 {
            return 1.0;
        }
        self.constraints_applied as f64 / total as f64
    }
}
