use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// An identifier has no definition in the specifications
    UnresolvedIdentifier,
    UnresolvedConstraintPath,
    /// A constraint path runs through a type only introduced by an includes constraint
    IncludesTypePath,
    ChoiceOptionNotFound,
    ChoiceOptionCardinality,
    DuplicateCode,
    DuplicateValueSet,
    /// A constraint kind was applied to a value it cannot decorate
    IncompatibleConstraint,
    CardinalityConflict,
    ChoiceField,
    RestrictedFieldName,
    UnnamedField,
    InheritedFieldCollision,
    UnsupportedValue,
    UnknownPrimitive,
    /// A constraint was accepted by the resolver but never applied
    UnconsumedConstraint,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedIdentifier => "unresolved_identifier",
            DiagnosticCode::UnresolvedConstraintPath => "unresolved_constraint_path",
            DiagnosticCode::IncludesTypePath => "includes_type_path",
            DiagnosticCode::ChoiceOptionNotFound => "choice_option_not_found",
            DiagnosticCode::ChoiceOptionCardinality => "choice_option_cardinality",
            DiagnosticCode::DuplicateCode => "duplicate_code",
            DiagnosticCode::DuplicateValueSet => "duplicate_value_set",
            DiagnosticCode::IncompatibleConstraint => "incompatible_constraint",
            DiagnosticCode::CardinalityConflict => "cardinality_conflict",
            DiagnosticCode::ChoiceField => "choice_field",
            DiagnosticCode::RestrictedFieldName => "restricted_field_name",
            DiagnosticCode::UnnamedField => "unnamed_field",
            DiagnosticCode::InheritedFieldCollision => "inherited_field_collision",
            DiagnosticCode::UnsupportedValue => "unsupported_value",
            DiagnosticCode::UnknownPrimitive => "unknown_primitive",
            DiagnosticCode::UnconsumedConstraint => "unconsumed_constraint",
        }
    }

    /// Default severity for a code. Only resolver gaps are internal.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::IncludesTypePath | DiagnosticCode::UnsupportedValue => Severity::Warning,
            DiagnosticCode::UnconsumedConstraint => Severity::Internal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    /// Internal consistency problem in the exporter, not in the model
    Internal,
}

/// A skipped, dropped or ambiguous condition found during export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            element: None,
            field: None,
            constraint: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        match (&self.element, &self.field) {
            (Some(element), Some(field)) => write!(f, " ({element}.{field})")?,
            (Some(element), None) => write!(f, " ({element})")?,
            _ => {}
        }
        if let Some(constraint) = &self.constraint {
            write!(f, " [{constraint}]")?;
        }
        Ok(())
    }
}
