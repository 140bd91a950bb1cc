use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Cardinality, Identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl fmt::Display for BindingStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BindingStrength::Required => "REQUIRED",
            BindingStrength::Extensible => "EXTENSIBLE",
            BindingStrength::Preferred => "PREFERRED",
            BindingStrength::Example => "EXAMPLE",
        };
        f.write_str(label)
    }
}

/// A concrete code from a code system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

impl fmt::Display for Coding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display {
            Some(display) => write!(f, "{} ({}:{})", display, self.system, self.code),
            None => write!(f, "{}:{}", self.system, self.code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConstraintKind {
    Cardinality {
        card: Cardinality,
    },
    Type {
        is_a: Identifier,
    },
    IncludesType {
        is_a: Identifier,
        card: Cardinality,
    },
    Code {
        code: Coding,
    },
    IncludesCode {
        code: Coding,
    },
    ValueSet {
        value_set: String,
        binding_strength: BindingStrength,
    },
    Subset {
        subtypes: Vec<Identifier>,
    },
    Boolean {
        value: bool,
    },
    FixedValue {
        value: serde_json::Value,
    },
}

/// A structural constraint attached to a value.
///
/// `path` addresses the constrained sub-value relative to the decorated
/// value's type. When `on_value` is set, the path is in its unnormalized form
/// and the constraint targets an option of a choice value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    #[serde(flatten)]
    pub kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub on_value: bool,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
            on_value: false,
        }
    }

    pub fn cardinality(card: Cardinality) -> Self {
        Self::new(ConstraintKind::Cardinality { card })
    }

    pub fn type_of(is_a: Identifier) -> Self {
        Self::new(ConstraintKind::Type { is_a })
    }

    pub fn includes_type(is_a: Identifier, card: Cardinality) -> Self {
        Self::new(ConstraintKind::IncludesType { is_a, card })
    }

    pub fn code(code: Coding) -> Self {
        Self::new(ConstraintKind::Code { code })
    }

    pub fn includes_code(code: Coding) -> Self {
        Self::new(ConstraintKind::IncludesCode { code })
    }

    pub fn value_set(value_set: impl Into<String>, binding_strength: BindingStrength) -> Self {
        Self::new(ConstraintKind::ValueSet {
            value_set: value_set.into(),
            binding_strength,
        })
    }

    pub fn subset(subtypes: Vec<Identifier>) -> Self {
        Self::new(ConstraintKind::Subset { subtypes })
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ConstraintKind::Boolean { value })
    }

    pub fn fixed_value(value: serde_json::Value) -> Self {
        Self::new(ConstraintKind::FixedValue { value })
    }

    pub fn with_path(mut self, path: Vec<Identifier>) -> Self {
        self.path = path;
        self
    }

    pub fn on_value(mut self) -> Self {
        self.on_value = true;
        self
    }

    /// Applies directly to the decorated value.
    pub fn is_unscoped(&self) -> bool {
        self.path.is_empty() && !self.on_value
    }

    /// The type a `Type` or `IncludesType` constraint selects.
    pub fn declared_type(&self) -> Option<&Identifier> {
        match &self.kind {
            ConstraintKind::Type { is_a } | ConstraintKind::IncludesType { is_a, .. } => Some(is_a),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ConstraintKind::Cardinality { .. } => "cardinality",
            ConstraintKind::Type { .. } => "type",
            ConstraintKind::IncludesType { .. } => "includes type",
            ConstraintKind::Code { .. } => "code",
            ConstraintKind::IncludesCode { .. } => "includes code",
            ConstraintKind::ValueSet { .. } => "value set",
            ConstraintKind::Subset { .. } => "subset",
            ConstraintKind::Boolean { .. } => "boolean",
            ConstraintKind::FixedValue { .. } => "fixed value",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} constraint", self.kind_name())?;
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(Identifier::to_string).collect();
            write!(f, " on {}", path.join("."))?;
        }
        match &self.kind {
            ConstraintKind::Cardinality { card } => write!(f, " ({card})"),
            ConstraintKind::Type { is_a } => write!(f, " ({is_a})"),
            ConstraintKind::IncludesType { is_a, card } => write!(f, " ({card} {is_a})"),
            ConstraintKind::Code { code } | ConstraintKind::IncludesCode { code } => {
                write!(f, " ({code})")
            }
            ConstraintKind::ValueSet {
                value_set,
                binding_strength,
            } => write!(f, " ({value_set}, {binding_strength})"),
            ConstraintKind::Subset { subtypes } => write!(f, " ({} subtypes)", subtypes.len()),
            ConstraintKind::Boolean { value } => write!(f, " ({value})"),
            ConstraintKind::FixedValue { value } => write!(f, " ({value})"),
        }
    }
}
