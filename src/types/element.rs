// Data element definitions as produced by the upstream expansion pass

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Coding, Identifier, Value};

/// A coded term describing an element, or a placeholder for one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Concept {
    Coded(Coding),
    Placeholder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tbd: Option<String>,
    },
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concept::Coded(coding) => write!(f, "{coding}"),
            Concept::Placeholder { tbd: Some(text) } => write!(f, "TBD ({text})"),
            Concept::Placeholder { tbd: None } => f.write_str("TBD"),
        }
    }
}

/// A parent type: either a real identifier or a not-yet-specified placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseType {
    Identifier(Identifier),
    Placeholder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tbd: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub identifier: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<Concept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub based_on: Vec<BaseType>,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Value>,
}

impl DataElement {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            description: None,
            concepts: Vec::new(),
            based_on: Vec::new(),
            is_entry: false,
            is_abstract: false,
            value: None,
            fields: Vec::new(),
        }
    }

    /// Mark element as an Entry
    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    /// Mark element as abstract
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_concept(mut self, concept: Concept) -> Self {
        self.concepts.push(concept);
        self
    }

    pub fn based_on(mut self, parent: Identifier) -> Self {
        self.based_on.push(BaseType::Identifier(parent));
        self
    }

    pub fn based_on_tbd(mut self, text: Option<String>) -> Self {
        self.based_on.push(BaseType::Placeholder { tbd: text });
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_field(mut self, field: Value) -> Self {
        self.fields.push(field);
        self
    }

    /// Identifiers of concrete (non-placeholder) parents.
    pub fn base_identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.based_on.iter().filter_map(|base| match base {
            BaseType::Identifier(id) => Some(id),
            BaseType::Placeholder { .. } => None,
        })
    }
}
