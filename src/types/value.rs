// Semantic values: top-level element values and fields

use serde::{Deserialize, Serialize};

use super::{Cardinality, Constraint, ConstraintKind, Identifier};

/// Where a value's definition came from relative to the element declaring it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inheritance {
    #[default]
    Declared,
    Inherited,
    Overridden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueKind {
    /// A primitive or a reference to another data element by identifier
    Identifiable,
    Choice {
        options: Vec<Value>,
    },
    /// A pointer to an Entry-typed element
    Reference,
    /// Intentionally left unspecified
    Placeholder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Incomplete,
}

/// A value or field as produced by the upstream expansion pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(flatten)]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_identifier: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_card: Option<Cardinality>,
    #[serde(default)]
    pub inheritance: Inheritance,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Value {
    fn with_kind(kind: ValueKind, identifier: Option<Identifier>) -> Self {
        Self {
            kind,
            identifier,
            effective_identifier: None,
            card: None,
            effective_card: None,
            inheritance: Inheritance::Declared,
            constraints: Vec::new(),
        }
    }

    pub fn identifiable(identifier: Identifier) -> Self {
        Self::with_kind(ValueKind::Identifiable, Some(identifier))
    }

    pub fn reference(identifier: Identifier) -> Self {
        Self::with_kind(ValueKind::Reference, Some(identifier))
    }

    pub fn choice(options: Vec<Value>) -> Self {
        Self::with_kind(ValueKind::Choice { options }, None)
    }

    pub fn placeholder(text: Option<String>) -> Self {
        Self::with_kind(ValueKind::Placeholder { text }, None)
    }

    pub fn incomplete(identifier: Option<Identifier>) -> Self {
        Self::with_kind(ValueKind::Incomplete, identifier)
    }

    /// Set both declared and effective cardinality
    pub fn with_card(mut self, card: Cardinality) -> Self {
        self.card = Some(card);
        self.effective_card = Some(card);
        self
    }

    pub fn with_effective_card(mut self, card: Cardinality) -> Self {
        self.effective_card = Some(card);
        self
    }

    pub fn with_effective_identifier(mut self, identifier: Identifier) -> Self {
        self.effective_identifier = Some(identifier);
        self
    }

    pub fn with_inheritance(mut self, inheritance: Inheritance) -> Self {
        self.inheritance = inheritance;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The identifier after upstream type narrowing, falling back to the
    /// declared one.
    pub fn effective_identifier(&self) -> Option<&Identifier> {
        self.effective_identifier.as_ref().or(self.identifier.as_ref())
    }

    pub fn effective_card(&self) -> Option<Cardinality> {
        self.effective_card.or(self.card)
    }

    /// Property name of a field.
    pub fn name(&self) -> Option<&str> {
        self.identifier.as_ref().map(Identifier::name)
    }

    /// The type was replaced at this level rather than inherited as-is.
    pub fn is_overridden(&self) -> bool {
        self.inheritance == Inheritance::Overridden
            || matches!(
                (&self.identifier, &self.effective_identifier),
                (Some(declared), Some(effective)) if declared != effective
            )
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, ValueKind::Choice { .. })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ValueKind::Reference)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ValueKind::Placeholder { .. })
    }

    pub fn options(&self) -> &[Value] {
        match &self.kind {
            ValueKind::Choice { options } => options,
            _ => &[],
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ValueKind::Identifiable)
            && self.effective_identifier().is_some_and(Identifier::is_primitive)
    }

    /// Primitive `code`/`concept`, or a choice with at least one coded option.
    pub fn is_coded(&self) -> bool {
        match &self.kind {
            ValueKind::Identifiable => self.effective_identifier().is_some_and(Identifier::is_coded),
            ValueKind::Choice { options } => options.iter().any(Value::is_coded),
            _ => false,
        }
    }

    /// Constraints that apply to this value itself rather than a sub-path.
    pub fn unscoped_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(|c| c.is_unscoped())
    }

    /// True if the declared or effective cardinality allows several
    /// occurrences, or one of the value's own cardinality constraints does.
    pub fn is_or_was_list(&self) -> bool {
        self.card.is_some_and(|c| c.is_list())
            || self.effective_card.is_some_and(|c| c.is_list())
            || self.unscoped_constraints().any(|c| {
                matches!(&c.kind, ConstraintKind::Cardinality { card } if card.is_list())
            })
    }
}
