// Qualified identifiers for data elements, primitives and the value keyword

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ShrSchemaError;

/// Namespace reserved for primitive types.
pub const PRIMITIVE_NAMESPACE: &str = "primitive";

/// Name of the reserved slot holding an element's top-level value.
pub const VALUE_KEYWORD: &str = "Value";

/// Every primitive name understood by the converter.
pub const PRIMITIVES: &[&str] = &[
    "boolean",
    "integer",
    "decimal",
    "unsignedInt",
    "positiveInt",
    "string",
    "markdown",
    "code",
    "id",
    "oid",
    "uri",
    "base64Binary",
    "date",
    "dateTime",
    "instant",
    "time",
    "xhtml",
    "concept",
];

/// A namespace-qualified name.
///
/// Serialized as a dotted string (`shr.core.Quantity`). Primitives and the
/// value keyword have no namespace in their string form (`code`, `Value`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    namespace: String,
    name: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(PRIMITIVE_NAMESPACE, name)
    }

    /// The sentinel path segment addressing an element's value slot.
    pub fn value_keyword() -> Self {
        Self::new("", VALUE_KEYWORD)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_primitive(&self) -> bool {
        self.namespace == PRIMITIVE_NAMESPACE
    }

    pub fn is_value_keyword(&self) -> bool {
        self.namespace.is_empty() && self.name == VALUE_KEYWORD
    }

    /// Primitive `code` or `concept`, the only types code and value set
    /// constraints may decorate.
    pub fn is_coded(&self) -> bool {
        self.is_primitive() && matches!(self.name.as_str(), "code" | "concept")
    }

    pub fn fqn(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() || self.is_primitive() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

impl FromStr for Identifier {
    type Err = ShrSchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            Some(_) => Err(ShrSchemaError::InvalidIdentifier {
                identifier: s.to_string(),
            }),
            None if PRIMITIVES.contains(&s) => Ok(Self::primitive(s)),
            None if s == VALUE_KEYWORD => Ok(Self::value_keyword()),
            None => Err(ShrSchemaError::InvalidIdentifier {
                identifier: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = ShrSchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.to_string()
    }
}
