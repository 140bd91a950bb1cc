pub mod cardinality;
pub mod constraint;
pub mod element;
pub mod identifier;
pub mod schema;
pub mod specification;
pub mod value;

pub use cardinality::{Cardinality, tighter_max};
pub use constraint::{BindingStrength, Coding, Constraint, ConstraintKind};
pub use element::{BaseType, Concept, DataElement};
pub use identifier::{Identifier, PRIMITIVE_NAMESPACE, PRIMITIVES, VALUE_KEYWORD};
pub use schema::{
    DRAFT_04_SCHEMA, JsonType, MemberRequirement, Membership, SchemaDocument, SchemaFragment,
    ValueSetBinding,
};
pub use specification::{Namespace, Specifications};
pub use value::{Inheritance, Value, ValueKind};
