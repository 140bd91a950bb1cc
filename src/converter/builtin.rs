// Shared shapes of the builtin foundational document

use super::urls::{BUILTIN_NAMESPACE, UrlBuilder};
use crate::{JsonType, SchemaDocument, SchemaFragment};

pub const SHR_ID: &str = "ShrId";
pub const ENTRY_ID: &str = "EntryId";
pub const ENTRY_TYPE: &str = "EntryType";

pub fn entry_type_shape() -> SchemaFragment {
    SchemaFragment::typed(JsonType::String).with_format("uri")
}

/// `ShrId`, `EntryId` and `EntryType`, in that order.
pub fn identity_properties() -> Vec<(&'static str, SchemaFragment)> {
    vec![
        (SHR_ID, SchemaFragment::typed(JsonType::String)),
        (ENTRY_ID, SchemaFragment::typed(JsonType::String)),
        (ENTRY_TYPE, entry_type_shape()),
    ]
}

/// Pointer to an entry. `ref_types` lists the entry-type URLs it may target.
pub fn reference_shape(ref_types: Vec<String>) -> SchemaFragment {
    let mut shape = SchemaFragment::object();
    for (name, property) in identity_properties() {
        shape = shape.with_property(name, property).with_required(name);
    }
    shape.ref_type = ref_types;
    shape
}

pub fn concept_shape() -> SchemaFragment {
    SchemaFragment::object()
        .with_property("code", SchemaFragment::typed(JsonType::String))
        .with_property(
            "codeSystem",
            SchemaFragment::typed(JsonType::String).with_format("uri"),
        )
        .with_property("displayText", SchemaFragment::typed(JsonType::String))
        .with_required("code")
        .with_required("codeSystem")
}

fn entry_shape() -> SchemaFragment {
    let mut shape = SchemaFragment::object().with_description(
        "Base of every entry: the owning record, the entry's own id and its type.",
    );
    for (name, property) in identity_properties() {
        let property = if name == ENTRY_TYPE {
            SchemaFragment::reference_to(format!("#/definitions/{ENTRY_TYPE}"))
        } else {
            property
        };
        shape = shape.with_property(name, property).with_required(name);
    }
    shape
}

pub fn builtin_document(urls: &UrlBuilder) -> SchemaDocument {
    let mut document = SchemaDocument::new(urls.schema_id(BUILTIN_NAMESPACE), BUILTIN_NAMESPACE)
        .with_definition("Entry", entry_shape())
        .with_definition(ENTRY_TYPE, entry_type_shape())
        .with_definition("Concept", concept_shape())
        .with_definition("Reference", reference_shape(Vec::new()));
    document.description = Some("Foundational definitions shared by all namespaces".to_string());
    document
}
