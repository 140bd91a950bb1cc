use shr_jsonschema::*;

pub const TEST_NAMESPACE: &str = "shr.test";

#[allow(dead_code)]
pub fn id(name: &str) -> Identifier {
    Identifier::new(TEST_NAMESPACE, name)
}

#[allow(dead_code)]
pub fn primitive(name: &str) -> Identifier {
    Identifier::primitive(name)
}

#[allow(dead_code)]
pub fn create_test_config(mode: OutputMode) -> ExporterConfig {
    ExporterConfig::default()
        .with_base_schema_url("https://example.org/schema")
        .with_base_type_url("https://example.org/types")
        .with_mode(mode)
}

#[allow(dead_code)]
pub fn export(specs: &Specifications, mode: OutputMode) -> ExportResult {
    JsonSchemaExporter::with_config(create_test_config(mode))
        .export(specs)
        .unwrap()
}

/// A definition of the test namespace as JSON.
#[allow(dead_code)]
pub fn definition(result: &ExportResult, name: &str) -> serde_json::Value {
    let document = result.document(TEST_NAMESPACE).unwrap();
    serde_json::to_value(&document.definitions[name]).unwrap()
}

/// The local object of a hierarchical definition: the last `allOf` entry, or
/// the definition itself.
#[allow(dead_code)]
pub fn local_part(definition: &serde_json::Value) -> serde_json::Value {
    match definition.get("allOf").and_then(|entries| entries.as_array()) {
        Some(entries) => entries.last().cloned().unwrap(),
        None => definition.clone(),
    }
}

#[allow(dead_code)]
pub fn create_test_field(name: &str, card: Cardinality) -> Value {
    Value::identifiable(id(name)).with_card(card)
}

#[allow(dead_code)]
pub fn create_coded_element(name: &str) -> DataElement {
    DataElement::new(id(name))
        .with_value(Value::identifiable(primitive("code")).with_card(Cardinality::exactly_one()))
}

/// An entry with a status, a list of components and a subject reference.
#[allow(dead_code)]
pub fn create_test_specs() -> Specifications {
    let mut specs = Specifications::new();
    specs.add_namespace(Namespace::new(TEST_NAMESPACE).with_description("Test namespace"));
    specs
        .with_element(
            DataElement::new(id("Observation"))
                .entry()
                .with_description("A measurement")
                .with_field(create_test_field("Status", Cardinality::exactly_one()))
                .with_field(create_test_field("Component", Cardinality::unbounded(0)))
                .with_field(
                    Value::reference(id("Patient")).with_card(Cardinality::optional()),
                ),
        )
        .with_element(create_coded_element("Status"))
        .with_element(
            DataElement::new(id("Component"))
                .with_value(Value::identifiable(primitive("string")).with_card(Cardinality::exactly_one())),
        )
        .with_element(DataElement::new(id("Patient")).entry())
}
