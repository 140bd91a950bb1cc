mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use shr_jsonschema::*;

#[test]
fn test_export_produces_namespace_document() {
    let result = export(&create_test_specs(), OutputMode::Hierarchical);

    let document = result.document(TEST_NAMESPACE).unwrap();
    assert_eq!(document.id, "https://example.org/schema/shr/test");
    assert_eq!(document.title, TEST_NAMESPACE);
    assert_eq!(document.description.as_deref(), Some("Test namespace"));

    let names: Vec<&str> = document.definitions.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Component", "Observation", "Patient", "Status"]);

    // Concrete entries are listed at the top level
    let json = serde_json::to_value(document).unwrap();
    assert_eq!(
        json["anyOf"],
        json!([
            { "$ref": "#/definitions/Observation" },
            { "$ref": "#/definitions/Patient" }
        ])
    );
    assert_eq!(json["$schema"], "http://json-schema.org/draft-04/schema#");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn test_abstract_entries_are_not_listed() {
    let specs = Specifications::new()
        .with_element(DataElement::new(id("Finding")).entry().abstract_());
    let result = export(&specs, OutputMode::Hierarchical);
    assert!(result.document(TEST_NAMESPACE).unwrap().any_of.is_empty());
}

#[test]
fn test_value_property_is_required() {
    let result = export(&create_test_specs(), OutputMode::Hierarchical);
    let status = definition(&result, "Status");

    assert_eq!(status["properties"]["Value"], json!({ "type": "string" }));
    assert_eq!(status["required"], json!(["Value", "EntryType"]));
    assert_eq!(
        status["properties"]["EntryType"],
        json!({ "$ref": "https://example.org/schema/shr/builtin#/definitions/EntryType" })
    );
}

#[test]
fn test_fields_in_hierarchical_entry() {
    let result = export(&create_test_specs(), OutputMode::Hierarchical);
    let observation = definition(&result, "Observation");
    let local = local_part(&observation);

    assert_eq!(local["properties"]["Status"], json!({ "$ref": "#/definitions/Status" }));
    assert_eq!(
        local["properties"]["Component"],
        json!({ "type": "array", "items": { "$ref": "#/definitions/Component" } })
    );
    assert_eq!(local["properties"]["Patient"]["refType"], json!(["https://example.org/types/shr/test/Patient"]));
    assert_eq!(local["required"], json!(["Status"]));
    assert_eq!(observation["description"], "A measurement");
}

// Scenario A: required scalar coded field fixed to a code
#[test]
fn test_required_coded_field_with_code() {
    let specs = Specifications::new().with_element(
        DataElement::new(id("Condition")).with_field(
            Value::identifiable(primitive("code"))
                .with_card(Cardinality::exactly_one())
                .with_constraint(Constraint::code(Coding::new("S", "X"))),
        ),
    );
    let result = export(&specs, OutputMode::Hierarchical);
    let condition = definition(&result, "Condition");

    assert_eq!(
        condition["properties"]["code"],
        json!({ "type": "string", "code": { "system": "S", "code": "X" } })
    );
    assert!(condition["required"].as_array().unwrap().contains(&json!("code")));
}

// Scenario B: 1..* list that must include at least two members of a subtype
#[test]
fn test_includes_type_on_list_field() {
    let specs = Specifications::new()
        .with_element(DataElement::new(id("Component")))
        .with_element(DataElement::new(id("Special")).based_on(id("Component")))
        .with_element(
            DataElement::new(id("Panel")).with_field(
                create_test_field("Component", Cardinality::unbounded(1)).with_constraint(
                    Constraint::includes_type(id("Special"), Cardinality::unbounded(2)),
                ),
            ),
        );
    let result = export(&specs, OutputMode::Hierarchical);
    let component = &definition(&result, "Panel")["properties"]["Component"];

    assert_eq!(component["type"], "array");
    assert!(component["minItems"].as_u64().unwrap() >= 2);
    assert_eq!(component["items"], json!({ "$ref": "#/definitions/Component" }));
    assert_eq!(
        component["includes"],
        json!({
            "minItems": 2,
            "members": [{ "items": { "$ref": "#/definitions/Special" }, "minItems": 2 }]
        })
    );
}

// Scenario C: entry identity inlined when flattened, composed from the builtin
// Entry when hierarchical
#[test]
fn test_entry_identity_by_output_mode() {
    let specs = Specifications::new().with_element(
        DataElement::new(id("Encounter"))
            .entry()
            .with_field(create_test_field("Status", Cardinality::optional())),
    )
    .with_element(create_coded_element("Status"));

    let flattened = export(&specs, OutputMode::Flattened);
    let encounter = definition(&flattened, "Encounter");
    assert!(encounter.get("allOf").is_none());
    assert_eq!(encounter["properties"]["ShrId"], json!({ "type": "string" }));
    assert_eq!(encounter["properties"]["EntryId"], json!({ "type": "string" }));
    assert_eq!(
        encounter["properties"]["EntryType"],
        json!({ "type": "string", "format": "uri" })
    );
    assert_eq!(encounter["required"], json!(["ShrId", "EntryId", "EntryType"]));
    let serialized = serde_json::to_string(&flattened.schemas).unwrap();
    assert!(!serialized.contains("shr/builtin"));
    assert_eq!(flattened.schemas.len(), 1);

    let hierarchical = export(&specs, OutputMode::Hierarchical);
    let encounter = definition(&hierarchical, "Encounter");
    assert_eq!(
        encounter["allOf"][0],
        json!({ "$ref": "https://example.org/schema/shr/builtin#/definitions/Entry" })
    );
    assert_eq!(hierarchical.schemas.len(), 2);
}

// Scenario D: inherited fields colliding by name are all excluded
#[test]
fn test_inherited_field_collision() {
    let specs = Specifications::new()
        .with_element(DataElement::new(id("Left")).with_field(create_test_field("Status", Cardinality::optional())))
        .with_element(DataElement::new(id("Right")).with_field(create_test_field("Status", Cardinality::optional())))
        .with_element(create_coded_element("Status"))
        .with_element(
            DataElement::new(id("Both"))
                .based_on(id("Left"))
                .based_on(id("Right"))
                .with_field(
                    create_test_field("Status", Cardinality::optional())
                        .with_inheritance(Inheritance::Inherited),
                )
                .with_field(
                    create_test_field("Status", Cardinality::optional())
                        .with_inheritance(Inheritance::Inherited),
                ),
        );

    for mode in [OutputMode::Hierarchical, OutputMode::Flattened] {
        let result = export(&specs, mode);
        let both = local_part(&definition(&result, "Both"));
        assert!(both["properties"].get("Status").is_none());
        assert_eq!(
            result
                .diagnostics_with(DiagnosticCode::InheritedFieldCollision)
                .count(),
            2
        );
    }
}

#[test]
fn test_hierarchical_composition_with_entry_ancestor() {
    let specs = Specifications::new()
        .with_element(DataElement::new(id("Finding")).entry().abstract_())
        .with_element(
            DataElement::new(id("Vital"))
                .entry()
                .based_on(id("Finding"))
                .with_field(create_test_field("Status", Cardinality::exactly_one())),
        )
        .with_element(create_coded_element("Status"));
    let result = export(&specs, OutputMode::Hierarchical);

    let vital = definition(&result, "Vital");
    let entries = vital["allOf"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], json!({ "$ref": "#/definitions/Finding" }));
    assert_eq!(entries[1]["required"], json!(["Status"]));

    let finding = definition(&result, "Finding");
    assert_eq!(
        finding,
        json!({
            "allOf": [
                { "$ref": "https://example.org/schema/shr/builtin#/definitions/Entry" },
                { "type": "object" }
            ]
        })
    );
}

#[test]
fn test_inherited_fields_only_inlined_when_flattened() {
    let specs = Specifications::new()
        .with_element(
            DataElement::new(id("Parent"))
                .with_field(create_test_field("Status", Cardinality::exactly_one())),
        )
        .with_element(
            DataElement::new(id("Child")).based_on(id("Parent")).with_field(
                create_test_field("Status", Cardinality::exactly_one())
                    .with_inheritance(Inheritance::Inherited),
            ),
        )
        .with_element(create_coded_element("Status"));

    let hierarchical = export(&specs, OutputMode::Hierarchical);
    let child = definition(&hierarchical, "Child");
    assert_eq!(child["allOf"][0], json!({ "$ref": "#/definitions/Parent" }));
    assert!(child["allOf"][1]["properties"].get("Status").is_none());

    let flattened = export(&specs, OutputMode::Flattened);
    let child = definition(&flattened, "Child");
    assert_eq!(child["properties"]["Status"], json!({ "$ref": "#/definitions/Status" }));
    assert_eq!(child["required"], json!(["EntryType", "Status"]));
}

#[test]
fn test_rejected_fields_are_reported() {
    let specs = Specifications::new()
        .with_element(create_coded_element("Status"))
        .with_element(
            DataElement::new(id("Odd"))
                .with_field(Value::identifiable(Identifier::value_keyword()))
                .with_field(Value::choice(vec![
                    Value::identifiable(primitive("string")),
                    Value::identifiable(primitive("integer")),
                ]))
                .with_field(Value::incomplete(None))
                .with_field(create_test_field("Status", Cardinality::new(0, Some(0)))),
        );
    let result = export(&specs, OutputMode::Hierarchical);

    let odd = definition(&result, "Odd");
    assert_eq!(odd["properties"].as_object().map(|p| p.len()), Some(1));
    assert!(odd["properties"].get("EntryType").is_some());
    assert_eq!(result.diagnostics_with(DiagnosticCode::RestrictedFieldName).count(), 1);
    assert_eq!(result.diagnostics_with(DiagnosticCode::ChoiceField).count(), 1);
    assert_eq!(result.diagnostics_with(DiagnosticCode::UnnamedField).count(), 1);
    for diagnostic in &result.diagnostics {
        assert_eq!(diagnostic.element.as_deref(), Some("shr.test.Odd"));
    }
}

#[test]
fn test_description_accumulates_in_order() {
    let specs = Specifications::new().with_element(
        DataElement::new(id("Sketch"))
            .with_description("Work in progress")
            .with_concept(Concept::Coded(Coding::new("http://snomed.info/sct", "123")))
            .based_on_tbd(Some("a future parent".into()))
            .with_field(Value::placeholder(Some("severity".into()))),
    );
    let result = export(&specs, OutputMode::Hierarchical);
    let sketch = definition(&result, "Sketch");

    assert_eq!(
        sketch["description"],
        "Work in progress\nConcepts: http://snomed.info/sct:123\nTBD Parents: a future parent\nTBD Fields: severity"
    );
}

#[test]
fn test_stats_are_collected() {
    let result = export(&create_test_specs(), OutputMode::Hierarchical);
    assert_eq!(result.stats.namespaces, 1);
    assert_eq!(result.stats.elements, 4);
    assert_eq!(result.stats.properties, 5);
}

#[test]
fn test_cross_namespace_references_are_absolute() {
    let specs = Specifications::new()
        .with_element(DataElement::new(Identifier::new("shr.core", "Quantity")))
        .with_element(
            DataElement::new(id("Dose")).with_value(
                Value::identifiable(Identifier::new("shr.core", "Quantity"))
                    .with_card(Cardinality::exactly_one()),
            ),
        );
    let result = export(&specs, OutputMode::Hierarchical);
    assert_eq!(
        definition(&result, "Dose")["properties"]["Value"],
        json!({ "$ref": "https://example.org/schema/shr/core#/definitions/Quantity" })
    );
    assert!(result.document("shr.core").is_some());
}
