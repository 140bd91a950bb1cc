mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use shr_jsonschema::*;
use std::fs;
use tempfile::TempDir;

const EXPANDED_SPECS: &str = r#"{
    "namespaces": [
        { "namespace": "shr.test", "description": "Test namespace" },
        { "namespace": "shr.core" }
    ],
    "dataElements": [
        {
            "identifier": "shr.core.Quantity",
            "value": { "kind": "identifiable", "identifier": "decimal", "card": { "min": 1, "max": 1 } }
        },
        {
            "identifier": "shr.test.Status",
            "value": { "kind": "identifiable", "identifier": "code", "card": { "min": 1, "max": 1 } }
        },
        {
            "identifier": "shr.test.BloodPressure",
            "isEntry": true,
            "description": "Systolic and diastolic pressure",
            "concepts": [{ "system": "http://loinc.org", "code": "85354-9" }],
            "fields": [
                {
                    "kind": "identifiable",
                    "identifier": "shr.test.Status",
                    "card": { "min": 1, "max": 1 },
                    "constraints": [
                        { "type": "valueSet", "valueSet": "http://example.org/vs/status", "bindingStrength": "REQUIRED", "path": ["code"] }
                    ]
                },
                {
                    "kind": "identifiable",
                    "identifier": "shr.core.Quantity",
                    "card": { "min": 0 }
                }
            ]
        }
    ]
}"#;

fn parsed_specs() -> Specifications {
    Specifications::from_json(EXPANDED_SPECS).unwrap()
}

#[test]
fn test_document_from_expanded_json() {
    let result = export(&parsed_specs(), OutputMode::Hierarchical);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

    let document = result.document(TEST_NAMESPACE).unwrap();
    let json = document.to_json().unwrap();
    assert_eq!(json["id"], "https://example.org/schema/shr/test");
    assert_eq!(json["title"], "shr.test");
    assert_eq!(json["anyOf"], json!([{ "$ref": "#/definitions/BloodPressure" }]));

    let pressure = &json["definitions"]["BloodPressure"];
    assert_eq!(
        pressure["description"],
        "Systolic and diastolic pressure\nConcepts: http://loinc.org:85354-9"
    );
    let local = local_part(pressure);
    assert_eq!(
        local["properties"]["Status"]["allOf"][1],
        json!({
            "properties": {
                "Value": {
                    "valueSet": { "uri": "http://example.org/vs/status", "strength": "REQUIRED" }
                }
            }
        })
    );
    assert_eq!(
        local["properties"]["Quantity"],
        json!({
            "type": "array",
            "items": { "$ref": "https://example.org/schema/shr/core#/definitions/Quantity" }
        })
    );
}

#[test]
fn test_builtin_document_contents() {
    let result = export(&parsed_specs(), OutputMode::Hierarchical);
    let builtin = serde_json::to_value(result.document("shr.builtin").unwrap()).unwrap();

    assert_eq!(builtin["id"], "https://example.org/schema/shr/builtin");
    let names: Vec<&str> = builtin["definitions"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, vec!["Entry", "EntryType", "Concept", "Reference"]);
    assert_eq!(
        builtin["definitions"]["Entry"]["required"],
        json!(["ShrId", "EntryId", "EntryType"])
    );
    assert_eq!(
        builtin["definitions"]["Entry"]["properties"]["EntryType"],
        json!({ "$ref": "#/definitions/EntryType" })
    );
    assert_eq!(
        builtin["definitions"]["EntryType"],
        json!({ "type": "string", "format": "uri" })
    );
    assert!(builtin.get("anyOf").is_none());
}

#[test]
fn test_documents_keyed_by_id() {
    let result = export(&parsed_specs(), OutputMode::Hierarchical);
    let ids: Vec<&str> = result.schemas.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec![
            "https://example.org/schema/shr/builtin",
            "https://example.org/schema/shr/test",
            "https://example.org/schema/shr/core",
        ]
    );
}

#[test]
fn test_write_schemas_to_directory() {
    let temp_dir = TempDir::new().unwrap();
    let result = export(&parsed_specs(), OutputMode::Flattened);

    let written = write_schemas(&result, temp_dir.path()).unwrap();
    assert_eq!(
        written,
        vec![
            temp_dir.path().join("shr.test.schema.json"),
            temp_dir.path().join("shr.core.schema.json"),
        ]
    );

    let content = fs::read_to_string(&written[0]).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["$schema"], DRAFT_04_SCHEMA);
    assert_eq!(
        json["definitions"]["BloodPressure"]["required"],
        json!(["ShrId", "EntryId", "EntryType", "Status"])
    );
}

#[test]
fn test_hierarchical_write_includes_builtin_document() {
    let temp_dir = TempDir::new().unwrap();
    let result = export(&parsed_specs(), OutputMode::Hierarchical);

    let written = write_schemas(&result, temp_dir.path()).unwrap();
    assert_eq!(
        written,
        vec![
            temp_dir.path().join("shr.builtin.schema.json"),
            temp_dir.path().join("shr.test.schema.json"),
            temp_dir.path().join("shr.core.schema.json"),
        ]
    );

    let builtin: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert!(builtin["definitions"].get("Entry").is_some());
}

#[test]
fn test_reserved_builtin_namespace() {
    let specs = Specifications::new()
        .with_element(DataElement::new(Identifier::new("shr.builtin", "Entry")));
    let result = JsonSchemaExporter::with_config(create_test_config(OutputMode::Hierarchical))
        .export(&specs);
    assert!(matches!(result, Err(ShrSchemaError::Conversion { .. })));
}

#[test]
fn test_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("exporter.json");
    fs::write(
        &path,
        r#"{ "baseSchemaUrl": "http://example.com/schemas/", "mode": "flattened" }"#,
    )
    .unwrap();

    let config = ExporterConfig::from_file(&path).unwrap();
    assert_eq!(config.mode, OutputMode::Flattened);
    assert_eq!(config.base_type_url, DEFAULT_TYPE_URL);

    let result = JsonSchemaExporter::with_config(config).export(&parsed_specs()).unwrap();
    assert!(result.document("shr.test").is_some());
    assert!(result.schemas.contains_key("http://example.com/schemas/shr/test"));
}

#[test]
fn test_invalid_identifier_in_input() {
    let error = Specifications::from_json(
        r#"{ "dataElements": [{ "identifier": "NotQualified" }] }"#,
    )
    .unwrap_err();
    assert!(matches!(error, ShrSchemaError::Serialization(_)));
}

#[test]
fn test_diagnostics_serialize_for_reporting() {
    let specs = Specifications::new().with_element(
        DataElement::new(id("Odd")).with_field(Value::identifiable(Identifier::value_keyword())),
    );
    let result = export(&specs, OutputMode::Hierarchical);
    let diagnostic = result.diagnostics.first().unwrap();

    assert_eq!(diagnostic.code.as_str(), "restricted_field_name");
    assert_eq!(diagnostic.severity, Severity::Error);
    assert!(diagnostic.to_string().starts_with("[restricted_field_name]"));
}
