//! Tests for the dictionary tool registry

mod common;

use common::*;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use ukbsearch_agent::tools::dictionary::SEARCH_FIELDS;
use ukbsearch_agent::{SearchError, ToolRegistry};

#[test]
fn test_registry_new() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.names().is_empty());
    assert!(!registry.has("explain_field_by_id"));
}

#[test]
fn test_dictionary_tools_in_order() {
    let registry = registry();
    assert!(registry.has("get_all_categories"));
    assert!(!registry.has("read_file"));
    assert_eq!(
        registry.names(),
        vec![
            "explain_field_by_id",
            "search_fields_by_keyword",
            "get_category_fields",
            "get_encoding_values",
            "recommend_related_fields",
            "get_all_categories",
            "get_recommended_fields",
        ]
    );
}

#[test]
fn test_definitions_match_descriptors() {
    let registry = registry();
    let definitions = registry.definitions();
    assert_eq!(definitions.len(), 7);

    for (definition, descriptor) in definitions.iter().zip(registry.descriptors()) {
        assert_eq!(definition.tool_type, "function");
        assert_eq!(definition.function.name, descriptor.name);
        let properties = definition.function.parameters["properties"]
            .as_object()
            .unwrap();
        let declared: Vec<&str> = descriptor.params.iter().map(|p| p.name).collect();
        assert_eq!(properties.len(), declared.len());
        for name in declared {
            assert!(properties.contains_key(name));
        }
    }
}

#[test]
fn test_limit_defaults_in_schema() {
    let registry = registry();
    let defaults: Vec<(String, Value)> = registry
        .definitions()
        .into_iter()
        .filter_map(|t| {
            let default = t.function.parameters["properties"]["limit"]["default"].clone();
            (!default.is_null()).then(|| (t.function.name, default))
        })
        .collect();

    assert_eq!(
        defaults,
        vec![
            ("search_fields_by_keyword".to_string(), json!(20)),
            ("get_category_fields".to_string(), json!(50)),
            ("get_encoding_values".to_string(), json!(50)),
            ("recommend_related_fields".to_string(), json!(10)),
            ("get_recommended_fields".to_string(), json!(20)),
        ]
    );
}

#[test]
fn test_search_descriptor_required_keys() {
    let schema = SEARCH_FIELDS.schema();
    assert_eq!(schema["required"], json!(["keyword"]));
}

#[tokio::test]
async fn test_dispatch_explain_field() {
    let registry = registry();
    let out = assert_ok!(
        registry
            .dispatch("explain_field_by_id", &json!({ "field_id": 31 }))
            .await
    );
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["field_id"], 31);
    assert_eq!(value["category"]["title"], "Baseline characteristics");
}

#[tokio::test]
async fn test_dispatch_unknown_tool() {
    let registry = registry();
    let err = assert_err!(registry.dispatch("nonexistent", &json!({})).await);
    assert!(matches!(err, SearchError::ToolNotFound { ref tool_name } if tool_name == "nonexistent"));
}

#[tokio::test]
async fn test_dispatch_wraps_not_found() {
    let registry = registry();
    let err = assert_err!(
        registry
            .dispatch("get_category_fields", &json!({ "category_name": "Genomics" }))
            .await
    );
    assert_eq!(err.code(), "TOOL_EXECUTION_ERROR");
    assert_eq!(err.details()["tool_name"], "get_category_fields");
    assert!(err.to_string().contains("Category 'Genomics' not found"));
}

#[tokio::test]
async fn test_dispatch_missing_required_key() {
    let registry = registry();
    let err = registry
        .dispatch("recommend_related_fields", &json!({ "limit": 3 }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TOOL_EXECUTION_ERROR");
    assert!(err.to_string().contains("recommend_related_fields"));
    assert!(err.to_string().contains("field_id"));
}

#[tokio::test]
async fn test_dispatch_drops_unknown_keys() {
    let registry = registry();
    let out = registry
        .dispatch(
            "recommend_related_fields",
            &json!({ "field_id": "34", "limit": 10, "include_self": true }),
        )
        .await
        .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    let related: Vec<i64> = value["related"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field_id"].as_i64().unwrap())
        .collect();
    assert_eq!(related, vec![31]);
}

#[tokio::test]
async fn test_dispatch_recommended_without_category() {
    let registry = registry();
    let out = registry
        .dispatch("get_recommended_fields", &json!({ "category_name": null }))
        .await
        .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["fields"][0]["reason"], "Core demographic");
    assert!(value["category"].is_null());
}

#[tokio::test]
async fn test_dispatch_encoding_values() {
    let registry = registry();
    let out = registry
        .dispatch("get_encoding_values", &json!({ "encoding_id": 9 }))
        .await
        .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["total"], 2);
    assert_eq!(value["values"][0]["meaning"], "Female");
}

#[tokio::test]
async fn test_dispatch_all_categories_ignores_arguments() {
    let registry = registry();
    let out = registry
        .dispatch("get_all_categories", &json!({ "anything": 1 }))
        .await
        .unwrap();
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["count"], 2);
}
