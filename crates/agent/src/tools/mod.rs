//! Dictionary tools and their dispatch table

pub mod dictionary;

pub use dictionary::{
    register_dictionary_tools, AllCategoriesTool, CategoryFieldsTool, EncodingValuesTool,
    ExplainFieldTool, RecommendRelatedTool, RecommendedFieldsTool, SearchFieldsTool, DESCRIPTORS,
};

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use ukbsearch_provider::Tool;

use crate::{Result, SearchError};

/// Accepted argument type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    String,
    /// String that may be null or absent
    OptionalString,
}

/// One accepted parameter of a tool
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<i64>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required_int(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn int_with_default(
        name: &'static str,
        default: i64,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            required: false,
            default: Some(default),
            description,
        }
    }

    pub const fn required_string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional_string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::OptionalString,
            required: false,
            default: None,
            description,
        }
    }

    fn schema(&self) -> Value {
        let mut schema = match self.kind {
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::OptionalString => json!({ "type": ["string", "null"] }),
        };
        schema["description"] = json!(self.description);
        if let Some(default) = self.default {
            schema["default"] = json!(default);
        }
        schema
    }

    /// Check one supplied value against the declared kind
    fn coerce(&self, value: &Value) -> Result<Value> {
        let mismatch = |expected: &str| {
            SearchError::validation(
                self.name,
                Some(value.clone()),
                format!("'{}' must be {}", self.name, expected),
            )
        };

        match self.kind {
            ParamKind::Integer => match value {
                Value::Number(n) if n.is_i64() => Ok(value.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(json!(f as i64))
                    }
                    _ => Err(mismatch("an integer")),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|n| json!(n))
                    .map_err(|_| mismatch("an integer")),
                _ => Err(mismatch("an integer")),
            },
            ParamKind::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch("a string")),
            },
            ParamKind::OptionalString => match value {
                Value::String(_) | Value::Null => Ok(value.clone()),
                _ => Err(mismatch("a string or null")),
            },
        }
    }
}

/// Static metadata for one tool
#[derive(Debug)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolDescriptor {
    /// JSON schema of the accepted parameters
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    pub fn to_provider_tool(&self) -> Tool {
        Tool::new(self.name, self.description, self.schema())
    }

    /// Reduce raw model arguments to the declared parameters.
    ///
    /// Unknown keys are dropped, defaults filled in and required keys
    /// enforced. `null` counts as absent.
    pub fn bind(&self, args: &Value) -> Result<ToolArgs> {
        let supplied = match args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(SearchError::validation(
                    "arguments",
                    Some(other.clone()),
                    "arguments must be a JSON object",
                ))
            }
        };

        let dropped: Vec<&String> = supplied
            .keys()
            .filter(|k| !self.params.iter().any(|p| p.name == k.as_str()))
            .collect();
        if !dropped.is_empty() {
            debug!("{}: ignoring unknown arguments {:?}", self.name, dropped);
        }

        let mut bound = Map::new();
        for param in self.params {
            match supplied.get(param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    bound.insert(param.name.to_string(), param.coerce(value)?);
                }
                None if param.required => {
                    return Err(SearchError::validation(
                        param.name,
                        None,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                None => {
                    if let Some(default) = param.default {
                        bound.insert(param.name.to_string(), json!(default));
                    }
                }
            }
        }

        Ok(ToolArgs { values: bound })
    }
}

/// Arguments after binding; only declared parameters remain
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn int(&self, name: &str) -> Result<i64> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| SearchError::validation(name, None, format!("'{}' is not set", name)))
    }

    pub fn string(&self, name: &str) -> Result<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::validation(name, None, format!("'{}' is not set", name)))
    }

    pub fn opt_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Page size; negative values become 0 and are clamped by the store
    pub fn limit(&self, name: &str) -> Result<u32> {
        let raw = self.int(name)?;
        Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

/// A tool the model can call
#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn descriptor(&self) -> &'static ToolDescriptor;

    async fn execute(&self, args: ToolArgs) -> Result<Value>;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }
}

/// Dispatch table from tool name to tool; keeps registration order
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool of the same name
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name();
        match self.index.get(name) {
            Some(&slot) => self.tools[slot] = Box::new(tool),
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(Box::new(tool));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn descriptors(&self) -> Vec<&'static ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Tool list sent with every model request
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| t.descriptor().to_provider_tool())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run `name` with `args` and serialize its result.
    ///
    /// Unknown names fail with [`SearchError::ToolNotFound`]; binding and
    /// invocation failures come back as [`SearchError::ToolExecution`].
    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<String> {
        let tool = self.get(name).ok_or_else(|| SearchError::ToolNotFound {
            tool_name: name.to_string(),
        })?;

        let bound = tool
            .descriptor()
            .bind(args)
            .map_err(|e| SearchError::tool_execution(name, e.to_string()))?;

        match tool.execute(bound).await {
            Ok(value) => {
                debug!("Tool '{}' executed successfully", name);
                Ok(serde_json::to_string(&value)?)
            }
            Err(e) => {
                warn!("Tool '{}' execution failed: {}", name, e);
                Err(SearchError::tool_execution(name, e.to_string()))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static LOOKUP: ToolDescriptor = ToolDescriptor {
        name: "lookup",
        description: "Look something up",
        params: &[
            ParamSpec::required_int("field_id", "Field ID"),
            ParamSpec::int_with_default("limit", 20, "Maximum results"),
            ParamSpec::optional_string("category_name", "Category filter"),
        ],
    };

    #[test]
    fn test_schema_shape() {
        let schema = LOOKUP.schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["field_id"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["default"], 20);
        assert_eq!(
            schema["properties"]["category_name"]["type"],
            json!(["string", "null"])
        );
        assert_eq!(schema["required"], json!(["field_id"]));
    }

    #[test]
    fn test_schema_without_required() {
        static EMPTY: ToolDescriptor = ToolDescriptor {
            name: "empty",
            description: "",
            params: &[],
        };
        let schema = EMPTY.schema();
        assert!(schema.get("required").is_none());
        assert!(schema["properties"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_bind_drops_unknown_and_fills_defaults() {
        let args = LOOKUP
            .bind(&json!({ "field_id": 31, "verbose": true, "format": "long" }))
            .unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.int("field_id").unwrap(), 31);
        assert_eq!(args.limit("limit").unwrap(), 20);
        assert!(!args.contains("verbose"));
        assert!(args.opt_string("category_name").is_none());
    }

    #[test]
    fn test_bind_missing_required() {
        let err = LOOKUP.bind(&json!({ "limit": 5 })).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("field_id"));
    }

    #[test]
    fn test_bind_null_counts_as_absent() {
        assert!(LOOKUP.bind(&json!({ "field_id": null })).is_err());

        let args = LOOKUP
            .bind(&json!({ "field_id": 1, "limit": null, "category_name": null }))
            .unwrap();
        assert_eq!(args.limit("limit").unwrap(), 20);
        assert!(!args.contains("category_name"));
    }

    #[test]
    fn test_bind_coerces_numeric_strings() {
        let args = LOOKUP.bind(&json!({ "field_id": " 31 ", "limit": 5.0 })).unwrap();
        assert_eq!(args.int("field_id").unwrap(), 31);
        assert_eq!(args.limit("limit").unwrap(), 5);
    }

    #[test]
    fn test_bind_rejects_mismatched_types() {
        assert!(LOOKUP.bind(&json!({ "field_id": "thirty-one" })).is_err());
        assert!(LOOKUP.bind(&json!({ "field_id": 1.5 })).is_err());
        assert!(LOOKUP
            .bind(&json!({ "field_id": 1, "category_name": 7 }))
            .is_err());
    }

    #[test]
    fn test_bind_rejects_non_object() {
        let err = LOOKUP.bind(&json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_negative_limit_floors_at_zero() {
        let args = LOOKUP.bind(&json!({ "field_id": 1, "limit": -4 })).unwrap();
        assert_eq!(args.limit("limit").unwrap(), 0);
    }
}
