//! Tool registry: typed metadata, module grouping, parameter validation.
//!
//! Owns tool *metadata* (not implementations; endpoint bodies live behind the
//! `ToolBackend` seam). Every tool belongs to exactly one module.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Name of the per-call auto-subscribe override argument.
pub const AUTO_SUBSCRIBE_PARAM: &str = "auto_subscribe";

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Bool,
    Object,
    StringList,
    Enum(Vec<String>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::String => expect(value.is_string(), "string", value),
            ParamType::Int => expect(value.is_i64() || value.is_u64(), "integer", value),
            ParamType::Bool => expect(value.is_boolean(), "boolean", value),
            ParamType::Object => expect(value.is_object(), "object", value),
            ParamType::StringList => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| format!("expected array, got {}", value_type_name(value)))?;
                for (i, item) in arr.iter().enumerate() {
                    if !item.is_string() {
                        return Err(format!(
                            "expected string at index {}, got {}",
                            i,
                            value_type_name(item)
                        ));
                    }
                }
                Ok(())
            }
            ParamType::Enum(variants) => {
                let s = value.as_str().ok_or_else(|| {
                    format!("expected string for enum, got {}", value_type_name(value))
                })?;
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!(
                        "invalid enum value '{}', expected one of: {}",
                        s,
                        variants.join(", ")
                    ))
                }
            }
        }
    }

    /// JSON Schema fragment for this type.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => serde_json::json!({ "type": "string" }),
            ParamType::Int => serde_json::json!({ "type": "integer" }),
            ParamType::Bool => serde_json::json!({ "type": "boolean" }),
            ParamType::Object => serde_json::json!({ "type": "object" }),
            ParamType::StringList => {
                serde_json::json!({ "type": "array", "items": { "type": "string" } })
            }
            ParamType::Enum(variants) => serde_json::json!({ "type": "string", "enum": variants }),
        }
    }
}

fn expect(ok: bool, wanted: &str, value: &Value) -> std::result::Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("expected {}, got {}", wanted, value_type_name(value)))
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }
}

// =============================================================================
// Tool and module descriptors
// =============================================================================

/// Immutable tool metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub module: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,
    pub supports_auto_subscribe: bool,
    /// Only meaningful when `supports_auto_subscribe` is set.
    pub default_auto_subscribe: bool,
}

impl ToolDescriptor {
    pub fn new(name: &str, module: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            supports_auto_subscribe: false,
            default_auto_subscribe: false,
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.parameters.push(param);
        self
    }

    /// Mark the tool as auto-subscribe capable. Adds the optional per-call
    /// `auto_subscribe` override argument.
    pub fn auto_subscribe(mut self, default_enabled: bool) -> Self {
        self.supports_auto_subscribe = true;
        self.default_auto_subscribe = default_enabled;
        self.parameters.push(ParamDef::optional(
            AUTO_SUBSCRIBE_PARAM,
            ParamType::Bool,
            "Automatically subscribe to the affected deployment (overrides server settings)",
        ));
        self
    }

    /// MCP `inputSchema` for this tool.
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut schema = param.param_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".to_string(), Value::String(param.description.clone()));
                if let Some(default) = &param.default {
                    obj.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(param.name.clone(), schema);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    /// MCP `tools/list` entry.
    pub fn definition(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

/// A named group of tools, the coarse-grained activation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub tools: BTreeSet<String>,
}

// =============================================================================
// Tool registry
// =============================================================================

/// In-memory tool registry. Built once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Tool names are unique across all modules.
    pub fn register(&mut self, tool: ToolDescriptor) -> Result<()> {
        if tool.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if tool.module.is_empty() {
            return Err(Error::validation(format!(
                "Tool '{}' has no module",
                tool.name
            )));
        }
        if let Some(existing) = self.tools.get(&tool.name) {
            return Err(Error::validation(format!(
                "Tool '{}' already registered by module '{}'",
                tool.name, existing.module
            )));
        }

        self.modules
            .entry(tool.module.clone())
            .or_insert_with(|| ModuleDescriptor {
                name: tool.module.clone(),
                tools: BTreeSet::new(),
            })
            .tools
            .insert(tool.name.clone());
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Get a tool descriptor by name.
    pub fn get(&self, tool_name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(tool_name)
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    pub fn module(&self, module_name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(module_name)
    }

    pub fn has_module(&self, module_name: &str) -> bool {
        self.modules.contains_key(module_name)
    }

    /// All modules, sorted by name.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// All tool names, sorted.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// All tool descriptors, sorted by name.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Validate arguments against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid). Arguments the
    /// tool does not declare are passed through to the remote API untouched.
    pub fn validate_params(&self, tool_name: &str, params: &Value) -> Result<Vec<String>> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| Error::unknown_tool(tool_name))?;

        let param_map = params
            .as_object()
            .ok_or_else(|| Error::validation("Arguments must be a JSON object"))?;

        let mut errors = Vec::new();
        for param_def in &tool.parameters {
            match param_map.get(&param_def.name) {
                None | Some(Value::Null) => {
                    if param_def.required {
                        errors.push(format!("Missing required parameter: {}", param_def.name));
                    }
                }
                Some(value) => {
                    if let Err(e) = param_def.param_type.validate(value) {
                        errors.push(format!("Parameter '{}': {}", param_def.name, e));
                    }
                }
            }
        }

        Ok(errors)
    }

    /// Fill in default values for missing optional parameters.
    pub fn fill_defaults(&self, tool_name: &str, params: &mut Value) -> Result<()> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| Error::unknown_tool(tool_name))?;

        if let Some(map) = params.as_object_mut() {
            for param_def in &tool.parameters {
                if !map.contains_key(&param_def.name) {
                    if let Some(default) = &param_def.default {
                        map.insert(param_def.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
