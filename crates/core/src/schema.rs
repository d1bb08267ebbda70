//! Tool input schemas.
//!
//! A tool declares its parameters once as an [`InputSchema`]; the same value
//! renders the JSON Schema sent to the model and checks incoming arguments.

use serde_json::{Map, Value, json};

use crate::error::ToolError;

/// Type and shape constraints for a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Str {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    Bool,
    /// A string restricted to a fixed set of values.
    Enum(Vec<&'static str>),
    StrArray {
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
}

impl ParamKind {
    pub fn string() -> Self {
        Self::Str { min_len: None, max_len: None }
    }

    pub fn string_len(min_len: usize, max_len: usize) -> Self {
        Self::Str {
            min_len: Some(min_len),
            max_len: Some(max_len),
        }
    }

    pub fn int_range(min: i64, max: i64) -> Self {
        Self::Int {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn string_array(min_items: usize, max_items: usize) -> Self {
        Self::StrArray {
            min_items: Some(min_items),
            max_items: Some(max_items),
        }
    }
}

/// A named parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
}

/// The declared input contract of a tool.
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    params: Vec<Param>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(mut self, name: &'static str, description: &'static str, kind: ParamKind) -> Self {
        self.params.push(Param {
            name,
            description,
            kind,
            required: true,
            default: None,
        });
        self
    }

    /// Add an optional parameter, with the default the tool applies when absent.
    pub fn optional(
        mut self,
        name: &'static str,
        description: &'static str,
        kind: ParamKind,
        default: Option<Value>,
    ) -> Self {
        self.params.push(Param {
            name,
            description,
            kind,
            required: false,
            default,
        });
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Render as a JSON Schema object.
    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut prop = match &param.kind {
                ParamKind::Str { min_len, max_len } => {
                    let mut p = json!({"type": "string"});
                    if let Some(min) = min_len {
                        p["minLength"] = json!(min);
                    }
                    if let Some(max) = max_len {
                        p["maxLength"] = json!(max);
                    }
                    p
                }
                ParamKind::Int { min, max } => {
                    let mut p = json!({"type": "integer"});
                    if let Some(min) = min {
                        p["minimum"] = json!(min);
                    }
                    if let Some(max) = max {
                        p["maximum"] = json!(max);
                    }
                    p
                }
                ParamKind::Bool => json!({"type": "boolean"}),
                ParamKind::Enum(values) => json!({"type": "string", "enum": values}),
                ParamKind::StrArray { min_items, max_items } => {
                    let mut p = json!({"type": "array", "items": {"type": "string"}});
                    if let Some(min) = min_items {
                        p["minItems"] = json!(min);
                    }
                    if let Some(max) = max_items {
                        p["maxItems"] = json!(max);
                    }
                    p
                }
            };
            prop["description"] = json!(param.description);
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check arguments against the declared parameters.
    ///
    /// Unknown extra keys are ignored. `null` counts as absent.
    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let empty = Map::new();
        let obj = match args {
            Value::Object(obj) => obj,
            Value::Null => &empty,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected an object of arguments, got {other}"
                )));
            }
        };

        for param in &self.params {
            match obj.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ToolError::InvalidArguments(format!(
                            "missing required parameter '{}'",
                            param.name
                        )));
                    }
                }
                Some(value) => check_value(param, value)?,
            }
        }
        Ok(())
    }
}

fn invalid(param: &Param, detail: impl std::fmt::Display) -> ToolError {
    ToolError::InvalidArguments(format!("'{}' {detail}", param.name))
}

fn check_value(param: &Param, value: &Value) -> Result<(), ToolError> {
    match &param.kind {
        ParamKind::Str { min_len, max_len } => {
            let s = value.as_str().ok_or_else(|| invalid(param, "must be a string"))?;
            let len = s.trim().chars().count();
            if let Some(min) = min_len
                && len < *min
            {
                return Err(invalid(param, format_args!("must be at least {min} characters")));
            }
            if let Some(max) = max_len
                && len > *max
            {
                return Err(invalid(param, format_args!("must be at most {max} characters")));
            }
        }
        ParamKind::Int { min, max } => {
            let n = value.as_i64().ok_or_else(|| invalid(param, "must be an integer"))?;
            if let Some(min) = min
                && n < *min
            {
                return Err(invalid(param, format_args!("must be >= {min}")));
            }
            if let Some(max) = max
                && n > *max
            {
                return Err(invalid(param, format_args!("must be <= {max}")));
            }
        }
        ParamKind::Bool => {
            if !value.is_boolean() {
                return Err(invalid(param, "must be a boolean"));
            }
        }
        ParamKind::Enum(values) => {
            let s = value.as_str().ok_or_else(|| invalid(param, "must be a string"))?;
            if !values.contains(&s) {
                return Err(invalid(param, format_args!("must be one of {}", values.join(", "))));
            }
        }
        ParamKind::StrArray { min_items, max_items } => {
            let items = value.as_array().ok_or_else(|| invalid(param, "must be an array"))?;
            if items.iter().any(|v| !v.is_string()) {
                return Err(invalid(param, "must contain only strings"));
            }
            if let Some(min) = min_items
                && items.len() < *min
            {
                return Err(invalid(param, format_args!("needs at least {min} items")));
            }
            if let Some(max) = max_items
                && items.len() > *max
            {
                return Err(invalid(param, format_args!("allows at most {max} items")));
            }
        }
    }
    Ok(())
}
