//! Tool registration and dispatch.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::callback::Callback;
use crate::context::Context;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::output::ToolOutput;

/// Named arguments of a tool call.
pub type Arguments = Map<String, Value>;

pub type ToolHandler = Callback<(Arguments, Context), ToolOutput>;

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

impl ToolInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Build an object schema from `(name, json_type, required)` triples.
    ///
    /// `required` is omitted when no parameter is required.
    pub fn schema_for(params: &[(&str, &str, bool)]) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, ty, is_required) in params {
            properties.insert(name.to_string(), json!({ "type": ty }));
            if *is_required {
                required.push(Value::String(name.to_string()));
            }
        }

        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

/// Decode tool arguments into a typed struct.
pub fn parse_arguments<T: DeserializeOwned>(args: Arguments) -> anyhow::Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| anyhow::anyhow!("Invalid arguments: {e}"))
}

/// Tools in registration order, indexed by name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolInfo>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: ToolInfo) -> McpResult<()> {
        if self.index.contains_key(&info.name) {
            return Err(McpError::DuplicateRegistration {
                kind: "Tool",
                name: info.name,
            });
        }
        tracing::debug!("Registered tool '{}'", info.name);
        self.index.insert(info.name.clone(), self.tools.len());
        self.tools.push(info);
        Ok(())
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolInfo::definition).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn get(&self, name: &str) -> McpResult<&ToolInfo> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool and wrap whatever it produced.
    ///
    /// Only an unknown name or non-object arguments are protocol errors.
    /// Handler failures, panics included, come back as an `isError` result.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: Context,
    ) -> McpResult<ToolCallResult> {
        let tool = self.get(name)?;
        let args = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(McpError::InvalidParams(format!(
                    "Tool arguments must be an object, got {other}"
                )))
            }
        };

        match tool.handler.invoke_guarded((args, ctx)).await {
            Ok(output) => Ok(output.into_result()),
            Err(e) => {
                tracing::error!("Tool '{name}' failed: {e:#}");
                Ok(ToolCallResult::error(format!("{e:#}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentBlock;

    fn ctx() -> Context {
        Context::new(None, "test")
    }

    fn echo() -> ToolInfo {
        ToolInfo::new(
            "echo",
            "Echo the message",
            ToolInfo::schema_for(&[("message", "string", true)]),
            Callback::immediate(|(args, _ctx): (Arguments, Context)| {
                let msg = args.get("message").and_then(Value::as_str).unwrap_or("");
                Ok(ToolOutput::from(msg.to_string()))
            }),
        )
    }

    #[test]
    fn test_schema_for() {
        let schema = ToolInfo::schema_for(&[("a", "integer", true), ("b", "string", false)]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["a"]["type"], "integer");
        assert_eq!(schema["required"], json!(["a"]));

        let schema = ToolInfo::schema_for(&[("b", "string", false)]);
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(echo()).unwrap();
        let err = reg.register(echo()).unwrap_err();
        assert!(matches!(err, McpError::DuplicateRegistration { kind: "Tool", .. }));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_list_in_registration_order() {
        let mut reg = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            reg.register(ToolInfo {
                name: name.to_string(),
                ..echo()
            })
            .unwrap();
        }
        let names: Vec<_> = reg.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_invoke_echo() {
        let mut reg = ToolRegistry::new();
        reg.register(echo()).unwrap();
        let result = reg
            .invoke("echo", Some(json!({ "message": "hi" })), ctx())
            .await
            .unwrap();
        assert_eq!(result.content, vec![ContentBlock::text("hi")]);
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let reg = ToolRegistry::new();
        let err = reg.invoke("nope", None, ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: 'nope'");
        assert_eq!(err.code(), crate::types::error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let mut reg = ToolRegistry::new();
        reg.register(echo()).unwrap();
        let err = reg.invoke("echo", Some(json!([1, 2])), ctx()).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_failure_and_panic_become_error_results() {
        let mut reg = ToolRegistry::new();
        reg.register(ToolInfo::new(
            "fail",
            "",
            ToolInfo::schema_for(&[]),
            Callback::immediate(|_: (Arguments, Context)| anyhow::bail!("boom")),
        ))
        .unwrap();
        reg.register(ToolInfo::new(
            "panic",
            "",
            ToolInfo::schema_for(&[]),
            Callback::deferred(|_: (Arguments, Context)| async move {
                if true {
                    panic!("exploded");
                }
                Ok(ToolOutput::from("never"))
            }),
        ))
        .unwrap();

        let result = reg.invoke("fail", None, ctx()).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, vec![ContentBlock::text("boom")]);

        let result = reg.invoke("panic", None, ctx()).await.unwrap();
        assert!(result.is_error);
        assert_eq!(result.content[0].as_text(), Some("exploded"));
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Debug, serde::Deserialize)]
        struct Add {
            a: i64,
            b: i64,
        }
        let mut args = Arguments::new();
        args.insert("a".into(), json!(2));
        args.insert("b".into(), json!(3));
        let add: Add = parse_arguments(args).unwrap();
        assert_eq!(add.a + add.b, 5);

        let err = parse_arguments::<Add>(Arguments::new()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid arguments"));
    }
}
