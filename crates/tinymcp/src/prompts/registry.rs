//! Prompt registration and rendering.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::callback::Callback;
use crate::tools::Arguments;
use crate::types::{McpError, McpResult, PromptArgument, PromptDefinition, PromptGetResult};

use super::output::PromptOutput;

pub type PromptHandler = Callback<Arguments, PromptOutput>;

#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
    pub handler: PromptHandler,
}

impl PromptInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: Vec<PromptArgument>,
        handler: PromptHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments,
            handler,
        }
    }

    /// Take the argument list from an object schema's `properties`, in
    /// order. A property is required iff it appears in `required`.
    pub fn with_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &Value,
        handler: PromptHandler,
    ) -> Self {
        Self::new(name, description, arguments_from_schema(schema), handler)
    }

    pub fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

pub fn arguments_from_schema(schema: &Value) -> Vec<PromptArgument> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| PromptArgument {
                    name: name.clone(),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: Vec<PromptInfo>,
    index: HashMap<String, usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: PromptInfo) -> McpResult<()> {
        if self.index.contains_key(&info.name) {
            return Err(McpError::DuplicateRegistration {
                kind: "Prompt",
                name: info.name,
            });
        }
        tracing::debug!("Registered prompt '{}'", info.name);
        self.index.insert(info.name.clone(), self.prompts.len());
        self.prompts.push(info);
        Ok(())
    }

    pub fn list_prompts(&self) -> Vec<PromptDefinition> {
        self.prompts.iter().map(PromptInfo::definition).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get_info(&self, name: &str) -> McpResult<&PromptInfo> {
        self.index
            .get(name)
            .map(|&i| &self.prompts[i])
            .ok_or_else(|| McpError::PromptNotFound(name.to_string()))
    }

    /// Render a prompt after checking its required arguments.
    pub async fn get(&self, name: &str, arguments: Option<Value>) -> McpResult<PromptGetResult> {
        let prompt = self.get_info(name)?;
        let args = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(McpError::InvalidParams(format!(
                    "Prompt arguments must be an object, got {other}"
                )))
            }
        };

        if let Some(missing) = prompt
            .arguments
            .iter()
            .find(|a| a.required && !args.contains_key(&a.name))
        {
            return Err(McpError::InvalidParams(format!(
                "Missing required argument: '{}'",
                missing.name
            )));
        }

        let output = prompt.handler.invoke_guarded(args).await.map_err(|e| {
            tracing::error!("Prompt '{name}' failed: {e:#}");
            McpError::internal(&e)
        })?;

        Ok(PromptGetResult {
            description: prompt.description.clone(),
            messages: output.into_messages(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptMessage;
    use serde_json::json;

    fn review() -> PromptInfo {
        PromptInfo::new(
            "review",
            "Review some code",
            vec![
                PromptArgument::required("code", "Code to review"),
                PromptArgument::optional("focus", "What to look at"),
            ],
            Callback::immediate(|args: Arguments| {
                let code = args.get("code").and_then(Value::as_str).unwrap_or_default();
                Ok(PromptOutput::from(format!("Please review:\n{code}")))
            }),
        )
    }

    #[test]
    fn test_arguments_from_schema_keep_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "zeta": { "type": "string", "description": "last letter" },
                "alpha": { "type": "integer" }
            },
            "required": ["alpha"]
        });
        let args = arguments_from_schema(&schema);
        assert_eq!(args[0], PromptArgument::optional("zeta", "last letter"));
        assert_eq!(args[1], PromptArgument::required("alpha", ""));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut reg = PromptRegistry::new();
        reg.register(review()).unwrap();
        assert!(reg.register(review()).is_err());
    }

    #[tokio::test]
    async fn test_get_renders_messages() {
        let mut reg = PromptRegistry::new();
        reg.register(review()).unwrap();
        let result = reg
            .get("review", Some(json!({ "code": "fn main() {}" })))
            .await
            .unwrap();
        assert_eq!(result.description, "Review some code");
        assert_eq!(
            result.messages,
            vec![PromptMessage::user("Please review:\nfn main() {}")]
        );
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let mut reg = PromptRegistry::new();
        reg.register(review()).unwrap();
        let err = reg.get("review", Some(json!({ "focus": "style" }))).await.unwrap_err();
        assert_eq!(err.code(), crate::types::error_codes::INVALID_PARAMS);
        assert_eq!(err.to_string(), "Invalid params: Missing required argument: 'code'");
    }

    #[tokio::test]
    async fn test_unknown_prompt() {
        let reg = PromptRegistry::new();
        let err = reg.get("ghost", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Prompt not found: 'ghost'");
    }
}
