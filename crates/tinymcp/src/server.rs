//! Server definition: identity, registries, and lifecycle hooks.
//!
//! An [`McpServer`] is assembled with `&mut self` registration calls and then
//! frozen behind an `Arc` for serving. Nothing is registered after that, so
//! request handling reads the registries without locking.

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;

use crate::callback::Callback;
use crate::context::Context;
use crate::prompts::{PromptHandler, PromptInfo, PromptOutput, PromptRegistry};
use crate::resources::{ResourceHandler, ResourceInfo, ResourceOutput, ResourceRegistry};
use crate::tools::{Arguments, ToolHandler, ToolInfo, ToolOutput, ToolRegistry};
use crate::types::{Implementation, McpError, McpResult, PromptArgument, ServerCapabilities};

/// Startup or shutdown hook.
pub type Hook = Callback<(), ()>;

#[derive(Debug)]
pub struct McpServer {
    name: String,
    version: String,
    instructions: Option<String>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    startup_hooks: Vec<Hook>,
    shutdown_hooks: Vec<Hook>,
}

impl McpServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
            prompts: PromptRegistry::new(),
            startup_hooks: Vec::new(),
            shutdown_hooks: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn server_info(&self) -> Implementation {
        Implementation {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Capability groups to advertise, based on what is registered.
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::from_registries(
            !self.tools.is_empty(),
            !self.resources.is_empty(),
            !self.prompts.is_empty(),
        )
    }

    // -- Tools --------------------------------------------------------------

    pub fn add_tool(&mut self, info: ToolInfo) -> McpResult<&mut Self> {
        self.tools.register(info)?;
        Ok(self)
    }

    pub fn tool<F, O>(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(Arguments, Context) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<ToolOutput> + 'static,
    {
        let handler: ToolHandler =
            Callback::immediate(move |(args, ctx): (Arguments, Context)| f(args, ctx).map(Into::into));
        self.add_tool(ToolInfo::new(name, description, input_schema, handler))
    }

    pub fn tool_async<F, Fut, O>(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(Arguments, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<ToolOutput> + 'static,
    {
        let handler: ToolHandler = Callback::deferred(move |(args, ctx): (Arguments, Context)| {
            let fut = f(args, ctx);
            async move { fut.await.map(Into::into) }
        });
        self.add_tool(ToolInfo::new(name, description, input_schema, handler))
    }

    // -- Resources ----------------------------------------------------------

    pub fn add_resource(&mut self, info: ResourceInfo) -> McpResult<&mut Self> {
        self.resources.register(info)?;
        Ok(self)
    }

    /// Register a concrete resource or a `{param}` template. The handler
    /// gets the captured parameters.
    pub fn resource<F, O>(
        &mut self,
        uri: &str,
        name: &str,
        description: &str,
        mime_type: &str,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(HashMap<String, String>) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<ResourceOutput> + 'static,
    {
        let handler: ResourceHandler =
            Callback::immediate(move |params: HashMap<String, String>| f(params).map(Into::into));
        self.add_resource(ResourceInfo::new(uri, name, description, handler).with_mime_type(mime_type))
    }

    pub fn resource_async<F, Fut, O>(
        &mut self,
        uri: &str,
        name: &str,
        description: &str,
        mime_type: &str,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<ResourceOutput> + 'static,
    {
        let handler: ResourceHandler = Callback::deferred(move |params: HashMap<String, String>| {
            let fut = f(params);
            async move { fut.await.map(Into::into) }
        });
        self.add_resource(ResourceInfo::new(uri, name, description, handler).with_mime_type(mime_type))
    }

    // -- Prompts ------------------------------------------------------------

    pub fn add_prompt(&mut self, info: PromptInfo) -> McpResult<&mut Self> {
        self.prompts.register(info)?;
        Ok(self)
    }

    pub fn prompt<F, O>(
        &mut self,
        name: &str,
        description: &str,
        arguments: Vec<PromptArgument>,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(Arguments) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<PromptOutput> + 'static,
    {
        let handler: PromptHandler = Callback::immediate(move |args: Arguments| f(args).map(Into::into));
        self.add_prompt(PromptInfo::new(name, description, arguments, handler))
    }

    pub fn prompt_async<F, Fut, O>(
        &mut self,
        name: &str,
        description: &str,
        arguments: Vec<PromptArgument>,
        f: F,
    ) -> McpResult<&mut Self>
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<PromptOutput> + 'static,
    {
        let handler: PromptHandler = Callback::deferred(move |args: Arguments| {
            let fut = f(args);
            async move { fut.await.map(Into::into) }
        });
        self.add_prompt(PromptInfo::new(name, description, arguments, handler))
    }

    // -- Lifecycle ----------------------------------------------------------

    pub fn on_startup(&mut self, hook: Hook) -> &mut Self {
        self.startup_hooks.push(hook);
        self
    }

    pub fn on_shutdown(&mut self, hook: Hook) -> &mut Self {
        self.shutdown_hooks.push(hook);
        self
    }

    /// Run startup hooks in order. The first failure aborts startup.
    pub async fn run_startup(&self) -> McpResult<()> {
        tracing::info!(
            tools = self.tools.len(),
            resources = self.resources.len(),
            prompts = self.prompts.len(),
            "Starting MCP server '{}' v{}",
            self.name,
            self.version
        );
        for hook in &self.startup_hooks {
            hook.invoke_guarded(())
                .await
                .map_err(|e| McpError::Hook(format!("{e:#}")))?;
        }
        Ok(())
    }

    /// Run every shutdown hook; failures are logged and do not stop the rest.
    pub async fn run_shutdown(&self) {
        for hook in &self.shutdown_hooks {
            if let Err(e) = hook.invoke_guarded(()).await {
                tracing::error!("Shutdown hook failed: {e:#}");
            }
        }
        tracing::info!("MCP server '{}' stopped", self.name);
    }
}
