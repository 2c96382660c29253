//! Resource registration and lookup.

use std::collections::HashMap;

use crate::callback::Callback;
use crate::types::{
    McpError, McpResult, ReadResourceResult, ResourceDefinition, ResourceTemplateDefinition,
};

use super::output::ResourceOutput;
use super::template::{TemplateError, UriTemplate};

pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Receives the parameters captured from a template URI; empty for
/// concrete resources.
pub type ResourceHandler = Callback<HashMap<String, String>, ResourceOutput>;

#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub handler: ResourceHandler,
    template: Result<Option<UriTemplate>, TemplateError>,
}

impl ResourceInfo {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: ResourceHandler,
    ) -> Self {
        let uri = uri.into();
        let template = UriTemplate::parse(&uri);
        Self {
            uri,
            name: name.into(),
            description: description.into(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            handler,
            template,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn is_template(&self) -> bool {
        !matches!(self.template, Ok(None))
    }
}

/// Concrete resources and templates share one key space.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<ResourceInfo>,
    index: HashMap<String, usize>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: ResourceInfo) -> McpResult<()> {
        if let Err(e) = &info.template {
            return Err(McpError::InvalidTemplate {
                uri: info.uri.clone(),
                reason: e.to_string(),
            });
        }
        if self.index.contains_key(&info.uri) {
            return Err(McpError::DuplicateRegistration {
                kind: "Resource",
                name: info.uri,
            });
        }
        tracing::debug!(
            template = info.is_template(),
            "Registered resource '{}'",
            info.uri
        );
        self.index.insert(info.uri.clone(), self.resources.len());
        self.resources.push(info);
        Ok(())
    }

    pub fn list_resources(&self) -> Vec<ResourceDefinition> {
        self.resources
            .iter()
            .filter(|r| !r.is_template())
            .map(|r| ResourceDefinition {
                uri: r.uri.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                mime_type: r.mime_type.clone(),
            })
            .collect()
    }

    pub fn list_templates(&self) -> Vec<ResourceTemplateDefinition> {
        self.resources
            .iter()
            .filter(|r| r.is_template())
            .map(|r| ResourceTemplateDefinition {
                uri_template: r.uri.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                mime_type: r.mime_type.clone(),
            })
            .collect()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.uri.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Find the resource serving `uri` and the parameters to call it with.
    ///
    /// An exact concrete match wins; otherwise templates are tried in
    /// registration order and the first match is used.
    pub fn resolve(&self, uri: &str) -> McpResult<(&ResourceInfo, HashMap<String, String>)> {
        if let Some(res) = self
            .index
            .get(uri)
            .map(|&i| &self.resources[i])
            .filter(|r| !r.is_template())
        {
            return Ok((res, HashMap::new()));
        }

        self.resources
            .iter()
            .find_map(|r| {
                r.template
                    .as_ref()
                    .ok()
                    .and_then(Option::as_ref)
                    .and_then(|t| t.matches(uri))
                    .map(|params| (r, params))
            })
            .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))
    }

    /// Read `uri`. Handler failures surface as internal errors.
    pub async fn read(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let (res, params) = self.resolve(uri)?;
        let output = res.handler.invoke_guarded(params).await.map_err(|e| {
            tracing::error!("Resource '{uri}' failed: {e:#}");
            McpError::internal(&e)
        })?;
        Ok(output.into_result(uri, &res.mime_type))
    }
}
