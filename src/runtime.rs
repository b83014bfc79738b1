//! Agent runtime boundary.
//!
//! [`AgentRuntime`] is the seam the reconciliation engine mutates the world
//! through; [`HttpAgentRuntime`] implements it against a Letta-style REST
//! surface. Attachment truth lives in the runtime, never in this process.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::RuntimeConfig,
    error::{ToolSyncError, ToolSyncResult},
    types::{AttachedToolRef, ToolDescriptor, ToolOrigin},
};

/// Network boundary to the agent runtime. All calls are request/response
/// with JSON payloads and a mandatory timeout.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// All tools currently bound to the agent, with origin tags.
    async fn list_agent_tools(&self, agent_id: &str) -> ToolSyncResult<Vec<AttachedToolRef>>;

    /// Tools registered from a specific MCP server.
    async fn list_server_tools(&self, server: &str) -> ToolSyncResult<Vec<ToolDescriptor>>;

    /// Register a tool from an MCP server. Idempotent on the runtime side;
    /// the returned descriptor carries the authoritative `tool_id`.
    async fn register_tool(&self, server: &str, name: &str) -> ToolSyncResult<ToolDescriptor>;

    async fn attach_tool(&self, agent_id: &str, tool_id: &str) -> ToolSyncResult<()>;

    async fn detach_tool(&self, agent_id: &str, tool_id: &str) -> ToolSyncResult<()>;

    /// The full registered tool inventory (sync reconciler input).
    async fn list_all_tools(&self) -> ToolSyncResult<Vec<ToolDescriptor>>;
}

/// Wire representation of a tool as the runtime reports it. The runtime is
/// inconsistent about `id` vs `tool_id`, so both are accepted and normalized.
#[derive(Debug, Deserialize)]
struct RuntimeTool {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    tool_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tool_type: Option<String>,
    #[serde(default)]
    mcp_server_name: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl RuntimeTool {
    fn resolve_id(&self) -> Option<String> {
        self.id.clone().or_else(|| self.tool_id.clone())
    }

    /// `external_mcp` is externally managed; any other explicit type is a
    /// statically configured tool; an absent tag is genuinely unknown and
    /// left for the conservative classification in the state reader.
    fn origin(&self) -> ToolOrigin {
        match self.tool_type.as_deref() {
            Some("external_mcp") => ToolOrigin::ExternalMcp,
            Some(_) => ToolOrigin::Static,
            None => ToolOrigin::Unknown,
        }
    }

    fn into_descriptor(self) -> Option<ToolDescriptor> {
        let tool_id = self.resolve_id()?;
        let origin = self.origin();
        let name = self.name.clone().unwrap_or_default();
        let mut descriptor = ToolDescriptor::new(tool_id, name)
            .with_origin(origin)
            .with_tags(self.tags);
        if let Some(description) = self.description {
            descriptor = descriptor.with_description(description);
        }
        if let Some(server) = self.mcp_server_name {
            descriptor = descriptor.with_source_server(server);
        }
        Some(descriptor)
    }
}

/// Reqwest-backed [`AgentRuntime`].
pub struct HttpAgentRuntime {
    client: reqwest::Client,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpAgentRuntime {
    /// Header carrying the runtime credential, when one is configured.
    const AUTH_HEADER: &'static str = "X-BARE-PASSWORD";

    pub fn new(config: &RuntimeConfig) -> ToolSyncResult<Self> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| ToolSyncError::Config(format!("invalid runtime base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolSyncError::Config(format!(
                "unsupported runtime base_url scheme: {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: config.auth_token.as_ref().map(|t| format!("password {t}")),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");
        if let Some(auth) = &self.auth_header {
            builder = builder.header(Self::AUTH_HEADER, auth);
        }
        builder
    }

    async fn get_tools(&self, path: &str) -> ToolSyncResult<Vec<RuntimeTool>> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(map_send_error("", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolSyncError::OperationFailed {
                tool_id: String::new(),
                status: Some(status.as_u16()),
                message: format!("GET {path}: {body}"),
            });
        }
        let tools = response.json::<Vec<RuntimeTool>>().await.map_err(|e| {
            ToolSyncError::MalformedResponse {
                context: format!("GET {path}: {e}"),
            }
        })?;
        Ok(tools)
    }

    /// Interpret a mutation response. A success status with an undecodable
    /// body is still a success; the raw body is kept for diagnostics only.
    async fn check_mutation(
        &self,
        response: reqwest::Response,
        tool_id: &str,
        tolerate_not_found: bool,
    ) -> ToolSyncResult<()> {
        let status = response.status();
        if status.is_success() {
            match response.json::<serde_json::Value>().await {
                Ok(_) => {}
                Err(e) => {
                    debug!(tool_id, error = %e, "Non-JSON success body from runtime");
                }
            }
            return Ok(());
        }

        if tolerate_not_found && status == StatusCode::NOT_FOUND {
            warn!(tool_id, "Tool not found or already detached (404)");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ToolSyncError::OperationFailed {
            tool_id: tool_id.to_string(),
            status: Some(status.as_u16()),
            message: body,
        })
    }
}

fn map_send_error(tool_id: &str, context: &str) -> impl FnOnce(reqwest::Error) -> ToolSyncError {
    let tool_id = tool_id.to_string();
    let context = context.to_string();
    move |e| {
        if e.is_timeout() {
            ToolSyncError::OperationTimeout {
                tool_id: if tool_id.is_empty() { context } else { tool_id },
            }
        } else {
            ToolSyncError::Http(e)
        }
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    async fn list_agent_tools(&self, agent_id: &str) -> ToolSyncResult<Vec<AttachedToolRef>> {
        let tools = self.get_tools(&format!("/agents/{agent_id}/tools")).await?;
        let mut refs = Vec::with_capacity(tools.len());
        for tool in tools {
            let Some(tool_id) = tool.resolve_id() else {
                warn!(agent_id, name = ?tool.name, "Attached tool without an id, skipping");
                continue;
            };
            refs.push(AttachedToolRef::new(
                agent_id,
                tool_id,
                tool.name.clone().unwrap_or_default(),
                tool.origin(),
            ));
        }
        Ok(refs)
    }

    async fn list_server_tools(&self, server: &str) -> ToolSyncResult<Vec<ToolDescriptor>> {
        let tools = self
            .get_tools(&format!("/tools/mcp/servers/{server}/tools"))
            .await?;
        Ok(tools.into_iter().filter_map(RuntimeTool::into_descriptor).collect())
    }

    async fn register_tool(&self, server: &str, name: &str) -> ToolSyncResult<ToolDescriptor> {
        let path = format!("/tools/mcp/servers/{server}/{name}");
        let response = self
            .request(reqwest::Method::POST, &path)
            .send()
            .await
            .map_err(map_send_error(name, &path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolSyncError::OperationFailed {
                tool_id: name.to_string(),
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let tool = response.json::<RuntimeTool>().await.map_err(|e| {
            ToolSyncError::MalformedResponse {
                context: format!("POST {path}: {e}"),
            }
        })?;
        tool.into_descriptor()
            .ok_or_else(|| ToolSyncError::MalformedResponse {
                context: format!("POST {path}: registration response carried no tool id"),
            })
    }

    async fn attach_tool(&self, agent_id: &str, tool_id: &str) -> ToolSyncResult<()> {
        let path = format!("/agents/{agent_id}/tools/attach/{tool_id}");
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .send()
            .await
            .map_err(map_send_error(tool_id, &path))?;
        self.check_mutation(response, tool_id, false).await
    }

    async fn detach_tool(&self, agent_id: &str, tool_id: &str) -> ToolSyncResult<()> {
        let path = format!("/agents/{agent_id}/tools/detach/{tool_id}");
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .send()
            .await
            .map_err(map_send_error(tool_id, &path))?;
        // 404 means the tool is already gone, which is the state we wanted.
        self.check_mutation(response, tool_id, true).await
    }

    async fn list_all_tools(&self) -> ToolSyncResult<Vec<ToolDescriptor>> {
        let tools = self.get_tools("/tools").await?;
        Ok(tools.into_iter().filter_map(RuntimeTool::into_descriptor).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_tool_id_normalization() {
        let tool: RuntimeTool =
            serde_json::from_str(r#"{"tool_id": "tool-1", "name": "web_search"}"#).unwrap();
        assert_eq!(tool.resolve_id().as_deref(), Some("tool-1"));

        let tool: RuntimeTool =
            serde_json::from_str(r#"{"id": "tool-2", "tool_id": "tool-1"}"#).unwrap();
        assert_eq!(tool.resolve_id().as_deref(), Some("tool-2"));

        let tool: RuntimeTool = serde_json::from_str(r#"{"name": "orphan"}"#).unwrap();
        assert!(tool.resolve_id().is_none());
    }

    #[test]
    fn test_origin_mapping() {
        let tool: RuntimeTool =
            serde_json::from_str(r#"{"id": "t", "tool_type": "external_mcp"}"#).unwrap();
        assert_eq!(tool.origin(), ToolOrigin::ExternalMcp);

        let tool: RuntimeTool =
            serde_json::from_str(r#"{"id": "t", "tool_type": "letta_core"}"#).unwrap();
        assert_eq!(tool.origin(), ToolOrigin::Static);

        let tool: RuntimeTool = serde_json::from_str(r#"{"id": "t"}"#).unwrap();
        assert_eq!(tool.origin(), ToolOrigin::Unknown);
    }

    #[test]
    fn test_base_url_validation() {
        let config = RuntimeConfig {
            base_url: "ftp://runtime.example.com".to_string(),
            auth_token: None,
            request_timeout_secs: 10,
        };
        assert!(HttpAgentRuntime::new(&config).is_err());

        let config = RuntimeConfig {
            base_url: "https://runtime.example.com/v1/".to_string(),
            auth_token: Some("secret".to_string()),
            request_timeout_secs: 10,
        };
        let runtime = HttpAgentRuntime::new(&config).unwrap();
        assert_eq!(runtime.base_url, "https://runtime.example.com/v1");
        assert_eq!(runtime.auth_header.as_deref(), Some("password secret"));
    }
}
