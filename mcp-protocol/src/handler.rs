// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rmcp` server handler exposing the two-tool MCP surface.
//!
//! A deliberate narrowing to exactly two tools, `cleo_query` and
//! `cleo_mutate`, each taking a
//! `{domain, operation, params}` triple that [`dispatch::resolve`] turns
//! into a [`cleo_core::ops::Operation`] before it reaches [`cleo_core::ops::execute`].

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use cleo_core::{accessor::DataAccessor, config::Config, ops};
use rmcp::{
    handler::server::tool::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    ErrorData as McpError,
    ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::{dispatch, envelope};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CleoToolRequest {
    /// One of `task`, `focus`, `session`, `graph`, `system`,
    /// `orchestrator`, `metrics`.
    pub domain: String,
    pub operation: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Clone)]
pub struct CleoMcpServer {
    accessor: Arc<dyn DataAccessor>,
    config: Config,
    actor: String,
    tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

impl CleoMcpServer {
    pub fn new(accessor: Arc<dyn DataAccessor>, config: Config, actor: impl Into<String>) -> Self {
        Self { accessor, config, actor: actor.into(), tool_router: Self::tool_router() }
    }

    async fn handle(&self, request: CleoToolRequest, cmd_prefix: &str) -> Result<CallToolResult, McpError> {
        let cmd = format!("{cmd_prefix}.{}.{}", request.domain, request.operation);
        let now = Utc::now();
        let meta = || envelope::EnvelopeMeta { cmd: cmd.clone(), ts: now, version: env!("CARGO_PKG_VERSION") };

        let envelope = match dispatch::resolve(&request.domain, &request.operation, &request.params) {
            Ok(op) => {
                let ctx = ops::OpContext {
                    accessor: self.accessor.as_ref(),
                    config: &self.config,
                    now,
                    actor: self.actor.clone(),
                };
                match ops::execute(op, &ctx).await {
                    Ok(data) => envelope::success(meta(), data),
                    Err(err) => envelope::failure(meta(), &err, None),
                }
            }
            Err(err) => envelope::failure(meta(), &err, None),
        };

        let text = serde_json::to_string(&envelope)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_router]
impl CleoMcpServer {
    #[tool(description = "Read-only CLEO operations: task.show/list/find, graph.analyze/deps/waves/next, session.status, focus.show, system.validate/doctor, metrics.summary.")]
    async fn cleo_query(&self, Parameters(request): Parameters<CleoToolRequest>) -> Result<CallToolResult, McpError> {
        self.handle(request, "query").await
    }

    #[tool(description = "State-changing CLEO operations: task.add/update/complete/cancel/delete/..., focus.set/clear, session.start/end/suspend/resume, system.migrate, orchestrator.ready/next/spawn.")]
    async fn cleo_mutate(&self, Parameters(request): Parameters<CleoToolRequest>) -> Result<CallToolResult, McpError> {
        self.handle(request, "mutate").await
    }
}

#[tool_handler]
impl ServerHandler for CleoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "CLEO task management for humans and coding agents. Call cleo_query for reads \
                 and cleo_mutate for writes, both with {domain, operation, params}."
                    .into(),
            ),
            ..Default::default()
        }
    }
}
