//! MCP server exposing exit statistics, interview records and the assistant
//! as tools over stdio.

use crate::completion::{CompletionService, OpenAiCompletion};
use crate::config::{resolve_api_key, ExitIntelConfig};
use crate::insights::{open_session, InsightsSession};
use crate::interview::Sentiment;
use crate::ExitIntelError;
use rmcp::{
    ErrorData, ServerHandler, ServiceExt,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The session lock also serializes chat: one completion in flight per conversation.
type SessionHandle = Arc<Mutex<InsightsSession>>;

#[derive(Clone)]
pub struct InsightsServer {
    session: SessionHandle,
    service: Arc<dyn CompletionService>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

// --- Parameter types ---

#[derive(Deserialize, JsonSchema)]
pub struct AggregatesParams {
    /// Restrict statistics to one department (exact name). Omit for all.
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
pub struct ListInterviewsParams {
    /// Only list interviews from this department. Omit for all.
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
pub struct GetInterviewParams {
    /// "Name (employeeID)" as returned by list_interviews, or a bare employee ID.
    pub selector: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct AskParams {
    /// Question about the exit interview data, in plain English.
    pub question: String,
}

// --- Response types ---

#[derive(Serialize)]
struct InterviewListing {
    selector: String,
    employee_id: String,
    department: String,
    designation: String,
    overall_sentiment: Sentiment,
    key_themes: Vec<String>,
}

fn internal_err(e: &impl std::fmt::Display) -> ErrorData {
    ErrorData::new(ErrorCode::INTERNAL_ERROR, format!("internal: {e}"), None)
}

// --- Core tool logic (pub for testing) ---

impl InsightsServer {
    pub fn do_aggregates(&self, params: AggregatesParams) -> Result<CallToolResult, ErrorData> {
        let session = self.session.lock().map_err(|e| internal_err(&e))?;
        let stats = session.aggregates(params.department.as_deref());
        let json = serde_json::to_string(&stats).map_err(|e| internal_err(&e))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    pub fn do_list_interviews(
        &self,
        params: ListInterviewsParams,
    ) -> Result<CallToolResult, ErrorData> {
        let session = self.session.lock().map_err(|e| internal_err(&e))?;
        let listings: Vec<InterviewListing> = session
            .records()
            .iter()
            .filter(|r| {
                params
                    .department
                    .as_deref()
                    .is_none_or(|d| r.interview.department == d)
            })
            .map(|r| InterviewListing {
                selector: r.display_name(),
                employee_id: r.interview.employee_id.clone(),
                department: r.interview.department.clone(),
                designation: r.interview.designation.clone(),
                overall_sentiment: r.analysis.overall_sentiment,
                key_themes: r.analysis.key_themes.clone(),
            })
            .collect();
        let json = serde_json::to_string(&listings).map_err(|e| internal_err(&e))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    pub fn do_get_interview(&self, params: GetInterviewParams) -> Result<CallToolResult, ErrorData> {
        let session = self.session.lock().map_err(|e| internal_err(&e))?;
        let record = session.lookup(&params.selector).map_err(|e| match e {
            ExitIntelError::NotFound(_) | ExitIntelError::AmbiguousSelector { .. } => {
                ErrorData::new(ErrorCode::INVALID_PARAMS, e.to_string(), None)
            }
            other => internal_err(&other),
        })?;
        let json = serde_json::to_string(record).map_err(|e| internal_err(&e))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Chat failures come back as tool errors; the question stays in the
    /// history, so the client can simply ask again.
    pub fn do_ask(&self, params: AskParams) -> Result<CallToolResult, ErrorData> {
        let question = params.question.trim();
        if question.is_empty() {
            return Ok(CallToolResult::error(vec![Content::text("question must not be empty")]));
        }
        let mut session = self.session.lock().map_err(|e| internal_err(&e))?;
        let result = session.ask(self.service.as_ref(), question);
        match result {
            Ok(reply) => Ok(CallToolResult::success(vec![Content::text(reply)])),
            Err(e) => {
                log::warn!("ask failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

// --- MCP tool wrappers (delegate to do_* methods) ---

#[tool_router]
impl InsightsServer {
    pub fn new(session: SessionHandle, service: Arc<dyn CompletionService>) -> Self {
        Self {
            session,
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Aggregate exit statistics: total, negative sentiment rate, top theme, theme frequency, sentiment by department.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn aggregates(
        &self,
        p: Parameters<AggregatesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_aggregates(p.0)
    }

    #[tool(
        description = "List analyzed interviews with their selectors, sentiment and themes.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn list_interviews(
        &self,
        p: Parameters<ListInterviewsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_list_interviews(p.0)
    }

    #[tool(
        description = "Fetch one enriched interview record (transcript and analysis) by selector.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn get_interview(
        &self,
        p: Parameters<GetInterviewParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.do_get_interview(p.0)
    }

    #[tool(
        description = "Ask the HR analyst assistant a question. Answers are grounded in the analyzed interviews and the conversation continues across calls.",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn ask(&self, p: Parameters<AskParams>) -> Result<CallToolResult, ErrorData> {
        self.do_ask(p.0)
    }
}

#[tool_handler]
impl ServerHandler for InsightsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_instructions("exitintel: exit interview statistics, records, and a grounded HR analyst chat")
    }
}

pub fn handle_serve(config: &ExitIntelConfig, corpus_path: &Path) -> Result<(), ExitIntelError> {
    let api_key = resolve_api_key(&config.completion)?;
    let session = open_session(config, corpus_path)?;
    let service: Arc<dyn CompletionService> =
        Arc::new(OpenAiCompletion::new(&config.completion, api_key));
    let server = InsightsServer::new(Arc::new(Mutex::new(session)), service);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ExitIntelError::Io)?;

    rt.block_on(async {
        let provider = crate::metrics::init_meter_provider(&config.metrics);
        log::info!("serve starting");
        let result = async {
            let service = server
                .serve(stdio())
                .await
                .map_err(|e| ExitIntelError::Config(format!("mcp: {e}")))?;
            service
                .waiting()
                .await
                .map_err(|e| ExitIntelError::Config(format!("mcp: {e}")))?;
            Ok::<(), ExitIntelError>(())
        }
        .await;
        log::info!("serve stopped");
        crate::metrics::shutdown(provider);
        result
    })
}
