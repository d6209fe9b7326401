//! Transport layer for stdio and HTTP.
//!
//! The HTTP server carries streamable MCP at `/mcp` and a small REST
//! surface: `POST /research` (JSON, or server-sent events when `stream` is
//! set), `POST /chat` for the research-only assistant, and `GET /status`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use super::params::{ChatBody, ResearchRequest};
use super::server::MarsMcpServer;
use crate::agent::chat::{CHAT_SYSTEM_PROMPT, is_refusal};
use crate::agent::message::{assistant_message, user_message};
use crate::agent::{FallbackClient, ProgressEvent, SessionStore, Workflow, detect_research_intent};

/// Starts the MCP server with stdio transport.
///
/// The server reads JSON-RPC messages from stdin and writes responses to stdout.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a runtime error.
pub async fn serve_stdio(server: MarsMcpServer) -> anyhow::Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Shared state for the REST routes.
#[derive(Clone)]
struct AppState {
    workflow: Arc<Workflow>,
    client: Arc<FallbackClient>,
    sessions: SessionStore,
}

/// Builds the REST routes over the server's workflow and client and the
/// given chat session store.
///
/// `/mcp` is nested separately by [`serve_http`].
pub fn rest_router(server: &MarsMcpServer, sessions: SessionStore) -> Router {
    let state = AppState {
        workflow: server.workflow(),
        client: server.client(),
        sessions,
    };
    Router::new()
        .route("/research", post(research_handler))
        .route("/chat", post(chat_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Runs a workflow in the background and streams its events as SSE.
///
/// When `session` is set, the final report is recorded in that session
/// once the run ends.
fn stream_workflow(state: &AppState, topic: String, session: Option<Uuid>) -> Response {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let workflow = Arc::clone(&state.workflow);
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let result = workflow.run_with_progress(&topic, &tx).await;
        if let Some(id) = session {
            sessions.append(id, assistant_message(result.final_report()));
        }
    });

    let events = UnboundedReceiverStream::new(rx).map(|event: ProgressEvent| {
        let json = serde_json::to_string(&event).unwrap_or_else(|_| String::from("{}"));
        Ok::<_, Infallible>(Event::default().event(event.name()).data(json))
    });
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// `POST /research`: runs a workflow and returns its result.
///
/// With `stream: true` the response is an SSE stream of `progress` and
/// `error` events ending in a single `result` event.
async fn research_handler(
    State(state): State<AppState>,
    Json(req): Json<ResearchRequest>,
) -> Response {
    let topic = req.topic.trim().to_string();
    if topic.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "topic must not be empty");
    }
    info!(topic = %topic, stream = req.stream, "http research request");

    if req.stream {
        return stream_workflow(&state, topic, None);
    }
    let result = state.workflow.run(&topic).await;
    Json(result).into_response()
}

/// `POST /chat`: one turn with the research-only assistant.
///
/// Research requests run the workflow (streamed when asked) and record the
/// report as the reply. Anything else gets a direct model reply, flagged
/// when it is a refusal.
async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatBody>) -> Response {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    let session_id = state.sessions.ensure(req.session_id);
    state.sessions.append(session_id, user_message(&message));

    let research = detect_research_intent(&state.client, &message).await;
    info!(%session_id, research, stream = req.stream, "http chat request");

    if research {
        if req.stream {
            return stream_workflow(&state, message, Some(session_id));
        }
        let result = state.workflow.run(&message).await;
        let reply = result.final_report().to_string();
        state
            .sessions
            .append(session_id, assistant_message(&reply));
        return Json(serde_json::json!({
            "session_id": session_id,
            "reply": reply,
            "result": result,
        }))
        .into_response();
    }

    match state
        .client
        .generate(CHAT_SYSTEM_PROMPT, &message, req.temperature)
        .await
    {
        Ok(reply) => {
            let refusal = is_refusal(&reply);
            state
                .sessions
                .append(session_id, assistant_message(&reply));
            Json(serde_json::json!({
                "session_id": session_id,
                "reply": reply,
                "refusal": refusal,
            }))
            .into_response()
        }
        Err(e) => {
            warn!(%session_id, error = %e, "chat reply failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// `GET /status`: endpoint health in priority order, budgets, and the
/// number of open chat sessions.
async fn status_handler(State(state): State<AppState>) -> Response {
    let budgets = state.workflow.budgets();
    Json(serde_json::json!({
        "endpoints": state.client.status(),
        "sessions": state.sessions.len(),
        "budgets": {
            "max_iterations": budgets.max_iterations,
            "max_research_attempts": budgets.max_research_attempts,
            "max_writing_attempts": budgets.max_writing_attempts,
        },
    }))
    .into_response()
}

/// Starts the HTTP server.
///
/// Listens on the given host and port; MCP clients connect at `/mcp`.
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters a runtime error.
pub async fn serve_http(server: MarsMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    };

    let ct = tokio_util::sync::CancellationToken::new();

    let rest = rest_router(&server, SessionStore::new());
    let service = StreamableHttpService::new(
        move || Ok::<_, std::io::Error>(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let router = rest.nest_service("/mcp", service);
    let addr = format!("{host}:{port}");
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;

    // stdout stays clean for piping
    #[allow(clippy::print_stderr)]
    {
        eprintln!("MARS-RS listening on http://{addr} (MCP at /mcp)");
    }

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::client_replying;
    use crate::agent::{PromptSet, Role, StageSet, WorkflowConfig};
    use crate::sources::SourceRegistry;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(reply: &str, sessions: &SessionStore) -> Router {
        let client = client_replying(reply);
        let stages = StageSet::standard(
            Arc::clone(&client),
            &PromptSet::defaults(),
            SourceRegistry::new(),
            false,
        );
        let workflow = Workflow::new(stages, WorkflowConfig::default());
        let server = MarsMcpServer::from_parts(Arc::new(workflow), client);
        rest_router(&server, sessions.clone())
    }

    fn post(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| unreachable!())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap_or_default()
    }

    fn event_names(sse: &str) -> Vec<String> {
        sse.lines()
            .filter_map(|line| line.strip_prefix("event:"))
            .map(|name| name.trim().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_research_rejects_empty_topic() {
        let response = app("x", &SessionStore::new())
            .oneshot(post("/research", &serde_json::json!({"topic": "  "})))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "topic must not be empty");
    }

    #[tokio::test]
    async fn test_research_returns_result_json() {
        let response = app("not json", &SessionStore::new())
            .oneshot(post("/research", &serde_json::json!({"topic": "raft consensus"})))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["topic"], "raft consensus");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["terminal"], true);
    }

    #[tokio::test]
    async fn test_research_stream_ends_with_single_result() {
        let response = app("not json", &SessionStore::new())
            .oneshot(post(
                "/research",
                &serde_json::json!({"topic": "raft consensus", "stream": true}),
            ))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let names = event_names(&body_text(response).await);
        assert_eq!(names.first().map(String::as_str), Some("progress"));
        assert_eq!(names.last().map(String::as_str), Some("result"));
        assert_eq!(names.iter().filter(|n| *n == "result").count(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_endpoints_and_budgets() {
        let request = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .unwrap_or_else(|_| unreachable!());
        let response = app("x", &SessionStore::new())
            .oneshot(request)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["endpoints"][0]["name"], "mock-model");
        assert_eq!(json["budgets"]["max_iterations"], 5);
        assert_eq!(json["budgets"]["max_writing_attempts"], 2);
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let sessions = SessionStore::new();
        let response = app("x", &sessions)
            .oneshot(post("/chat", &serde_json::json!({"message": ""})))
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_chat_refusal_is_flagged() {
        let sessions = SessionStore::new();
        let response = app("I can only help with research-related requests.", &sessions)
            .oneshot(post("/chat", &serde_json::json!({"message": "tell me a joke"})))
            .await
            .unwrap_or_else(|_| unreachable!());
        let json = body_json(response).await;
        assert_eq!(json["refusal"], true);
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn test_chat_session_keeps_history() {
        let sessions = SessionStore::new();
        let app = app("Raft elects one leader per term.", &sessions);

        let first = body_json(
            app.clone()
                .oneshot(post("/chat", &serde_json::json!({"message": "how does raft work?"})))
                .await
                .unwrap_or_else(|_| unreachable!()),
        )
        .await;
        assert_eq!(first["refusal"], false);
        assert_eq!(first["reply"], "Raft elects one leader per term.");
        let id = first["session_id"].as_str().unwrap_or_default().to_string();

        let second = body_json(
            app.oneshot(post(
                "/chat",
                &serde_json::json!({"session_id": id, "message": "and paxos?"}),
            ))
            .await
            .unwrap_or_else(|_| unreachable!()),
        )
        .await;
        assert_eq!(second["session_id"], id.as_str());

        let uuid = Uuid::parse_str(&id).unwrap_or_else(|_| unreachable!());
        let roles: Vec<Role> = sessions.history(uuid).iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_research_runs_workflow() {
        let sessions = SessionStore::new();
        let json = body_json(
            app("not json", &sessions)
                .oneshot(post(
                    "/chat",
                    &serde_json::json!({"message": "find papers on raft consensus"}),
                ))
                .await
                .unwrap_or_else(|_| unreachable!()),
        )
        .await;
        assert_eq!(json["result"]["status"], "completed");
        assert_eq!(json["reply"], json["result"]["final_report"]);
    }

    #[tokio::test]
    async fn test_chat_research_stream_records_report() {
        let sessions = SessionStore::new();
        let response = app("not json", &sessions)
            .oneshot(post(
                "/chat",
                &serde_json::json!({"message": "survey gossip protocols", "stream": true}),
            ))
            .await
            .unwrap_or_else(|_| unreachable!());
        let names = event_names(&body_text(response).await);
        assert_eq!(names.last().map(String::as_str), Some("result"));

        let ids = sessions.session_ids();
        assert_eq!(ids.len(), 1);
        let history = sessions.history(ids[0]);
        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User, Role::Assistant]);
        assert!(!history[2].content.trim().is_empty());
    }
}
