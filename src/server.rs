//! HTTP and WebSocket transport.
//!
//! Editors call the plain HTTP endpoints; viewers keep a WebSocket open and
//! receive refresh and search messages for the document they display.

use crate::config::Config;
use crate::error::SyncError;
use crate::registry::{DeliveryError, Session, SessionId, SessionRegistry, ViewerMessage};
use crate::service::SyncService;
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tower_http::trace::TraceLayer;
use tracing::info;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Messages queued for one viewer before it counts as stalled and is dropped.
pub const OUTBOX_CAPACITY: usize = 64;

/// A connected viewer; outgoing messages are queued for its writer task.
#[derive(Debug)]
pub struct WsSession {
    id: SessionId,
    outbox: mpsc::Sender<String>,
}

impl WsSession {
    pub fn new(outbox: mpsc::Sender<String>) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            outbox,
        }
    }
}

impl Session for WsSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn deliver(&self, message: &ViewerMessage) -> Result<(), DeliveryError> {
        let text = serde_json::to_string(message)?;
        self.outbox.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged(self.id),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }
}

/// Request sent by a viewer over its WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewerRequest {
    /// Backward search at a clicked point of the viewer's document.
    Backward { page: u32, x: f64, y: f64 },
    /// The viewer switched to another document.
    Open { pdf: PathBuf },
}

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub service: SyncService,
    pub registry: SessionRegistry<WsSession>,
    /// Document used when a request does not name one
    pub document: Option<PathBuf>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            service: SyncService::new(config.cache_capacity),
            registry: SessionRegistry::new(),
            document: config.document.clone(),
        }
    }

    fn document_or_default(&self, requested: Option<PathBuf>) -> Result<PathBuf, ApiError> {
        requested
            .or_else(|| self.document.clone())
            .ok_or_else(|| ApiError::BadRequest("missing `pdf` parameter".to_string()))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
    sessions: usize,
    cached_indices: usize,
}

#[derive(Serialize)]
struct DeliveryResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    delivered: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct DocumentQuery {
    pdf: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ForwardQuery {
    line: u32,
    tex: PathBuf,
    pdf: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct BackwardQuery {
    page: u32,
    x: f64,
    y: f64,
    pdf: Option<PathBuf>,
}

/// Handler failure rendered as a JSON error body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Sync(SyncError),
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

/// HTTP status reported for a search failure.
pub fn status_for(error: &SyncError) -> StatusCode {
    match error {
        SyncError::MissingMappingFile { .. }
        | SyncError::NoMatchingInput { .. }
        | SyncError::NoMatch { .. }
        | SyncError::UnresolvableInputPath { .. } => StatusCode::NOT_FOUND,
        SyncError::CorruptMappingFile { .. } | SyncError::MalformedIndex { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SyncError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Sync(e) => {
                tracing::warn!("Search failed: {}", e);
                (status_for(&e), e.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        documents: state.registry.document_count(),
        sessions: state.registry.session_count(),
        cached_indices: state.service.cache().len().await,
    })
}

/// Tell viewers of `pdf` (all viewers when omitted) to reload.
async fn refresh(
    State(state): State<SharedState>,
    Query(query): Query<DocumentQuery>,
) -> impl IntoResponse {
    if let Some(pdf) = &query.pdf {
        state.service.cache().invalidate(pdf).await;
    }
    let delivered = state.registry.broadcast_refresh(query.pdf.as_deref());
    Json(DeliveryResponse::<()> {
        data: None,
        delivered,
    })
}

/// Forward search; the result is also pushed to the document's viewers.
async fn synctex(
    State(state): State<SharedState>,
    Query(query): Query<ForwardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf = state.document_or_default(query.pdf)?;
    let result = state.service.forward(query.line, &query.tex, &pdf).await?;
    let delivered = state.registry.broadcast_search(&result, &pdf);
    Ok(Json(DeliveryResponse {
        data: Some(result),
        delivered,
    }))
}

async fn backward(
    State(state): State<SharedState>,
    Query(query): Query<BackwardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf = state.document_or_default(query.pdf)?;
    let result = state
        .service
        .backward(query.page, query.x, query.y, &pdf)
        .await?;
    Ok(Json(result))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

/// Viewers connect here, optionally naming the document they display.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, ApiError> {
    let document = state.document_or_default(query.pdf)?;
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, state, document)))
}

async fn handle_websocket(socket: WebSocket, state: SharedState, mut document: PathBuf) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let session = Arc::new(WsSession::new(outbox));
    let id = session.id();

    state.registry.register(Arc::clone(&session), &document);
    info!(session = id, document = %document.display(), "Viewer connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = inbox.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_request(&state, &session, &mut document, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session = id, "WebSocket receive failed: {}", e);
                break;
            }
        }
    }

    state.registry.unregister(id);
    writer.abort();
    info!(session = id, "Viewer disconnected");
}

async fn handle_request(state: &AppState, session: &Arc<WsSession>, document: &mut PathBuf, text: &str) {
    let reply = match serde_json::from_str::<ViewerRequest>(text) {
        Ok(ViewerRequest::Backward { page, x, y }) => {
            match state.service.backward(page, x, y, document.as_path()).await {
                Ok(data) => ViewerMessage::Backward { data },
                Err(e) => ViewerMessage::Error {
                    message: e.to_string(),
                },
            }
        }
        Ok(ViewerRequest::Open { pdf }) => {
            state.registry.register(Arc::clone(session), &pdf);
            info!(session = session.id(), document = %pdf.display(), "Viewer switched document");
            *document = pdf;
            return;
        }
        Err(e) => {
            tracing::debug!(session = session.id(), "Ignoring malformed request: {}", e);
            ViewerMessage::Error {
                message: format!("malformed request: {e}"),
            }
        }
    };

    if let Err(e) = session.deliver(&reply) {
        tracing::debug!(session = session.id(), "Reply not delivered: {}", e);
    }
}

/// Build the axum router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/refresh", get(refresh))
        .route("/synctex", get(synctex))
        .route("/backward", get(backward))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until interrupted.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr = config.address();
    let state = Arc::new(AppState::new(&config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local = listener.local_addr().context("Failed to read bound address")?;
    log_endpoints(&local.to_string(), config.document());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Server stopped");
    Ok(())
}

fn log_endpoints(addr: &str, document: Option<&Path>) {
    let pdf = document.map_or_else(|| "<pdf>".to_string(), |d| d.display().to_string());
    info!(%addr, "Listening");
    info!("Viewer:   ws://{}/ws?pdf={}", addr, pdf);
    info!("Refresh:  http://{}/refresh?pdf={}", addr, pdf);
    info!("SyncTeX:  http://{}/synctex?pdf={}&line=<number>&tex=<path>", addr, pdf);
    info!("Backward: http://{}/backward?pdf={}&page=<number>&x=<pt>&y=<pt>", addr, pdf);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ForwardResult;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[test]
    fn test_session_delivers_json() {
        let (outbox, mut inbox) = mpsc::channel(OUTBOX_CAPACITY);
        let session = WsSession::new(outbox);

        session
            .deliver(&ViewerMessage::Synctex {
                data: ForwardResult {
                    page: 3,
                    x: 1.5,
                    y: 2.0,
                },
            })
            .unwrap();
        let text = inbox.try_recv().unwrap();
        check!(text == r#"{"type":"synctex","data":{"page":3,"x":1.5,"y":2.0}}"#);
    }

    #[test]
    fn test_closed_session_fails_delivery() {
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        let session = WsSession::new(outbox);
        drop(inbox);

        let_assert!(Err(DeliveryError::Closed(id)) = session.deliver(&ViewerMessage::Refresh));
        check!(id == session.id());
    }

    #[test]
    fn test_session_ids_are_unique() {
        let (outbox, _inbox) = mpsc::channel(1);
        let a = WsSession::new(outbox.clone());
        let b = WsSession::new(outbox);
        check!(a.id() != b.id());
    }

    #[test]
    fn test_full_outbox_fails_delivery() {
        let (outbox, _inbox) = mpsc::channel(1);
        let session = WsSession::new(outbox);

        session.deliver(&ViewerMessage::Refresh).unwrap();
        let_assert!(Err(DeliveryError::Backlogged(id)) = session.deliver(&ViewerMessage::Refresh));
        check!(id == session.id());
    }

    #[test]
    fn test_stalled_viewer_is_dropped_from_registry() {
        let (outbox, mut inbox) = mpsc::channel(2);
        let registry = SessionRegistry::new();
        registry.register(Arc::new(WsSession::new(outbox)), Path::new("/work/doc.pdf"));

        check!(registry.broadcast_refresh(None) == 1);
        check!(registry.broadcast_refresh(None) == 1);
        check!(registry.broadcast_refresh(None) == 0);
        check!(registry.session_count() == 0);
        check!(inbox.try_recv().is_ok());
    }

    #[rstest]
    #[case(r#"{"type":"backward","page":2,"x":10.5,"y":-3}"#, ViewerRequest::Backward { page: 2, x: 10.5, y: -3.0 })]
    #[case(r#"{"type":"open","pdf":"/work/doc.pdf"}"#, ViewerRequest::Open { pdf: PathBuf::from("/work/doc.pdf") })]
    fn test_viewer_requests(#[case] text: &str, #[case] expected: ViewerRequest) {
        check!(serde_json::from_str::<ViewerRequest>(text).unwrap() == expected);
    }

    #[rstest]
    #[case(SyncError::NoMatch { page: 1 }, StatusCode::NOT_FOUND)]
    #[case(SyncError::UnresolvableInputPath { input: "a.tex".into() }, StatusCode::NOT_FOUND)]
    #[case(SyncError::MalformedIndex { input: "a.tex".into(), reason: String::new() }, StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(SyncError::Task("panicked".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_for(#[case] error: SyncError, #[case] status: StatusCode) {
        check!(status_for(&error) == status);
    }
}
