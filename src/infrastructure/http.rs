use crate::{
    events::receiver::EventReceiver,
    infrastructure::{logging::InvocationContext, shutdown::ShutdownSignal},
    messaging::{domain::TracedChangeRequest, sender::ChangeRequestSender},
    processing::{change_request::ChangeRequest, processor::EventProcessor},
    shared::{
        constants::{aws, functions},
        error::DosIntegrationError,
        types::RequestId,
        utils::time::format_timestamp,
    },
};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Instrument};

/// Everything the HTTP handlers reach into
#[derive(Clone)]
pub struct HttpState {
    pub receiver: EventReceiver,
    pub processor: EventProcessor,
    pub sender: ChangeRequestSender,
    pub sender_queue: mpsc::Sender<TracedChangeRequest>,
    pub started_at: Instant,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/event-receiver", post(receive_change_event))
        .route("/event-sender", post(receive_change_request))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: ShutdownSignal,
) -> Result<(), DosIntegrationError> {
    let addr = listener.local_addr()?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

fn invocation_context(function_name: &str, headers: &HeaderMap) -> InvocationContext {
    let trace_header = headers
        .get(aws::TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    InvocationContext::new(function_name, RequestId::new(), trace_header)
}

fn message(status: StatusCode, message: impl Into<String>, reference: &RequestId) -> Response {
    (
        status,
        Json(json!({ "message": message.into(), "reference": reference })),
    )
        .into_response()
}

async fn receive_change_event(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = invocation_context(functions::EVENT_RECEIVER, &headers);
    let reference = ctx.aws_request_id.clone();
    let span = ctx.span();

    async move {
        match state.receiver.receive(&ctx, &body).await {
            Ok(_) => message(StatusCode::OK, "Change event received", &reference),
            Err(e @ (DosIntegrationError::Validation(_) | DosIntegrationError::MalformedEvent(_))) => {
                message(StatusCode::BAD_REQUEST, e.to_string(), &reference)
            }
            Err(e) => {
                error!("Change event could not be queued: {}", e);
                message(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Change event could not be processed",
                    &reference,
                )
            }
        }
    }
    .instrument(span)
    .await
}

async fn receive_change_request(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = invocation_context(functions::EVENT_SENDER, &headers);
    let reference = ctx.aws_request_id.clone();
    let span = ctx.span();

    async move {
        let request: ChangeRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed change request: {}", e);
                return message(StatusCode::BAD_REQUEST, format!("Malformed change request: {}", e), &reference);
            }
        };

        if let Err(e) = request.validate() {
            warn!("Invalid change request {}: {}", request.reference, e);
            return message(StatusCode::BAD_REQUEST, e, &reference);
        }

        let request_reference = request.reference.clone();
        let queued = TracedChangeRequest::new(request, ctx.x_ray_trace_id);
        match state.sender_queue.send(queued).await {
            Ok(()) => message(StatusCode::ACCEPTED, "Change request queued", &request_reference),
            Err(e) => {
                error!("Change request could not be queued: {}", e);
                message(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Event sender is not running",
                    &request_reference,
                )
            }
        }
    }
    .instrument(span)
    .await
}

async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    let receiver = state.receiver.get_stats().await;
    let processor = state.processor.get_stats().await;
    let sender = state.sender.get_stats().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "mock_mode": state.sender.settings().mock_mode,
        "receiver": {
            "events_received": receiver.events_received,
            "events_accepted": receiver.events_accepted,
            "events_rejected": receiver.events_rejected,
            "events_failed": receiver.events_failed,
        },
        "processor": {
            "events_processed": processor.events_processed,
            "events_failed": processor.events_failed,
            "change_requests_dispatched": processor.change_requests_dispatched,
            "change_requests_failed": processor.change_requests_failed,
        },
        "sender": {
            "change_requests_sent": sender.change_requests_sent,
            "change_requests_failed": sender.change_requests_failed,
            "last_status": sender.last_status,
            "last_activity": sender.last_activity.map(format_timestamp),
        },
    }))
}
