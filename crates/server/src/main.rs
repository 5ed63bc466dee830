use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use server_api::{
    auth::{mint_custom_token, AuthConfig},
    create_item, delete_item, ensure_principal, list_items, sign_in_anonymously,
    sign_in_with_token, ApiContext,
};
use shared::{
    domain::{Item, ItemDocument, PrincipalId},
    error::{ApiError, ErrorCode},
    protocol::{
        AuthTokenRequest, ItemSnapshot, PrincipalQuery, ServerEvent, SessionResponse,
        SNAPSHOT_REVISION_HEADER,
    },
};
use storage::Storage;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info, warn};

mod config;

use config::{load_settings, prepare_database_url};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    snapshots: broadcast::Sender<ItemSnapshot>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Option<ServerCommand>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ServerCommand {
    /// Print a custom sign-in token for PRINCIPAL and exit.
    MintToken { principal: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = load_settings();
    let auth = AuthConfig {
        token_secret: settings.auth_secret,
        token_ttl_seconds: settings.auth_token_ttl_seconds,
    };

    if let Some(ServerCommand::MintToken { principal }) = args.command {
        let token = mint_custom_token(&auth, &PrincipalId(principal.clone()))
            .context("failed to mint custom token")?;
        info!(principal_id = %principal, ttl_seconds = auth.token_ttl_seconds, "custom token minted");
        println!("{token}");
        return Ok(());
    }

    let database_url = prepare_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext { storage, auth };
    let (snapshots, _) = broadcast::channel(256);

    let app = build_router(Arc::new(AppState { api, snapshots }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "document store listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/anonymous", post(http_sign_in_anonymously))
        .route("/auth/token", post(http_sign_in_with_token))
        .route(
            "/namespaces/:namespace/items",
            get(http_list_items).post(http_create_item),
        )
        .route(
            "/namespaces/:namespace/items/:item_id",
            axum::routing::delete(http_delete_item),
        )
        .route(
            "/namespaces/:namespace/items/:item_id/toggle",
            post(http_toggle_item),
        )
        .route("/namespaces/:namespace/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match state.api.storage.health_check().await {
        Ok(()) => "ok".into_response(),
        Err(err) => {
            error!(%err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
        }
    }
}

fn status_for(err: &ApiError) -> StatusCode {
    match err.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(&err), Json(err))
}

type RevisionHeader = [(&'static str, String); 1];

/// Fans a committed snapshot out to every live channel and returns the
/// header announcing its revision to the writer. Having no live subscribers
/// is not an error.
fn publish(state: &AppState, snapshot: ItemSnapshot) -> RevisionHeader {
    let header = [(SNAPSHOT_REVISION_HEADER, snapshot.revision.to_string())];
    debug!(
        namespace = %snapshot.namespace,
        revision = snapshot.revision,
        items = snapshot.items.len(),
        "publishing snapshot"
    );
    let _ = state.snapshots.send(snapshot);
    header
}

async fn http_sign_in_anonymously(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionResponse>> {
    let principal_id = sign_in_anonymously(&state.api).await.map_err(reject)?;
    Ok(Json(SessionResponse { principal_id }))
}

async fn http_sign_in_with_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthTokenRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let principal_id = sign_in_with_token(&state.api, &req.token)
        .await
        .map_err(reject)?;
    Ok(Json(SessionResponse { principal_id }))
}

async fn http_list_items(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Query(q): Query<PrincipalQuery>,
) -> ApiResult<Json<ItemSnapshot>> {
    let snapshot = list_items(&state.api, &PrincipalId(q.principal_id), &namespace)
        .await
        .map_err(reject)?;
    Ok(Json(snapshot))
}

async fn http_create_item(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Query(q): Query<PrincipalQuery>,
    Json(document): Json<ItemDocument>,
) -> ApiResult<(StatusCode, RevisionHeader, Json<Item>)> {
    let committed = create_item(&state.api, &PrincipalId(q.principal_id), &namespace, document)
        .await
        .map_err(reject)?;
    let revision = publish(&state, committed.snapshot);
    Ok((StatusCode::CREATED, revision, Json(committed.value)))
}

async fn http_toggle_item(
    State(state): State<Arc<AppState>>,
    Path((namespace, item_id)): Path<(String, String)>,
    Query(q): Query<PrincipalQuery>,
) -> ApiResult<(StatusCode, RevisionHeader)> {
    let committed = server_api::toggle_item(
        &state.api,
        &PrincipalId(q.principal_id),
        &namespace,
        &item_id,
    )
    .await
    .map_err(reject)?;
    let revision = publish(&state, committed.snapshot);
    Ok((StatusCode::NO_CONTENT, revision))
}

async fn http_delete_item(
    State(state): State<Arc<AppState>>,
    Path((namespace, item_id)): Path<(String, String)>,
    Query(q): Query<PrincipalQuery>,
) -> ApiResult<(StatusCode, RevisionHeader)> {
    let committed = delete_item(&state.api, &PrincipalId(q.principal_id), &namespace, &item_id)
        .await
        .map_err(reject)?;
    let revision = publish(&state, committed.snapshot);
    Ok((StatusCode::NO_CONTENT, revision))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Query(q): Query<PrincipalQuery>,
) -> Response {
    let principal = PrincipalId(q.principal_id);
    if let Err(err) = ensure_principal(&state.api, &principal).await {
        return reject(err).into_response();
    }
    ws.on_upgrade(move |socket| ws_connection(state, socket, namespace, principal))
}

async fn ws_connection(
    state: Arc<AppState>,
    socket: WebSocket,
    namespace: String,
    principal: PrincipalId,
) {
    use axum::extract::ws::Message;
    use futures::StreamExt;

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before reading the initial snapshot so no commit falls in between.
    let mut snapshots_rx = state.snapshots.subscribe();
    info!(%namespace, principal_id = %principal, "live channel opened");

    let initial = match list_items(&state.api, &principal, &namespace).await {
        Ok(snapshot) => ServerEvent::Snapshot(snapshot),
        Err(err) => ServerEvent::Error(err),
    };
    let initial_failed = matches!(initial, ServerEvent::Error(_));
    if !send_event(&mut sender, &initial).await || initial_failed {
        return;
    }

    let send_state = Arc::clone(&state);
    let send_namespace = namespace.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = match snapshots_rx.recv().await {
                Ok(snapshot) if snapshot.namespace == send_namespace => {
                    ServerEvent::Snapshot(snapshot)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(namespace = %send_namespace, skipped, "live channel lagged; resending current snapshot");
                    match send_state.api.storage.snapshot(&send_namespace).await {
                        Ok(snapshot) => ServerEvent::Snapshot(snapshot),
                        Err(err) => ServerEvent::Error(ApiError::new(
                            ErrorCode::Internal,
                            err.to_string(),
                        )),
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !send_event(&mut sender, &event).await {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }

    send_task.abort();
    info!(%namespace, principal_id = %principal, "live channel closed");
}

/// Returns `false` once the peer can no longer be written to.
async fn send_event<S>(sender: &mut S, event: &ServerEvent) -> bool
where
    S: futures::Sink<axum::extract::ws::Message> + Unpin,
{
    use futures::SinkExt;

    let text = match serde_json::to_string(event) {
        Ok(v) => v,
        Err(err) => {
            error!(%err, "failed to encode server event");
            return true;
        }
    };
    sender
        .send(axum::extract::ws::Message::Text(text))
        .await
        .is_ok()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
