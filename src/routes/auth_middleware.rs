use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info};
use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // Resolve the caller the same way websocket handshakes are resolved
    let identity = match state.identities.resolve(req.headers(), None) {
        Some(identity) => identity,
        None => {
            debug!("Rejecting unauthenticated request to {}", req.uri().path());
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    info!("Request to {} by user {}", req.uri().path(), identity.username);

    // Make the identity available to downstream handlers
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
