//! # HTTPルーティング
//!
//! - `POST /api/storage` — アクション振り分け
//! - `PUT /api/storage` — バイナリアップロード
//! - `GET /api/storage/resolve?identifier=...` — サーバー側の識別子解決

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use dynstore_types::UrlMetadata;
use serde::Deserialize;

use crate::api::StorageApi;
use crate::context::{log_rejection, Authenticated, AuthorizationType, AxumContextDriver};
use crate::error::GatewayError;

type ApiState = Arc<StorageApi<AxumContextDriver>>;

/// ルーターを構築する。
///
/// `Locals` 方式では全リクエストに [`Authenticated`] を付与する層を入れる。
/// セッション管理を持つアプリケーションに組み込む場合は、この層を独自の認証ミドルウェアに置き換える。
pub fn router(api: ApiState, auth: AuthorizationType) -> Router {
    let router = Router::new()
        .route("/api/storage", post(handle_post).put(handle_put))
        .route("/api/storage/resolve", get(handle_resolve))
        .with_state(api);

    match auth {
        AuthorizationType::Locals => router.layer(axum::middleware::from_fn(mark_authenticated)),
        AuthorizationType::Headers => router,
    }
}

async fn mark_authenticated(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(Authenticated);
    next.run(request).await
}

/// POST /api/storage
async fn handle_post(State(api): State<ApiState>, request: Request) -> Response {
    api.post(request).await
}

/// PUT /api/storage
async fn handle_put(State(api): State<ApiState>, request: Request) -> Response {
    api.put(request).await
}

#[derive(Debug, Deserialize)]
struct ResolveQuery {
    identifier: Option<String>,
}

/// GET /api/storage/resolve
async fn handle_resolve(
    State(api): State<ApiState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<UrlMetadata>, GatewayError> {
    let identifier = query
        .identifier
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| GatewayError::missing_field("identifier", "resolveUrl"));

    let result = match identifier {
        Ok(identifier) => api.resolve_url(&identifier).await,
        Err(e) => Err(e),
    };

    result.map(Json).inspect_err(log_rejection)
}
