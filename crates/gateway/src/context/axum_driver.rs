//! # axum コンテキストドライバ

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{ApiReply, AuthorizationType, ContextDriver, ParsedContext};
use crate::error::GatewayError;

/// 前段の認証ミドルウェアが認証済みリクエストに付与するマーカー。
/// `AuthorizationType::Locals` はこのマーカーの有無で判定する。
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

/// axumのリクエスト/レスポンスを扱うドライバ。
pub struct AxumContextDriver {
    /// `Headers` 方式で比較するBearerトークン
    bearer_token: Option<Arc<str>>,
    /// ボディ読み取りの上限（バイト）
    max_body_bytes: usize,
}

impl AxumContextDriver {
    pub fn new(bearer_token: Option<String>, max_body_bytes: usize) -> Self {
        Self {
            bearer_token: bearer_token.map(Arc::from),
            max_body_bytes,
        }
    }
}

#[async_trait::async_trait]
impl ContextDriver for AxumContextDriver {
    type Request = Request;
    type Response = Response;

    async fn parse_context(&self, request: Request) -> Result<ParsedContext, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| GatewayError::BadRequest(format!("Failed to read request body: {e}")))?;

        let has_session = parts.extensions.get::<Authenticated>().is_some();
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned);
        let expected = self.bearer_token.clone();

        Ok(ParsedContext::new(parts.headers, body, move |auth| match auth {
            AuthorizationType::Headers => match (&expected, &bearer) {
                (Some(expected), Some(bearer)) => expected.as_ref() == bearer.as_str(),
                _ => false,
            },
            AuthorizationType::Locals => has_session,
        }))
    }

    fn build_response(&self, reply: ApiReply) -> Response {
        (reply.status, Json(reply.data)).into_response()
    }
}
