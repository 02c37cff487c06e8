//! Tower layer shaping JSON responses with a fieldset
//!
//! The layer reads the selection from the request query before the handler
//! runs, so invalid selectors are rejected with `400` without doing any work.
//! Successful JSON bodies are then shaped; status and headers pass through.
//! Bodies larger than the layer's limit are refused with `500`.

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::core::error::{FieldsetError, MarshalError};
use crate::core::schema::Fieldset;
use crate::core::selection::Selection;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer applying a fieldset to the responses of the wrapped service
///
/// # Example
///
/// ```rust,ignore
/// let registry = FieldsetRegistry::default();
/// let app = Router::new().route(
///     "/topics",
///     get(list_topics).layer(registry.layer::<TopicFields>()?),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MarshalLayer {
    fieldset: Arc<Fieldset>,
    body_limit: usize,
}

impl MarshalLayer {
    pub fn new(fieldset: Arc<Fieldset>) -> Self {
        Self {
            fieldset,
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Cap the number of body bytes buffered for shaping
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn fieldset(&self) -> &Arc<Fieldset> {
        &self.fieldset
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

impl<S> Layer<S> for MarshalLayer {
    type Service = MarshalService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MarshalService {
            inner,
            fieldset: self.fieldset.clone(),
            body_limit: self.body_limit,
        }
    }
}

/// Service produced by [`MarshalLayer`]
#[derive(Debug, Clone)]
pub struct MarshalService<S> {
    inner: S,
    fieldset: Arc<Fieldset>,
    body_limit: usize,
}

impl<S> Service<Request> for MarshalService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let selection = match self.fieldset.parse_uri(request.uri()) {
            Ok(selection) => selection,
            Err(e) => {
                let response = FieldsetError::from(e).into_response();
                return Box::pin(async move { Ok(response) });
            }
        };

        // The ready service is the one in `self`; keep a fresh clone in its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let fieldset = self.fieldset.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let response = inner.call(request).await?;
            Ok(shape_response(&fieldset, &selection, body_limit, response)
                .await
                .unwrap_or_else(IntoResponse::into_response))
        })
    }
}

async fn shape_response(
    fieldset: &Fieldset,
    selection: &Selection,
    body_limit: usize,
    response: Response,
) -> Result<Response, FieldsetError> {
    if !response.status().is_success() {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, body_limit)
        .await
        .map_err(|e| MarshalError::Body {
            message: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Ok(Response::from_parts(parts, Body::from(bytes)));
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| MarshalError::Body {
            message: e.to_string(),
        })?;
    let shaped = fieldset.shape(&payload, selection)?;
    let body = serde_json::to_vec(&shaped).map_err(|e| FieldsetError::Internal(e.to_string()))?;

    tracing::debug!(
        fieldset = %fieldset.name(),
        status = %parts.status,
        bytes = body.len(),
        "shaped response"
    );

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(Response::from_parts(parts, Body::from(body)))
}
