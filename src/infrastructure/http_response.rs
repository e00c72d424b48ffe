// HTTP response utilities for JSON bodies with optional Brotli encoding
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// Whether the client advertised Brotli in `Accept-Encoding`.
pub fn accepts_brotli(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').any(|enc| enc.trim().starts_with("br")))
        .unwrap_or(false)
}

/// Serialize to JSON and optionally compress with Brotli
pub async fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let json = serde_json::to_vec(value).map_err(|e| {
        tracing::error!("JSON serialization error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let (body_bytes, content_encoding) = if compress {
        let original = json.len();
        let mut encoder = BrotliEncoder::new(std::io::Cursor::new(json));
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.map_err(|e| {
            tracing::error!("Brotli compression error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::trace!("Compressed response: {} -> {} bytes", original, compressed.len());
        (compressed, Some("br"))
    } else {
        (json, None)
    };

    let mut response_builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, HeaderValue::from(body_bytes.len()));

    if let Some(encoding) = content_encoding {
        response_builder = response_builder.header(header::CONTENT_ENCODING, encoding);
    }

    response_builder.body(Body::from(body_bytes)).map_err(|e| {
        tracing::error!("Response build error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Same as [`json_response`], collapsing a build failure into its status code.
pub async fn respond<T: Serialize>(status: StatusCode, value: &T, compress: bool) -> Response<Body> {
    match json_response(status, value, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use serde_json::json;

    #[test]
    fn test_accepts_brotli() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_brotli(&headers));

        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        assert!(accepts_brotli(&headers));

        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        assert!(!accepts_brotli(&headers));
    }

    #[tokio::test]
    async fn test_plain_json_response() {
        let response = json_response(StatusCode::OK, &json!({"ok": true}), false)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "11");
    }

    #[tokio::test]
    async fn test_compressed_response_sets_encoding() {
        let response = json_response(StatusCode::BAD_REQUEST, &json!({"error": "bad"}), true)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "br");
    }
}
