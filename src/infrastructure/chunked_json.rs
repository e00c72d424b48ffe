// Chunked JSON streaming of dashboard events
use crate::domain::dashboard::{Dashboard, DashboardEvent};
use crate::infrastructure::json_mapper::event_to_json;
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast::{self, error::RecvError};

/// Chunked response where every chunk is one length-prefixed event.
pub fn chunked_json_stream<S>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = DashboardEvent> + Send + 'static,
{
    let byte_stream = stream.then(move |event| async move { serialize_chunk(event, compress).await });

    // Chunks are compressed individually, so no Content-Encoding on the response.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Encodes one event: 4-byte big-endian length, then the JSON (optionally Brotli) payload.
pub async fn serialize_chunk(event: DashboardEvent, compress: bool) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(&event_to_json(event)).map_err(std::io::Error::other)?;

    let payload = if compress {
        let mut encoder = BrotliEncoder::new(std::io::Cursor::new(json));
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await?;
        compressed
    } else {
        json
    };

    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(payload.len() as u32);
    chunk.put_slice(&payload);
    Ok(chunk.freeze())
}

/// Event stream for one client: the current frame first, then whatever the bus publishes.
pub fn event_stream(
    current: Dashboard,
    mut rx: broadcast::Receiver<DashboardEvent>,
) -> impl Stream<Item = DashboardEvent> + Send + 'static {
    async_stream::stream! {
        yield DashboardEvent::Frame(current);
        loop {
            match rx.recv().await {
                Ok(event) => yield event,
                Err(RecvError::Lagged(skipped)) => {
                    // The next frame carries the full state again.
                    tracing::warn!("Dashboard stream client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

pub fn stream_from_receiver(
    current: Dashboard,
    rx: broadcast::Receiver<DashboardEvent>,
    compress: bool,
) -> impl IntoResponse {
    match chunked_json_stream(event_stream(current, rx), compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::ViewMode;
    use futures::pin_mut;

    fn frame(label: &str) -> Dashboard {
        Dashboard {
            mode: ViewMode::Live,
            labels: vec![label.to_string()],
            charts: Vec::new(),
            tiles: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_chunk_is_length_prefixed_json() {
        let chunk = serialize_chunk(DashboardEvent::Notice("backend down".to_string()), false)
            .await
            .unwrap();

        let length = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        assert_eq!(length, chunk.len() - 4);
        let value: serde_json::Value = serde_json::from_slice(&chunk[4..]).unwrap();
        assert_eq!(value["type"], "notice");
        assert_eq!(value["message"], "backend down");
    }

    #[tokio::test]
    async fn test_compressed_chunk_length_matches_payload() {
        let chunk = serialize_chunk(DashboardEvent::Frame(frame("08:00:00")), true)
            .await
            .unwrap();

        let length = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        assert_eq!(length, chunk.len() - 4);
        assert!(length > 0);
    }

    #[tokio::test]
    async fn test_stream_starts_with_current_frame() {
        let (tx, rx) = broadcast::channel(4);
        let stream = event_stream(frame("08:00:00"), rx);
        pin_mut!(stream);

        tx.send(DashboardEvent::Frame(frame("08:00:30"))).unwrap();
        drop(tx);

        assert_eq!(stream.next().await, Some(DashboardEvent::Frame(frame("08:00:00"))));
        assert_eq!(stream.next().await, Some(DashboardEvent::Frame(frame("08:00:30"))));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_lagged_client_keeps_streaming() {
        let (tx, rx) = broadcast::channel(1);
        let stream = event_stream(frame("08:00:00"), rx);
        pin_mut!(stream);

        tx.send(DashboardEvent::Notice("first".to_string())).unwrap();
        tx.send(DashboardEvent::Notice("second".to_string())).unwrap();
        drop(tx);

        assert!(matches!(stream.next().await, Some(DashboardEvent::Frame(_))));
        assert_eq!(stream.next().await, Some(DashboardEvent::Notice("second".to_string())));
        assert_eq!(stream.next().await, None);
    }
}
