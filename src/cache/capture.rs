//! Streaming body capture.
//!
//! Reads a response body frame by frame into memory. With a ceiling set, the
//! buffer never grows past it: the first chunk that would overflow ends the
//! capture, and the caller gets back a body that replays the buffered prefix,
//! that chunk, and then the untouched remainder of the original stream.

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, future, stream};
use http_body_util::BodyExt;

/// Outcome of reading a body for caching.
pub enum Captured {
    /// The whole body, within the ceiling.
    Complete(Bytes),
    /// The ceiling was crossed; the body replays every byte in order.
    Overflow(Body),
    /// The source body failed; the body replays what was read, then the error.
    Failed(Body),
}

impl std::fmt::Debug for Captured {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Captured::Complete(bytes) => f.debug_tuple("Complete").field(&bytes.len()).finish(),
            Captured::Overflow(_) => f.write_str("Overflow"),
            Captured::Failed(_) => f.write_str("Failed"),
        }
    }
}

pub async fn capture_body(mut body: Body, limit: Option<usize>) -> Captured {
    let mut buffer = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                let replay = prefix_stream([buffer.freeze()])
                    .chain(stream::once(future::ready(Err::<Bytes, _>(err))));
                return Captured::Failed(Body::from_stream(replay));
            }
        };

        // Trailers are not part of the payload and are not replayed.
        let Ok(chunk) = frame.into_data() else {
            continue;
        };

        if let Some(limit) = limit
            && buffer.len() + chunk.len() > limit
        {
            let replay = prefix_stream([buffer.freeze(), chunk]).chain(body.into_data_stream());
            return Captured::Overflow(Body::from_stream(replay));
        }

        buffer.extend_from_slice(&chunk);
    }

    Captured::Complete(buffer.freeze())
}

fn prefix_stream<const N: usize>(
    chunks: [Bytes; N],
) -> impl futures::Stream<Item = Result<Bytes, axum::Error>> + Send + 'static {
    stream::iter(
        chunks
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .map(Ok),
    )
}
