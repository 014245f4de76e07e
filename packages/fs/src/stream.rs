//! Take-once byte streams.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::Error;

/// The chunked content behind a [`ByteStream`].
pub type ChunkStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// File content as a stream of chunks that can be consumed once.
///
/// Clones share the same underlying stream: whichever clone takes it first
/// gets the content and the others see it as consumed. Use a buffer when
/// the content is needed more than once.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<Mutex<Option<ChunkStream>>>,
}

impl ByteStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(stream.boxed()))),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::new(stream::iter(std::iter::once(Ok(bytes))))
    }

    /// Take the stream, leaving every clone consumed.
    pub fn take(&self) -> Option<ChunkStream> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_consumed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Read the whole stream into memory.
    pub async fn collect(&self) -> Result<Bytes, Error> {
        let mut chunks = self
            .take()
            .ok_or_else(|| Error::backend("stream was already consumed"))?;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| Error::backend(format!("stream read failed: {}", e)))?;
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
