//! Forwards chunks to a sink while assembling the full response.

use futures::{Stream, StreamExt};

use crate::agent_loop::OutputChunk;
use crate::error::Result;

/// Destination for chunks as they arrive.
pub trait ChunkSink {
    fn write_chunk(&mut self, chunk: &OutputChunk) -> Result<()>;
}

/// Drain `stream` in order, writing every chunk to `sink` immediately.
///
/// Returns the concatenation of all chunk contributions. The first `Err`
/// item aborts multiplexing and the partial text is discarded.
pub async fn multiplex<S, K>(mut stream: S, sink: &mut K) -> Result<String>
where
    S: Stream<Item = Result<OutputChunk>> + Unpin,
    K: ChunkSink + ?Sized,
{
    let mut response = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_chunk(&chunk)?;
        response.push_str(chunk.as_str());
    }
    Ok(response)
}
