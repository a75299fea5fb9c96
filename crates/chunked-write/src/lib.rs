//! Sequential chunk writer for narrow call-and-response bridges
//!
//! Splits an in-memory payload into bounded pieces and hands them to a [`ChunkSink`]:
//! - chunk `k + 1` is never issued before chunk `k`'s call has settled
//! - the first write truncates (`append = false`), every later write appends
//! - control is yielded back to the scheduler between chunks

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Chunk size for ordinary appended file writes (512 KB)
pub const DIRECT_CHUNK_SIZE: usize = 512 * 1024;

/// Chunk size for managed storage sessions (1 MB) - fewer round-trips per save
pub const SCOPED_CHUNK_SIZE: usize = 1024 * 1024;

/// One slice of the payload, as handed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWrite {
    pub index: usize,
    pub offset: u64,
    pub data: Bytes,
    pub append: bool,
}

/// Destination of a chunked transfer (one bridge write primitive)
#[async_trait]
pub trait ChunkSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn write_chunk(&self, chunk: ChunkWrite) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum ChunkError<E>
where
    E: std::error::Error + 'static,
{
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("chunk {index} at offset {offset} failed: {source}")]
    Sink {
        index: usize,
        offset: u64,
        #[source]
        source: E,
    },
}

/// Summary of a finished transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub chunks: usize,
    pub bytes: u64,
}

/// Number of writes a payload of `len` bytes needs: `ceil(len / chunk_size)`.
///
/// An empty payload needs none; creating the destination is up to the caller.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size)
}

/// Stream `payload` into `sink` in `chunk_size` pieces, strictly in offset order.
pub async fn write_chunked<S>(
    payload: &Bytes,
    chunk_size: usize,
    sink: &S,
) -> Result<TransferStats, ChunkError<S::Error>>
where
    S: ChunkSink + ?Sized,
{
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }

    let total = payload.len();
    let chunks = chunk_count(total, chunk_size);

    for index in 0..chunks {
        let start = index * chunk_size;
        let end = std::cmp::min(start + chunk_size, total);
        let offset = start as u64;

        sink.write_chunk(ChunkWrite {
            index,
            offset,
            data: payload.slice(start..end),
            append: index > 0,
        })
        .await
        .map_err(|source| ChunkError::Sink {
            index,
            offset,
            source,
        })?;

        debug!(
            "chunk_written: {}/{} offset={} len={} total={}",
            index + 1,
            chunks,
            offset,
            end - start,
            total
        );

        // Let the UI side breathe before the next bridge call
        if index + 1 < chunks {
            tokio::task::yield_now().await;
        }
    }

    Ok(TransferStats {
        chunks,
        bytes: total as u64,
    })
}
