use bytes::Bytes;

use crate::error::UploadError;

const MEGABYTE: u64 = 1024 * 1024; // 1MB
pub const MIN_CHUNK_SIZE_BYTES: u64 = 5 * MEGABYTE;
pub const MAX_CHUNK_SIZE_BYTES: u64 = 1024 * MEGABYTE;
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 100 * MEGABYTE;

/// Chunk size accepted by the remote upload session, between 5MB and 1GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u64);

impl ChunkSize {
    pub fn new(bytes: u64) -> Result<Self, UploadError> {
        if !(MIN_CHUNK_SIZE_BYTES..=MAX_CHUNK_SIZE_BYTES).contains(&bytes) {
            return Err(UploadError::InvalidChunkSize(bytes));
        }
        Ok(Self(bytes))
    }

    pub fn from_megabytes(megabytes: u64) -> Result<Self, UploadError> {
        Self::new(megabytes.saturating_mul(MEGABYTE))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_SIZE_BYTES)
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub bytes: Bytes,
}

/// Splits `payload` into `ceil(len / chunk_size)` ordered chunks. Only the last
/// chunk may be shorter than `chunk_size`. Chunks share the payload buffer.
pub fn split(payload: &Bytes, chunk_size: u64) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1) as usize;

    (0..payload.len().div_ceil(chunk_size))
        .map(|index| {
            let start = index * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            Chunk {
                index,
                bytes: payload.slice(start..end),
            }
        })
        .collect()
}
