
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub sequence_index: i64,
    pub text: String,
    pub vector: Option<Vec<u8>>,
}

impl Chunk {
    /// Decode the stored vector blob, if present.
    #[inline]
    pub fn decoded_vector(&self) -> Result<Option<Vec<f32>>> {
        self.vector
            .as_deref()
            .map(vector_from_blob)
            .transpose()
    }
}

/// Conventional chunk id: document id plus sequence index.
#[inline]
pub fn chunk_id(document_id: &str, sequence_index: usize) -> String {
    format!("{}#{}", document_id, sequence_index)
}

/// Encode a vector as a little-endian f32 byte array for storage.
#[inline]
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 byte array back into a vector.
#[inline]
pub fn vector_from_blob(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(RagError::Storage(format!(
            "Vector blob length {} is not a multiple of 4",
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}
