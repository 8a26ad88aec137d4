use sha2::{Digest, Sha256};

/// Accumulates recorder chunks in arrival order and assembles them into one
/// contiguous blob.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    chunks: Vec<Vec<u8>>,
    total_bytes_written: u64,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk. Empty chunks are dropped.
    pub fn write(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total_bytes_written += chunk.len() as u64;
        self.chunks.push(chunk);
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop everything written so far.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes_written = 0;
    }

    /// Concatenate the chunks and return the blob with its SHA-256 hex digest.
    /// The writer is left empty.
    pub fn close(&mut self) -> (Vec<u8>, String) {
        let mut data = Vec::with_capacity(self.total_bytes_written as usize);
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        self.total_bytes_written = 0;
        let checksum = sha256_hex(&data);
        (data, checksum)
    }
}

/// SHA-256 hex digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
