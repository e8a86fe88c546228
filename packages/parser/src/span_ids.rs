//! Span ids for one parse.
//!
//! Every node gets `<seed>-<n>` where the seed is a CRC32 of the file path.
//! These ids key the printer's dirty set and are meaningless across parses;
//! the durable identity of an element is its `data-oid` attribute.

use crc32fast::Hasher;

/// Hex CRC32 of a file path
pub fn path_seed(path: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(path.as_bytes());
    format!("{:08x}", hasher.finalize())
}

#[derive(Clone, Debug)]
pub struct SpanIds {
    seed: String,
    issued: u32,
}

impl SpanIds {
    pub fn for_path(path: &str) -> Self {
        Self {
            seed: path_seed(path),
            issued: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.issued += 1;
        format!("{}-{}", self.seed, self.issued)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
