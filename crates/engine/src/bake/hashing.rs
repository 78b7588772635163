use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Accumulates every bake input into one SHA-256 digest.
///
/// Each part is tagged and length-prefixed so that moving bytes between
/// parts changes the digest.
pub(crate) struct BakeInputHasher {
    hasher: Sha256,
}

impl BakeInputHasher {
    pub(crate) fn new(tool_version: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"bake-inputs\0");
        hasher.update(tool_version.as_bytes());
        hasher.update([0u8]);
        Self { hasher }
    }

    pub(crate) fn add_part(&mut self, tag: &str, bytes: &[u8]) {
        self.hasher.update(tag.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Records that an input was expected but could not be read.
    pub(crate) fn add_absent(&mut self, tag: &str) {
        self.hasher.update(tag.as_bytes());
        self.hasher.update(b"\0absent\0");
    }

    pub(crate) fn finish_hex(self) -> String {
        to_hex_lower(&self.hasher.finalize())
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
