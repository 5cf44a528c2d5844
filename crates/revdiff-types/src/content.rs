use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-addressed handle to the bytes of a file node.
///
/// A `ContentId` is the BLAKE3 hash of the file text. Two nodes with equal
/// ids have identical bytes, so the diff engine can decide "unchanged"
/// without ever loading the content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Compute a `ContentId` from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short_hex())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let data = b"This is the file 'iota'.\n";
        assert_eq!(ContentId::from_bytes(data), ContentId::from_bytes(data));
    }

    #[test]
    fn different_content_produces_different_ids() {
        let lf = ContentId::from_bytes(b"line\n");
        let crlf = ContentId::from_bytes(b"line\r\n");
        assert_ne!(lf, crlf);
    }

    #[test]
    fn display_is_full_hex_and_debug_is_short() {
        let id = ContentId::from_bytes(b"test");
        assert_eq!(id.to_string().len(), 64);
        assert_eq!(id.short_hex().len(), 8);
        assert!(id.to_string().starts_with(&id.short_hex()));
        assert!(format!("{id:?}").starts_with("ContentId("));
    }

    #[test]
    fn serde_roundtrip() {
        let id = ContentId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
