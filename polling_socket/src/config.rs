use serde::Deserialize;

use crate::constants::{CHUNK_SIZE, INITIAL_BUFFER_CAPACITY};

/// Tunables for a [`PollingClient`](crate::PollingClient).
///
/// `chunk_size` is a design parameter, not a protocol requirement: it caps
/// the bytes moved per socket syscall and may be resized freely without
/// affecting framing correctness.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[non_exhaustive]
pub struct ClientConfig {
    /// Maximum bytes per non-blocking read or write call.
    pub chunk_size: usize,
    /// Starting capacity of both ring buffers.
    pub initial_buffer_capacity: usize,
    /// Disable Nagle's algorithm on the connected stream.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            initial_buffer_capacity: INITIAL_BUFFER_CAPACITY,
            nodelay: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.initial_buffer_capacity, 1024);
        assert!(config.nodelay);
    }

    #[test]
    fn test_partial_deserialization_falls_back_to_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"chunk_size": 4096}"#).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.initial_buffer_capacity, 1024);
        assert!(config.nodelay);
    }
}
