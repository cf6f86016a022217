use std::io;

use thiserror::Error;

/// Connection-layer error taxonomy.
///
/// These errors never cross the public API boundary: every fatal variant is
/// logged and converted into an immediate shutdown, observable through the
/// close callback and the `Closed` state. `WouldBlock` is flow control and
/// is never represented here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The OS readiness poller could not be allocated.
    #[error("poller creation failed: {source}")]
    PollerCreation {
        #[source]
        source: io::Error,
    },

    /// The stream could not be placed under readiness watch.
    #[error("stream registration failed: {source}")]
    Registration {
        #[source]
        source: io::Error,
    },

    /// The connect address was not a literal `"<ipv4>:<port>"` pair.
    #[error("invalid address '{address}'")]
    AddressParse { address: String },

    /// The non-blocking connect failed outright.
    #[error("connect failed: {source}")]
    Connect {
        #[source]
        source: io::Error,
    },

    /// A readiness sample failed.
    #[error("readiness query failed: {source}")]
    ReadinessQuery {
        #[source]
        source: io::Error,
    },

    /// A socket write failed.
    #[error("send failed: {source}")]
    Send {
        #[source]
        source: io::Error,
    },

    /// The remote peer closed the connection (read returned zero bytes).
    #[error("closed by remote")]
    RemoteClosed,

    /// A socket read failed.
    #[error("receive failed: {source}")]
    Receive {
        #[source]
        source: io::Error,
    },

    /// A framed message was not a valid document. The sole recoverable
    /// error: reported through the receive callback flag, never fatal, and
    /// the stream position has already advanced past the malformed frame.
    #[error("document parse failed: {source}")]
    DocumentParse {
        #[from]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Whether this error tears the connection down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::DocumentParse { .. })
    }
}
