//! Single-connection, non-blocking TCP client with terminator-framed JSON
//! messaging, driven by an external poll loop.

pub mod buffer;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod framing;
pub mod poller;

// Re-export commonly used types
pub use buffer::RingBuffer;
pub use client::{OnCloseFn, OnConnectFn, OnRecvFn, PollingClient, State};
pub use config::ClientConfig;
pub use error::ClientError;
pub use framing::FrameExtractor;
pub use poller::{Readiness, ReadinessPoller};
