use std::io::{self, Read, Write};
use std::net::{SocketAddr, SocketAddrV4};

use mio::net::TcpStream;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    buffer::RingBuffer,
    config::ClientConfig,
    error::ClientError,
    framing::{FrameExtractor, decode_document},
    poller::ReadinessPoller,
};

/// Connection-completion callback; fired exactly once per successful connect.
pub type OnConnectFn = Box<dyn FnMut()>;
/// Per-message callback: `(parse_failed, document)`. `document` is
/// [`Value::Null`] when `parse_failed` is true.
pub type OnRecvFn = Box<dyn FnMut(bool, Value)>;
/// Close callback; fired after all internal state has been reset.
pub type OnCloseFn = Box<dyn FnMut()>;

/// Lifecycle state of a [`PollingClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Poller allocated, no connection attempted yet.
    Wait,
    /// Non-blocking connect issued, awaiting writable readiness.
    Connecting,
    /// Bidirectional traffic permitted.
    Connected,
    /// Terminal; no stream, no poller.
    Closed,
}

/// Single-connection, non-blocking TCP client delivering terminator-framed
/// JSON documents.
///
/// All work happens synchronously inside the calls the owning thread makes;
/// there is no internal thread or timer, and no call ever blocks. "Waiting"
/// is expressed by returning to the caller, who drives the connection by
/// invoking [`poll`](PollingClient::poll) on its own cadence:
///
/// ```no_run
/// use polling_socket::PollingClient;
///
/// let mut client = PollingClient::new();
/// client.initialize(
///     Box::new(|| println!("connected")),
///     Box::new(|parse_failed, doc| println!("got {doc} (parse_failed={parse_failed})")),
///     Box::new(|| println!("closed")),
/// );
/// client.connect("127.0.0.1:1234");
/// loop {
///     client.poll();
///     // ... application work, e.g. client.send_document(&json!({"test": 1}));
/// }
/// ```
///
/// Fatal conditions never surface as return values: they are logged, the
/// connection shuts down synchronously, and the host observes the close
/// callback and the `Closed` state. The instance is exclusively owned;
/// sharing it across threads requires external synchronization that this
/// type does not provide.
pub struct PollingClient {
    state: State,
    stream: Option<TcpStream>,
    poller: Option<ReadinessPoller>,
    on_connect: Option<OnConnectFn>,
    on_recv: Option<OnRecvFn>,
    on_close: Option<OnCloseFn>,
    send_buf: RingBuffer,
    recv_buf: RingBuffer,
    extractor: FrameExtractor,
    config: ClientConfig,
}

impl PollingClient {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            state: State::Closed,
            stream: None,
            poller: None,
            on_connect: None,
            on_recv: None,
            on_close: None,
            send_buf: RingBuffer::with_capacity(config.initial_buffer_capacity),
            recv_buf: RingBuffer::with_capacity(config.initial_buffer_capacity),
            extractor: FrameExtractor::new(),
            config,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Install the callback set and allocate the readiness poller, moving
    /// the client into `Wait`. On allocation failure the error is logged
    /// and the client shuts down immediately (the close callback fires).
    pub fn initialize(&mut self, on_connect: OnConnectFn, on_recv: OnRecvFn, on_close: OnCloseFn) {
        self.on_connect = Some(on_connect);
        self.on_recv = Some(on_recv);
        self.on_close = Some(on_close);

        match ReadinessPoller::new() {
            Ok(poller) => self.poller = Some(poller),
            Err(source) => {
                error!(error = %ClientError::PollerCreation { source }, "initialize failed");
                self.shutdown(true);
                return;
            }
        }

        self.state = State::Wait;
        debug!("client initialized");
    }

    /// Issue a non-blocking connect to a literal `"<ipv4>:<port>"` address.
    ///
    /// Valid only in `Wait`; calls in any other state are silently ignored —
    /// the caller must not race connect attempts. A malformed address or an
    /// immediate connect failure shuts the client down.
    pub fn connect(&mut self, address: &str) {
        if self.state != State::Wait {
            return;
        }

        let endpoint: SocketAddrV4 = match address.parse() {
            Ok(endpoint) => endpoint,
            Err(_) => {
                let err = ClientError::AddressParse {
                    address: address.to_string(),
                };
                error!(error = %err, "connect failed");
                self.shutdown(true);
                return;
            }
        };

        let mut stream = match TcpStream::connect(SocketAddr::V4(endpoint)) {
            Ok(stream) => stream,
            Err(source) => {
                error!(error = %ClientError::Connect { source }, "connect failed");
                self.shutdown(true);
                return;
            }
        };

        if self.config.nodelay {
            if let Err(err) = stream.set_nodelay(true) {
                warn!(error = %err, "could not set TCP_NODELAY");
            }
        }

        let Some(poller) = self.poller.as_ref() else {
            self.shutdown(true);
            return;
        };
        if let Err(source) = poller.register(&mut stream) {
            error!(error = %ClientError::Registration { source }, "connect failed");
            self.shutdown(true);
            return;
        }

        self.stream = Some(stream);
        self.state = State::Connecting;
        debug!(%endpoint, "connect issued");
    }

    /// Serialize `document`, append the frame terminator, and queue the
    /// bytes for sending. Silently ignored unless `Connected`.
    pub fn send_document(&mut self, document: &Value) {
        if self.state != State::Connected {
            return;
        }
        let Ok(mut bytes) = serde_json::to_vec(document) else {
            return;
        };
        bytes.push(self.extractor.terminator());
        self.send_bytes(&bytes);
    }

    /// Queue raw bytes on the send buffer and immediately attempt a flush.
    /// Silently ignored unless `Connected`.
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        if self.state != State::Connected {
            return;
        }
        self.send_buf.append(bytes);
        self.try_flush();
    }

    /// Drive the connection: one zero-wait readiness sample, then dispatch.
    ///
    /// No-op in `Wait` and `Closed`. Read readiness drains the socket and
    /// delivers every complete message before returning; write readiness
    /// either completes a pending connect or flushes buffered output;
    /// exceptional readiness while connecting means the connect failed.
    pub fn poll(&mut self) {
        if matches!(self.state, State::Wait | State::Closed) {
            return;
        }

        let readiness = match self.poller.as_mut() {
            Some(poller) => match poller.sample() {
                Ok(readiness) => readiness,
                Err(source) => {
                    error!(error = %ClientError::ReadinessQuery { source }, "poll failed");
                    self.shutdown(true);
                    return;
                }
            },
            None => return,
        };

        // Connect finalization runs first: the readiness edge that completes
        // the handshake can carry read readiness in the same sample, and the
        // connect notification must precede any data delivery.
        if self.state == State::Connecting {
            if readiness.error {
                error!("connect failed");
                self.shutdown(true);
                return;
            }
            if readiness.writable {
                self.finish_connect();
            }
        }

        if readiness.readable {
            self.try_recv();
        }

        if self.state == State::Connected && readiness.writable {
            self.try_flush();
        }
    }

    /// Close and release the stream, clear both buffers and all callback
    /// slots, and move to `Closed`.
    ///
    /// When `invoke_close_callback` is true the close callback runs last,
    /// after every field has been reset, so the host may re-`initialize`
    /// the client once the triggering call has returned.
    pub fn shutdown(&mut self, invoke_close_callback: bool) {
        if let (Some(stream), Some(poller)) = (self.stream.as_mut(), self.poller.as_ref()) {
            if let Err(err) = poller.deregister(stream) {
                debug!(error = %err, "deregister failed during shutdown");
            }
        }
        self.stream = None; // dropping the stream closes the handle
        self.poller = None;

        self.send_buf.clear();
        self.recv_buf.clear();

        self.on_connect = None;
        self.on_recv = None;
        let on_close = self.on_close.take();

        self.state = State::Closed;
        debug!("client shut down");

        if invoke_close_callback {
            if let Some(mut on_close) = on_close {
                on_close();
            }
        }
    }

    fn finish_connect(&mut self) {
        let peer = match self.stream.as_ref().map(TcpStream::peer_addr) {
            Some(Ok(peer)) => peer,
            Some(Err(source)) => {
                error!(error = %ClientError::Connect { source }, "connect failed");
                self.shutdown(true);
                return;
            }
            None => return,
        };

        self.state = State::Connected;
        if let Some(on_connect) = self.on_connect.as_mut() {
            on_connect();
        }
        info!(%peer, "connected");
    }

    /// Send buffered bytes in chunks of up to `chunk_size` until the buffer
    /// empties or the socket would block. Partial writes consume exactly the
    /// accepted count; the remainder stays queued for the next flush.
    fn try_flush(&mut self) {
        if self.state != State::Connected {
            return;
        }

        let mut chunk = vec![0u8; self.config.chunk_size];
        while !self.send_buf.is_empty() {
            let count = self.send_buf.peek(&mut chunk);
            let result = match self.stream.as_mut() {
                Some(stream) => stream.write(&chunk[..count]),
                None => return,
            };
            match result {
                Ok(0) => {
                    let source = io::Error::new(io::ErrorKind::WriteZero, "accepted no bytes");
                    error!(error = %ClientError::Send { source }, "flush failed");
                    self.shutdown(true);
                    return;
                }
                Ok(sent) => {
                    debug!(sent, offered = count, "flushed");
                    self.send_buf.consume_prefix(sent);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(source) => {
                    error!(error = %ClientError::Send { source }, "flush failed");
                    self.shutdown(true);
                    return;
                }
            }
        }
    }

    /// Drain the socket in chunks of up to `chunk_size`, delivering every
    /// complete message after each successful read. A zero-byte read means
    /// the remote closed the connection; would-block ends the loop normally.
    fn try_recv(&mut self) {
        if self.state != State::Connected {
            return;
        }

        let mut chunk = vec![0u8; self.config.chunk_size];
        loop {
            let result = match self.stream.as_mut() {
                Some(stream) => stream.read(&mut chunk),
                None => return,
            };
            match result {
                Ok(0) => {
                    info!("{}", ClientError::RemoteClosed);
                    self.shutdown(true);
                    return;
                }
                Ok(count) => {
                    debug!(count, "received");
                    self.recv_buf.append(&chunk[..count]);
                    self.deliver_messages();
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
                Err(source) => {
                    error!(error = %ClientError::Receive { source }, "receive failed");
                    self.shutdown(true);
                    return;
                }
            }
        }
    }

    /// Extract and deliver every complete message currently buffered, in
    /// arrival order. A message that fails to parse is reported with the
    /// `parse_failed` flag set and does not desynchronize later frames.
    fn deliver_messages(&mut self) {
        while let Some(frame) = self.extractor.next_frame(&mut self.recv_buf) {
            let (parse_failed, document) = match decode_document(&frame) {
                Ok(document) => (false, document),
                Err(err) => {
                    warn!(error = %err, "message is not a valid document");
                    (true, Value::Null)
                }
            };
            if let Some(on_recv) = self.on_recv.as_mut() {
                on_recv(parse_failed, document);
            }
        }
    }
}

impl Default for PollingClient {
    fn default() -> Self {
        Self::new()
    }
}
