use std::{io, time::Duration};

use mio::{Events, Interest, Poll, Token, net::TcpStream};

use crate::constants::POLL_EVENT_CAPACITY;

const STREAM: Token = Token(0);

/// Point-in-time readiness of the watched stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

/// Zero-wait readiness sampling over a single stream.
///
/// One sample performs exactly one poll with a zero timeout: it reports
/// whatever readiness the OS has queued and returns immediately, whether or
/// not anything was ready. It never waits and never retries internally.
#[derive(Debug)]
pub struct ReadinessPoller {
    poll: Poll,
    events: Events,
}

impl ReadinessPoller {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(POLL_EVENT_CAPACITY),
        })
    }

    /// Watch `stream` for read and write readiness.
    pub fn register(&self, stream: &mut TcpStream) -> io::Result<()> {
        self.poll
            .registry()
            .register(stream, STREAM, Interest::READABLE | Interest::WRITABLE)
    }

    pub fn deregister(&self, stream: &mut TcpStream) -> io::Result<()> {
        self.poll.registry().deregister(stream)
    }

    /// Sample current readiness without waiting.
    pub fn sample(&mut self) -> io::Result<Readiness> {
        self.poll.poll(&mut self.events, Some(Duration::ZERO))?;

        let mut readiness = Readiness::default();
        for event in self.events.iter() {
            if event.token() != STREAM {
                continue;
            }
            // a half-closed read side still needs a read to observe EOF
            readiness.readable |= event.is_readable() || event.is_read_closed();
            readiness.writable |= event.is_writable();
            readiness.error |= event.is_error();
        }
        Ok(readiness)
    }
}
