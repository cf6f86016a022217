/// Maximum bytes moved per non-blocking socket read or write call (1 KiB)
pub const CHUNK_SIZE: usize = 1024;

/// Initial capacity of the send and receive ring buffers
pub const INITIAL_BUFFER_CAPACITY: usize = CHUNK_SIZE;

/// Byte value that terminates every document on the wire
pub const FRAME_TERMINATOR: u8 = 0x00;

/// Event batch capacity per readiness sample
pub const POLL_EVENT_CAPACITY: usize = 8;
