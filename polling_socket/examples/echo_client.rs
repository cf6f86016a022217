//! Demo driver: connect to a server, poll in a tight loop, and periodically
//! send a `{"test": n}` document. Pair it with any echo server, e.g.
//! `ncat -l 1234 --keep-open --exec "/bin/cat"`.
//!
//! Usage: `cargo run --example echo_client -- 127.0.0.1:1234`

use std::{cell::Cell, process, rc::Rc, thread, time::Duration};

use polling_socket::PollingClient;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(address) = std::env::args().nth(1) else {
        eprintln!("usage: echo_client <host:port>");
        eprintln!("(ex) 127.0.0.1:1234");
        process::exit(1);
    };

    let closed = Rc::new(Cell::new(false));

    let mut client = PollingClient::new();
    client.initialize(
        Box::new(|| println!("connected")),
        Box::new(|parse_failed, document| {
            println!("received (parse_failed={parse_failed}): {document}");
        }),
        Box::new({
            let closed = closed.clone();
            move || closed.set(true)
        }),
    );
    client.connect(&address);

    let mut tick: u64 = 0;
    while !closed.get() {
        client.poll();

        tick += 1;
        if tick % 500 == 0 {
            client.send_document(&json!({ "test": tick }));
        }

        thread::sleep(Duration::from_millis(1));
    }
}
