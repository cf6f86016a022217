//! End-to-end scenarios over loopback sockets: a real server thread on one
//! side, the poll-driven client on the other.

use std::{
    cell::{Cell, RefCell},
    io::{Read, Write},
    net::TcpListener,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use polling_socket::{PollingClient, State};
use serde_json::{Value, json};

struct Recorder {
    connected: Rc<Cell<u32>>,
    received: Rc<RefCell<Vec<(bool, Value)>>>,
    closed: Rc<Cell<u32>>,
}

fn client_with_recorder() -> (PollingClient, Recorder) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let recorder = Recorder {
        connected: Rc::new(Cell::new(0)),
        received: Rc::new(RefCell::new(Vec::new())),
        closed: Rc::new(Cell::new(0)),
    };
    let mut client = PollingClient::new();
    let connected = recorder.connected.clone();
    let received = recorder.received.clone();
    let closed = recorder.closed.clone();
    client.initialize(
        Box::new(move || connected.set(connected.get() + 1)),
        Box::new(move |parse_failed, document| {
            received.borrow_mut().push((parse_failed, document));
        }),
        Box::new(move || closed.set(closed.get() + 1)),
    );
    (client, recorder)
}

fn poll_until(client: &mut PollingClient, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        client.poll();
        thread::sleep(Duration::from_millis(1));
    }
}

fn spawn_echo_server(listener: TcpListener) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 8192];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if stream.write_all(&buf[..n]).is_err() {
                break;
            }
        }
    })
}

#[test]
fn test_connect_send_and_receive_echo() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = spawn_echo_server(listener);

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    let connected = recorder.connected.clone();
    poll_until(&mut client, || connected.get() == 1);
    assert_eq!(client.state(), State::Connected);
    assert_eq!(recorder.connected.get(), 1);

    client.send_document(&json!({ "test": 1 }));

    let received = recorder.received.clone();
    poll_until(&mut client, || !received.borrow().is_empty());

    {
        let messages = received.borrow();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].0);
        assert_eq!(messages[0].1, json!({ "test": 1 }));
    }

    client.shutdown(false);
    server.join().unwrap();
}

#[test]
fn test_burst_of_frames_is_delivered_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut burst = Vec::new();
        for n in 1..=5 {
            burst.extend_from_slice(json!({ "n": n }).to_string().as_bytes());
            burst.push(0);
        }
        stream.write_all(&burst).unwrap();
        // hold the connection open until the client is done
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
    });

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    let received = recorder.received.clone();
    poll_until(&mut client, || received.borrow().len() == 5);

    let messages = received.borrow();
    for (i, (parse_failed, document)) in messages.iter().enumerate() {
        assert!(!parse_failed);
        assert_eq!(*document, json!({ "n": i + 1 }));
    }
    drop(messages);

    client.shutdown(false);
    server.join().unwrap();
}

#[test]
fn test_partial_frame_is_withheld_until_completed() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"{\"late\":").unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(100));
        stream.write_all(b"true}\0").unwrap();
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
    });

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    // drain the first half and confirm nothing is delivered yet
    let connected = recorder.connected.clone();
    poll_until(&mut client, || connected.get() == 1);
    thread::sleep(Duration::from_millis(20));
    client.poll();
    assert!(recorder.received.borrow().is_empty());

    let received = recorder.received.clone();
    poll_until(&mut client, || !received.borrow().is_empty());

    let messages = received.borrow();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, json!({ "late": true }));
    drop(messages);

    client.shutdown(false);
    server.join().unwrap();
}

#[test]
fn test_malformed_frame_is_flagged_and_stream_stays_usable() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"this is not json\0{\"ok\":1}\0").unwrap();
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
    });

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    let received = recorder.received.clone();
    poll_until(&mut client, || received.borrow().len() == 2);
    assert_eq!(client.state(), State::Connected);

    let messages = received.borrow();
    assert!(messages[0].0);
    assert_eq!(messages[0].1, Value::Null);
    assert!(!messages[1].0);
    assert_eq!(messages[1].1, json!({ "ok": 1 }));
    drop(messages);

    client.shutdown(false);
    server.join().unwrap();
}

#[test]
fn test_remote_close_fires_on_close_once() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    let closed = recorder.closed.clone();
    poll_until(&mut client, || closed.get() == 1);
    assert_eq!(client.state(), State::Closed);
    assert_eq!(recorder.closed.get(), 1);

    // further polls stay no-ops
    client.poll();
    assert_eq!(recorder.closed.get(), 1);
    server.join().unwrap();
}

#[test]
fn test_large_document_survives_partial_writes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = spawn_echo_server(listener);

    let (mut client, recorder) = client_with_recorder();
    client.connect(&addr.to_string());

    let connected = recorder.connected.clone();
    poll_until(&mut client, || connected.get() == 1);

    // far larger than one 1 KiB chunk: forces chunked and partial writes
    let document = json!({ "payload": "x".repeat(300 * 1024) });
    client.send_document(&document);

    let received = recorder.received.clone();
    poll_until(&mut client, || !received.borrow().is_empty());

    let messages = received.borrow();
    assert_eq!(messages.len(), 1);
    assert!(!messages[0].0);
    assert_eq!(messages[0].1, document);
    drop(messages);

    client.shutdown(false);
    server.join().unwrap();
}
