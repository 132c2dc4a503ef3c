//! Run the `listener` and `connector` programs against each other.

use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::process::{Command, Stdio};

const LISTENER: &str = env!("CARGO_BIN_EXE_listener");
const CONNECTOR: &str = env!("CARGO_BIN_EXE_connector");

/// A loopback address with no socket bound to it.
fn free_addr() -> String {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().to_string()
}

#[test]
fn test_programs_exchange_and_exit_zero() {
    let addr = free_addr();

    let mut listener = Command::new(LISTENER)
        .args(["-y", "--log-level", "info", "-a", &addr])
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Wait for the listener to report it is accepting connections
    let mut logs = BufReader::new(listener.stderr.take().unwrap());
    let mut line = String::new();
    loop {
        line.clear();
        let n = logs.read_line(&mut line).unwrap();
        assert!(n > 0, "listener exited before listening");
        if line.contains("Listening") {
            break;
        }
    }

    let connector = Command::new(CONNECTOR)
        .args(["-y", "-a", &addr])
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    let served = listener.wait_with_output().unwrap();
    drop(logs);

    assert_eq!(connector.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&connector.stdout),
        "Hello message sent\nMessage from a server: Hello from server\n"
    );

    assert_eq!(served.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&served.stdout),
        "Message from a client: Hello from client\nHello message sent\n"
    );
}

#[test]
fn test_connector_refused_exits_one() {
    let addr = free_addr();

    let output = Command::new(CONNECTOR)
        .args(["-y", "-a", &addr])
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let expected = format!("error: connection to {addr} failed");
    assert!(
        stderr.lines().any(|l| l.starts_with(&expected)),
        "stderr was: {stderr}"
    );
}

#[test]
fn test_invalid_config_exits_one() {
    let output = Command::new(LISTENER)
        .args(["-y", "--backlog", "0"])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: Invalid configuration"), "{stderr}");
}
