//! Accept one connection, print the peer's message, reply once.

use std::process::ExitCode;
use tcp_handshake::signal::{Console, Immediate};
use tcp_handshake::{logging, Config, Listener, ReadySignal, Role};
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match Config::load(Role::Listener) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.log_level);

    info!(
        role = ?config.role,
        address = %config.endpoint,
        backlog = config.backlog,
        reuse_port = config.reuse_port,
        max_message_len = config.max_message_len,
        confirm = config.confirm,
        "Starting listener"
    );

    let signal: Box<dyn ReadySignal> = if config.confirm {
        Box::new(Console::stdio())
    } else {
        Box::new(Immediate)
    };

    let on_message = |message: &[u8]| {
        println!("Message from a client: {}", String::from_utf8_lossy(message));
    };

    match Listener::new(config, signal).run_with(on_message) {
        Ok(_) => {
            println!("Hello message sent");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(step = e.step(), error = %e, "Listener failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
