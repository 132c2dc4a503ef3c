//! Connect, send one message, print the reply.

use std::process::ExitCode;
use tcp_handshake::signal::{Console, Immediate};
use tcp_handshake::{logging, Config, Connector, ReadySignal, Role};
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match Config::load(Role::Connector) {
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
        connect_timeout = ?config.connect_timeout,
        io_timeout = ?config.io_timeout,
        confirm = config.confirm,
        "Starting connector"
    );

    let signal: Box<dyn ReadySignal> = if config.confirm {
        Box::new(Console::stdio())
    } else {
        Box::new(Immediate)
    };

    match Connector::new(config, signal).run_with(|_| println!("Hello message sent")) {
        Ok(exchange) => {
            println!("Message from a server: {}", exchange.received_text());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(step = e.step(), error = %e, "Connector failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
