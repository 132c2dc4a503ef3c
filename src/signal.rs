//! Local confirmation gate.
//!
//! Before exchanging its message each side waits on a `ReadySignal`. The
//! programs wait for the operator to press Enter; tests and non-interactive
//! runs substitute a channel or an immediate trigger.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;

/// Prompt printed before waiting on the console.
pub const PROMPT: &str = "Press Enter to continue...";

/// Blocks the caller until the local side is ready to proceed.
pub trait ReadySignal {
    fn wait(&mut self) -> io::Result<()>;
}

impl<S: ReadySignal + ?Sized> ReadySignal for &mut S {
    fn wait(&mut self) -> io::Result<()> {
        (**self).wait()
    }
}

impl<S: ReadySignal + ?Sized> ReadySignal for Box<S> {
    fn wait(&mut self) -> io::Result<()> {
        (**self).wait()
    }
}

/// Never blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl ReadySignal for Immediate {
    fn wait(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prompts on `output` and waits for one line on `input`.
///
/// Line content is ignored. End of input also counts as confirmation.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    /// Console bound to the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ReadySignal for Console<R, W> {
    fn wait(&mut self) -> io::Result<()> {
        writeln!(self.output, "{PROMPT}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            tracing::debug!("console closed, continuing");
        }
        Ok(())
    }
}

/// Receiving half of a channel-backed signal.
pub struct ChannelSignal {
    rx: mpsc::Receiver<()>,
}

/// Sending half of a channel-backed signal.
#[derive(Clone)]
pub struct Trigger {
    tx: mpsc::Sender<()>,
}

impl Trigger {
    /// Release one pending `wait`. Fails silently if the waiter is gone.
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }
}

/// Create a connected trigger/signal pair.
pub fn channel() -> (Trigger, ChannelSignal) {
    let (tx, rx) = mpsc::channel();
    (Trigger { tx }, ChannelSignal { rx })
}

impl ReadySignal for ChannelSignal {
    fn wait(&mut self) -> io::Result<()> {
        self.rx.recv().map_err(|_| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "ready trigger dropped before firing",
            )
        })
    }
}
