use std::fmt;
use std::sync::{Mutex, PoisonError};

use xpad360_protocol::{led_command, rumble_command, LedState};

use crate::error::{Error, Result};
use crate::usb::OutputPipe;

/// Outbound messages understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Rumble { left: u8, right: u8 },
    Led(LedState),
}

impl Command {
    fn send_with(self, f: impl FnOnce(&[u8]) -> Result<()>) -> Result<()> {
        match self {
            Command::Rumble { left, right } => f(&rumble_command(left, right)),
            Command::Led(state) => f(&led_command(state)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Rumble { left, right } => write!(f, "rumble {left}/{right}"),
            Command::Led(state) => write!(f, "led {state}"),
        }
    }
}

/// Output pipe of the current connection. Concurrent senders are
/// serialized.
#[derive(Default)]
pub(crate) struct OutputChannel {
    pipe: Mutex<Option<Box<dyn OutputPipe>>>,
}

impl OutputChannel {
    pub(crate) fn install(&self, pipe: Box<dyn OutputPipe>) {
        *self.lock() = Some(pipe);
    }

    /// Drops the pipe, returning whether one was installed.
    pub(crate) fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    pub(crate) fn send(&self, command: Command) -> Result<()> {
        let mut pipe = self.lock();
        let pipe = pipe.as_mut().ok_or(Error::NotConnected)?;
        command.send_with(|bytes| {
            pipe.transfer(bytes)?;
            Ok(())
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn OutputPipe>>> {
        self.pipe.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::usb::TransferError;

    #[derive(Default)]
    struct Recorder {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl OutputPipe for Recorder {
        fn transfer(&mut self, data: &[u8]) -> std::result::Result<usize, TransferError> {
            self.writes.lock().unwrap().push(data.to_vec());
            Ok(data.len())
        }
    }

    struct Broken;

    impl OutputPipe for Broken {
        fn transfer(&mut self, _data: &[u8]) -> std::result::Result<usize, TransferError> {
            Err(TransferError::Disconnected)
        }
    }

    #[test]
    fn without_pipe_reports_not_connected() {
        let channel = OutputChannel::default();
        let result = channel.send(Command::Led(LedState::Rotate));
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[test]
    fn writes_encoded_commands() {
        let recorder = Recorder::default();
        let writes = Arc::clone(&recorder.writes);
        let channel = OutputChannel::default();
        channel.install(Box::new(recorder));

        channel.send(Command::Rumble { left: 128, right: 200 }).unwrap();
        channel.send(Command::Led(LedState::Rotate)).unwrap();

        let writes = writes.lock().unwrap();
        assert_eq!(writes[0], [0x00, 0x08, 0x00, 0x80, 0xC8, 0x00, 0x00, 0x00]);
        assert_eq!(writes[1], [0x01, 0x03, 0x0A]);
    }

    #[test]
    fn transfer_errors_propagate() {
        let channel = OutputChannel::default();
        channel.install(Box::new(Broken));
        let result = channel.send(Command::Rumble { left: 1, right: 1 });
        assert!(matches!(
            result,
            Err(Error::Transfer(TransferError::Disconnected))
        ));
    }

    #[test]
    fn close_removes_the_pipe() {
        let channel = OutputChannel::default();
        assert!(!channel.close());
        channel.install(Box::new(Broken));
        assert!(channel.close());
        assert!(matches!(
            channel.send(Command::Led(LedState::Off)),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn commands_display_readably() {
        assert_eq!(Command::Rumble { left: 3, right: 4 }.to_string(), "rumble 3/4");
        assert_eq!(Command::Led(LedState::TopLeftOn).to_string(), "led top_left_on");
    }
}
