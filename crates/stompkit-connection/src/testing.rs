//! In-memory transport used by the state machine tests.

use std::collections::VecDeque;
use std::time::Duration;

use stompkit_frame::{Frame, FrameError};

use crate::error::{ConnectionError, Result};
use crate::handler::TransmissionHandler;

/// Replays queued inbound frames and records everything sent.
///
/// An empty inbound queue behaves like an expired reception timeout.
#[derive(Debug, Default)]
pub(crate) struct ScriptedHandler {
    inbound: VecDeque<Result<Frame>>,
    sent: Vec<Frame>,
    send_failure: Option<FrameError>,
    initialized: bool,
    closed: bool,
    reception_timeout: Duration,
}

impl ScriptedHandler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_inbound(&mut self, frame: Frame) {
        self.inbound.push_back(Ok(frame));
    }

    pub(crate) fn push_failure(&mut self, err: ConnectionError) {
        self.inbound.push_back(Err(err));
    }

    pub(crate) fn fail_next_send(&mut self, err: FrameError) {
        self.send_failure = Some(err);
    }

    pub(crate) fn sent(&self) -> &[Frame] {
        &self.sent
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn reception_timeout(&self) -> Duration {
        self.reception_timeout
    }
}

impl TransmissionHandler for ScriptedHandler {
    fn initialize(&mut self, _timeout: Duration) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn set_reception_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.reception_timeout = timeout;
        Ok(())
    }

    fn send_frame(&mut self, frame: &mut Frame) -> Result<()> {
        if let Some(err) = self.send_failure.take() {
            return Err(err.into());
        }
        frame.freeze();
        self.sent.push(frame.clone());
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Frame> {
        self.inbound.pop_front().unwrap_or(Err(ConnectionError::Timeout))
    }
}
