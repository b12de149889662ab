//! Scripted transport for tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// What the mock hands back for one read.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Bytes received from the device.
    Data(Bytes),
    /// Nothing arrived before the read timeout.
    Silence,
    /// The channel went away.
    Closed,
}

/// Transport that replays scripted replies and records writes.
#[derive(Debug, Default)]
pub struct MockTransport {
    open: bool,
    replies: VecDeque<Reply>,
    read_timeout: Duration,
    /// Frames written, with the time they were written.
    pub written: Vec<(Instant, Bytes)>,
    /// Number of input buffer resets.
    pub resets: usize,
    /// Number of flushes.
    pub flushes: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an already-open mock.
    pub fn opened() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    /// Sets how long a read waits when nothing is scripted to arrive.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn push(&mut self, reply: Reply) -> &mut Self {
        self.replies.push_back(reply);
        self
    }

    pub fn push_data(&mut self, data: &[u8]) -> &mut Self {
        self.push(Reply::Data(Bytes::copy_from_slice(data)))
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.open = true;
            Ok(())
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.open = false;
            Ok(())
        })
    }

    fn write(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.open {
                return Err(Error::NotConnected);
            }
            self.written.push((Instant::now(), data));
            Ok(())
        })
    }

    fn read(
        &mut self,
        max_bytes: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>> {
        Box::pin(async move {
            if !self.open {
                return Err(Error::NotConnected);
            }
            match self.replies.pop_front() {
                Some(Reply::Data(data)) => Ok(data.slice(..data.len().min(max_bytes))),
                Some(Reply::Silence) | None => {
                    tokio::time::sleep(self.read_timeout).await;
                    Ok(Bytes::new())
                }
                Some(Reply::Closed) => {
                    self.open = false;
                    Err(Error::ChannelClosed)
                }
            }
        })
    }

    fn flush(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.flushes += 1;
            Ok(())
        })
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        self.resets += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
