//! Timed polling loop.
//!
//! [`PollingLoop`] reads the gauge at a fixed interval and hands every sample
//! to a [`Recorder`]. A failed read is still a sample, only its pressure is
//! missing. Transport and storage errors end the run.
//!
//! Cancellation is cooperative: [`StopHandle::stop`] is checked once per
//! iteration, so a running read and the sleep after it always complete.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::client::GaugeClient;
use crate::error::Result;
use crate::recorder::Recorder;
use crate::transport::Transport;
use crate::types::PressureReading;

/// Default time between samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default run length.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(300);

/// Timing and storage settings for a polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between samples.
    pub interval: Duration,
    /// Total run length, zero for no limit.
    pub duration: Duration,
    /// Forward samples to the recorder.
    pub store: bool,
}

impl PollingConfig {
    /// Creates a configuration that stores every sample.
    #[must_use]
    pub const fn new(interval: Duration, duration: Duration) -> Self {
        Self {
            interval,
            duration,
            store: true,
        }
    }

    /// Sets whether samples are stored.
    #[must_use]
    pub const fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    /// Returns the number of samples in a bounded run, `None` if unbounded.
    ///
    /// A run of `duration` takes one sample per started `interval`.
    #[must_use]
    pub fn max_samples(&self) -> Option<u64> {
        if self.duration.is_zero() {
            return None;
        }
        if self.interval.is_zero() {
            return Some(u64::MAX);
        }
        let samples = self.duration.as_nanos().div_ceil(self.interval.as_nanos());
        Some(u64::try_from(samples).unwrap_or(u64::MAX))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_DURATION)
    }
}

/// Lifecycle of a [`PollingLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started yet.
    Idle,
    /// Taking samples.
    Running,
    /// Finished, stopped or failed. Terminal.
    Stopped,
}

/// Requests a running loop to stop after its current iteration.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests a stop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns true if a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples taken.
    pub samples: u64,
    /// Samples without a pressure value.
    pub failures: u64,
}

/// Drives a [`GaugeClient`] at a fixed cadence.
#[derive(Debug)]
pub struct PollingLoop {
    config: PollingConfig,
    state: LoopState,
    stop: StopHandle,
    next_index: u64,
    started: Option<Instant>,
}

impl PollingLoop {
    /// Creates an idle loop.
    #[must_use]
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config,
            state: LoopState::Idle,
            stop: StopHandle::default(),
            next_index: 0,
            started: None,
        }
    }

    /// Returns a handle that stops this loop.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Requests a stop, same as [`StopHandle::stop`].
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Returns the loop configuration.
    #[must_use]
    pub const fn config(&self) -> &PollingConfig {
        &self.config
    }

    fn start(&mut self) {
        self.state = LoopState::Running;
        self.next_index = 0;
        self.started = Some(Instant::now());
    }

    fn should_continue(&self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        self.config
            .max_samples()
            .is_none_or(|max| self.next_index < max)
    }

    /// Runs the loop until the configured duration has elapsed, a stop is
    /// requested or a fatal error occurs.
    ///
    /// A loop runs once; calling this on a stopped loop returns an empty
    /// summary.
    pub async fn run<T, R>(
        &mut self,
        client: &mut GaugeClient<T>,
        recorder: &mut R,
    ) -> Result<RunSummary>
    where
        T: Transport,
        R: Recorder + ?Sized,
    {
        if self.state != LoopState::Idle {
            tracing::debug!("polling loop already finished");
            return Ok(RunSummary::default());
        }

        self.start();
        tracing::info!(
            "polling every {:?} ({})",
            self.config.interval,
            self.config
                .max_samples()
                .map_or_else(|| "unbounded".to_owned(), |n| format!("{n} samples"))
        );

        let mut summary = RunSummary::default();
        let result = loop {
            if !self.should_continue() {
                break Ok(summary);
            }

            match self.poll_once(client, recorder).await {
                Ok(reading) => {
                    summary.samples += 1;
                    if !reading.is_valid() {
                        summary.failures += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("polling stopped: {}", e);
                    break Err(e);
                }
            }

            if self.should_continue() {
                tokio::time::sleep(self.config.interval).await;
            }
        };

        self.state = LoopState::Stopped;
        if result.is_ok() {
            tracing::info!(
                "polling finished: {} samples, {} failed",
                summary.samples,
                summary.failures
            );
        }
        result
    }

    /// Takes and records one sample.
    async fn poll_once<T, R>(
        &mut self,
        client: &mut GaugeClient<T>,
        recorder: &mut R,
    ) -> Result<PressureReading>
    where
        T: Transport,
        R: Recorder + ?Sized,
    {
        let pressure = client.read_pressure().await?;
        let elapsed = self.started.map_or(Duration::ZERO, |s| s.elapsed());
        let reading = PressureReading::new(self.next_index, elapsed, pressure);

        match reading.pressure {
            Some(p) => tracing::info!(
                "[{}] [{:.3}s] pressure: {:e} Torr",
                reading.index,
                reading.elapsed_secs(),
                p
            ),
            None => tracing::warn!(
                "[{}] [{:.3}s] read failed",
                reading.index,
                reading.elapsed_secs()
            ),
        }

        if self.config.store {
            recorder.append(&reading)?;
        }

        self.next_index += 1;
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GaugeConfig;
    use crate::error::Error;
    use crate::protocol::checksum_bytes;
    use crate::recorder::MemoryRecorder;
    use crate::transport::mock::{MockTransport, Reply};
    use crate::types::Address;

    fn pressure_response(pressure: f32) -> Vec<u8> {
        let mut frame = vec![b'*', 0x01, 0x02, 0x04];
        frame.extend_from_slice(&pressure.to_be_bytes());
        let crc = checksum_bytes(&frame[1..]);
        frame.extend_from_slice(&crc);
        frame
    }

    fn client(transport: MockTransport) -> GaugeClient<MockTransport> {
        GaugeClient::new(transport, GaugeConfig::new(Address::new(0x01)))
    }

    /// Stops the loop once enough samples were recorded.
    struct StopAfter {
        inner: MemoryRecorder,
        limit: usize,
        handle: StopHandle,
    }

    impl Recorder for StopAfter {
        fn append(&mut self, reading: &PressureReading) -> Result<()> {
            self.inner.append(reading)?;
            if self.inner.readings().len() >= self.limit {
                self.handle.stop();
            }
            Ok(())
        }
    }

    #[test]
    fn test_max_samples() {
        let secs = Duration::from_secs;
        assert_eq!(PollingConfig::new(secs(2), secs(10)).max_samples(), Some(5));
        assert_eq!(PollingConfig::new(secs(5), secs(300)).max_samples(), Some(60));
        assert_eq!(PollingConfig::new(secs(3), secs(10)).max_samples(), Some(4));
        assert_eq!(PollingConfig::new(secs(5), secs(1)).max_samples(), Some(1));
        assert_eq!(PollingConfig::new(secs(2), Duration::ZERO).max_samples(), None);

        let millis = Duration::from_millis;
        assert_eq!(PollingConfig::new(millis(300), millis(2100)).max_samples(), Some(7));
        assert_eq!(PollingConfig::new(millis(100), millis(300)).max_samples(), Some(3));
        assert_eq!(PollingConfig::new(millis(300), millis(2101)).max_samples(), Some(8));
        assert_eq!(
            PollingConfig::new(Duration::from_nanos(1), Duration::MAX).max_samples(),
            Some(u64::MAX)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_interval_run() {
        let mut client = client(MockTransport::opened());
        let mut recorder = MemoryRecorder::new();
        let mut polling = PollingLoop::new(PollingConfig::new(
            Duration::from_millis(300),
            Duration::from_millis(2100),
        ));

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary.samples, 7);
        assert_eq!(recorder.readings().last().map(|r| r.index), Some(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_gauge_costs_read_timeout() {
        let transport = MockTransport::opened().read_timeout(Duration::from_secs(1));
        let mut client = client(transport);
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(2), Duration::from_secs(6)));

        let start = Instant::now();
        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary, RunSummary { samples: 3, failures: 3 });
        // Settle delay plus read timeout per sample, interval between samples
        let readings = recorder.readings();
        assert!(readings[0].elapsed >= Duration::from_millis(1100));
        assert!(readings[1].elapsed >= Duration::from_millis(4200));
        assert!(readings[2].elapsed >= Duration::from_millis(7300));
        assert!(start.elapsed() < Duration::from_millis(7400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run() {
        let mut transport = MockTransport::opened();
        for i in 0..5 {
            transport.push_data(&pressure_response(1.0e-7 * (i + 1) as f32));
        }
        let mut client = client(transport);
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(2), Duration::from_secs(10)));

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary, RunSummary { samples: 5, failures: 0 });
        assert_eq!(polling.config().max_samples(), Some(5));
        assert_eq!(polling.state(), LoopState::Stopped);

        let readings = recorder.readings();
        let indices: Vec<u64> = readings.iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert!(readings.windows(2).all(|w| w[0].elapsed < w[1].elapsed));
        assert!(readings.iter().all(PressureReading::is_valid));
        assert_eq!(client.transport().written.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_timing() {
        let mut client = client(MockTransport::opened());
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(2), Duration::from_secs(6)));

        let start = Instant::now();
        polling.run(&mut client, &mut recorder).await.unwrap();

        // Each sample costs the settle delay plus the interval, no sleep after the last
        let readings = recorder.readings();
        assert_eq!(readings.len(), 3);
        assert!(readings[0].elapsed >= Duration::from_millis(100));
        assert!(readings[1].elapsed >= Duration::from_millis(2200));
        assert!(readings[2].elapsed >= Duration::from_millis(4300));
        assert!(start.elapsed() < Duration::from_millis(4400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_run_until_stopped() {
        let mut client = client(MockTransport::opened());
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(1), Duration::ZERO));
        let mut recorder = StopAfter {
            inner: MemoryRecorder::new(),
            limit: 12,
            handle: polling.stop_handle(),
        };

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary.samples, 12);
        assert_eq!(recorder.inner.readings().len(), 12);
        assert_eq!(polling.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reads_are_recorded() {
        let mut transport = MockTransport::opened();
        transport
            .push_data(&pressure_response(2.0e-8))
            .push(Reply::Silence)
            .push_data(&[b'*', 0x01])
            .push_data(&pressure_response(3.0e-8));
        let mut client = client(transport);
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(1), Duration::from_secs(4)));

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary, RunSummary { samples: 4, failures: 2 });
        let pressures: Vec<Option<f32>> =
            recorder.readings().iter().map(|r| r.pressure).collect();
        assert_eq!(pressures, [Some(2.0e-8), None, None, Some(3.0e-8)]);
        let indices: Vec<u64> = recorder.readings().iter().map(|r| r.index).collect();
        assert_eq!(indices, [0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_disabled() {
        let mut client = client(MockTransport::opened());
        let mut recorder = MemoryRecorder::new();
        let mut polling = PollingLoop::new(
            PollingConfig::new(Duration::from_secs(1), Duration::from_secs(3)).store(false),
        );

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary.samples, 3);
        assert!(recorder.readings().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_ends_run() {
        let mut transport = MockTransport::opened();
        transport
            .push_data(&pressure_response(1.0e-6))
            .push(Reply::Closed);
        let mut client = client(transport);
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(1), Duration::ZERO));

        let result = polling.run(&mut client, &mut recorder).await;

        assert!(matches!(result, Err(Error::ChannelClosed)));
        assert_eq!(polling.state(), LoopState::Stopped);
        assert_eq!(recorder.readings().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_client_fails_immediately() {
        let mut client = client(MockTransport::new());
        let mut recorder = MemoryRecorder::new();
        let mut polling = PollingLoop::new(PollingConfig::default());

        let result = polling.run(&mut client, &mut recorder).await;

        assert!(matches!(result, Err(Error::NotConnected)));
        assert!(recorder.readings().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_run() {
        let mut client = client(MockTransport::opened());
        let mut recorder = MemoryRecorder::new();
        let mut polling = PollingLoop::new(PollingConfig::default());
        polling.stop();

        let summary = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(client.transport().written.is_empty());
        assert_eq!(polling.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_once() {
        let mut client = client(MockTransport::opened());
        let mut recorder = MemoryRecorder::new();
        let mut polling =
            PollingLoop::new(PollingConfig::new(Duration::from_secs(1), Duration::from_secs(2)));

        polling.run(&mut client, &mut recorder).await.unwrap();
        let again = polling.run(&mut client, &mut recorder).await.unwrap();

        assert_eq!(again, RunSummary::default());
        assert_eq!(recorder.readings().len(), 2);
    }
}
