//! Session loop
//!
//! One blocking thread owns the emulator, the button timer and the client
//! set. Each tick is one uninterrupted unit:
//!
//! 1. drain session inputs (connects, disconnects, button commands)
//! 2. step `frame_stride` frames, driving the button timer around each step
//! 3. compose a snapshot
//! 4. serialize it once and queue it for every client
//! 5. sleep until the next tick
//!
//! The transport talks to the loop only through the bounded input channel
//! and each client's bounded outbound queue.

mod buttons;
mod hub;

pub use buttons::ButtonTimer;
pub use hub::{ClientHub, ClientId, DropReason};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use statecast_shared::{Button, encode_state_update};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::compose::{Composer, FrameContext, GameState, Snapshot};
use crate::config::SessionConfig;
use crate::emulator::{Emulator, EmulatorFault};

/// Events delivered from the transport to the loop
#[derive(Debug)]
pub enum SessionInput<F> {
    Connected {
        id: ClientId,
        outbox: mpsc::Sender<F>,
    },
    Disconnected {
        id: ClientId,
    },
    Button {
        client: ClientId,
        button: Button,
    },
}

/// Session loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started, or fully stopped
    Idle,
    /// Between ticks
    Running,
    /// Advancing the emulator
    Stepping,
    /// Queueing the snapshot for clients
    Broadcasting,
    /// Discarding inputs and releasing clients
    ShuttingDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Stepping => "stepping",
            SessionState::Broadcasting => "broadcasting",
            SessionState::ShuttingDown => "shutting down",
        })
    }
}

/// Failures that halt the loop
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Emulator(#[from] EmulatorFault),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub state: GameState,
    /// Clients that received the snapshot
    pub delivered: usize,
    pub dropped: Vec<(ClientId, DropReason)>,
}

/// Running totals, logged periodically and on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub frames: u64,
    pub commands: u64,
    pub snapshots_sent: u64,
    pub clients_dropped: u64,
}

/// Tick-driven loop over one emulator.
///
/// `F` is the frame type queued for clients; the WebSocket transport uses
/// text frames.
pub struct SessionLoop<E: Emulator, F: From<String> + Clone = Utf8Bytes> {
    emulator: E,
    composer: Composer,
    timer: ButtonTimer,
    hub: ClientHub<F>,
    inputs: mpsc::Receiver<SessionInput<F>>,
    config: SessionConfig,
    shutdown: Arc<AtomicBool>,
    state: SessionState,
    frame: u64,
    last_button: Option<Button>,
    stats: SessionStats,
}

impl<E: Emulator, F: From<String> + Clone> SessionLoop<E, F> {
    pub fn new(
        emulator: E,
        composer: Composer,
        inputs: mpsc::Receiver<SessionInput<F>>,
        config: SessionConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            emulator,
            composer,
            timer: ButtonTimer::new(config.hold_frames, config.release_frames),
            hub: ClientHub::new(),
            inputs,
            config,
            shutdown,
            state: SessionState::Idle,
            frame: 0,
            last_button: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn clients(&self) -> usize {
        self.hub.len()
    }

    pub fn emulator(&self) -> &E {
        &self.emulator
    }

    /// Step the configured warm-up frames, then enter `Running`.
    ///
    /// Only valid from `Idle`; later calls do nothing.
    pub fn warm_up(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Ok(());
        }
        for _ in 0..self.config.warmup_frames {
            self.frame = self.emulator.step_frame()?;
            self.stats.frames += 1;
        }
        tracing::info!(
            frames = self.config.warmup_frames,
            frame = self.frame,
            "Emulator warmed up"
        );
        self.state = SessionState::Running;
        Ok(())
    }

    /// Run one tick: inputs, frames, snapshot, broadcast.
    pub fn tick(&mut self) -> Result<TickReport, SessionError> {
        if self.state == SessionState::Idle {
            self.warm_up()?;
        }
        self.drain_inputs();

        self.state = SessionState::Stepping;
        for _ in 0..self.config.frame_stride {
            self.timer.before_step(&mut self.emulator)?;
            self.frame = self.emulator.step_frame()?;
            self.timer.after_step(&mut self.emulator)?;
            self.stats.frames += 1;
        }

        let snapshot = self.snapshot()?;

        self.state = SessionState::Broadcasting;
        let frame = F::from(encode_state_update(&snapshot)?);
        let dropped = self.hub.broadcast(&frame);
        for (client, reason) in &dropped {
            tracing::warn!(%client, %reason, "Dropping client");
        }

        self.stats.ticks += 1;
        self.stats.snapshots_sent += self.hub.len() as u64;
        self.stats.clients_dropped += dropped.len() as u64;
        self.state = SessionState::Running;

        Ok(TickReport {
            frame: self.frame,
            state: snapshot.state,
            delivered: self.hub.len(),
            dropped,
        })
    }

    /// Compose a snapshot of the current frame without stepping.
    pub fn snapshot(&mut self) -> Result<Snapshot, SessionError> {
        let context = FrameContext {
            frame: self.frame,
            screen: self.emulator.capture_screen(),
            last_button: self.last_button,
        };
        Ok(self.composer.compose(&self.emulator, context)?)
    }

    /// Apply every queued input in arrival order.
    ///
    /// A closed input channel means the transport is gone and requests
    /// shutdown.
    fn drain_inputs(&mut self) {
        loop {
            match self.inputs.try_recv() {
                Ok(input) => self.apply(input),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.shutdown.swap(true, Ordering::Relaxed) {
                        tracing::info!("Transport closed, stopping session");
                    }
                    break;
                }
            }
        }
    }

    fn apply(&mut self, input: SessionInput<F>) {
        match input {
            SessionInput::Connected { id, outbox } => {
                self.hub.connect(id, outbox);
                tracing::info!(client = %id, clients = self.hub.len(), "Client connected");
            }
            SessionInput::Disconnected { id } => {
                if self.hub.disconnect(id) {
                    tracing::info!(client = %id, clients = self.hub.len(), "Client disconnected");
                }
            }
            SessionInput::Button { client, button } => {
                tracing::debug!(%client, %button, "Button command");
                self.timer.press(button);
                self.last_button = Some(button);
                self.stats.commands += 1;
            }
        }
    }

    /// Tick at the configured rate until shutdown is requested.
    ///
    /// An emulator fault stops the loop and is returned after clients are
    /// released.
    pub fn run(mut self) -> Result<SessionStats, SessionError> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.tick_rate_hz.max(1)));
        tracing::info!(
            tick_rate_hz = self.config.tick_rate_hz,
            frame_stride = self.config.frame_stride,
            "Session loop starting"
        );

        let result = self.warm_up().and_then(|()| {
            while !self.shutdown.load(Ordering::Relaxed) {
                let started = Instant::now();
                self.tick()?;

                let interval = self.config.summary_interval;
                if interval > 0 && self.stats.ticks % interval == 0 {
                    tracing::info!(
                        ticks = self.stats.ticks,
                        frame = self.frame,
                        clients = self.hub.len(),
                        commands = self.stats.commands,
                        dropped = self.stats.clients_dropped,
                        "Session summary"
                    );
                }

                if let Some(rest) = period.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
            Ok(())
        });

        if let Err(e) = &result {
            tracing::error!(error = %e, frame = self.frame, "Session loop halted");
        }
        self.shut_down()?;
        result.map(|()| self.stats)
    }

    /// Discard queued inputs, release held buttons and drop every client.
    pub fn shut_down(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::ShuttingDown;
        self.shutdown.store(true, Ordering::Relaxed);
        self.inputs.close();

        let mut discarded = 0;
        while self.inputs.try_recv().is_ok() {
            discarded += 1;
        }
        let clients = self.hub.len();
        self.hub.clear();
        let released = self.timer.clear(&mut self.emulator);

        tracing::info!(
            discarded,
            clients,
            ticks = self.stats.ticks,
            frames = self.stats.frames,
            "Session stopped"
        );
        self.state = SessionState::Idle;
        released?;
        Ok(())
    }
}
