//! Async driver for one simulation.
//!
//! The driver task is the only owner of the [`Simulation`]. The candle fetch
//! runs in its own cancellable task and hands its result back over a oneshot
//! channel; the driver then advances the clock on a fixed cadence. Commands
//! from the outside arrive over an mpsc channel and are applied between
//! ticks, so `advance()` and ledger mutations never overlap.
//!
//! ```text
//!            commands (mpsc)                 events (mpsc)
//!  handle ─────────────────────► driver ─────────────────────► handle
//!                                  ▲
//!                    oneshot       │
//!  fetch task ─────────────────────┘
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::controller::Simulation;
use super::snapshot::{Snapshot, TerminalNotice};
use crate::config::SimulationSettings;
use crate::error::{DataSourceError, SimulationError};
use crate::ledger::{Direction, Position, TradeRecord};
use crate::market::{Candle, CandleDataSource, CandleInterval};

/// Shortest cadence the driver will tick at.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Reply channel for a command.
pub type Reply<T> = oneshot::Sender<Result<T, SimulationError>>;

/// Driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Wall-clock delay between ticks, floored at [`MIN_TICK_INTERVAL`].
    pub tick_interval: Duration,
    /// Capacity of the command channel.
    pub command_buffer: usize,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            command_buffer: 32,
            event_buffer: 1024,
        }
    }
}

impl DriverConfig {
    /// Set the tick cadence.
    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}

impl From<&SimulationSettings> for DriverConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self::default().with_tick_interval(Duration::from_millis(settings.tick_interval_ms))
    }
}

/// Request sent to a running driver.
#[derive(Debug)]
pub enum SimulationCommand {
    /// Open a position at the latest price.
    OpenPosition {
        /// Long or short.
        direction: Direction,
        /// Cash to commit.
        amount_in_cash: Decimal,
        /// Optional protective exit level.
        limit_price: Option<Decimal>,
        /// Reply channel.
        reply: Reply<Position>,
    },
    /// Close a position at the latest price.
    ClosePosition {
        /// Position to close.
        position_id: Uuid,
        /// Reply channel.
        reply: Reply<TradeRecord>,
    },
    /// Change playback speed from the next candle.
    SetSpeed {
        /// New multiplier.
        speed: u32,
        /// Reply channel.
        reply: Reply<()>,
    },
    /// Stop the driver.
    Stop,
}

/// Output of a running driver, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationEvent {
    /// Candles are loaded and ticking is about to start.
    Loaded {
        /// Active ticker.
        ticker: String,
        /// Number of candles loaded.
        candles: usize,
    },
    /// One tick was processed.
    Tick(Box<Snapshot>),
    /// The run is over; no further events follow.
    Terminal(TerminalNotice),
}

/// Spawns simulation drivers.
pub struct SimulationDriver;

impl SimulationDriver {
    /// Spawn a driver for `simulation`, loading candles from `source`.
    #[must_use]
    pub fn spawn(
        simulation: Simulation,
        source: Arc<dyn CandleDataSource>,
        config: DriverConfig,
    ) -> SimulationHandle {
        Self::spawn_with_shutdown(simulation, source, config, CancellationToken::new())
    }

    /// Spawn a driver that also stops when `shutdown` is cancelled.
    ///
    /// The driver works on a child of `shutdown`, so stopping or cancelling
    /// this driver never cancels the caller's token.
    #[must_use]
    pub fn spawn_with_shutdown(
        simulation: Simulation,
        source: Arc<dyn CandleDataSource>,
        config: DriverConfig,
        shutdown: CancellationToken,
    ) -> SimulationHandle {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let ticker = simulation.ticker().to_string();
        let shutdown = shutdown.child_token();

        let task = tokio::spawn(run(
            simulation,
            source,
            config,
            command_rx,
            event_tx,
            shutdown.clone(),
        ));

        SimulationHandle {
            ticker,
            commands: command_tx,
            events: event_rx,
            shutdown,
            task,
        }
    }
}

/// Caller's side of a running driver.
#[derive(Debug)]
pub struct SimulationHandle {
    ticker: String,
    commands: mpsc::Sender<SimulationCommand>,
    events: mpsc::Receiver<SimulationEvent>,
    shutdown: CancellationToken,
    task: JoinHandle<Simulation>,
}

impl SimulationHandle {
    /// Wait for the next event. `None` once the driver has exited.
    pub async fn next_event(&mut self) -> Option<SimulationEvent> {
        self.events.recv().await
    }

    /// Open a position at the latest price.
    pub async fn open_position(
        &self,
        direction: Direction,
        amount_in_cash: Decimal,
        limit_price: Option<Decimal>,
    ) -> Result<Position, SimulationError> {
        self.request(|reply| SimulationCommand::OpenPosition {
            direction,
            amount_in_cash,
            limit_price,
            reply,
        })
        .await
    }

    /// Close a position at the latest price.
    pub async fn close_position(&self, position_id: Uuid) -> Result<TradeRecord, SimulationError> {
        self.request(|reply| SimulationCommand::ClosePosition { position_id, reply })
            .await
    }

    /// Change playback speed.
    pub async fn set_speed(&self, speed: u32) -> Result<(), SimulationError> {
        self.request(|reply| SimulationCommand::SetSpeed { speed, reply })
            .await
    }

    /// Ask the driver to stop after the command queue drains to this point.
    pub async fn stop(&self) {
        if self.commands.send(SimulationCommand::Stop).await.is_err() {
            debug!(ticker = %self.ticker, "Driver already stopped");
        }
    }

    /// Stop the driver immediately, cancelling any in-flight fetch.
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Token that stops the driver when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drain remaining events and wait for the driver to finish.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the driver task panicked or was aborted.
    pub async fn join(mut self) -> Result<Simulation, JoinError> {
        while self.events.recv().await.is_some() {}
        self.task.await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SimulationCommand,
    ) -> Result<T, SimulationError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| self.stopped())?;
        rx.await.map_err(|_| self.stopped())?
    }

    fn stopped(&self) -> SimulationError {
        SimulationError::SimulationFailed {
            ticker: self.ticker.clone(),
            reason: "driver stopped".to_string(),
        }
    }
}

async fn run(
    mut simulation: Simulation,
    source: Arc<dyn CandleDataSource>,
    config: DriverConfig,
    mut commands: mpsc::Receiver<SimulationCommand>,
    events: mpsc::Sender<SimulationEvent>,
    shutdown: CancellationToken,
) -> Simulation {
    let ticker = simulation.ticker().to_string();
    let fetch_cancel = shutdown.child_token();
    let mut fetched = spawn_fetch(
        source,
        ticker.clone(),
        simulation.interval(),
        fetch_cancel.clone(),
    );

    let result = loop {
        tokio::select! {
            result = &mut fetched => {
                break result.unwrap_or_else(|_| Err(DataSourceError::Cancelled {
                    ticker: ticker.clone(),
                }));
            }
            Some(command) = commands.recv() => {
                if handle_command(&mut simulation, command).is_break() {
                    info!(ticker = %ticker, "Driver stopped before candles loaded");
                    fetch_cancel.cancel();
                    return simulation;
                }
            }
            () = shutdown.cancelled() => {
                info!(ticker = %ticker, "Driver cancelled before candles loaded");
                return simulation;
            }
        }
    };

    match simulation.load_candles(result) {
        Ok(candles) => {
            let loaded = SimulationEvent::Loaded {
                ticker: ticker.clone(),
                candles,
            };
            if events.send(loaded).await.is_err() {
                return simulation;
            }
        }
        Err(err) => {
            emit_terminal(&events, &ticker, &err).await;
            return simulation;
        }
    }

    let mut interval = tokio::time::interval(config.tick_interval.max(MIN_TICK_INTERVAL));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match simulation.advance() {
                    Ok(snapshot) => {
                        if events.send(SimulationEvent::Tick(Box::new(snapshot))).await.is_err() {
                            debug!(ticker = %ticker, "Event receiver dropped");
                            break;
                        }
                    }
                    Err(err) => {
                        emit_terminal(&events, &ticker, &err).await;
                        break;
                    }
                }
            }
            Some(command) = commands.recv() => {
                if handle_command(&mut simulation, command).is_break() {
                    info!(ticker = %ticker, "Driver stopped");
                    break;
                }
            }
            () = shutdown.cancelled() => {
                info!(ticker = %ticker, "Driver cancelled");
                break;
            }
        }
    }

    simulation
}

fn spawn_fetch(
    source: Arc<dyn CandleDataSource>,
    ticker: String,
    interval: CandleInterval,
    cancel: CancellationToken,
) -> oneshot::Receiver<Result<Vec<Candle>, DataSourceError>> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = tokio::select! {
            result = source.fetch_candles(&ticker, interval) => result,
            () = cancel.cancelled() => Err(DataSourceError::Cancelled {
                ticker: ticker.clone(),
            }),
        };
        if tx.send(result).is_err() {
            debug!(ticker = %ticker, "Candle fetch finished after driver exit");
        }
    });

    rx
}

fn handle_command(simulation: &mut Simulation, command: SimulationCommand) -> ControlFlow<()> {
    match command {
        SimulationCommand::OpenPosition {
            direction,
            amount_in_cash,
            limit_price,
            reply,
        } => {
            let result = simulation.open_position(direction, amount_in_cash, limit_price);
            if reply.send(result).is_err() {
                debug!("Open-position caller went away");
            }
        }
        SimulationCommand::ClosePosition { position_id, reply } => {
            let result = simulation.close_position(position_id);
            if reply.send(result).is_err() {
                debug!("Close-position caller went away");
            }
        }
        SimulationCommand::SetSpeed { speed, reply } => {
            let result = simulation.set_speed(speed);
            if reply.send(result).is_err() {
                debug!("Set-speed caller went away");
            }
        }
        SimulationCommand::Stop => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

async fn emit_terminal(
    events: &mpsc::Sender<SimulationEvent>,
    ticker: &str,
    error: &SimulationError,
) {
    let notice = TerminalNotice::from_error(ticker, error);
    if notice.is_completed() {
        info!(ticker = %ticker, "Replay completed");
    } else {
        warn!(ticker = %ticker, kind = %notice.kind, reason = %notice.reason, "Replay terminated");
    }
    if events.send(SimulationEvent::Terminal(notice)).await.is_err() {
        debug!(ticker = %ticker, "Event receiver dropped before terminal notice");
    }
}
