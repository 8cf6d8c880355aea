//! Simulation orchestration.
//!
//! - [`Simulation`]: owns one run's clock and account; one `advance()` per tick
//! - [`SimulationDriver`]: tokio task that fetches candles off the tick path and
//!   drives a `Simulation` on a fixed cadence
//! - [`TradeSink`]: where closed trades go

mod controller;
mod driver;
mod sink;
mod snapshot;

pub use controller::{Simulation, SimulationSetup};
pub use driver::{
    DriverConfig, MIN_TICK_INTERVAL, Reply, SimulationCommand, SimulationDriver, SimulationEvent,
    SimulationHandle,
};
pub use sink::{
    ChannelTradeSink, InMemoryTradeSink, NoOpTradeSink, PersistedTrade, PersistenceError,
    TradeSink, UserId,
};
pub use snapshot::{Snapshot, TerminalNotice};
