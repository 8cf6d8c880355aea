//! Simulation controller.
//!
//! A [`Simulation`] is the single owner of one run's clock and account. Each
//! call to [`Simulation::advance`] emits one tick, settles any limit hits on
//! the active ticker, re-marks the account and returns a [`Snapshot`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sink::{TradeSink, UserId};
use super::snapshot::Snapshot;
use crate::config::SimulationSettings;
use crate::error::{DataSourceError, SimulationError};
use crate::ledger::{
    Account, AccountSummary, Direction, ExitReason, Position, TradeRecord, is_limit_hit,
};
use crate::market::{Candle, CandleDataSource, CandleInterval};
use crate::observability;
use crate::replay::{
    ClockConfig, ClockState, DEFAULT_TICK_BUDGET, PlaybackSpeed, SimulationClock, Tick,
    TickSynthesizer,
};

/// Input for [`Simulation::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSetup {
    /// Ticker to replay.
    pub ticker: String,
    /// Owner of the run.
    pub user: UserId,
    /// Starting cash.
    pub initial_balance: Decimal,
    /// Playback speed multiplier.
    pub speed: u32,
    /// Tick budget divided by the speed.
    pub tick_budget: usize,
    /// Candle width requested from the data source.
    pub interval: CandleInterval,
    /// Fixed RNG seed.
    pub seed: Option<u64>,
}

impl SimulationSetup {
    /// Create a setup with the default tick budget, daily candles and an
    /// OS-seeded synthesizer.
    #[must_use]
    pub fn new(
        ticker: impl Into<String>,
        user: UserId,
        initial_balance: Decimal,
        speed: u32,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            user,
            initial_balance,
            speed,
            tick_budget: DEFAULT_TICK_BUDGET,
            interval: CandleInterval::default(),
            seed: None,
        }
    }

    /// Set the tick budget.
    #[must_use]
    pub const fn with_tick_budget(mut self, tick_budget: usize) -> Self {
        self.tick_budget = tick_budget;
        self
    }

    /// Set the candle interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: CandleInterval) -> Self {
        self.interval = interval;
        self
    }

    /// Seed the tick synthesizer.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl From<&SimulationSettings> for SimulationSetup {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            ticker: settings.ticker.clone(),
            user: UserId::new(settings.user.clone()),
            initial_balance: settings.initial_balance,
            speed: settings.speed,
            tick_budget: settings.tick_budget,
            interval: settings.interval,
            seed: settings.seed,
        }
    }
}

/// One simulation run: clock, account and trade sink.
pub struct Simulation {
    ticker: String,
    user: UserId,
    interval: CandleInterval,
    clock: SimulationClock,
    account: Account,
    sink: Arc<dyn TradeSink>,
    last_tick: Option<Tick>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("ticker", &self.ticker)
            .field("user", &self.user)
            .field("state", &self.clock.state())
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Validate the setup and create an unloaded simulation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an empty ticker, a non-positive
    /// balance, a speed outside the valid set or a zero tick budget.
    pub fn setup(setup: SimulationSetup, sink: Arc<dyn TradeSink>) -> Result<Self, SimulationError> {
        let ticker = setup.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(SimulationError::invalid_configuration(
                "ticker must not be empty",
            ));
        }
        let speed = PlaybackSpeed::new(setup.speed)?;
        if setup.tick_budget == 0 {
            return Err(SimulationError::invalid_configuration(
                "tick budget must be positive",
            ));
        }
        let account = Account::new(setup.initial_balance)?;

        let config = ClockConfig {
            speed,
            tick_budget: setup.tick_budget,
            interval: setup.interval,
        };
        let synthesizer = setup
            .seed
            .map_or_else(TickSynthesizer::new, TickSynthesizer::seeded);

        info!(
            ticker = %ticker,
            user = %setup.user,
            initial_balance = %setup.initial_balance,
            speed = %speed,
            interval = %setup.interval,
            "Simulation set up"
        );

        Ok(Self {
            clock: SimulationClock::with_synthesizer(ticker.clone(), config, synthesizer),
            ticker,
            user: setup.user,
            interval: setup.interval,
            account,
            sink,
            last_tick: None,
        })
    }

    /// Fetch candles for the active ticker and load them.
    ///
    /// # Errors
    ///
    /// Returns `DataSource` or `InvalidCandle`; the clock is left `Failed`.
    pub async fn load(&mut self, source: &dyn CandleDataSource) -> Result<usize, SimulationError> {
        debug!(ticker = %self.ticker, source = source.name(), "Fetching candles");
        let result = source.fetch_candles(&self.ticker, self.interval).await;
        self.load_candles(result)
    }

    /// Apply the outcome of a candle fetch that ran elsewhere.
    ///
    /// Returns the number of candles loaded.
    ///
    /// # Errors
    ///
    /// Returns `DataSource` or `InvalidCandle`; the clock is left `Failed`.
    pub fn load_candles(
        &mut self,
        result: Result<Vec<Candle>, DataSourceError>,
    ) -> Result<usize, SimulationError> {
        self.last_tick = None;
        match result {
            Ok(candles) => {
                let count = candles.len();
                self.clock.load(candles)?;
                Ok(count)
            }
            Err(source_err) => {
                let err = SimulationError::from(source_err);
                self.clock.fail(&err);
                Err(err)
            }
        }
    }

    /// Emit one tick and settle the account against it.
    ///
    /// # Errors
    ///
    /// Returns `SimulationEnded` or `SimulationFailed` from the clock. Both are
    /// terminal until the next load; the account is not touched.
    pub fn advance(&mut self) -> Result<Snapshot, SimulationError> {
        let tick = self.clock.advance()?;
        let closed_trades = self.close_hit_limits(&tick);

        let equity = self.equity_at(tick.price);
        let drawdown = self.account.update_peak_and_drawdown(equity);
        let return_rate = self.account.total_return_rate(equity);

        observability::update_account(
            &self.ticker,
            equity,
            drawdown,
            self.account.open_positions().len(),
        );

        debug!(
            ticker = %self.ticker,
            candle_index = tick.candle_index,
            ordinal = tick.ordinal,
            price = %tick.price,
            equity = %equity,
            "Tick"
        );

        let snapshot = Snapshot {
            ticker: self.ticker.clone(),
            timestamp: tick.timestamp,
            candle_index: tick.candle_index,
            tick_ordinal: tick.ordinal,
            price: tick.price,
            equity,
            return_rate,
            drawdown,
            max_drawdown: self.account.max_drawdown(),
            cash: self.account.cash_balance(),
            price_history: self.clock.price_history(),
            open_positions: self.account.open_positions().to_vec(),
            closed_trades,
        };
        self.last_tick = Some(tick);
        Ok(snapshot)
    }

    /// Open a position on the active ticker at the latest price.
    ///
    /// # Errors
    ///
    /// - `NoPrice` before the first tick.
    /// - `InvalidAmount` / `InsufficientFunds` from the ledger.
    pub fn open_position(
        &mut self,
        direction: Direction,
        amount_in_cash: Decimal,
        limit_price: Option<Decimal>,
    ) -> Result<Position, SimulationError> {
        let (price, time) = self.current_quote()?;
        self.account.open_position(
            &self.ticker,
            direction,
            amount_in_cash,
            price,
            limit_price,
            time,
        )
    }

    /// Close a position at the latest price and persist the trade.
    ///
    /// # Errors
    ///
    /// - `NoPrice` before the first tick.
    /// - `PositionNotFound` if the position is not open.
    pub fn close_position(&mut self, position_id: Uuid) -> Result<TradeRecord, SimulationError> {
        let (price, time) = self.current_quote()?;
        let record = self
            .account
            .close_position(position_id, price, time, ExitReason::Manual)?;
        self.persist(&record);
        Ok(record)
    }

    /// Change playback speed from the next candle on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a speed outside the valid set.
    pub fn set_speed(&mut self, speed: u32) -> Result<(), SimulationError> {
        let speed = PlaybackSpeed::new(speed)?;
        self.clock.set_speed(speed);
        Ok(())
    }

    /// Aggregate statistics over closed trades.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        self.account.summary()
    }

    /// Current equity, marked at the latest price.
    #[must_use]
    pub fn equity(&self) -> Decimal {
        self.last_tick
            .as_ref()
            .map_or_else(|| self.account.cash_balance(), |t| self.equity_at(t.price))
    }

    /// Active ticker.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Owner of the run.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    /// Candle width requested on load.
    #[must_use]
    pub const fn interval(&self) -> CandleInterval {
        self.interval
    }

    /// Clock state.
    #[must_use]
    pub const fn state(&self) -> ClockState {
        self.clock.state()
    }

    /// The simulation clock.
    #[must_use]
    pub const fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// The paper-trading account.
    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Latest emitted tick.
    #[must_use]
    pub const fn last_tick(&self) -> Option<&Tick> {
        self.last_tick.as_ref()
    }

    fn current_quote(&self) -> Result<(Decimal, DateTime<Utc>), SimulationError> {
        self.last_tick
            .as_ref()
            .map(|t| (t.price, t.timestamp))
            .ok_or_else(|| SimulationError::NoPrice {
                ticker: self.ticker.clone(),
            })
    }

    fn equity_at(&self, price: Decimal) -> Decimal {
        self.account
            .total_equity(|ticker| (ticker == self.ticker).then_some(price))
    }

    fn close_hit_limits(&mut self, tick: &Tick) -> Vec<TradeRecord> {
        let hit: Vec<Uuid> = self
            .account
            .positions_for(&self.ticker)
            .filter(|p| is_limit_hit(p, tick.price))
            .map(|p| p.id)
            .collect();

        let mut closed = Vec::with_capacity(hit.len());
        for position_id in hit {
            match self.account.close_position(
                position_id,
                tick.price,
                tick.timestamp,
                ExitReason::Limit,
            ) {
                Ok(record) => {
                    info!(
                        position_id = %position_id,
                        ticker = %self.ticker,
                        price = %tick.price,
                        "Limit hit, position closed"
                    );
                    self.persist(&record);
                    closed.push(record);
                }
                Err(e) => {
                    warn!(position_id = %position_id, error = %e, "Failed to close position on limit hit");
                }
            }
        }
        closed
    }

    fn persist(&self, record: &TradeRecord) {
        observability::record_trade_closed(&record.ticker, record.exit_reason.as_str());
        if let Err(e) = self.sink.record_trade(&self.user, record) {
            warn!(
                user = %self.user,
                position_id = %record.position_id,
                error = %e,
                "Failed to persist trade"
            );
        }
    }
}
