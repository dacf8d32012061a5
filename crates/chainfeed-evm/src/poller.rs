//! Poll scheduler: one task per contract instance.
//!
//! ```text
//! IDLE ──tick, guard clear──▶ FETCHING ──fetch + dispatch done──▶ IDLE
//!   ▲                                                              │
//!   └─────────────── tick while FETCHING: skipped ◀────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use chainfeed_core::{BlockNumber, ContractInstance, Cursor, CursorStore, IngestError};
use futures::future::{BoxFuture, FutureExt, OptionFuture};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::fetcher::LogFetcher;

/// Per-instance state, owned by that instance's task only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub cursor: Cursor,
    in_flight: bool,
}

impl PollState {
    pub fn new(cursor: Cursor) -> Self {
        Self { cursor, in_flight: false }
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    /// Set the guard and return the block to fetch from, or `None` if a fetch
    /// is already running.
    pub fn try_begin_fetch(&mut self) -> Option<BlockNumber> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(self.cursor.next_block)
    }

    pub fn finish_fetch(&mut self) {
        self.in_flight = false;
    }
}

type Cycle = BoxFuture<'static, Result<Option<DispatchOutcome>, IngestError>>;

pub struct Poller {
    instance: ContractInstance,
    origin: BlockNumber,
    interval: Duration,
    fetcher: Arc<LogFetcher>,
    dispatcher: Arc<Dispatcher>,
    cursors: Arc<dyn CursorStore>,
}

impl Poller {
    pub fn new(
        instance: ContractInstance,
        origin: BlockNumber,
        interval: Duration,
        fetcher: Arc<LogFetcher>,
        dispatcher: Arc<Dispatcher>,
        cursors: Arc<dyn CursorStore>,
    ) -> Self {
        Self { instance, origin, interval, fetcher, dispatcher, cursors }
    }

    pub fn address(&self) -> &str {
        &self.instance.address
    }

    /// Stored cursor, raised to the origin block if it lags behind it.
    async fn initial_cursor(&self) -> Cursor {
        let stored = match self.cursors.load(&self.instance.address).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(address = %self.instance.address, error = %e, "could not load cursor, starting at origin");
                None
            }
        };
        let mut cursor = Cursor::new(self.instance.address.clone(), self.origin);
        if let Some(stored) = stored {
            cursor.advance_to(stored.next_block);
        }
        cursor
    }

    fn cycle(&self, from: BlockNumber) -> Cycle {
        let fetcher = Arc::clone(&self.fetcher);
        let dispatcher = Arc::clone(&self.dispatcher);
        let address = self.instance.address.clone();
        async move {
            let logs = fetcher.fetch_logs(&address, from).await;
            dispatcher.process(logs.as_ref()).await
        }
        .boxed()
    }

    /// Poll until `cancel` fires.
    ///
    /// Only an internal contract violation ends the loop early; every other
    /// failure is retried on the next tick from the same cursor.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), IngestError> {
        let mut state = PollState::new(self.initial_cursor().await);
        tracing::info!(
            family = %self.instance.family,
            address = %self.instance.address,
            from_block = %state.cursor.next_block,
            "tracking contract"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<Cycle> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(address = %self.instance.address, "poller stopping");
                    return Ok(());
                }
                _ = ticker.tick() => match state.try_begin_fetch() {
                    Some(from) => in_flight = Some(self.cycle(from)),
                    None => tracing::debug!(address = %self.instance.address, "fetch already in progress, skipping tick"),
                },
                Some(result) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    state.finish_fetch();
                    self.complete(&mut state, result).await?;
                }
            }
        }
    }

    async fn complete(
        &self,
        state: &mut PollState,
        result: Result<Option<DispatchOutcome>, IngestError>,
    ) -> Result<(), IngestError> {
        let address = &self.instance.address;
        match result {
            Ok(Some(DispatchOutcome { highest_block: Some(highest), .. })) => {
                let next = highest.next()?;
                let previous = state.cursor.next_block;
                if state.cursor.advance_to(next) {
                    tracing::info!(address = %address, from = %previous, to = %next, "cursor advanced");
                    if let Err(e) = self.cursors.save(&state.cursor).await {
                        tracing::warn!(address = %address, error = %e, "could not persist cursor");
                    }
                }
            }
            Ok(_) => tracing::debug!(address = %address, "no new events"),
            Err(e) if e.is_fatal() => {
                tracing::error!(address = %address, error = %e, "poller stopped on internal error");
                return Err(e);
            }
            Err(e) => tracing::warn!(address = %address, error = %e, "poll cycle failed, retrying next tick"),
        }
        Ok(())
    }
}
