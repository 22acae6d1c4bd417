//! Change triggers.
//!
//! A [`ChangeSource`] tells the broadcast loop when the ranking may have
//! moved. Sources either just say "something changed" (the loop then
//! queries the store) or hand over the new ranking directly, as a store
//! watch subscription does.

use std::time::Duration;

use async_trait::async_trait;
use board_core::ScoreEntry;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::info;

use crate::config::{Config, TriggerMode};
use crate::error::{ChangeError, StoreError};
use crate::store::ScoreStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The ranking may have changed; query the store.
    Changed,
    /// The ranking is now exactly this, best first.
    Ranked(Vec<ScoreEntry>),
}

#[async_trait]
pub trait ChangeSource: Send {
    /// Wait for the next change.
    async fn next_change(&mut self) -> Result<Change, ChangeError>;

    /// Short name for logs.
    fn describe(&self) -> &'static str;
}

/// Fires on a fixed period whether or not anything changed.
pub struct IntervalSource {
    ticker: Interval,
}

impl IntervalSource {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        // A slow cycle should not be followed by a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        IntervalSource { ticker }
    }
}

#[async_trait]
impl ChangeSource for IntervalSource {
    async fn next_change(&mut self) -> Result<Change, ChangeError> {
        self.ticker.tick().await;
        Ok(Change::Changed)
    }

    fn describe(&self) -> &'static str {
        "interval"
    }
}

/// Build the trigger selected by `config`.
///
/// `notify` opens a watch on the store; a store that cannot watch is an
/// error here rather than a silent switch to polling.
pub async fn build_change_source(
    config: &Config,
    store: &dyn ScoreStore,
) -> Result<Box<dyn ChangeSource>, StoreError> {
    let source: Box<dyn ChangeSource> = match config.trigger {
        TriggerMode::Interval => Box::new(IntervalSource::new(config.poll_interval())),
        TriggerMode::Notify => store.watch(&config.leaderboard_key, config.top_k).await?,
    };

    info!(
        store = store.name(),
        source = source.describe(),
        trigger = %config.trigger,
        "change source ready"
    );
    Ok(source)
}
