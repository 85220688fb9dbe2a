//! In-memory record of live channel posts and publish counters.

use std::{collections::BTreeMap, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::{domain::MessageId, errors::Error};

/// A post that was published and not yet deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostRecord {
    pub id: MessageId,
    pub published_at: DateTime<Local>,
}

/// When the publish counter starts over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CounterReset {
    /// Count everything published since the process started.
    #[default]
    Never,
    /// Count only posts published on the current local calendar day.
    Daily,
}

impl FromStr for CounterReset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" | "none" | "off" => Ok(CounterReset::Never),
            "daily" | "day" => Ok(CounterReset::Daily),
            other => Err(Error::Config(format!(
                "unknown counter reset policy: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerStats {
    pub post_count: u64,
    pub last_published_at: Option<DateTime<Local>>,
    pub live_posts: usize,
}

#[derive(Debug, Default)]
pub struct PostLedger {
    posts: BTreeMap<MessageId, DateTime<Local>>,
    post_count: u64,
    last_published_at: Option<DateTime<Local>>,
    reset: CounterReset,
    counter_day: Option<NaiveDate>,
}

impl PostLedger {
    pub fn new(reset: CounterReset) -> Self {
        Self {
            reset,
            ..Self::default()
        }
    }

    /// Record a successful publish.
    pub fn record(&mut self, record: PostRecord) {
        let day = record.published_at.date_naive();
        if self.reset == CounterReset::Daily && self.counter_day != Some(day) {
            self.post_count = 0;
        }
        self.counter_day = Some(day);

        self.posts.insert(record.id, record.published_at);
        self.post_count += 1;
        self.last_published_at = Some(record.published_at);
    }

    pub fn get(&self, id: MessageId) -> Option<PostRecord> {
        self.posts.get(&id).map(|published_at| PostRecord {
            id,
            published_at: *published_at,
        })
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.posts.contains_key(&id)
    }

    /// Drop a post from the ledger. Counters are not touched.
    pub fn remove(&mut self, id: MessageId) -> Option<PostRecord> {
        self.posts
            .remove(&id)
            .map(|published_at| PostRecord { id, published_at })
    }

    /// Posts strictly older than `retention` at `now`, oldest first.
    pub fn expired(&self, now: DateTime<Local>, retention: Duration) -> Vec<PostRecord> {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return Vec::new();
        };
        let mut out = self
            .records()
            .into_iter()
            .filter(|r| now.signed_duration_since(r.published_at) > retention)
            .collect::<Vec<_>>();
        out.sort_by_key(|r| r.published_at);
        out
    }

    /// All live posts, ordered by message id.
    pub fn records(&self) -> Vec<PostRecord> {
        self.posts
            .iter()
            .map(|(id, published_at)| PostRecord {
                id: *id,
                published_at: *published_at,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn stats_at(&self, now: DateTime<Local>) -> LedgerStats {
        let post_count = match self.reset {
            CounterReset::Daily if self.counter_day != Some(now.date_naive()) => 0,
            _ => self.post_count,
        };
        LedgerStats {
            post_count,
            last_published_at: self.last_published_at,
            live_posts: self.posts.len(),
        }
    }

    pub fn stats(&self) -> LedgerStats {
        self.stats_at(Local::now())
    }
}

/// Shared handle to the one ledger of the process.
///
/// The scheduler task and the update dispatcher both hold clones. Reads take
/// the ledger lock briefly; anything that mutates the ledger (publish, sweep,
/// delete) first holds the cycle lock for its whole duration, network calls
/// included, so those operations never interleave.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    ledger: Arc<Mutex<PostLedger>>,
    cycle: Arc<Mutex<()>>,
}

impl SharedLedger {
    pub fn new(ledger: PostLedger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            cycle: Arc::new(Mutex::new(())),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, PostLedger> {
        self.ledger.lock().await
    }

    /// Exclusive right to run one mutating operation.
    pub async fn begin_cycle(&self) -> OwnedMutexGuard<()> {
        self.cycle.clone().lock_owned().await
    }

    pub async fn stats(&self) -> LedgerStats {
        self.ledger.lock().await.stats()
    }

    pub async fn records(&self) -> Vec<PostRecord> {
        self.ledger.lock().await.records()
    }
}

impl Default for SharedLedger {
    fn default() -> Self {
        Self::new(PostLedger::default())
    }
}
