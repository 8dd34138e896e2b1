use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::{EnrichedRecord, LeaderboardApi};
use crate::error::SyncError;

/// Records produced for one batch plus tallies of what was dropped.
#[derive(Debug, Default)]
pub struct EnrichOutcome {
    pub records: Vec<EnrichedRecord>,
    pub attempted: usize,
    pub not_available: usize,
    pub missing_stats: usize,
    pub failed: usize,
}

impl EnrichOutcome {
    pub fn dropped(&self) -> usize {
        self.not_available + self.missing_stats + self.failed
    }

    fn absorb(&mut self, part: EnrichOutcome) {
        self.records.extend(part.records);
        self.not_available += part.not_available;
        self.missing_stats += part.missing_stats;
        self.failed += part.failed;
    }
}

/// Enrich `usernames` with a fixed pool of `workers` tasks draining a shared queue.
///
/// Each worker sleeps `delay` after every fetch before taking the next name, so the
/// outbound rate is roughly `workers / delay`. Per-identity failures are logged and
/// counted, never returned. Completion order across workers is unspecified.
pub async fn enrich<A>(
    api: Arc<A>,
    usernames: Vec<String>,
    workers: usize,
    delay: Duration,
) -> EnrichOutcome
where
    A: LeaderboardApi + ?Sized + 'static,
{
    let attempted = usernames.len();
    if attempted == 0 {
        return EnrichOutcome::default();
    }
    let workers = workers.max(1).min(attempted);
    let queue = Arc::new(Mutex::new(VecDeque::from(usernames)));

    let mut set = JoinSet::new();
    for worker in 0..workers {
        let api = Arc::clone(&api);
        let queue = Arc::clone(&queue);
        set.spawn(async move { drain(worker, &*api, &queue, delay).await });
    }

    let mut outcome = EnrichOutcome {
        attempted,
        ..Default::default()
    };
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(part) => outcome.absorb(part),
            Err(e) => error!(error = %e, "enrichment worker aborted"),
        }
    }
    debug!(
        attempted,
        enriched = outcome.records.len(),
        dropped = outcome.dropped(),
        "enrichment batch joined"
    );
    outcome
}

async fn drain<A>(
    worker: usize,
    api: &A,
    queue: &Mutex<VecDeque<String>>,
    delay: Duration,
) -> EnrichOutcome
where
    A: LeaderboardApi + ?Sized,
{
    let mut out = EnrichOutcome::default();
    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(username) = next else { break };

        match api.fetch_record(&username).await {
            Ok(record) => {
                debug!(
                    worker,
                    username = %username,
                    solved = record.total_problems_solved,
                    "identity enriched"
                );
                out.records.push(record);
            }
            Err(SyncError::IdentityNotAvailable(_)) => {
                warn!(worker, username = %username, "identity not available; skipping");
                out.not_available += 1;
            }
            Err(SyncError::MissingAggregateStat(_)) => {
                warn!(worker, username = %username, "no 'All' submission stat; skipping");
                out.missing_stats += 1;
            }
            Err(e) => {
                error!(worker, username = %username, error = %e, "identity fetch failed; skipping");
                out.failed += 1;
            }
        }

        if queue.lock().unwrap_or_else(PoisonError::into_inner).is_empty() {
            break;
        }
        sleep(delay).await;
    }
    out
}
