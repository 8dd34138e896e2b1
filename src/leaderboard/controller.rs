use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::enrich::enrich;
use super::extract::extract_usernames;
use super::{LeaderboardApi, RecordSink};
use crate::error::SyncError;
use crate::util::env::{env_parse, env_parse_opt};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    StopRequested,
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("sync already running (current page {current_page})")]
    AlreadyRunning { current_page: u32 },
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Caller-supplied knobs for one run; unset or out-of-range values fall back to
/// [`SyncDefaults`].
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub start_page: Option<i64>,
    /// Page bound; `<= 0` means every page the leaderboard reports.
    pub pages: Option<i64>,
    pub workers: Option<usize>,
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SyncDefaults {
    pub workers: usize,
    pub delay: Duration,
    pub pages: Option<i64>,
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            delay: DEFAULT_DELAY,
            pages: None,
        }
    }
}

impl SyncDefaults {
    /// SYNC_WORKERS, SYNC_DELAY_MS, SYNC_PAGES.
    pub fn from_env() -> Self {
        Self {
            workers: env_parse("SYNC_WORKERS", DEFAULT_WORKERS).max(1),
            delay: Duration::from_millis(env_parse("SYNC_DELAY_MS", DEFAULT_DELAY.as_millis() as u64)),
            pages: env_parse_opt("SYNC_PAGES"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunPlan {
    start_page: u32,
    pages: Option<u32>,
    workers: usize,
    delay: Duration,
}

impl RunPlan {
    fn normalize(opts: &SyncOptions, defaults: &SyncDefaults) -> Self {
        let start_page = opts
            .start_page
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX)) as u32;
        let pages = opts
            .pages
            .or(defaults.pages)
            .filter(|p| *p > 0)
            .map(|p| p.min(i64::from(u32::MAX)) as u32);
        let workers = opts
            .workers
            .filter(|w| *w >= 1)
            .unwrap_or(defaults.workers)
            .max(1);
        let delay = opts
            .delay
            .filter(|d| !d.is_zero())
            .or(Some(defaults.delay).filter(|d| !d.is_zero()))
            .unwrap_or(DEFAULT_DELAY);
        Self {
            start_page,
            pages,
            workers,
            delay,
        }
    }

    fn end_page(&self, total_pages: u32) -> u32 {
        match self.pages {
            Some(n) => total_pages.min(self.start_page.saturating_add(n - 1)),
            None => total_pages,
        }
    }
}

#[derive(Debug, Clone)]
struct SyncRun {
    state: RunState,
    current_page: u32,
    start_page: u32,
    end_page: Option<u32>,
    workers: usize,
    delay: Duration,
    users_enriched: u64,
    users_persisted: u64,
    pages_skipped: u32,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Default for SyncRun {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            current_page: 0,
            start_page: 0,
            end_page: None,
            workers: 0,
            delay: Duration::ZERO,
            users_enriched: 0,
            users_persisted: 0,
            pages_skipped: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Point-in-time view of the controller for operators.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub active: bool,
    pub state: RunState,
    pub current_page: u32,
    pub start_page: u32,
    pub end_page: Option<u32>,
    pub workers: usize,
    pub delay_ms: u64,
    pub users_enriched: u64,
    pub users_persisted: u64,
    pub pages_skipped: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Summary returned when a run finishes or is stopped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub start_page: u32,
    pub end_page: u32,
    pub last_page: u32,
    pub pages_processed: u32,
    pub pages_skipped: u32,
    pub users_enriched: u64,
    pub users_dropped: u64,
    pub users_persisted: u64,
    pub batches_failed: u32,
    pub stopped: bool,
}

/// Owns the single active run. Cheap to clone; clones share state.
///
/// `start`/`run` admit a run only from `Idle`; `stop` flips `Running` to
/// `StopRequested`, which the page loop polls before each page. Pages are processed
/// strictly one after another, so at most one batch reaches the sink at a time.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn LeaderboardApi>,
    sink: Arc<dyn RecordSink>,
    defaults: SyncDefaults,
    run: Mutex<SyncRun>,
}

impl SyncController {
    pub fn new(
        api: Arc<dyn LeaderboardApi>,
        sink: Arc<dyn RecordSink>,
        defaults: SyncDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                sink,
                defaults,
                run: Mutex::new(SyncRun::default()),
            }),
        }
    }

    /// Admit a run and drive it on the tokio runtime.
    pub fn start(
        &self,
        opts: SyncOptions,
    ) -> Result<JoinHandle<Result<RunReport, SyncError>>, ControllerError> {
        let plan = self.admit(&opts)?;
        let this = self.clone();
        Ok(tokio::spawn(async move { this.drive(plan).await }))
    }

    /// Admit a run and drive it on the current task.
    pub async fn run(&self, opts: SyncOptions) -> Result<RunReport, ControllerError> {
        let plan = self.admit(&opts)?;
        Ok(self.drive(plan).await?)
    }

    /// Request a stop; returns false when nothing is running.
    pub fn stop(&self) -> bool {
        let mut run = self.lock();
        if run.state == RunState::Running {
            run.state = RunState::StopRequested;
            info!(current_page = run.current_page, "sync stop requested");
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> SyncStatus {
        let run = self.lock();
        SyncStatus {
            active: run.state != RunState::Idle,
            state: run.state,
            current_page: run.current_page,
            start_page: run.start_page,
            end_page: run.end_page,
            workers: run.workers,
            delay_ms: run.delay.as_millis() as u64,
            users_enriched: run.users_enriched,
            users_persisted: run.users_persisted,
            pages_skipped: run.pages_skipped,
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncRun> {
        self.inner.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self, opts: &SyncOptions) -> Result<RunPlan, ControllerError> {
        let mut run = self.lock();
        if run.state != RunState::Idle {
            warn!(current_page = run.current_page, "sync start rejected: already running");
            return Err(ControllerError::AlreadyRunning {
                current_page: run.current_page,
            });
        }
        let plan = RunPlan::normalize(opts, &self.inner.defaults);
        *run = SyncRun {
            state: RunState::Running,
            current_page: plan.start_page,
            start_page: plan.start_page,
            workers: plan.workers,
            delay: plan.delay,
            started_at: Some(Utc::now()),
            ..SyncRun::default()
        };
        Ok(plan)
    }

    fn stop_requested(&self) -> bool {
        self.lock().state == RunState::StopRequested
    }

    #[instrument(skip(self, plan), fields(start_page = plan.start_page, workers = plan.workers))]
    async fn drive(&self, plan: RunPlan) -> Result<RunReport, SyncError> {
        let _idle_on_exit = IdleOnDrop(self);
        info!(
            pages = ?plan.pages,
            delay_ms = plan.delay.as_millis() as u64,
            "sync run starting"
        );

        // The first page anchors the page bound; without it there is nothing to do.
        let first = match self.inner.api.fetch_page(plan.start_page).await {
            Ok(page) => page,
            Err(e) => {
                error!(page = plan.start_page, error = %e, "first page fetch failed; aborting run");
                return Err(e);
            }
        };
        let end_page = plan.end_page(first.total_pages);
        self.lock().end_page = Some(end_page);

        let mut report = RunReport {
            start_page: plan.start_page,
            end_page,
            last_page: plan.start_page,
            ..RunReport::default()
        };
        let mut prefetched = Some(first);

        for page in plan.start_page..=end_page {
            if self.stop_requested() {
                info!(page, "stop observed; ending run before page");
                report.stopped = true;
                break;
            }
            self.lock().current_page = page;
            report.last_page = page;

            let fetched = match prefetched.take() {
                Some(p) => Ok(p),
                None => self.inner.api.fetch_page(page).await,
            };
            match fetched {
                Ok(data) => {
                    let usernames = extract_usernames(&data);
                    let outcome = enrich(
                        Arc::clone(&self.inner.api),
                        usernames,
                        plan.workers,
                        plan.delay,
                    )
                    .await;
                    let enriched = outcome.records.len() as u64;
                    report.users_enriched += enriched;
                    report.users_dropped += outcome.dropped() as u64;

                    let mut persisted = 0u64;
                    if !outcome.records.is_empty() {
                        match self.inner.sink.upsert(&outcome.records).await {
                            Ok(rows) => persisted = rows,
                            Err(e) => {
                                error!(page, batch = enriched, error = %e, "batch upsert failed; page not persisted");
                                report.batches_failed += 1;
                            }
                        }
                    }
                    report.users_persisted += persisted;
                    report.pages_processed += 1;
                    {
                        let mut run = self.lock();
                        run.users_enriched += enriched;
                        run.users_persisted += persisted;
                    }
                    info!(
                        page,
                        end_page,
                        attempted = outcome.attempted,
                        enriched,
                        dropped = outcome.dropped(),
                        persisted,
                        "page synced"
                    );
                }
                Err(e) => {
                    warn!(page, error = %e, "page fetch failed; skipping page");
                    report.pages_skipped += 1;
                    self.lock().pages_skipped += 1;
                }
            }

            if page < end_page {
                if self.stop_requested() {
                    info!(page, "stop observed; ending run without waiting for next page");
                    report.stopped = true;
                    break;
                }
                sleep(plan.delay).await;
            }
        }

        info!(
            last_page = report.last_page,
            pages_processed = report.pages_processed,
            pages_skipped = report.pages_skipped,
            users_persisted = report.users_persisted,
            stopped = report.stopped,
            "sync run finished"
        );
        Ok(report)
    }
}

/// Returns the controller to `Idle` however `drive` exits, including when the
/// run future is dropped by a caller-side timeout.
struct IdleOnDrop<'a>(&'a SyncController);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        let mut run = self.0.lock();
        run.state = RunState::Idle;
        run.finished_at = Some(Utc::now());
    }
}
