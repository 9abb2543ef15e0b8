use crate::application::analysis::orchestrator::AnalysisOrchestrator;
use crate::application::analysis::sections::panic_message;
use crate::application::dispatch::relay::{DeliveryAction, RelaySender};
use crate::domain::analysis::{AnalysisFailure, AnalysisOutcome};
use crate::domain::dispatch::{Admission, AnalysisRequest, DeliveryPayload, Destination, UserId};
use crate::domain::errors::DispatchError;
use crate::domain::ports::DeliverySink;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use uuid::Uuid;

type LockTable = Arc<Mutex<HashMap<UserId, Uuid>>>;

fn lock_table(table: &Mutex<HashMap<UserId, Uuid>>) -> MutexGuard<'_, HashMap<UserId, Uuid>> {
    // A panic while holding the guard cannot leave the map half-updated
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks a user BUSY for as long as it lives. Dropping it (on any exit path,
/// including unwinding) returns the user to FREE.
pub struct UserLease {
    table: LockTable,
    user_id: UserId,
    token: Uuid,
}

impl UserLease {
    /// Atomic check-and-set on the lock table
    fn acquire(table: &LockTable, user_id: UserId) -> Option<Self> {
        let mut active = lock_table(table);
        if active.contains_key(&user_id) {
            return None;
        }
        let token = Uuid::new_v4();
        active.insert(user_id, token);
        Some(Self {
            table: Arc::clone(table),
            user_id,
            token,
        })
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

impl Drop for UserLease {
    fn drop(&mut self) {
        let mut active = lock_table(&self.table);
        if active.get(&self.user_id) == Some(&self.token) {
            active.remove(&self.user_id);
        }
    }
}

/// A request bound to its lease. Exists only while the user is BUSY.
pub struct AnalysisJob {
    pub request: AnalysisRequest,
    lease: UserLease,
}

impl AnalysisJob {
    pub fn id(&self) -> Uuid {
        self.lease.token()
    }
}

struct DispatcherInner {
    orchestrator: Arc<AnalysisOrchestrator>,
    relay: RelaySender,
    sink: Arc<dyn DeliverySink>,
    runtime: Handle,
}

/// Admission control plus worker pool for analysis requests.
///
/// At most one job per user is in flight. A second request for a busy user
/// is answered with `Admission::RejectedBusy` immediately; it is not queued.
/// Every admitted job enqueues exactly one delivery action on the relay.
pub struct AnalysisDispatcher {
    locks: LockTable,
    pool: rayon::ThreadPool,
    inner: Arc<DispatcherInner>,
}

impl AnalysisDispatcher {
    /// `runtime` is the handle worker threads block on for provider I/O. It
    /// must belong to a multi-threaded runtime driven independently of the
    /// delivery scheduler.
    pub fn new(
        orchestrator: Arc<AnalysisOrchestrator>,
        relay: RelaySender,
        sink: Arc<dyn DeliverySink>,
        pool_size: usize,
        runtime: Handle,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pool_size.max(1))
            .thread_name(|i| format!("analysis-worker-{}", i))
            .panic_handler(|panic| {
                error!("Dispatcher: Worker panicked outside a job: {}", panic_message(panic.as_ref()));
            })
            .build()
            .context("Failed to build analysis worker pool")?;

        info!("Dispatcher: Worker pool ready ({} threads)", pool.current_num_threads());

        Ok(Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            pool,
            inner: Arc::new(DispatcherInner {
                orchestrator,
                relay,
                sink,
                runtime,
            }),
        })
    }

    pub fn submit_analysis(&self, user_id: UserId, symbol: &str, strategy: &str) -> Admission {
        self.submit(AnalysisRequest::new(user_id, symbol, strategy))
    }

    pub fn submit(&self, request: AnalysisRequest) -> Admission {
        let Some(lease) = UserLease::acquire(&self.locks, request.user_id) else {
            info!(
                "Dispatcher: User {} already has an analysis running, rejecting {}",
                request.user_id, request.symbol
            );
            return Admission::RejectedBusy;
        };

        let job = AnalysisJob { request, lease };
        let job_id = job.id();
        info!(
            "Dispatcher: Admitted job {} for user {} ({} {})",
            job_id, job.request.user_id, job.request.symbol, job.request.strategy
        );

        let inner = Arc::clone(&self.inner);
        self.pool.spawn(move || inner.execute(job));
        Admission::Admitted { job_id }
    }

    /// Same as `submit`, with a busy user reported as `DispatchError`
    pub fn try_submit(&self, request: AnalysisRequest) -> Result<Uuid, DispatchError> {
        let user_id = request.user_id;
        self.submit(request).into_result(user_id)
    }

    pub fn is_busy(&self, user_id: UserId) -> bool {
        lock_table(&self.locks).contains_key(&user_id)
    }

    pub fn in_flight(&self) -> usize {
        lock_table(&self.locks).len()
    }
}

impl DispatcherInner {
    fn execute(&self, job: AnalysisJob) {
        let AnalysisJob { request, lease } = job;
        let job_id = lease.token();

        let outcome = match catch_unwind(AssertUnwindSafe(|| {
            self.runtime
                .block_on(self.orchestrator.analyze(&request.symbol, &request.strategy))
        })) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!("Dispatcher: Job {} panicked: {}", job_id, detail);
                AnalysisOutcome::Failed(AnalysisFailure {
                    symbol: request.symbol.clone(),
                    strategy: request.strategy.clone(),
                    reason: format!("internal error: {}", detail),
                    notices: Vec::new(),
                })
            }
        };

        let action = delivery_action(
            Arc::clone(&self.sink),
            request.reply_to.clone(),
            DeliveryPayload::Outcome(outcome),
            format!("job {} -> {}", job_id, request.reply_to),
        );
        if let Err(action) = self.relay.enqueue(action) {
            let err = DispatchError::RelayClosed {
                job_id: job_id.to_string(),
            };
            warn!("Dispatcher: {} ({})", err, action.label());
        }

        // Released only after the result is on the relay
        drop(lease);
    }
}

/// Wraps a payload and its destination into a relay action
pub fn delivery_action(
    sink: Arc<dyn DeliverySink>,
    destination: Destination,
    payload: DeliveryPayload,
    label: String,
) -> DeliveryAction {
    DeliveryAction::new(label, move || async move {
        sink.deliver(&destination, &payload).await
    })
}
