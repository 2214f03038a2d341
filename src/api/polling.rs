use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

use super::{client::TaskClient, errors::ApiClientError, models::TaskRecord, types::TaskStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Shorter intervals are raised to this so a zero interval can't hammer the API.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative cancellation for [`poll_until_terminal`]. Clones share state,
/// so one can be handed to another thread and cancelled from there.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `timeout` unless cancelled first. Returns `true` when
    /// cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, wakeup) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = wakeup
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

#[derive(Clone, Debug)]
pub struct PollOptions {
    pub interval: Duration,
    /// `None` polls forever.
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_POLL_TIMEOUT),
            cancel: CancelToken::new(),
        }
    }
}

impl PollOptions {
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Checks the task every `options.interval` until it is exported.
///
/// `on_progress` sees every snapshot, the terminal one included. The wait
/// never runs past `options.timeout`: the last pause is cut short so that a
/// final check happens right at the deadline. Intervals below
/// [`MIN_POLL_INTERVAL`] are raised to it.
///
/// # Errors
///
/// `TaskFailed` when the server reports failure, `Timeout` when the task is
/// still in flight once the deadline has passed, `Cancelled` when `options.cancel` fires, or any error
/// from [`TaskClient::check_status`].
pub fn poll_until_terminal<F>(
    client: &TaskClient,
    task_id: &str,
    user_id: &str,
    options: &PollOptions,
    mut on_progress: F,
) -> Result<TaskRecord, ApiClientError>
where
    F: FnMut(&TaskRecord),
{
    let started = Instant::now();
    let deadline = options.timeout.and_then(|timeout| started.checked_add(timeout));
    let interval = options.interval.max(MIN_POLL_INTERVAL);

    loop {
        if options.cancel.is_cancelled() {
            return Err(ApiClientError::Cancelled);
        }

        let task = client.check_status(task_id, user_id)?;
        on_progress(&task);

        match task.status() {
            TaskStatus::Exported => return Ok(task),
            TaskStatus::Failed => return Err(ApiClientError::TaskFailed(Box::new(task))),
            TaskStatus::Pending | TaskStatus::Processing | TaskStatus::Unknown => (),
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(ApiClientError::Timeout {
                        task_id: task_id.to_owned(),
                        elapsed: started.elapsed(),
                    });
                }
                interval.min(deadline - now)
            }
            None => interval,
        };

        log::trace!(
            "Task {task_id} is {}, checking again in {pause:?}",
            task.status()
        );
        if options.cancel.wait(pause) {
            return Err(ApiClientError::Cancelled);
        }
    }
}
