//! Bounded-concurrency fan-out.
//!
//! [`WorkerPool::run`] hands an ordered list of tasks to at most
//! `worker_count` concurrently running workers that pull from a shared queue.
//! Every task is attempted exactly once, failures do not stop the remaining
//! tasks, and the results come back in submission order regardless of
//! completion order.
//!
//! The pool has no timeout of its own. Deadlines belong to the operation.
//! Workers live in a [`JoinSet`], so dropping an unfinished `run` future
//! aborts them.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

use crate::error::PoolError;

/// Outcome of one task.
#[derive(Debug)]
pub struct WorkerResult<T, R, E> {
    /// The task as submitted.
    pub task: T,
    /// What the operation returned for it.
    pub outcome: Result<R, E>,
}

impl<T, R, E> WorkerResult<T, R, E> {
    /// Successful response, if any.
    pub fn response(&self) -> Option<&R> {
        self.outcome.as_ref().ok()
    }

    /// Error, if the task failed.
    pub fn error(&self) -> Option<&E> {
        self.outcome.as_ref().err()
    }
}

/// Marker that at least one task failed.
///
/// Which tasks failed is recorded on the individual results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateError {
    /// Number of failed tasks.
    pub failed: usize,
    /// Number of submitted tasks.
    pub total: usize,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} upstream calls failed",
            self.failed, self.total
        )
    }
}

impl std::error::Error for AggregateError {}

/// Ordered results plus the aggregate failure marker.
pub type PoolOutput<T, R, E> = (Vec<WorkerResult<T, R, E>>, Option<AggregateError>);

/// Fixed-size pool running one operation over many tasks.
pub struct WorkerPool<F> {
    workers: usize,
    operation: Arc<F>,
}

impl<F> fmt::Debug for WorkerPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl<F> WorkerPool<F> {
    /// Create a pool with `workers` concurrent workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WorkerCount`] if `workers` is zero.
    pub fn new(workers: usize, operation: F) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::WorkerCount(workers));
        }
        Ok(Self {
            workers,
            operation: Arc::new(operation),
        })
    }

    /// Configured worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the operation over every task and wait for all of them.
    ///
    /// Results are returned in the order of `tasks`. The aggregate error is
    /// `Some` if and only if at least one task failed.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Incomplete`] if a worker was cancelled before
    /// reporting its tasks.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the operation panics inside a worker.
    pub async fn run<T, R, E, Fut>(&self, tasks: Vec<T>) -> Result<PoolOutput<T, R, E>, PoolError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        T: Clone + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok((Vec::new(), None));
        }

        let queue: Arc<Mutex<VecDeque<(usize, T)>>> =
            Arc::new(Mutex::new(tasks.into_iter().enumerate().collect()));
        let workers = self.workers.min(total);

        tracing::debug!(tasks = total, workers, "Dispatching tasks");

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let queue = queue.clone();
            let operation = self.operation.clone();
            set.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((index, task)) = next else {
                        break;
                    };
                    let outcome = (operation.as_ref())(task.clone()).await;
                    done.push((index, WorkerResult { task, outcome }));
                }
                done
            });
        }

        // One slot per task, indexed by submission order
        let mut slots: Vec<Option<WorkerResult<T, R, E>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(done) => {
                    for (index, result) in done {
                        slots[index] = Some(result);
                    }
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => tracing::error!("Worker did not complete: {}", e),
            }
        }

        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        let Some(results) = slots.into_iter().collect::<Option<Vec<_>>>() else {
            return Err(PoolError::Incomplete { completed, total });
        };

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        let aggregate = (failed > 0).then_some(AggregateError { failed, total });

        Ok((results, aggregate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Failed(String);

    /// Completes tasks out of order: later tasks finish first.
    async fn reversed_delay(task: usize) -> Result<String, Failed> {
        tokio::time::sleep(Duration::from_millis(5 * (5 - task as u64))).await;
        if task == 2 {
            Err(Failed(format!("task {task} failed")))
        } else {
            Ok(format!("done {task}"))
        }
    }

    #[tokio::test]
    async fn zero_workers_rejected() {
        let err = WorkerPool::new(0, reversed_delay).unwrap_err();
        assert!(matches!(err, PoolError::WorkerCount(0)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn results_keep_input_order_with_one_failure() {
        let pool = WorkerPool::new(2, reversed_delay).unwrap();
        let (results, aggregate) = pool.run((0..5).collect()).await.unwrap();

        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task, i);
        }

        assert_eq!(results[2].error(), Some(&Failed("task 2 failed".into())));
        assert!(results[2].response().is_none());
        for i in [0, 1, 3, 4] {
            assert_eq!(results[i].response(), Some(&format!("done {i}")));
        }

        let aggregate = aggregate.expect("aggregate error");
        assert_eq!(aggregate, AggregateError { failed: 1, total: 5 });
        assert_eq!(aggregate.to_string(), "1 of 5 upstream calls failed");
    }

    #[tokio::test]
    async fn more_workers_than_tasks_matches_exact_count() {
        let exact = WorkerPool::new(5, reversed_delay).unwrap();
        let oversized = WorkerPool::new(50, reversed_delay).unwrap();

        let (a, agg_a) = exact.run((0..5).collect()).await.unwrap();
        let (b, agg_b) = oversized.run((0..5).collect()).await.unwrap();

        fn flatten(
            results: &[WorkerResult<usize, String, Failed>],
        ) -> Vec<(usize, Option<String>, Option<String>)> {
            results
                .iter()
                .map(|r| (r.task, r.response().cloned(), r.error().map(|e| e.0.clone())))
                .collect()
        }
        assert_eq!(flatten(&a), flatten(&b));
        assert_eq!(agg_a, agg_b);
    }

    #[tokio::test]
    async fn all_success_has_no_aggregate() {
        let pool = WorkerPool::new(3, |task: u32| async move { Ok::<_, Failed>(task * 2) }).unwrap();
        let (results, aggregate) = pool.run(vec![1, 2, 3, 4]).await.unwrap();

        assert!(aggregate.is_none());
        let values: Vec<u32> = results.iter().filter_map(|r| r.response().copied()).collect();
        assert_eq!(values, vec![2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn empty_task_list() {
        let pool = WorkerPool::new(2, |task: u32| async move { Ok::<_, Failed>(task) }).unwrap();
        let (results, aggregate) = pool.run(Vec::new()).await.unwrap();
        assert!(results.is_empty());
        assert!(aggregate.is_none());
    }

    #[tokio::test]
    async fn every_task_attempted_once_despite_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pool = WorkerPool::new(2, move |task: u32| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(Failed(format!("fail {task}")))
            }
        })
        .unwrap();

        let (results, aggregate) = pool.run((0..10).collect()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(results.len(), 10);
        assert_eq!(aggregate, Some(AggregateError { failed: 10, total: 10 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded_by_worker_count() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());

        let pool = WorkerPool::new(3, move |_task: u32| {
            let (active, peak) = (a.clone(), p.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Failed>(())
            }
        })
        .unwrap();

        pool.run((0..12).collect()).await.unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn dropping_run_aborts_workers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let pool = WorkerPool::new(2, move |_task: u32| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Failed>(())
            }
        })
        .unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), pool.run(vec![1, 2, 3])).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
