/*!
Materializing every occurrence of a schedule within a range.

The range is recursively chopped into chunks (see the `chunk` module). The two
chunks of each split are materialized independently and their results are
concatenated, first chunk first, which keeps the output in ascending order no
matter which chunk finishes first. Indivisible chunks are walked serially.

Concurrency is bounded by a fixed number of threads: only the top few levels
of the recursion dispatch their second chunk to a new thread. Below that, each
thread chops and walks its chunk in order from a work stack. The whole
computation is bounded by a single deadline, computed once from the caller's
time budget. If the deadline passes, the computation fails with a `Timeout`
error and no partial results are returned.
*/

use std::{
    num::NonZero,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;

use crate::{
    calendar::Interval,
    chunk::{self, Chunks},
    generator::{Occurrence, Occurrences, Schedule},
    kind::Kind,
};

/// The error returned when materialization doesn't finish within its time
/// budget.
///
/// Callers can recover it from an `anyhow::Error` via `downcast_ref`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeout {
    budget: Duration,
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "materializing occurrences timed out after {budget:?}",
            budget = self.budget,
        )
    }
}

impl std::error::Error for Timeout {}

/// Computes every occurrence of a schedule within a range, in parallel and
/// within a time budget.
///
/// A materializer holds no state between calls, so materializing the same
/// range twice always produces the same occurrences in the same order.
#[derive(Clone, Debug)]
pub struct Materializer {
    budget: Duration,
    threads: NonZero<usize>,
}

impl Materializer {
    /// Create a new materializer that fails when a single call to
    /// `Materializer::materialize` takes longer than `budget`.
    ///
    /// By default, only one thread is used.
    pub fn new(budget: Duration) -> Materializer {
        Materializer { budget, threads: NonZero::<usize>::MIN }
    }

    /// Set the maximum number of threads to use.
    ///
    /// When this is `1`, no threads are spawned at all.
    pub fn threads(self, threads: NonZero<usize>) -> Materializer {
        Materializer { threads, ..self }
    }

    /// Returns every occurrence of `schedule` (a schedule of the given kind)
    /// that lies entirely within `range`, sorted by start.
    ///
    /// When this takes longer than the materializer's time budget, an error
    /// containing a `Timeout` is returned.
    pub fn materialize<S: Schedule + 'static>(
        &self,
        schedule: Arc<S>,
        kind: Kind,
        range: &Interval,
    ) -> anyhow::Result<Vec<Occurrence>> {
        let now = Instant::now();
        let task = Task {
            schedule,
            kind,
            budget: self.budget,
            // A budget too big to represent as a deadline is no budget at
            // all.
            deadline: now.checked_add(self.budget),
        };
        let forks = fork_depth(self.threads);
        log::debug!(
            "materializing {kind} occurrences within `{range}` using up to \
             {threads} thread(s) and a budget of {budget:?}",
            threads = self.threads,
            budget = self.budget,
        );
        let occurrences = task.run(range, forks)?;
        log::debug!(
            "materialized {len} occurrence(s) in {elapsed:?}",
            len = occurrences.len(),
            elapsed = now.elapsed(),
        );
        Ok(occurrences)
    }
}

/// Returns the number of recursion levels that may fork a thread so that at
/// most `threads` threads are busy at once. This is `ceil(log2(threads))`.
fn fork_depth(threads: NonZero<usize>) -> u32 {
    usize::BITS - (threads.get() - 1).leading_zeros()
}

/// The state shared by every level of a single materialization.
struct Task<S> {
    schedule: Arc<S>,
    kind: Kind,
    budget: Duration,
    deadline: Option<Instant>,
}

impl<S> Clone for Task<S> {
    fn clone(&self) -> Task<S> {
        Task {
            schedule: Arc::clone(&self.schedule),
            kind: self.kind,
            budget: self.budget,
            deadline: self.deadline,
        }
    }
}

impl<S: Schedule + 'static> Task<S> {
    fn run(
        &self,
        range: &Interval,
        forks: u32,
    ) -> anyhow::Result<Vec<Occurrence>> {
        if forks == 0 {
            return self.run_serial(range);
        }
        self.check_deadline()?;
        let Chunks { first, second } =
            chunk::chop(range, &*self.schedule, self.kind);
        match (first, second) {
            (None, None) => Ok(vec![]),
            (None, Some(chunk)) | (Some(chunk), None) => self.walk(chunk),
            (Some(first), Some(second)) => {
                self.fork(&first, second, forks - 1)
            }
        }
    }

    /// Materializes `range` on this thread.
    ///
    /// Chopping is lopsided, so the number of splits grows with the length
    /// of the range. Pending chunks are kept on the heap instead of the call
    /// stack, with the first chunk of each split always popped next.
    fn run_serial(&self, range: &Interval) -> anyhow::Result<Vec<Occurrence>> {
        let mut occurrences = vec![];
        let mut pending = vec![range.clone()];
        while let Some(range) = pending.pop() {
            self.check_deadline()?;
            let Chunks { first, second } =
                chunk::chop(&range, &*self.schedule, self.kind);
            match (first, second) {
                (None, None) => {}
                (None, Some(chunk)) | (Some(chunk), None) => {
                    occurrences.extend(self.walk(chunk)?);
                }
                (Some(first), Some(second)) => {
                    pending.push(second);
                    pending.push(first);
                }
            }
        }
        Ok(occurrences)
    }

    /// Materializes `second` on a new thread while materializing `first` on
    /// this one.
    fn fork(
        &self,
        first: &Interval,
        second: Interval,
        forks: u32,
    ) -> anyhow::Result<Vec<Occurrence>> {
        log::trace!("dispatching `{second}` to a new thread");
        let (send, recv) = flume::bounded(1);
        let task = self.clone();
        let handle = thread::Builder::new()
            .name(format!("materialize-{forks}"))
            .spawn(move || {
                let result = task.run(&second, forks);
                // The receiver is gone when the other chunk failed or the
                // deadline passed. Nobody wants this result then.
                let _ = send.send(result);
            })
            .context("failed to spawn materializer thread")?;
        let mut occurrences = self.run(first, forks)?;
        let received = match self.deadline {
            Some(deadline) => recv.recv_deadline(deadline),
            None => {
                recv.recv().map_err(|_| flume::RecvTimeoutError::Disconnected)
            }
        };
        match received {
            Ok(result) => {
                occurrences.extend(result?);
                Ok(occurrences)
            }
            Err(flume::RecvTimeoutError::Timeout) => Err(self.timeout()),
            Err(flume::RecvTimeoutError::Disconnected) => {
                // The only way the sender is dropped without sending is a
                // panic, so propagate it.
                match handle.join() {
                    Err(panic) => std::panic::resume_unwind(panic),
                    Ok(()) => anyhow::bail!(
                        "materializer thread exited without reporting a result"
                    ),
                }
            }
        }
    }

    /// Walks an indivisible chunk serially.
    fn walk(&self, chunk: Interval) -> anyhow::Result<Vec<Occurrence>> {
        log::trace!("walking `{chunk}`");
        let mut occurrences = vec![];
        for occurrence in Occurrences::new(&*self.schedule, chunk) {
            occurrences.push(occurrence);
            self.check_deadline()?;
        }
        Ok(occurrences)
    }

    fn check_deadline(&self) -> anyhow::Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(self.timeout())
            }
            _ => Ok(()),
        }
    }

    fn timeout(&self) -> anyhow::Error {
        anyhow::Error::from(Timeout { budget: self.budget })
    }
}
