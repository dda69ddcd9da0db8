use super::completion::{Callback, Completion, CompletionId, CompletionState, Operation};
use super::poller::{Backend, Poller};
use super::timer;
use crate::builder::EventLoopBuilder;
use crate::fifo::Fifo;
use crate::time;
use crate::utils::Slab;
use crate::{Error, Result};

use log::{debug, trace};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Single-threaded readiness event loop.
///
/// The loop owns every completion submitted to it and three queues that
/// thread through them:
/// - `io_pending`: I/O completions waiting to be registered,
/// - `timeouts`: timers that are not due yet,
/// - `completed`: completions whose callback has to run.
///
/// Each cycle expires due timers, registers a batch of pending I/O with
/// the backend, waits for readiness and then runs every ready callback.
/// Timer expiries land in `completed` before the readiness of the same
/// cycle, so they dispatch first.
pub struct EventLoop<B = Poller> {
    backend: B,

    /// Completions registered with the backend and not resolved yet.
    inflight: usize,

    completions: Slab<Completion<B>>,

    timeouts: Fifo,
    completed: Fifo,
    io_pending: Fifo,

    batch_size: usize,

    /// Reusable buffer for the tokens a wait reports.
    ready: Vec<CompletionId>,

    /// Set while `completed` is being drained.
    dispatching: bool,
}

impl EventLoop<Poller> {
    /// Creates a loop on the native backend with the default configuration.
    pub fn new() -> Result<Self> {
        EventLoopBuilder::new().build()
    }

    /// Acquires the multiplexer handle. Same as [`new`](Self::new).
    pub fn init() -> Result<Self> {
        Self::new()
    }
}

impl<B: Backend> EventLoop<B> {
    pub(crate) fn with_config(batch_size: usize, event_capacity: usize) -> Result<Self> {
        let backend = B::new(event_capacity)?;

        debug!("event loop created: batch_size={batch_size}, event_capacity={event_capacity}");

        Ok(Self {
            backend,
            inflight: 0,
            completions: Slab::new(64),
            timeouts: Fifo::new(),
            completed: Fifo::new(),
            io_pending: Fifo::new(),
            batch_size,
            ready: Vec::with_capacity(event_capacity),
            dispatching: false,
        })
    }

    /// Releases the multiplexer handle.
    ///
    /// Completions still owned by the loop are dropped without running
    /// their callbacks.
    pub fn deinit(self) {
        debug!(
            "event loop released: completions={}, inflight={}",
            self.completions.len(),
            self.inflight
        );
    }

    /// Takes ownership of a new completion and queues it.
    ///
    /// Timers go to `timeouts`, everything else to `io_pending`.
    pub fn submit<F>(&mut self, operation: Operation, callback: F) -> CompletionId
    where
        F: FnMut(&mut EventLoop<B>, CompletionId) + 'static,
    {
        let callback: Callback<B> = Box::new(callback);
        let index = self.completions.insert(Completion::new(operation, callback));

        self.enqueue(index);

        CompletionId(index)
    }

    /// Queues a dispatched completion again with the same operation.
    ///
    /// Registrations are one-shot; this is how a callback asks to be
    /// notified once more.
    pub fn resubmit(&mut self, id: CompletionId) -> Result<()> {
        self.expect_state(id, CompletionState::Idle)?;
        self.enqueue(id.0);
        Ok(())
    }

    /// Queues a dispatched completion again with a new operation.
    pub fn resubmit_with(&mut self, id: CompletionId, operation: Operation) -> Result<()> {
        self.expect_state(id, CompletionState::Idle)?;

        if let Some(completion) = self.completions.get_mut(id.0) {
            completion.operation = operation;
        }
        self.enqueue(id.0);
        Ok(())
    }

    /// Submits a timer expiring at `expires` (nanoseconds on [`time::current_time`]).
    pub fn timeout_at<F>(&mut self, expires: u64, callback: F) -> CompletionId
    where
        F: FnMut(&mut EventLoop<B>, CompletionId) + 'static,
    {
        self.submit(Operation::Timeout { expires }, callback)
    }

    /// Submits a timer expiring `duration` from now.
    pub fn timeout_after<F>(&mut self, duration: Duration, callback: F) -> CompletionId
    where
        F: FnMut(&mut EventLoop<B>, CompletionId) + 'static,
    {
        self.timeout_at(time::deadline_after(duration), callback)
    }

    /// Takes a timer that has not expired yet out of `timeouts`.
    ///
    /// Returns `false` if it was not waiting there, e.g. because it
    /// already fired. The completion stays owned by the loop, `Idle`.
    pub fn cancel_timeout(&mut self, id: CompletionId) -> Result<bool> {
        let state = self.state(id)?;

        if state != CompletionState::Pending || !self.timeouts.remove(&mut self.completions, id.0)
        {
            return Ok(false);
        }

        self.set_state(id.0, CompletionState::Idle);
        trace!("cancel_timeout: {id}");

        Ok(true)
    }

    /// Pushes an idle completion straight onto `completed`.
    ///
    /// Called from a callback, it dispatches in the current drain.
    pub fn ready(&mut self, id: CompletionId) -> Result<()> {
        self.expect_state(id, CompletionState::Idle)?;

        self.set_state(id.0, CompletionState::Ready);
        self.completed.push(&mut self.completions, id.0);
        Ok(())
    }

    /// Drops a completion and returns its operation.
    ///
    /// A registered completion cannot be removed: the backend still holds
    /// its token. Let it fire first.
    pub fn remove(&mut self, id: CompletionId) -> Result<Operation> {
        let state = self.state(id)?;

        match state {
            CompletionState::Registered => return Err(Error::InvalidState { id, state }),
            CompletionState::Pending => {
                if !self.io_pending.remove(&mut self.completions, id.0) {
                    self.timeouts.remove(&mut self.completions, id.0);
                }
            }
            CompletionState::Ready => {
                self.completed.remove(&mut self.completions, id.0);
            }
            CompletionState::Idle => {}
        }

        self.completions
            .remove(id.0)
            .map(|completion| completion.operation)
            .ok_or(Error::UnknownCompletion(id))
    }

    pub fn operation(&self, id: CompletionId) -> Result<Operation> {
        self.completions
            .get(id.0)
            .map(|completion| completion.operation)
            .ok_or(Error::UnknownCompletion(id))
    }

    pub fn state(&self, id: CompletionId) -> Result<CompletionState> {
        self.completions
            .get(id.0)
            .map(|completion| completion.state)
            .ok_or(Error::UnknownCompletion(id))
    }

    /// Number of completions registered with the backend and not resolved.
    pub fn inflight(&self) -> usize {
        self.inflight
    }

    pub fn pending_len(&self) -> usize {
        self.io_pending.len()
    }

    pub fn timeouts_len(&self) -> usize {
        self.timeouts.len()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    /// True when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.inflight == 0
            && self.io_pending.is_empty()
            && self.timeouts.is_empty()
            && self.completed.is_empty()
    }

    pub fn current_time(&self) -> u64 {
        time::current_time()
    }

    /// Runs one non-blocking cycle.
    pub fn tick(&mut self) -> Result<()> {
        self.flush(false)
    }

    /// Drives the loop until `duration` has elapsed.
    ///
    /// Readiness and other timers keep being dispatched meanwhile.
    pub fn run_for(&mut self, duration: Duration) -> Result<()> {
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);

        let timer = self.timeout_after(duration, move |_, _| flag.set(true));

        while !done.get() {
            if let Err(err) = self.flush(true) {
                if let Err(cleanup) = self.remove(timer) {
                    debug!("run_for: releasing timer {timer} failed: {cleanup}");
                }
                return Err(err);
            }
        }

        self.remove(timer)?;
        Ok(())
    }

    /// Runs one cycle.
    ///
    /// With `wait` set, blocks until readiness or the next timer; never
    /// blocks when there is nothing that could wake it.
    ///
    /// Called from inside a callback, the cycle stops short of running
    /// callbacks; whatever it made ready runs in the enclosing drain.
    pub fn flush(&mut self, wait: bool) -> Result<()> {
        let next_timeout = self.flush_timeouts();
        let submitted = self.submit_batch()?;

        if submitted == 0
            && self.completed.is_empty()
            && self.inflight == 0
            && (!wait || next_timeout.is_none())
        {
            trace!("flush: nothing to wait for");
            return Ok(());
        }

        let timeout = if !wait || !self.completed.is_empty() {
            Some(Duration::ZERO)
        } else {
            next_timeout.map(Duration::from_nanos)
        };

        self.ready.clear();
        self.backend.wait(timeout, &mut self.ready)?;

        self.inflight -= self.ready.len();

        for &id in &self.ready {
            if let Some(completion) = self.completions.get_mut(id.0) {
                completion.state = CompletionState::Ready;
                self.completed.push(&mut self.completions, id.0);
            }
        }

        trace!(
            "flush: submitted={submitted}, fired={}, inflight={}",
            self.ready.len(),
            self.inflight
        );

        self.dispatch();
        Ok(())
    }

    /// Expires due timers. Returns the delay to the next one in nanoseconds.
    pub fn flush_timeouts(&mut self) -> Option<u64> {
        self.flush_timeouts_at(time::current_time())
    }

    /// [`flush_timeouts`](Self::flush_timeouts) against an explicit `now`.
    pub fn flush_timeouts_at(&mut self, now: u64) -> Option<u64> {
        timer::flush_timeouts(
            &mut self.completions,
            &mut self.timeouts,
            &mut self.completed,
            now,
        )
    }

    /// Registers up to `batch_size` completions from `io_pending`.
    ///
    /// Every registered completion is popped off the queue and counted in
    /// flight right away. A registration that displaces an armed one on
    /// the same descriptor retires it: the displaced completion goes back
    /// to `Idle` without its callback running.
    fn submit_batch(&mut self) -> Result<usize> {
        let mut submitted = 0;

        while submitted < self.batch_size {
            let Some(index) = self.io_pending.pop(&mut self.completions) else {
                break;
            };
            let Some(completion) = self.completions.get_mut(index) else {
                continue;
            };

            let operation = completion.operation;
            let (Some(fd), Some(interest)) = (operation.fd(), operation.interest()) else {
                // Timers never reach the backend.
                self.timeouts.push(&mut self.completions, index);
                continue;
            };

            let id = CompletionId(index);
            let displaced = match self.backend.register(fd, interest, id) {
                Ok(displaced) => displaced,
                Err(err) => {
                    self.set_state(index, CompletionState::Idle);
                    return Err(err);
                }
            };

            self.set_state(index, CompletionState::Registered);
            self.inflight += 1;
            submitted += 1;

            if let Some(old) = displaced {
                debug!("{old} superseded by {id} on fd {fd}");
                self.set_state(old.0, CompletionState::Idle);
                self.inflight -= 1;
            }
        }

        Ok(submitted)
    }

    /// Runs callbacks until `completed` is empty, including the ones
    /// pushed by callbacks along the way.
    ///
    /// Drains never nest: a flush issued from inside a callback leaves
    /// `completed` to the drain already running.
    fn dispatch(&mut self) {
        if self.dispatching {
            trace!("dispatch: deferred to the running drain");
            return;
        }

        self.dispatching = true;
        while let Some(index) = self.completed.pop(&mut self.completions) {
            let Some(completion) = self.completions.get_mut(index) else {
                continue;
            };

            completion.state = CompletionState::Idle;
            let Some(mut callback) = completion.callback.take() else {
                continue;
            };

            callback(self, CompletionId(index));

            // The callback may have removed its completion, and the slot
            // may already hold a new one.
            if let Some(completion) = self.completions.get_mut(index) {
                if completion.callback.is_none() {
                    completion.callback = Some(callback);
                }
            }
        }
        self.dispatching = false;
    }

    fn enqueue(&mut self, index: usize) {
        let Some(completion) = self.completions.get_mut(index) else {
            return;
        };

        completion.state = CompletionState::Pending;

        if completion.operation.is_timeout() {
            self.timeouts.push(&mut self.completions, index);
        } else {
            self.io_pending.push(&mut self.completions, index);
        }
    }

    fn expect_state(&self, id: CompletionId, expected: CompletionState) -> Result<()> {
        let state = self.state(id)?;

        if state != expected {
            return Err(Error::InvalidState { id, state });
        }
        Ok(())
    }

    fn set_state(&mut self, index: usize, state: CompletionState) {
        if let Some(completion) = self.completions.get_mut(index) {
            completion.state = state;
        }
    }

    #[cfg(test)]
    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
