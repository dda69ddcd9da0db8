//! Timeout management.
//!
//! Pending timers are plain completions sitting in the loop's `timeouts`
//! queue. Every cycle scans the whole queue once: due timers move to
//! `completed`, the others contribute to the next wake-up deadline.
//!
//! The queue is unsorted, so a scan is linear and each expiry is an
//! O(len) unlink. This is fine for the handful of timers a single loop
//! usually carries.

use super::completion::{Completion, CompletionState};
use crate::fifo::{Fifo, Links};
use crate::utils::Slab;

/// Moves every timer due at `now` from `timeouts` to `completed`.
///
/// Timers are appended to `completed` in queue order. Returns the
/// shortest remaining delay in nanoseconds among the timers still
/// pending, or `None` if no timer is left.
pub(crate) fn flush_timeouts<B>(
    completions: &mut Slab<Completion<B>>,
    timeouts: &mut Fifo,
    completed: &mut Fifo,
    now: u64,
) -> Option<u64> {
    let mut next_timeout: Option<u64> = None;
    let mut cursor = timeouts.peek();

    while let Some(index) = cursor {
        // Read the successor first: pushing onto `completed` rewrites the link.
        cursor = completions.next(index);

        let Some(completion) = completions.get_mut(index) else {
            continue;
        };

        // A non-timer in this queue has no expiry; treat it as due.
        let expires = completion.operation.expires().unwrap_or(0);

        if now >= expires {
            completion.state = CompletionState::Ready;
            timeouts.remove(completions, index);
            completed.push(completions, index);
        } else {
            let remaining = expires - now;
            next_timeout = Some(next_timeout.map_or(remaining, |n| n.min(remaining)));
        }
    }

    next_timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::EventLoop;
    use crate::reactor::completion::{CompletionId, Operation};

    fn noop(_: &mut EventLoop<()>, _: CompletionId) {}

    fn timer(completions: &mut Slab<Completion<()>>, timeouts: &mut Fifo, expires: u64) -> usize {
        let index = completions.insert(Completion::new(
            Operation::Timeout { expires },
            Box::new(noop),
        ));
        completions.get_mut(index).unwrap().state = CompletionState::Pending;
        timeouts.push(completions, index);
        index
    }

    #[test]
    fn test_expires_only_due_timers() {
        let mut completions = Slab::new(4);
        let mut timeouts = Fifo::new();
        let mut completed = Fifo::new();

        // Deliberately out of order: the scan must not stop early.
        let t3 = timer(&mut completions, &mut timeouts, 300);
        let t1 = timer(&mut completions, &mut timeouts, 100);
        let t2 = timer(&mut completions, &mut timeouts, 200);

        let next = flush_timeouts(&mut completions, &mut timeouts, &mut completed, 150);

        assert_eq!(next, Some(50));
        assert_eq!(completed.iter(&completions).collect::<Vec<_>>(), vec![t1]);
        assert_eq!(timeouts.iter(&completions).collect::<Vec<_>>(), vec![t3, t2]);
        assert_eq!(
            completions.get(t1).unwrap().state,
            CompletionState::Ready
        );

        let next = flush_timeouts(&mut completions, &mut timeouts, &mut completed, 300);

        assert_eq!(next, None);
        assert!(timeouts.is_empty());
        assert_eq!(
            completed.iter(&completions).collect::<Vec<_>>(),
            vec![t1, t3, t2]
        );
    }

    #[test]
    fn test_consecutive_due_timers_all_expire() {
        let mut completions = Slab::new(4);
        let mut timeouts = Fifo::new();
        let mut completed = Fifo::new();

        for expires in [10, 20, 30] {
            timer(&mut completions, &mut timeouts, expires);
        }

        let next = flush_timeouts(&mut completions, &mut timeouts, &mut completed, 30);

        assert_eq!(next, None);
        assert_eq!(completed.len(), 3);
    }

    #[test]
    fn test_empty_queue_has_no_deadline() {
        let mut completions: Slab<Completion<()>> = Slab::new(0);
        let mut timeouts = Fifo::new();
        let mut completed = Fifo::new();

        assert_eq!(
            flush_timeouts(&mut completions, &mut timeouts, &mut completed, 0),
            None
        );
        assert!(completed.is_empty());
    }
}
