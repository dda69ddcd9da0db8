use ekio::{EventLoop, Operation, current_time};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[test]
fn test_run_for_fires_timer() {
    let mut lp = EventLoop::init().unwrap();
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    let start = Instant::now();
    lp.timeout_after(Duration::from_millis(10), move |_, _| flag.set(true));
    lp.run_for(Duration::from_millis(10)).unwrap();

    assert!(fired.get(), "timer callback should have run");
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert_eq!(lp.timeouts_len(), 0);
    assert_eq!(lp.completed_len(), 0);
    assert_eq!(lp.pending_len(), 0);
    assert_eq!(lp.inflight(), 0);

    lp.deinit();
}

#[test]
fn test_cancelled_timer_never_fires() {
    let mut lp = EventLoop::init().unwrap();
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    let id = lp.timeout_after(Duration::from_millis(5), move |_, _| flag.set(true));
    assert!(lp.cancel_timeout(id).unwrap());

    lp.run_for(Duration::from_millis(15)).unwrap();

    assert!(!fired.get(), "cancelled timer should not run");
    assert!(lp.is_idle());
}

#[test]
fn test_periodic_timer_by_resubmission() {
    let mut lp = EventLoop::init().unwrap();
    let count = Rc::new(Cell::new(0));
    let seen = Rc::clone(&count);

    lp.timeout_after(Duration::from_millis(5), move |lp, id| {
        seen.set(seen.get() + 1);

        let expires = current_time() + Duration::from_millis(5).as_nanos() as u64;
        lp.resubmit_with(id, Operation::Timeout { expires }).unwrap();
    });

    lp.run_for(Duration::from_millis(50)).unwrap();

    assert!(count.get() >= 2, "timer fired {} times", count.get());
    assert_eq!(lp.timeouts_len(), 1);
}

#[test]
fn test_tick_without_work_returns_immediately() {
    let mut lp = EventLoop::init().unwrap();

    let start = Instant::now();
    lp.timeout_after(Duration::from_secs(60), |_, _| {});
    lp.tick().unwrap();
    lp.tick().unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(lp.timeouts_len(), 1);
}
