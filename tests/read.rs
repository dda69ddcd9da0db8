use ekio::{CompletionState, EventLoop, Operation};
use std::cell::Cell;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (Rc::clone(&count), count)
}

#[test]
fn test_two_reads_complete_in_one_flush() {
    let (mut a, a_peer) = UnixStream::pair().unwrap();
    let (mut b, b_peer) = UnixStream::pair().unwrap();
    (&a_peer).write_all(b"ping").unwrap();
    (&b_peer).write_all(b"pong").unwrap();

    let mut lp = EventLoop::init().unwrap();
    let baseline = lp.inflight();
    let (count, seen) = counter();

    let mut buf_a = [0u8; 4];
    let mut buf_b = [0u8; 4];

    let first = Rc::clone(&seen);
    lp.submit(Operation::read(a.as_raw_fd(), &mut buf_a, 0), move |_, _| {
        first.set(first.get() + 1)
    });
    lp.submit(Operation::read(b.as_raw_fd(), &mut buf_b, 0), move |_, _| {
        seen.set(seen.get() + 1)
    });

    lp.flush(true).unwrap();

    assert_eq!(count.get(), 2);
    assert_eq!(lp.inflight(), baseline);

    // Readiness only: the data is still there for the caller to read.
    a.read_exact(&mut buf_a).unwrap();
    b.read_exact(&mut buf_b).unwrap();
    assert_eq!(&buf_a, b"ping");
    assert_eq!(&buf_b, b"pong");
}

#[test]
fn test_switching_direction_is_not_fatal() {
    let (socket, peer) = UnixStream::pair().unwrap();
    let fd = socket.as_raw_fd();

    let mut lp = EventLoop::init().unwrap();
    let (reads, read_seen) = counter();
    let (writes, write_seen) = counter();

    let read = lp.submit(Operation::Recv { socket: fd }, move |_, _| {
        read_seen.set(read_seen.get() + 1)
    });
    lp.tick().unwrap();
    assert_eq!(lp.inflight(), 1);

    let write = lp.submit(Operation::Send { socket: fd }, move |_, _| {
        write_seen.set(write_seen.get() + 1)
    });
    lp.flush(true).unwrap();

    assert_eq!(writes.get(), 1);
    assert_eq!(reads.get(), 0);
    assert_eq!(lp.state(read).unwrap(), CompletionState::Idle);
    assert_eq!(lp.state(write).unwrap(), CompletionState::Idle);
    assert_eq!(lp.inflight(), 0);

    // Back to reading on the same descriptor.
    lp.resubmit(read).unwrap();
    (&peer).write_all(b"x").unwrap();
    lp.flush(true).unwrap();
    assert_eq!(reads.get(), 1);
}

#[test]
fn test_closed_descriptor_is_tolerated() {
    let (socket, peer) = UnixStream::pair().unwrap();

    let mut lp = EventLoop::init().unwrap();
    let id = lp.submit(Operation::readable(socket.as_raw_fd()), |_, _| {});
    lp.tick().unwrap();

    drop(socket);
    drop(peer);
    lp.tick().unwrap();

    // The registration can never fire now; it stays in flight.
    assert_eq!(lp.state(id).unwrap(), CompletionState::Registered);
    assert_eq!(lp.inflight(), 1);

    // A new descriptor, possibly reusing the number, registers fine.
    let (socket, peer) = UnixStream::pair().unwrap();
    (&peer).write_all(b"x").unwrap();

    let (count, seen) = counter();
    lp.submit(Operation::readable(socket.as_raw_fd()), move |_, _| {
        seen.set(seen.get() + 1)
    });
    lp.tick().unwrap();
    assert_eq!(count.get(), 1);
}
