use crate::Result;
use crate::reactor::EventLoop;
use crate::reactor::poller::{Backend, Poller};

const DEFAULT_BATCH_SIZE: usize = 256;
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configures and creates an [`EventLoop`].
///
/// ```no_run
/// let event_loop = ekio::EventLoopBuilder::new()
///     .batch_size(64)
///     .build()?;
/// # Ok::<(), ekio::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EventLoopBuilder {
    batch_size: usize,
    event_capacity: usize,
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopBuilder {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Maximum number of completions registered per cycle.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size;
        self
    }

    /// Maximum number of events a single wait reports.
    ///
    /// # Panics
    ///
    /// Panics if `event_capacity` is zero.
    pub fn event_capacity(mut self, event_capacity: usize) -> Self {
        assert!(event_capacity > 0, "event capacity must be positive");
        self.event_capacity = event_capacity;
        self
    }

    /// Builds a loop on the native backend.
    pub fn build(self) -> Result<EventLoop> {
        self.build_with::<Poller>()
    }

    /// Builds a loop on a backend of the caller's choice.
    pub fn build_with<B: Backend>(self) -> Result<EventLoop<B>> {
        EventLoop::with_config(self.batch_size, self.event_capacity)
    }
}
