//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the event
//! loop. In particular, it exposes a [`Slab`] allocator that owns every
//! completion and hands out the stable indices the intrusive queues link
//! through.

mod slab;

pub(crate) use slab::Slab;
