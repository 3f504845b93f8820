//! A bounded, thread-safe, multi-producer multi-consumer FIFO transporting
//! fixed-size records between threads.
//!
//! Producers append whole records at the tail; consumers remove them from
//! the head, blocking until enough arrive or every producer has gone. The
//! backing circular buffer grows to the next power of two when a push
//! overflows it and shrinks once occupancy drops to a quarter. One mutex
//! guards the whole structure and a single condition variable wakes
//! blocked consumers, so a push never blocks on space and a pop of `n`
//! records always returns a contiguous FIFO prefix.
//!
//! The pipe is reached through three handle kinds sharing one underlying
//! structure: [`Pipe`] (bidirectional, mints the others), [`Producer`] and
//! [`Consumer`]. Each handle kind is counted separately; when the last
//! producer disappears, blocked consumers wake, drain the remaining
//! records and then observe end-of-stream as a pop returning 0.

pub mod consumer;
pub mod error;
pub mod pipe;
pub mod producer;
mod ringbuf;
mod shared;
pub(crate) mod sync;
mod trace_macro;

pub use consumer::Consumer;
pub use error::PipeError;
pub use pipe::Pipe;
pub use producer::Producer;
