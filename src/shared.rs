//! Lock and wake-up protocol shared by every handle.
//!
//! One mutex guards the ring together with the handle refcounts; one
//! condition variable is broadcast when records arrive or when the last
//! producer departs. Critical sections stay short: the only allocation
//! inside one is the resize path.

use crate::error::PipeError;
use crate::ringbuf::RingBuffer;
use crate::sync::{Condvar, Mutex, MutexGuard, PoisonError};

pub(crate) struct Shared {
    state: Mutex<State>,
    has_new_elems: Condvar,
}

struct State {
    ring: RingBuffer,
    /// Live producer-capable handles. Zero means end-of-stream once the
    /// ring drains.
    producers: usize,
    /// Live consumer-capable handles. Zero means pushed records can never
    /// be observed.
    consumers: usize,
    /// Records discarded because no consumer handle remained.
    dropped: u64,
}

fn check_aligned(len: usize, elem_size: usize) -> Result<(), PipeError> {
    if len % elem_size != 0 {
        return Err(PipeError::UnalignedLength(len, elem_size));
    }
    Ok(())
}

impl Shared {
    /// Both refcounts start at 1: the bidirectional handle issued by the
    /// factory counts as one producer and one consumer.
    pub(crate) fn new(elem_size: usize, min_cap: usize) -> Result<Self, PipeError> {
        Ok(Shared {
            state: Mutex::new(State {
                ring: RingBuffer::new(elem_size, min_cap)?,
                producers: 1,
                consumers: 1,
                dropped: 0,
            }),
            has_new_elems: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.ring.check_invariants();
        state
    }

    /// Run `f` under the lock with invariants checked on entry and exit.
    fn locked<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.lock();
        let ret = f(&mut state);
        state.ring.check_invariants();
        ret
    }

    pub(crate) fn push(&self, records: &[u8]) -> Result<(), PipeError> {
        self.locked(|state| {
            check_aligned(records.len(), state.ring.elem_size())?;

            if state.consumers == 0 {
                // No remaining handle can mint a consumer, so the records
                // could never be popped. Count them instead of storing
                // them.
                let count = (records.len() / state.ring.elem_size()) as u64;
                state.dropped += count;
                crate::pipe_trace!(count, "records discarded, no consumers");
                return Ok(());
            }

            state.ring.push(records)
        })?;

        // Broadcast with the lock released; a single signal would be wrong
        // with consumers waiting on differing batch sizes.
        self.has_new_elems.notify_all();
        Ok(())
    }

    pub(crate) fn pop(&self, target: &mut [u8]) -> Result<usize, PipeError> {
        let mut state = self.lock();
        check_aligned(target.len(), state.ring.elem_size())?;
        let requested = target.len() / state.ring.elem_size();

        while state.ring.len() < requested && state.producers > 0 {
            crate::pipe_trace!(available = state.ring.len(), requested, "pop waiting");
            state = self
                .has_new_elems
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let popped = if state.ring.len() > 0 {
            state.ring.pop(target)
        } else {
            0
        };
        state.ring.check_invariants();
        Ok(popped)
    }

    pub(crate) fn try_pop(&self, target: &mut [u8]) -> Result<usize, PipeError> {
        self.locked(|state| {
            check_aligned(target.len(), state.ring.elem_size())?;
            Ok(if state.ring.len() > 0 {
                state.ring.pop(target)
            } else {
                0
            })
        })
    }

    pub(crate) fn reserve(&self, count: usize) -> Result<(), PipeError> {
        self.locked(|state| state.ring.reserve(count))
    }

    pub(crate) fn add_producer(&self) {
        self.locked(|state| state.producers += 1);
    }

    pub(crate) fn add_consumer(&self) {
        self.locked(|state| state.consumers += 1);
    }

    pub(crate) fn add_pair(&self) {
        self.locked(|state| {
            state.producers += 1;
            state.consumers += 1;
        });
    }

    pub(crate) fn release_producer(&self) {
        self.release(true, false);
    }

    pub(crate) fn release_consumer(&self) {
        self.release(false, true);
    }

    pub(crate) fn release_pair(&self) {
        self.release(true, true);
    }

    fn release(&self, producer: bool, consumer: bool) {
        let last_producer = self.locked(|state| {
            if producer {
                debug_assert!(state.producers > 0, "producer handle released twice");
                state.producers -= 1;
            }
            if consumer {
                debug_assert!(state.consumers > 0, "consumer handle released twice");
                state.consumers -= 1;
            }
            producer && state.producers == 0
        });

        // Blocked consumers re-check the producer count and drain whatever
        // is left.
        if last_producer {
            crate::pipe_trace!("last producer released");
            self.has_new_elems.notify_all();
        }
    }

    pub(crate) fn elem_size(&self) -> usize {
        self.locked(|state| state.ring.elem_size())
    }

    pub(crate) fn len(&self) -> usize {
        self.locked(|state| state.ring.len())
    }

    pub(crate) fn capacity(&self) -> usize {
        self.locked(|state| state.ring.capacity())
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.locked(|state| state.dropped)
    }
}
