//! Resizable circular buffer of fixed-size records.
//!
//! Storage is a single byte buffer addressed by two offsets: `begin` points
//! at the oldest record, `end` one past the newest. Two layouts occur:
//!
//! ```text
//! nowrap:   [ . . . begin >=========> end . . . ]
//! wrap:     [ =====> end . . . begin >========= ]
//! ```
//!
//! A full buffer reaches `begin == end` with every byte live and counts as
//! wrapped. Offsets are rewrapped to 0 the moment they hit the physical end
//! of the buffer, so an offset equal to `buffer.len()` never survives an
//! operation.

use crate::error::PipeError;

/// Capacity floor a fresh pipe starts with. `reserve(0)` restores it.
pub(crate) const DEFAULT_MIN_CAP: usize = 32;

pub(crate) struct RingBuffer {
    /// Bytes per record, fixed at creation.
    elem_size: usize,
    /// Records currently live.
    elem_count: usize,
    /// Record slots allocated.
    capacity: usize,
    /// Smallest capacity the buffer will shrink to.
    min_cap: usize,
    /// Backing storage, exactly `capacity * elem_size` bytes.
    buffer: Vec<u8>,
    /// Byte offset of the oldest record.
    begin: usize,
    /// Byte offset one past the newest record.
    end: usize,
}

fn alloc_bytes(len: usize) -> Result<Vec<u8>, PipeError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Smallest power of two at or above `n`, or `n` itself when no such power
/// is representable.
fn next_pow2(n: usize) -> usize {
    n.checked_next_power_of_two().unwrap_or(n)
}

fn wrap_if_at_end(offset: usize, buf_len: usize) -> usize {
    if offset == buf_len {
        0
    } else {
        offset
    }
}

impl RingBuffer {
    pub(crate) fn new(elem_size: usize, min_cap: usize) -> Result<Self, PipeError> {
        if elem_size == 0 {
            return Err(PipeError::ZeroElementSize);
        }

        let min_cap = min_cap.max(1);
        let bytes = min_cap
            .checked_mul(elem_size)
            .ok_or(PipeError::CapacityOverflow)?;

        let ring = RingBuffer {
            elem_size,
            elem_count: 0,
            capacity: min_cap,
            min_cap,
            buffer: alloc_bytes(bytes)?,
            begin: 0,
            end: 0,
        };
        ring.check_invariants();
        Ok(ring)
    }

    pub(crate) fn elem_size(&self) -> usize {
        self.elem_size
    }

    pub(crate) fn len(&self) -> usize {
        self.elem_count
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Does the live region cross the physical end of the buffer? A full
    /// buffer has `begin == end` and is wrapped; an empty one is not.
    fn wraps_around(&self) -> bool {
        self.elem_count > 0 && self.begin >= self.end
    }

    /// Asserts every structural assumption. Compiled out of release builds.
    pub(crate) fn check_invariants(&self) {
        debug_assert!(self.elem_size > 0);
        debug_assert!(
            self.capacity >= self.min_cap,
            "capacity below the minimum capacity"
        );
        debug_assert!(
            self.elem_count <= self.capacity,
            "more live records than capacity"
        );
        debug_assert_eq!(self.buffer.len(), self.capacity * self.elem_size);
        debug_assert!(
            self.begin < self.buffer.len(),
            "begin must be rewrapped before reaching the buffer end"
        );
        debug_assert!(
            self.end < self.buffer.len(),
            "end must be rewrapped before reaching the buffer end"
        );

        let live = self.elem_count * self.elem_size;
        if self.wraps_around() {
            debug_assert_eq!(live, (self.buffer.len() - self.begin) + self.end);
        } else {
            debug_assert_eq!(live, self.end - self.begin);
        }
    }

    /// Append whole records at the tail, growing the buffer if needed.
    /// On allocation failure nothing is appended.
    pub(crate) fn push(&mut self, records: &[u8]) -> Result<(), PipeError> {
        debug_assert_eq!(records.len() % self.elem_size, 0);
        self.check_invariants();

        let count = records.len() / self.elem_size;
        let needed = self
            .elem_count
            .checked_add(count)
            .ok_or(PipeError::CapacityOverflow)?;
        if needed > self.capacity {
            self.resize(next_pow2(needed))?;
        }

        // The buffer now holds enough free slots, so at most one wrap is
        // needed. Reduce the nowrap case to the wrapped one by filling the
        // tail gap first.
        let buf_len = self.buffer.len();
        let mut src = records;
        let mut end = self.end;

        if !self.wraps_around() {
            let at_end = src.len().min(buf_len - end);
            self.buffer[end..end + at_end].copy_from_slice(&src[..at_end]);
            end = wrap_if_at_end(end + at_end, buf_len);
            src = &src[at_end..];
        }

        if !src.is_empty() {
            self.buffer[end..end + src.len()].copy_from_slice(src);
            end = wrap_if_at_end(end + src.len(), buf_len);
        }

        self.end = end;
        self.elem_count += count;

        crate::pipe_trace!(
            pushed = count,
            len = self.elem_count,
            capacity = self.capacity,
            "records appended"
        );

        self.check_invariants();
        Ok(())
    }

    /// Remove up to `target.len() / elem_size` records from the head,
    /// returning how many were copied out.
    pub(crate) fn pop(&mut self, target: &mut [u8]) -> usize {
        debug_assert_eq!(target.len() % self.elem_size, 0);
        self.check_invariants();

        let requested = target.len() / self.elem_size;
        let to_copy = requested.min(self.elem_count);
        let mut remaining = to_copy * self.elem_size;
        self.elem_count -= to_copy;

        let buf_len = self.buffer.len();
        let first = remaining.min(buf_len - self.begin);
        target[..first].copy_from_slice(&self.buffer[self.begin..self.begin + first]);
        remaining -= first;
        self.begin = wrap_if_at_end(self.begin + first, buf_len);

        // Wrapped remainder sits at the front of the buffer.
        if remaining > 0 {
            target[first..first + remaining].copy_from_slice(&self.buffer[..remaining]);
            self.begin = wrap_if_at_end(remaining, buf_len);
        }

        self.check_invariants();

        // Shrink to half once occupancy falls to a quarter. The resize
        // guard keeps the capacity at or above min_cap and the live count.
        if self.elem_count <= self.capacity / 4 {
            let _ = self.resize(self.capacity / 2);
        }

        crate::pipe_trace!(
            popped = to_copy,
            len = self.elem_count,
            capacity = self.capacity,
            "records removed"
        );

        to_copy
    }

    /// Set the capacity floor to `count` records, growing the buffer when
    /// the floor exceeds the current capacity. `count == 0` restores the
    /// default floor.
    pub(crate) fn reserve(&mut self, count: usize) -> Result<(), PipeError> {
        let count = if count == 0 { DEFAULT_MIN_CAP } else { count };

        if count > self.elem_count {
            if count > self.capacity {
                self.resize(count)?;
            }
            self.min_cap = count;
        }
        Ok(())
    }

    /// Reallocate to `new_cap` slots, linearising the live region to offset
    /// 0. Refused (a no-op) when `new_cap` cannot hold the live records or
    /// sits below `min_cap`.
    fn resize(&mut self, new_cap: usize) -> Result<(), PipeError> {
        self.check_invariants();

        if new_cap <= self.elem_count || new_cap < self.min_cap {
            return Ok(());
        }

        let new_len = new_cap
            .checked_mul(self.elem_size)
            .ok_or(PipeError::CapacityOverflow)?;
        let mut new_buf = alloc_bytes(new_len)?;

        let live = self.elem_count * self.elem_size;
        if self.wraps_around() {
            let tail = self.buffer.len() - self.begin;
            new_buf[..tail].copy_from_slice(&self.buffer[self.begin..]);
            new_buf[tail..live].copy_from_slice(&self.buffer[..self.end]);
        } else {
            new_buf[..live].copy_from_slice(&self.buffer[self.begin..self.begin + live]);
        }

        crate::pipe_trace!(
            old_capacity = self.capacity,
            new_capacity = new_cap,
            "buffer resized"
        );

        self.buffer = new_buf;
        self.begin = 0;
        self.end = live;
        self.capacity = new_cap;

        self.check_invariants();
        Ok(())
    }
}
