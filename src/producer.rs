use crate::error::PipeError;
use crate::shared::Shared;
use crate::sync::Arc;

/// Producer end of a pipe. Cloning mints another producer; the pipe
/// signals end-of-stream to consumers once every producer is gone.
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Producer { shared }
    }

    /// Append the records in `records` to the pipe, growing the buffer as
    /// needed and waking blocked consumers.
    ///
    /// `records.len()` must be a whole number of elements. The append is
    /// atomic: records from concurrent pushes never interleave. Never
    /// blocks on a full buffer; storage grows instead, and growth failure
    /// is reported without appending anything.
    pub fn push(&self, records: &[u8]) -> Result<(), PipeError> {
        self.shared.push(records)
    }

    /// Raise the capacity floor to `count` records. `count == 0` restores
    /// the default floor.
    pub fn reserve(&self, count: usize) -> Result<(), PipeError> {
        self.shared.reserve(count)
    }

    /// Records discarded because no consumer handle remained.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped()
    }

    pub fn elem_size(&self) -> usize {
        self.shared.elem_size()
    }

    /// Records currently queued.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

impl Clone for Producer {
    fn clone(&self) -> Self {
        self.shared.add_producer();
        Producer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.shared.release_producer();
    }
}
