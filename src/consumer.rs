use crate::error::PipeError;
use crate::shared::Shared;
use crate::sync::Arc;

/// Consumer end of a pipe. Cloning mints another consumer; each pop hands
/// out a contiguous FIFO prefix.
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Consumer { shared }
    }

    /// Remove up to `target.len() / elem_size` records from the pipe,
    /// blocking until that many are available or every producer is gone.
    ///
    /// Returns the number of records copied into `target`. `Ok(0)` means
    /// the pipe is empty and no producer remains: the stream has ended.
    /// Spurious wake-ups are absorbed by re-checking the condition.
    pub fn pop(&self, target: &mut [u8]) -> Result<usize, PipeError> {
        self.shared.pop(target)
    }

    /// Remove whatever is immediately available, up to
    /// `target.len() / elem_size` records, without blocking.
    ///
    /// Returns `Ok(0)` when the pipe is currently empty, whether or not
    /// producers remain.
    pub fn try_pop(&self, target: &mut [u8]) -> Result<usize, PipeError> {
        self.shared.try_pop(target)
    }

    /// Raise the capacity floor to `count` records. `count == 0` restores
    /// the default floor.
    pub fn reserve(&self, count: usize) -> Result<(), PipeError> {
        self.shared.reserve(count)
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

impl Clone for Consumer {
    fn clone(&self) -> Self {
        self.shared.add_consumer();
        Consumer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.shared.release_consumer();
    }
}
