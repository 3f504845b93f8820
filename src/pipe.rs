use crate::consumer::Consumer;
use crate::error::PipeError;
use crate::producer::Producer;
use crate::ringbuf::DEFAULT_MIN_CAP;
use crate::shared::Shared;
use crate::sync::Arc;

/// Bidirectional handle to a pipe, returned by the factory.
///
/// A `Pipe` counts as one producer and one consumer at the same time, and
/// is the handle that mints the typed ends. Keeping one alive therefore
/// holds the stream open; drop it once the real producers and consumers
/// exist.
///
/// ```
/// use bytepipe::Pipe;
///
/// let pipe = Pipe::new(1)?;
/// let producer = pipe.producer();
/// let consumer = pipe.consumer();
/// drop(pipe);
///
/// producer.push(b"HELLO")?;
/// drop(producer);
///
/// let mut buf = [0u8; 5];
/// assert_eq!(consumer.pop(&mut buf)?, 5);
/// assert_eq!(&buf, b"HELLO");
/// assert_eq!(consumer.pop(&mut buf)?, 0); // producers gone, stream over
/// # Ok::<(), bytepipe::PipeError>(())
/// ```
pub struct Pipe {
    shared: Arc<Shared>,
}

impl Pipe {
    /// Create a pipe carrying records of `elem_size` bytes each.
    pub fn new(elem_size: usize) -> Result<Self, PipeError> {
        Self::with_min_capacity(elem_size, DEFAULT_MIN_CAP)
    }

    /// Create a pipe with an explicit capacity floor of `min_cap` records
    /// (clamped to at least 1). The buffer never shrinks below the floor.
    pub fn with_min_capacity(elem_size: usize, min_cap: usize) -> Result<Self, PipeError> {
        Ok(Pipe {
            shared: Arc::new(Shared::new(elem_size, min_cap)?),
        })
    }

    /// Mint a producer handle.
    pub fn producer(&self) -> Producer {
        self.shared.add_producer();
        Producer::from_shared(Arc::clone(&self.shared))
    }

    /// Mint a consumer handle.
    pub fn consumer(&self) -> Consumer {
        self.shared.add_consumer();
        Consumer::from_shared(Arc::clone(&self.shared))
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

impl Clone for Pipe {
    fn clone(&self) -> Self {
        self.shared.add_pair();
        Pipe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.shared.release_pair();
    }
}
