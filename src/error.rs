use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipeError {
    #[error("element size must be non-zero")]
    ZeroElementSize,

    #[error("buffer length {0} is not a multiple of the element size {1}")]
    UnalignedLength(usize, usize),

    #[error("requested capacity overflows addressable memory")]
    CapacityOverflow,

    #[error("buffer allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),
}
