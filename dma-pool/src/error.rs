//! Allocator errors.

use core::fmt;

/// How an error should be treated by the integration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad region or board configuration. Fatal at boot.
    Configuration,
    /// The region (or its bookkeeping) is full.
    Exhaustion,
    /// Caller broke the allocation contract.
    Misuse,
}

/// DMA region errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Region used before `init`.
    NotInitialized,
    /// Null base, zero size or a window overflowing the address space.
    InvalidRegion,
    /// No free block large enough.
    OutOfMemory,
    /// Allocation registry full.
    TooManyAllocations,
    /// Zero-byte allocation.
    ZeroSize,
    /// Alignment not a power of two.
    InvalidAlignment,
    /// Size or offset arithmetic overflowed.
    SizeOverflow,
    /// Address is not the start of a live allocation.
    NotAllocated,
    /// Access past the end of the allocation.
    OutOfBounds,
    /// `free` of a reservation or `release` of an allocation.
    KindMismatch,
    /// Allocation currently borrowed through a view.
    Busy,
}

impl DmaError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DmaError::NotInitialized | DmaError::InvalidRegion => ErrorClass::Configuration,
            DmaError::OutOfMemory | DmaError::TooManyAllocations => ErrorClass::Exhaustion,
            DmaError::ZeroSize
            | DmaError::InvalidAlignment
            | DmaError::SizeOverflow
            | DmaError::NotAllocated
            | DmaError::OutOfBounds
            | DmaError::KindMismatch
            | DmaError::Busy => ErrorClass::Misuse,
        }
    }
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmaError::NotInitialized => write!(f, "region not initialized"),
            DmaError::InvalidRegion => write!(f, "invalid region"),
            DmaError::OutOfMemory => write!(f, "out of memory"),
            DmaError::TooManyAllocations => write!(f, "too many allocations"),
            DmaError::ZeroSize => write!(f, "zero-sized allocation"),
            DmaError::InvalidAlignment => write!(f, "alignment not a power of two"),
            DmaError::SizeOverflow => write!(f, "size overflow"),
            DmaError::NotAllocated => write!(f, "address not allocated"),
            DmaError::OutOfBounds => write!(f, "access out of bounds"),
            DmaError::KindMismatch => write!(f, "free/release does not match alloc/reserve"),
            DmaError::Busy => write!(f, "allocation borrowed by a view"),
        }
    }
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(DmaError::InvalidRegion.class(), ErrorClass::Configuration);
        assert_eq!(DmaError::OutOfMemory.class(), ErrorClass::Exhaustion);
        assert_eq!(DmaError::TooManyAllocations.class(), ErrorClass::Exhaustion);
        assert_eq!(DmaError::NotAllocated.class(), ErrorClass::Misuse);
        assert_eq!(DmaError::Busy.class(), ErrorClass::Misuse);
    }
}
