//! TLV framework error types.

use thiserror::Error;

/// Errors raised while building or parsing TLV records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    /// Not enough room in the buffer for the requested growth
    #[error("capacity exceeded: need {needed} bytes, {available} available")]
    CapacityExceeded {
        /// Bytes requested
        needed: usize,
        /// Bytes still available
        available: usize,
    },

    /// Buffer cannot hold the fixed part of a record
    #[error("buffer too small for {record}: need {needed} bytes, {available} available")]
    BufferTooSmall {
        /// Record being constructed
        record: &'static str,
        /// Minimum record size
        needed: usize,
        /// Bytes available at construction
        available: usize,
    },

    /// Variable-length field allocated out of declaration order
    #[error("out of order allocation for {field} (lock order {locked})")]
    OrderingViolation {
        /// Field whose allocation was refused
        field: &'static str,
        /// Order index already locked by a later field
        locked: usize,
    },

    /// A list element was created but never added
    #[error("list {list} has an element pending")]
    PendingElement {
        /// List holding the pending element
        list: &'static str,
    },

    /// `add_element` without a matching `create_element`
    #[error("no element pending on list {list}")]
    NoPendingElement {
        /// List the add was attempted on
        list: &'static str,
    },

    /// Element handed to `add_element` is not the one the list expects next
    #[error("element mismatch on list {list}: expected offset {expected}, got {actual}")]
    ElementMismatch {
        /// List the add was attempted on
        list: &'static str,
        /// Offset of the expected next slot
        expected: usize,
        /// Offset of the element that was passed in
        actual: usize,
    },

    /// Variable-length field was already allocated
    #[error("{field} was already allocated")]
    AlreadyAllocated {
        /// Field name
        field: &'static str,
    },

    /// Parsed tag does not match the record type
    #[error("type mismatch: expected {expected:#x}, got {actual:#x}")]
    TypeMismatch {
        /// Tag of the record type
        expected: u16,
        /// Tag found on the wire
        actual: u16,
    },

    /// A length or count no longer fits its field
    #[error("length overflow on {field}")]
    LengthOverflow {
        /// Field that would overflow
        field: &'static str,
    },

    /// Mutation attempted on a parsed or finalized record
    #[error("record is read-only")]
    ReadOnly,

    /// Growth attempted on an element already committed to its list
    #[error("element is sealed")]
    Sealed,

    /// A list element cannot be finalized on its own
    #[error("nested record is finalized by its owner")]
    Nested,

    /// Not enough bytes for a TLV header or its declared payload
    #[error("truncated tlv")]
    Truncated,

    /// Tag not present in the dispatch table
    #[error("unknown tlv type {0:#x}")]
    UnknownTag(u16),

    /// Enumerated field holds a value outside its enumeration
    #[error("invalid value {value:#x} for {field}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Raw value found
        value: u32,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TlvError>;
