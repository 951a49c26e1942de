//! Host/network byte-order conversion.

use serde::{Deserialize, Serialize};

/// Byte order a record's multi-byte fields are currently stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Native order of the running host
    Host,
    /// Big-endian, as carried on the wire
    Network,
}

impl ByteOrder {
    /// The other order.
    pub fn flipped(self) -> Self {
        match self {
            ByteOrder::Host => ByteOrder::Network,
            ByteOrder::Network => ByteOrder::Host,
        }
    }
}

/// Reverse a 16/32/64-bit value in place when the host is little-endian.
///
/// Big-endian hosts already use network order, so the call is a no-op there.
/// Values narrower than 16 bits never need swapping.
pub fn swap_bytes(bits: usize, bytes: &mut [u8]) {
    if cfg!(target_endian = "big") || bits < 16 {
        return;
    }
    let width = bits / 8;
    bytes[..width].reverse();
}
