//! Fixed-size field types that can be laid over a buffer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::swap::{swap_bytes, ByteOrder};

/// A fixed-size value stored inline in a record.
///
/// `read`/`write` work on host-order bytes; `swap` converts one encoded
/// value between host and network order in place.
pub trait FieldType: Copy + fmt::Debug + 'static {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Decode from host-order bytes.
    fn read(bytes: &[u8]) -> Self;

    /// Encode as host-order bytes.
    fn write(self, bytes: &mut [u8]);

    /// Flip the byte order of one encoded value.
    fn swap(bytes: &mut [u8]) {
        swap_bytes(Self::SIZE * 8, bytes);
    }
}

macro_rules! int_field {
    ($($t:ty),* $(,)?) => {
        $(
            impl FieldType for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_ne_bytes(raw)
                }

                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

int_field!(u8, u16, u32, u64, i8, i16, i32);

/// Decode a value stored in `order`.
pub(crate) fn decode<T: FieldType>(bytes: &[u8], order: ByteOrder) -> T {
    match order {
        ByteOrder::Host => T::read(bytes),
        ByteOrder::Network => {
            let mut scratch: SmallVec<[u8; 16]> = SmallVec::from_slice(&bytes[..T::SIZE]);
            T::swap(&mut scratch);
            T::read(&scratch)
        }
    }
}

/// Implement [`FieldType`] for a `bitflags` type backed by an integer.
///
/// Unknown bits are kept as-is so reserved bits survive a parse.
#[macro_export]
macro_rules! flags_field {
    ($flags:ty, $bits:ty) => {
        impl $crate::FieldType for $flags {
            const SIZE: usize = <$bits as $crate::FieldType>::SIZE;

            fn read(bytes: &[u8]) -> Self {
                <$flags>::from_bits_retain(<$bits as $crate::FieldType>::read(bytes))
            }

            fn write(self, bytes: &mut [u8]) {
                <$bits as $crate::FieldType>::write(self.bits(), bytes)
            }
        }
    };
}

/// 48-bit IEEE MAC address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// ff:ff:ff:ff:ff:ff
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);
    /// 00:00:00:00:00:00
    pub const ZERO: MacAddr = MacAddr([0; 6]);
}

impl FieldType for MacAddr {
    const SIZE: usize = 6;

    fn read(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 6];
        raw.copy_from_slice(&bytes[..6]);
        MacAddr(raw)
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..6].copy_from_slice(&self.0);
    }

    fn swap(_bytes: &mut [u8]) {}
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Error parsing a colon-separated MAC address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacError;

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid mac address")
    }
}

impl std::error::Error for ParseMacError {}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; 6];
        let mut parts = s.split(':');
        for byte in raw.iter_mut() {
            let part = parts.next().ok_or(ParseMacError)?;
            if part.len() != 2 {
                return Err(ParseMacError);
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| ParseMacError)?;
        }
        if parts.next().is_some() {
            return Err(ParseMacError);
        }
        Ok(MacAddr(raw))
    }
}

/// 24-bit IEEE organizationally unique identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorOui(pub [u8; 3]);

impl VendorOui {
    /// Build from the low 24 bits of `value`, most significant byte first.
    pub const fn from_u32(value: u32) -> Self {
        VendorOui([(value >> 16) as u8, (value >> 8) as u8, value as u8])
    }

    /// The OUI as a 24-bit integer.
    pub const fn as_u32(&self) -> u32 {
        ((self.0[0] as u32) << 16) | ((self.0[1] as u32) << 8) | self.0[2] as u32
    }
}

impl FieldType for VendorOui {
    const SIZE: usize = 3;

    fn read(bytes: &[u8]) -> Self {
        VendorOui([bytes[0], bytes[1], bytes[2]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..3].copy_from_slice(&self.0);
    }

    fn swap(_bytes: &mut [u8]) {}
}

impl fmt::Display for VendorOui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}:{:02x}", self.0[0], self.0[1], self.0[2])
    }
}
