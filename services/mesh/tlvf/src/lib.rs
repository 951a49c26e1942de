//! Buffer-backed TLV records for IEEE 1905.1 and Wi-Fi EasyMesh control messages.
//!
//! Records are typed views laid directly over a shared byte buffer. Building
//! a record writes its fields in place, in host order; finalizing it converts
//! every multi-byte field to network order in a single pass. Parsing lays the
//! same view over received bytes and normalizes them back to host order.
//!
//! ## Features
//!
//! - **In-place Layout**: fields are read and written at their final offset, no copies
//! - **Variable Fields**: length-prefixed arrays and nested record lists that grow in place
//! - **Ordering Checks**: variable fields must be allocated in declaration order
//! - **Inner Records**: vendor payloads built in a reservation and trimmed on finalize
//! - **Dispatch**: tag and vendor OUI based parsing of whole CMDU payloads
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | u8 / u16 type        | TLV or attribute type      |
//! +----------------------+----------------------------+
//! | u16 length (BE)      | payload bytes that follow  |
//! +----------------------+----------------------------+
//! | fixed fields         | big-endian, declared order |
//! +----------------------+----------------------------+
//! | count / length       | prefix of a variable field |
//! +----------------------+----------------------------+
//! | elements             | variable (0..N)            |
//! +----------------------+----------------------------+
//! | ...                  | more fields and lists      |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod airties;
pub mod buffer;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod ieee1905;
pub mod list;
pub mod message;
pub mod record;
pub mod swap;
pub mod var;
pub mod wfa_map;
pub mod wsc;

// Re-export main types
pub use buffer::ByteBuffer;
pub use dispatch::{classify, parse_any, peek_header, ParsedTlv, TlvHeader, TlvKind};
pub use error::{Result, TlvError};
pub use field::{FieldType, MacAddr, ParseMacError, VendorOui};
pub use list::RecordList;
pub use message::{MessageBuilder, MessageReader, DEFAULT_MESSAGE_CAPACITY, MAX_TLV_PAYLOAD};
pub use record::{Mode, NestedRecord, Record, RecordCore, Slot, Tlv};
pub use swap::{swap_bytes, ByteOrder};
pub use var::{Count, LengthSource, VarArray, VarField};
