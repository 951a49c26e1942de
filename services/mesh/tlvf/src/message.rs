//! Whole CMDU payloads: a run of TLVs closed by an end-of-message TLV.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::buffer::ByteBuffer;
use crate::dispatch::{parse_any, peek_header, ParsedTlv};
use crate::error::{Result, TlvError};
use crate::ieee1905::EndOfMessage;
use crate::record::Record;

/// Default capacity of a message buffer, one Ethernet MTU.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 1500;

/// Largest payload a 16-bit TLV length can describe.
pub const MAX_TLV_PAYLOAD: usize = u16::MAX as usize;

/// Appends TLVs to one buffer in order.
///
/// Each TLV is populated inside the closure given to [`MessageBuilder::add`]
/// and finalized before `add` returns, so only one record ever writes at
/// the tail of the buffer.
#[derive(Debug)]
pub struct MessageBuilder {
    buf: ByteBuffer,
    count: usize,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_CAPACITY)
    }
}

impl MessageBuilder {
    /// Builder over a zeroed buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: ByteBuffer::with_capacity(capacity),
            count: 0,
        }
    }

    /// Build a `T` at the tail, fill it with `fill`, and finalize it.
    ///
    /// If `fill` fails, the record's bytes are dropped from the buffer.
    pub fn add<T, F>(&mut self, fill: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let start = self.buf.tail();
        let result = T::build(&self.buf).and_then(|mut record| {
            fill(&mut record)?;
            record.finalize()
        });
        if let Err(err) = result {
            let written = self.buf.tail() - start;
            warn!(record = T::NAME, error = %err, "dropping partially built tlv");
            self.buf.remove(start, written)?;
            return Err(err);
        }
        self.count += 1;
        debug!(record = T::NAME, offset = start, "tlv added");
        Ok(())
    }

    /// Number of TLVs added so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True before the first TLV is added.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Close the message with an end-of-message TLV and hand back its bytes.
    pub fn finish(mut self) -> Result<Bytes> {
        self.add::<EndOfMessage, _>(|_| Ok(()))?;
        debug!(tlvs = self.count, len = self.buf.len(), "message finished");
        Ok(self.buf.freeze())
    }
}

/// Iterates over the TLVs of a received message.
///
/// Stops after the end-of-message TLV. A TLV of unknown type is reported as
/// an error and skipped; a TLV whose length runs past the input ends the
/// iteration.
#[derive(Debug)]
pub struct MessageReader {
    buf: ByteBuffer,
    offset: usize,
    done: bool,
}

impl MessageReader {
    /// Reader over received bytes.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self {
            buf: ByteBuffer::from_wire(data),
            offset: 0,
            done: false,
        }
    }

    /// Offset of the next TLV.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for MessageReader {
    type Item = Result<ParsedTlv>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buf.tail() {
            return None;
        }
        let remaining = self.buf.tail() - self.offset;
        let header = match self.buf.with_slice(self.offset, remaining, peek_header) {
            Ok(header) => header,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if header.total_len() > remaining {
            warn!(
                offset = self.offset,
                declared = header.length,
                remaining,
                "tlv runs past end of message"
            );
            self.done = true;
            return Some(Err(TlvError::Truncated));
        }

        let parsed = parse_any(&self.buf, self.offset);
        self.offset += header.total_len();
        if let Ok(ParsedTlv::EndOfMessage(_)) = parsed {
            self.done = true;
        }
        Some(parsed)
    }
}
