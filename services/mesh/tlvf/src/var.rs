//! Variable-length fields.
//!
//! A [`VarArray`] is a run of fixed-size elements whose length is either
//! carried in a companion prefix field (counting elements) or implied by
//! the rest of the declared payload. Every variable field of a record has
//! an order index; fields must be allocated in increasing order because
//! allocating one shifts every byte behind it.

use tracing::error;

use crate::error::{Result, TlvError};
use crate::field::FieldType;
use crate::record::{Mode, RecordCore, Slot};

/// Integer type usable as an element count.
pub trait Count: FieldType + TryFrom<usize> + Into<usize> {}

impl<T: FieldType + TryFrom<usize> + Into<usize>> Count for T {}

/// Where the element count of a variable field comes from.
#[derive(Debug, Clone, Copy)]
pub enum LengthSource<P> {
    /// A prefix field laid out earlier in the record
    Prefix(Slot<P>),
    /// Whatever is left of the declared payload
    Remainder,
}

/// Run of `T` elements laid out inline in a record.
#[derive(Debug)]
pub struct VarArray<T, P = u8> {
    name: &'static str,
    order: usize,
    data: Slot<()>,
    source: LengthSource<P>,
    count: usize,
    allocated: bool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

/// Variable-length byte string.
pub type VarField<P = u8> = VarArray<u8, P>;

impl<T: FieldType, P: Count> VarArray<T, P> {
    /// Lay out a variable field whose element count is held in `prefix`.
    /// In parse mode the elements are consumed immediately.
    pub fn with_prefix(
        core: &mut RecordCore,
        name: &'static str,
        order: usize,
        prefix: Slot<P>,
    ) -> Result<Self> {
        let mut field = Self::anchored(core, name, order, LengthSource::Prefix(prefix));
        if core.mode() == Mode::Parse {
            let count: usize = core.get(prefix).into();
            field.consume(core, count)?;
        }
        Ok(field)
    }

    /// Lay out a variable field that runs to the end of the declared payload.
    pub fn remainder(core: &mut RecordCore, name: &'static str, order: usize) -> Result<Self> {
        let mut field = Self::anchored(core, name, order, LengthSource::Remainder);
        if core.mode() == Mode::Parse {
            let bytes = core.unread();
            if bytes % T::SIZE != 0 {
                error!(record = core.name(), field = name, bytes, "payload is not a whole number of elements");
                return Err(TlvError::Truncated);
            }
            field.consume(core, bytes / T::SIZE)?;
        }
        Ok(field)
    }

    fn anchored(core: &mut RecordCore, name: &'static str, order: usize, source: LengthSource<P>) -> Self {
        Self {
            name,
            order,
            data: core.anchor(),
            source,
            count: 0,
            allocated: false,
            _marker: std::marker::PhantomData,
        }
    }

    fn consume(&mut self, core: &mut RecordCore, count: usize) -> Result<()> {
        if let Err(err) = core.advance(count * T::SIZE) {
            error!(
                record = core.name(),
                field = self.name,
                count,
                "variable field runs past the end of the buffer"
            );
            return Err(err);
        }
        self.count = count;
        Ok(())
    }

    /// Grow the field by `count` zeroed elements.
    ///
    /// Allowed once per field, in build mode, and only while no field with a
    /// higher order index has been allocated. On failure nothing changes.
    pub fn allocate(&mut self, core: &mut RecordCore, count: usize) -> Result<()> {
        core.growable(self.name)?;
        core.check_order(self.name, self.order)?;
        if self.allocated {
            error!(record = core.name(), field = self.name, "field was already allocated");
            return Err(TlvError::AlreadyAllocated { field: self.name });
        }
        let len = count * T::SIZE;
        let available = core.remaining_bytes();
        if len > available {
            error!(
                record = core.name(),
                field = self.name,
                needed = len,
                available,
                "not enough available space on buffer"
            );
            return Err(TlvError::CapacityExceeded {
                needed: len,
                available,
            });
        }
        let prefix_value = match self.source {
            LengthSource::Prefix(_) => Some(P::try_from(self.count + count).map_err(|_| {
                error!(record = core.name(), field = self.name, count, "prefix cannot hold element count");
                TlvError::LengthOverflow { field: self.name }
            })?),
            LengthSource::Remainder => None,
        };
        core.check_length(self.name, len)?;

        core.raise_lock(self.order);
        let at = core.offset(self.data) + self.count * T::SIZE;
        core.grow_at(at, len)?;
        core.reanchor_after(self.data.index(), len);
        if let (LengthSource::Prefix(prefix), Some(value)) = (self.source, prefix_value) {
            core.put(prefix, value);
        }
        core.add_length(len)?;
        self.count += count;
        self.allocated = true;
        Ok(())
    }

    /// Allocate room for `values` and copy them in.
    pub fn set(&mut self, core: &mut RecordCore, values: &[T]) -> Result<()> {
        let first = self.count;
        self.allocate(core, values.len())?;
        let base = core.offset(self.data);
        for (i, value) in values.iter().enumerate() {
            core.put_at(base + (first + i) * T::SIZE, *value);
        }
        Ok(())
    }

    /// Overwrite the element at `idx` of an allocated field.
    pub fn set_at(&self, core: &mut RecordCore, idx: usize, value: T) -> Result<()> {
        core.writable()?;
        if idx >= self.count {
            return Err(TlvError::CapacityExceeded {
                needed: idx + 1,
                available: self.count,
            });
        }
        core.put_at(core.offset(self.data) + idx * T::SIZE, value);
        Ok(())
    }

    /// Element at `idx` in host order.
    pub fn get(&self, core: &RecordCore, idx: usize) -> Option<T> {
        (idx < self.count).then(|| core.get_at(core.offset(self.data) + idx * T::SIZE))
    }

    /// All elements in host order.
    pub fn to_vec(&self, core: &RecordCore) -> Vec<T> {
        (0..self.count).filter_map(|idx| self.get(core, idx)).collect()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True when the field holds no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Flip every element's byte order.
    pub fn swap(&self, core: &RecordCore) {
        if T::SIZE < 2 {
            return;
        }
        let base = core.offset(self.data);
        for idx in 0..self.count {
            core.swap_at::<T>(base + idx * T::SIZE);
        }
    }
}

impl<P: Count> VarArray<u8, P> {
    /// Raw bytes of the field.
    pub fn bytes(&self, core: &RecordCore) -> Vec<u8> {
        core.buffer().copy_out(core.offset(self.data), self.count)
    }

    /// Allocate room for `data` and copy it in.
    pub fn set_bytes(&mut self, core: &mut RecordCore, data: &[u8]) -> Result<()> {
        self.set(core, data)
    }

    /// Store `s` without a terminator.
    pub fn set_str(&mut self, core: &mut RecordCore, s: &str) -> Result<()> {
        self.set(core, s.as_bytes())
    }

    /// The field as text, cut at the first NUL.
    pub fn as_str(&self, core: &RecordCore) -> String {
        let bytes = self.bytes(core);
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record_core, ByteBuffer, Record};

    /// tag length name_len(u8) name[] ids_len(u16) ids[u16] trailer(u8)
    #[derive(Debug)]
    struct Strings {
        core: RecordCore,
        name: VarField,
        ids_length: Slot<u16>,
        ids: VarArray<u16, u16>,
        trailer: Slot<u8>,
    }

    impl Record for Strings {
        const NAME: &'static str = "Strings";

        fn initial_size() -> usize {
            1 + 2 + 1 + 2 + 1
        }

        fn init(mut core: RecordCore) -> Result<Self> {
            core.tag(0x20u8)?;
            core.length()?;
            let name_len = core.field::<u8>("name_length")?;
            let name = VarField::with_prefix(&mut core, "name", 0, name_len)?;
            let ids_length = core.field::<u16>("ids_length")?;
            let ids = VarArray::with_prefix(&mut core, "ids", 1, ids_length)?;
            let trailer = core.field("trailer")?;
            Ok(Self {
                core,
                name,
                ids_length,
                ids,
                trailer,
            })
        }

        record_core!();

        fn swap_fields(&mut self) {
            self.core.swap(self.ids_length);
            self.ids.swap(&self.core);
        }
    }

    #[test]
    fn test_allocation_shifts_trailing_fields() {
        let buf = ByteBuffer::with_capacity(64);
        let mut rec = Strings::build(&buf).unwrap();
        let trailer = rec.trailer;
        rec.core.set(trailer, 0xaa).unwrap();

        rec.name.set_str(&mut rec.core, "abc").unwrap();
        assert_eq!(rec.core.get(trailer), 0xaa);
        assert_eq!(rec.core.declared_length(), Some(4 + 3));

        rec.ids.set(&mut rec.core, &[0x0102, 0x0304]).unwrap();
        assert_eq!(rec.core.get(trailer), 0xaa);
        assert_eq!(rec.core.declared_length(), Some(4 + 3 + 4));

        rec.finalize().unwrap();
        assert_eq!(
            buf.to_bytes().as_ref(),
            &[0x20, 0x00, 0x0b, 0x03, b'a', b'b', b'c', 0x00, 0x02, 0x01, 0x02, 0x03, 0x04, 0xaa]
        );
    }

    #[test]
    fn test_out_of_order_allocation_fails() {
        let buf = ByteBuffer::with_capacity(64);
        let mut rec = Strings::build(&buf).unwrap();
        rec.ids.set(&mut rec.core, &[1]).unwrap();
        let before = buf.to_bytes();

        let err = rec.name.set_str(&mut rec.core, "x").unwrap_err();
        assert_eq!(
            err,
            TlvError::OrderingViolation {
                field: "name",
                locked: 1
            }
        );
        assert_eq!(buf.to_bytes(), before);
    }

    #[test]
    fn test_single_shot_allocation() {
        let buf = ByteBuffer::with_capacity(64);
        let mut rec = Strings::build(&buf).unwrap();
        rec.name.allocate(&mut rec.core, 2).unwrap();
        assert_eq!(
            rec.name.allocate(&mut rec.core, 1),
            Err(TlvError::AlreadyAllocated { field: "name" })
        );
        assert_eq!(rec.name.len(), 2);
    }

    #[test]
    fn test_allocation_capacity_exceeded() {
        let buf = ByteBuffer::with_capacity(10);
        let mut rec = Strings::build(&buf).unwrap();
        let err = rec.name.allocate(&mut rec.core, 4).unwrap_err();
        assert_eq!(
            err,
            TlvError::CapacityExceeded {
                needed: 4,
                available: 3
            }
        );
        assert_eq!(buf.len(), 7);
        assert!(rec.name.is_empty());
    }

    #[test]
    fn test_prefix_overflow() {
        let buf = ByteBuffer::with_capacity(512);
        let mut rec = Strings::build(&buf).unwrap();
        let err = rec.name.allocate(&mut rec.core, 256).unwrap_err();
        assert_eq!(err, TlvError::LengthOverflow { field: "name" });
    }

    #[test]
    fn test_parse_and_nul_truncation() {
        let wire = [
            0x20, 0x00, 0x0b, 0x03, b'a', 0x00, b'c', 0x00, 0x02, 0x01, 0x02, 0x03, 0x04, 0xaa,
        ];
        let rec = Strings::parse_bytes(&wire).unwrap();
        assert_eq!(rec.name.as_str(&rec.core), "a");
        assert_eq!(rec.name.bytes(&rec.core), vec![b'a', 0, b'c']);
        assert_eq!(rec.ids.to_vec(&rec.core), vec![0x0102, 0x0304]);
        assert_eq!(rec.core.get(rec.trailer), 0xaa);
    }

    #[test]
    fn test_parse_truncated_payload() {
        // name_length claims more bytes than the buffer holds
        let wire = [0x20, 0x00, 0x08, 0x09, b'a', b'b', 0x00, 0x00];
        let err = Strings::parse_bytes(&wire).unwrap_err();
        assert!(matches!(err, TlvError::CapacityExceeded { .. }));
    }
}
