//! Record core: fixed-field layout, field access and the record lifecycle.
//!
//! Every record owns a [`RecordCore`] describing the region of the shared
//! [`ByteBuffer`] it covers. Fields are laid out in declaration order by
//! [`RecordCore::field`], which hands back a typed [`Slot`]. Slots index an
//! offset table rather than the buffer directly, so a variable-length
//! allocation only has to bump the offsets of the slots declared after it.
//!
//! A record moves through three modes:
//!
//! ```text
//!  build() ──► Build ──finalize()──► Finalized      (bytes in network order)
//!  parse() ──► Parse                                (normalized to host order)
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, error, warn};

use crate::buffer::ByteBuffer;
use crate::error::{Result, TlvError};
use crate::field::{decode, FieldType};
use crate::swap::ByteOrder;

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Being written; fields in host order
    Build,
    /// Written and converted to network order; read-only
    Finalized,
    /// Laid over received bytes; read-only
    Parse,
}

/// Typed handle to one field of a record.
pub struct Slot<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T> {
    fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Position of the field in the record's offset table.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.index)
    }
}

#[derive(Debug, Clone, Copy)]
struct TagSlot {
    index: usize,
    expected: u16,
    size: usize,
}

struct InnerRecord {
    at: usize,
    reserve: usize,
    record: Box<dyn NestedRecord>,
}

/// Region, cursor and field table shared by every record type.
pub struct RecordCore {
    name: &'static str,
    buf: ByteBuffer,
    start: usize,
    cursor: usize,
    limit: usize,
    mode: Mode,
    order: ByteOrder,
    nested: bool,
    sealed: bool,
    slots: SmallVec<[usize; 16]>,
    tag: Option<TagSlot>,
    length: Option<Slot<u16>>,
    lock_order: usize,
    pending: Option<(&'static str, usize)>,
    inner: Option<InnerRecord>,
}

impl RecordCore {
    fn new(name: &'static str, buf: ByteBuffer, at: usize, limit: usize, mode: Mode) -> Self {
        let order = match mode {
            Mode::Parse => ByteOrder::Network,
            _ => ByteOrder::Host,
        };
        Self {
            name,
            buf,
            start: at,
            cursor: at,
            limit,
            mode,
            order,
            nested: false,
            sealed: false,
            slots: SmallVec::new(),
            tag: None,
            length: None,
            lock_order: 0,
            pending: None,
            inner: None,
        }
    }

    /// Core for a record appended at the tail of `buf`.
    pub fn build(name: &'static str, buf: &ByteBuffer) -> Self {
        let at = buf.tail();
        Self::new(name, buf.clone(), at, at, Mode::Build)
    }

    /// Core for a record parsed from `buf` at `at`, bounded by the written bytes.
    pub fn parse(name: &'static str, buf: &ByteBuffer, at: usize) -> Self {
        Self::parse_within(name, buf, at, buf.tail())
    }

    /// Core for a record parsed from `buf` at `at`, never reading past `limit`.
    pub fn parse_within(name: &'static str, buf: &ByteBuffer, at: usize, limit: usize) -> Self {
        Self::new(name, buf.clone(), at, limit.min(buf.tail()), Mode::Parse)
    }

    /// Core for a list element at `at` inside `parent`. In build mode the
    /// element starts with `reserved` bytes already opened for it.
    pub(crate) fn element(name: &'static str, parent: &RecordCore, at: usize, reserved: usize) -> Self {
        let limit = match parent.mode {
            Mode::Parse => parent.limit,
            _ => at + reserved,
        };
        let mut core = Self::new(name, parent.buf.clone(), at, limit, parent.mode);
        core.order = parent.order;
        core.nested = true;
        core
    }

    /// Name of the record type, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current lifecycle state.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Byte order the fields are stored in right now.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// True for records owned by a list.
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// True once a list has committed this element.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Absolute offset of the first byte of the record.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Absolute offset just past the last laid-out byte.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Laid-out size of the record in bytes.
    pub fn len(&self) -> usize {
        self.cursor - self.start
    }

    /// True when nothing is laid out yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared buffer this record lives in.
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buf
    }

    /// Bytes this record can still grow by (build) or still read (parse).
    pub fn remaining_bytes(&self) -> usize {
        let reserved = self.limit.saturating_sub(self.cursor);
        match self.mode {
            Mode::Build => reserved + self.buf.free(),
            _ => reserved,
        }
    }

    /// Copy of the record's bytes in their current order.
    ///
    /// Wire order only once a built record is finalized. A parsed record
    /// was swapped to host order in place, so its copy is not wire data.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.buf.copy_out(self.start, self.len()))
    }

    /// Fail unless `needed` bytes are available for the fixed part of the record.
    pub fn require(&self, needed: usize) -> Result<()> {
        let available = self.remaining_bytes();
        if available < needed {
            error!(
                record = self.name,
                needed, available, "not enough available space on buffer, record init failed"
            );
            return Err(TlvError::BufferTooSmall {
                record: self.name,
                needed,
                available,
            });
        }
        Ok(())
    }

    /// Move the cursor forward by `n`. In build mode the region grows into
    /// free buffer space; otherwise the move must stay inside the region.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        let reserved = self.limit.saturating_sub(self.cursor);
        if n > reserved {
            if self.mode != Mode::Build {
                return Err(TlvError::CapacityExceeded {
                    needed: n,
                    available: reserved,
                });
            }
            let extra = n - reserved;
            self.buf.insert(self.limit, extra).map_err(|_| TlvError::CapacityExceeded {
                needed: n,
                available: reserved + self.buf.free(),
            })?;
            self.limit += extra;
        }
        self.cursor += n;
        Ok(())
    }

    fn push_slot<T>(&mut self, at: usize) -> Slot<T> {
        self.slots.push(at);
        Slot::new(self.slots.len() - 1)
    }

    fn place<T: FieldType>(&mut self, field: &'static str) -> Result<Slot<T>> {
        let at = self.cursor;
        if let Err(err) = self.advance(T::SIZE) {
            error!(record = self.name, field, "buffer overflow laying out field");
            return Err(err);
        }
        if self.mode == Mode::Build {
            self.buf.with_slice_mut(at, T::SIZE, |bytes| bytes.fill(0));
        }
        Ok(self.push_slot(at))
    }

    /// Lay out the next fixed field. In build mode it is zeroed and its size
    /// is added to the declared length.
    pub fn field<T: FieldType>(&mut self, field: &'static str) -> Result<Slot<T>> {
        if self.mode == Mode::Build {
            self.check_length(field, T::SIZE)?;
        }
        let slot = self.place(field)?;
        self.add_length(T::SIZE)?;
        Ok(slot)
    }

    /// Lay out the next fixed field and write `value` into it in build mode.
    pub fn field_with<T: FieldType>(&mut self, field: &'static str, value: T) -> Result<Slot<T>> {
        let slot = self.field(field)?;
        if self.mode == Mode::Build {
            self.put(slot, value);
        }
        Ok(slot)
    }

    /// Lay out the type tag. It is written in build mode and checked after
    /// normalization in parse mode. The tag never counts toward the length.
    pub fn tag<T: FieldType + Into<u16>>(&mut self, value: T) -> Result<Slot<T>> {
        let slot = self.place::<T>("type")?;
        if self.mode == Mode::Build {
            self.put(slot, value);
        }
        self.tag = Some(TagSlot {
            index: slot.index,
            expected: value.into(),
            size: T::SIZE,
        });
        Ok(slot)
    }

    /// Lay out the 16-bit payload length. Fields laid out after it add their
    /// size to it in build mode. In parse mode the record is bounded to the
    /// declared payload.
    pub fn length(&mut self) -> Result<Slot<u16>> {
        let slot = self.place::<u16>("length")?;
        if self.mode == Mode::Parse {
            let declared = self.get(slot) as usize;
            let available = self.limit - self.cursor;
            if declared <= available {
                self.limit = self.cursor + declared;
            } else {
                warn!(
                    record = self.name,
                    declared, available, "declared length runs past the buffer"
                );
            }
        }
        self.length = Some(slot);
        Ok(slot)
    }

    /// Declared payload length, if the record carries one.
    pub fn declared_length(&self) -> Option<u16> {
        self.length.map(|slot| self.get(slot))
    }

    /// Tag read from the record in host order, if the record carries one.
    pub fn type_tag(&self) -> Option<u16> {
        self.tag.map(|tag| self.read_tag(tag))
    }

    fn read_tag(&self, tag: TagSlot) -> u16 {
        let at = self.slots[tag.index];
        if tag.size == 1 {
            self.get_at::<u8>(at) as u16
        } else {
            self.get_at::<u16>(at)
        }
    }

    /// Marker slot at the cursor, used to anchor variable fields and lists.
    pub(crate) fn anchor(&mut self) -> Slot<()> {
        let at = self.cursor;
        self.push_slot(at)
    }

    /// Absolute offset of a slot.
    pub fn offset<T>(&self, slot: Slot<T>) -> usize {
        self.slots[slot.index]
    }

    /// Read a field in host order, whatever order it is stored in.
    pub fn get<T: FieldType>(&self, slot: Slot<T>) -> T {
        self.get_at(self.slots[slot.index])
    }

    /// Read a value at an absolute offset in host order.
    pub fn get_at<T: FieldType>(&self, at: usize) -> T {
        self.buf
            .with_slice(at, T::SIZE, |bytes| decode::<T>(bytes, self.order))
    }

    /// Write a field. Only records still being built accept writes.
    pub fn set<T: FieldType>(&mut self, slot: Slot<T>, value: T) -> Result<()> {
        self.writable()?;
        if let Some((list, anchor)) = self.pending {
            if slot.index > anchor {
                warn!(record = self.name, list, "field behind a pending element is not writable");
                return Err(TlvError::PendingElement { list });
            }
        }
        self.put(slot, value);
        Ok(())
    }

    pub(crate) fn put<T: FieldType>(&self, slot: Slot<T>, value: T) {
        self.put_at(self.slots[slot.index], value);
    }

    pub(crate) fn put_at<T: FieldType>(&self, at: usize, value: T) {
        self.buf
            .with_slice_mut(at, T::SIZE, |bytes| value.write(bytes));
    }

    /// Flip the byte order of a field in place.
    pub fn swap<T: FieldType>(&self, slot: Slot<T>) {
        self.swap_at::<T>(self.slots[slot.index]);
    }

    /// Flip the byte order of one value at an absolute offset.
    pub fn swap_at<T: FieldType>(&self, at: usize) {
        self.buf.with_slice_mut(at, T::SIZE, T::swap);
    }

    fn swap_header(&self) {
        if let Some(tag) = self.tag {
            if tag.size == 2 {
                self.swap_at::<u16>(self.slots[tag.index]);
            }
        }
        if let Some(length) = self.length {
            self.swap(length);
        }
    }

    fn flip_order(&mut self) {
        self.order = self.order.flipped();
    }

    /// Check the parsed tag against the record type.
    pub fn validate_tag(&self) -> Result<()> {
        let Some(tag) = self.tag else {
            return Ok(());
        };
        let actual = self.read_tag(tag);
        if actual != tag.expected {
            error!(
                record = self.name,
                expected = tag.expected,
                actual,
                "tlv type mismatch"
            );
            return Err(TlvError::TypeMismatch {
                expected: tag.expected,
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn writable(&self) -> Result<()> {
        if self.mode != Mode::Build || self.order != ByteOrder::Host {
            warn!(record = self.name, mode = ?self.mode, "write on read-only record");
            return Err(TlvError::ReadOnly);
        }
        Ok(())
    }

    /// Fail unless the record may still grow.
    pub(crate) fn growable(&self, field: &'static str) -> Result<()> {
        self.writable()?;
        if self.sealed {
            error!(record = self.name, field, "element already committed to its list");
            return Err(TlvError::Sealed);
        }
        if self.inner.is_some() {
            error!(record = self.name, field, "record is closed by its inner record");
            return Err(TlvError::OrderingViolation {
                field,
                locked: self.lock_order,
            });
        }
        Ok(())
    }

    /// Fail if a field with order index `order` may no longer be allocated.
    pub(crate) fn check_order(&self, field: &'static str, order: usize) -> Result<()> {
        if self.lock_order > order {
            error!(
                record = self.name,
                field,
                locked = self.lock_order,
                "out of order allocation for variable length field"
            );
            return Err(TlvError::OrderingViolation {
                field,
                locked: self.lock_order,
            });
        }
        Ok(())
    }

    pub(crate) fn raise_lock(&mut self, order: usize) {
        self.lock_order = self.lock_order.max(order);
    }

    pub(crate) fn pending(&self) -> Option<&'static str> {
        self.pending.map(|(list, _)| list)
    }

    pub(crate) fn set_pending(&mut self, pending: Option<(&'static str, usize)>) {
        self.pending = pending;
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    /// Bytes left to read before the end of the region.
    pub(crate) fn unread(&self) -> usize {
        self.limit.saturating_sub(self.cursor)
    }

    /// Open `n` zeroed bytes at `at` inside the record.
    pub(crate) fn grow_at(&mut self, at: usize, n: usize) -> Result<()> {
        self.buf.insert(at, n)?;
        self.extend(n);
        Ok(())
    }

    /// Account for `n` bytes already opened inside the record.
    pub(crate) fn extend(&mut self, n: usize) {
        self.cursor += n;
        self.limit += n;
    }

    /// Shift every slot declared after `index` forward by `n`.
    pub(crate) fn reanchor_after(&mut self, index: usize, n: usize) {
        for at in self.slots.iter_mut().skip(index + 1) {
            *at += n;
        }
    }

    pub(crate) fn check_length(&self, field: &'static str, n: usize) -> Result<()> {
        let Some(slot) = self.length else {
            return Ok(());
        };
        if self.get(slot) as usize + n > u16::MAX as usize {
            error!(record = self.name, field, "declared length overflow");
            return Err(TlvError::LengthOverflow { field });
        }
        Ok(())
    }

    /// Add `n` to the declared length (build mode only).
    pub(crate) fn add_length(&mut self, n: usize) -> Result<()> {
        if self.mode != Mode::Build {
            return Ok(());
        }
        let Some(slot) = self.length else {
            return Ok(());
        };
        self.check_length("length", n)?;
        let next = self.get(slot) + n as u16;
        self.put(slot, next);
        Ok(())
    }

    fn sub_length(&mut self, n: usize) {
        if let Some(slot) = self.length {
            let next = self.get(slot).saturating_sub(n as u16);
            self.put(slot, next);
        }
    }

    /// Reserve space at the tail of the buffer and build `I` inside it.
    ///
    /// With `reserve == None` every free byte is reserved. The reservation
    /// counts toward this record's length until [`Record::finalize`] trims
    /// what the inner record left unused.
    ///
    /// Once attached, no variable field or list of this record may grow.
    pub fn attach_inner<I: Record>(&mut self, reserve: Option<usize>) -> Result<()> {
        if self.inner.is_some() {
            return Err(TlvError::AlreadyAllocated { field: "inner" });
        }
        self.growable("inner")?;
        if self.cursor != self.buf.tail() {
            error!(record = self.name, "inner record must start at the buffer tail");
            return Err(TlvError::OrderingViolation {
                field: "inner",
                locked: self.lock_order,
            });
        }
        let free = self.buf.free();
        let reserve = reserve.unwrap_or(free);
        if reserve > free {
            error!(record = self.name, reserve, free, "inner reservation exceeds buffer");
            return Err(TlvError::CapacityExceeded {
                needed: reserve,
                available: free,
            });
        }
        self.check_length("inner", reserve)?;

        let at = self.cursor;
        self.grow_at(at, reserve)?;
        self.add_length(reserve)?;

        match self.buf.window(at, reserve).and_then(|window| I::build(&window)) {
            Ok(inner) => {
                self.inner = Some(InnerRecord {
                    at,
                    reserve,
                    record: Box::new(inner),
                });
                // growth before the inner record would move it under its slots
                self.raise_lock(usize::MAX);
                Ok(())
            }
            Err(err) => {
                self.buf.remove(at, reserve)?;
                self.cursor -= reserve;
                self.limit -= reserve;
                self.sub_length(reserve);
                Err(err)
            }
        }
    }

    /// The attached inner record, if it is an `I`.
    pub fn inner<I: Record>(&self) -> Option<&I> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.record.as_any().downcast_ref::<I>())
    }

    /// Mutable access to the attached inner record, if it is an `I`.
    pub fn inner_mut<I: Record>(&mut self) -> Option<&mut I> {
        self.inner
            .as_mut()
            .and_then(|inner| inner.record.as_any_mut().downcast_mut::<I>())
    }

    /// Parse the unread rest of the payload as an `I`.
    pub fn parse_inner<I: Record>(&mut self) -> Result<I> {
        let core = RecordCore::parse_within(I::NAME, &self.buf, self.cursor, self.limit);
        let inner = I::construct(core)?;
        self.cursor += inner.core().len();
        Ok(inner)
    }

    fn finalize_inner(&mut self) -> Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(());
        };
        inner.record.finalize_nested()?;
        let used = inner.record.nested_len();
        let tailroom = inner.reserve.saturating_sub(used);
        let at = inner.at + used;
        inner.reserve = used;
        if tailroom > 0 {
            self.buf.remove(at, tailroom)?;
            self.cursor -= tailroom;
            self.limit -= tailroom;
            self.sub_length(tailroom);
            debug!(record = self.name, tailroom, "trimmed inner record tailroom");
        }
        Ok(())
    }
}

impl fmt::Debug for RecordCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCore")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("len", &self.len())
            .field("mode", &self.mode)
            .field("order", &self.order)
            .field("nested", &self.nested)
            .field("inner", &self.inner.is_some())
            .finish()
    }
}

/// A typed view over a region of a [`ByteBuffer`].
///
/// Implementors describe their layout in [`Record::init`] and how to
/// normalize their multi-byte fields in [`Record::swap_fields`]; the
/// provided methods drive construction, validation and finalization.
pub trait Record: Sized + 'static {
    /// Record type name, for diagnostics
    const NAME: &'static str;

    /// Size of the record with every variable field and list empty.
    fn initial_size() -> usize;

    /// Lay out the fields over `core`, in either mode.
    fn init(core: RecordCore) -> Result<Self>;

    /// The record's core.
    fn core(&self) -> &RecordCore;

    /// The record's core, mutably.
    fn core_mut(&mut self) -> &mut RecordCore;

    /// Flip every multi-byte field and every list element. Tag and length
    /// are handled by [`Record::class_swap`].
    fn swap_fields(&mut self);

    /// Record-specific checks that must hold before finalizing.
    fn post_init_check(&self) -> Result<()> {
        Ok(())
    }

    /// Convert the whole record between host and network order.
    fn class_swap(&mut self) {
        self.core().swap_header();
        self.swap_fields();
        self.core_mut().flip_order();
    }

    /// Build a new record at the tail of `buf`.
    fn build(buf: &ByteBuffer) -> Result<Self> {
        Self::construct(RecordCore::build(Self::NAME, buf))
    }

    /// Parse a record from `buf` at `at`.
    fn parse(buf: &ByteBuffer, at: usize) -> Result<Self> {
        Self::construct(RecordCore::parse(Self::NAME, buf, at))
    }

    /// Parse a record from the start of `data`.
    fn parse_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(&ByteBuffer::from_wire(data), 0)
    }

    /// Size check, layout, and for top-level parsed records normalization
    /// and tag validation.
    fn construct(core: RecordCore) -> Result<Self> {
        core.require(Self::initial_size())?;
        let mut record = Self::init(core)?;
        let core = record.core();
        if core.mode() == Mode::Parse && !core.is_nested() {
            record.class_swap();
            record.core().validate_tag()?;
        }
        Ok(record)
    }

    /// Seal the record for transmission: finalize the inner record, trim
    /// its unused reservation and convert to network order. Calling it
    /// again, or on a parsed record, does nothing.
    fn finalize(&mut self) -> Result<()> {
        let core = self.core();
        match core.mode() {
            Mode::Parse => {
                debug!(record = Self::NAME, "finalize on parsed record ignored");
                return Ok(());
            }
            Mode::Finalized => {
                debug!(record = Self::NAME, "record already finalized");
                return Ok(());
            }
            Mode::Build => {}
        }
        if core.is_nested() {
            error!(record = Self::NAME, "list element finalized on its own");
            return Err(TlvError::Nested);
        }
        if let Some(list) = core.pending() {
            error!(record = Self::NAME, list, "finalize with an element still pending");
            return Err(TlvError::PendingElement { list });
        }
        self.post_init_check()?;
        self.core_mut().finalize_inner()?;
        self.class_swap();
        let core = self.core_mut();
        core.mode = Mode::Finalized;
        debug!(record = Self::NAME, len = core.len(), "record finalized");
        Ok(())
    }

    /// Laid-out size in bytes.
    fn len(&self) -> usize {
        self.core().len()
    }

    /// True when nothing is laid out.
    fn is_empty(&self) -> bool {
        self.core().is_empty()
    }

    /// Current lifecycle state.
    fn mode(&self) -> Mode {
        self.core().mode()
    }

    /// Copy of the record's bytes, see [`RecordCore::to_bytes`]. Host order
    /// for parsed records; do not retransmit them as wire data.
    fn to_bytes(&self) -> Bytes {
        self.core().to_bytes()
    }
}

/// A record that starts with a type tag and a 16-bit payload length.
pub trait Tlv: Record {
    /// Tag identifying the record type on the wire
    const TYPE_TAG: u16;
}

/// Type-erased record stored as another record's inner payload.
pub trait NestedRecord: Any {
    /// Finalize the record.
    fn finalize_nested(&mut self) -> Result<()>;
    /// Laid-out size in bytes.
    fn nested_len(&self) -> usize;
    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<R: Record> NestedRecord for R {
    fn finalize_nested(&mut self) -> Result<()> {
        self.finalize()
    }

    fn nested_len(&self) -> usize {
        self.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Implement [`Record::core`] and [`Record::core_mut`] for a record whose
/// core lives in a field named `core`.
#[macro_export]
macro_rules! record_core {
    () => {
        fn core(&self) -> &$crate::RecordCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut $crate::RecordCore {
            &mut self.core
        }
    };
}

/// Getter and build-mode setter for each fixed field of a record. The
/// record must keep the field's slot in a struct field named like the getter.
#[macro_export]
macro_rules! fixed_fields {
    ($( $(#[$meta:meta])* $get:ident / $set:ident : $ty:ty ;)*) => {
        $(
            $(#[$meta])*
            pub fn $get(&self) -> $ty {
                self.core.get(self.$get)
            }

            #[doc = concat!("Set `", stringify!($get), "`.")]
            pub fn $set(&mut self, value: $ty) -> $crate::Result<()> {
                self.core.set(self.$get, value)
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    /// tag(u8) length(u16) a(u8) b(u32)
    #[derive(Debug)]
    struct Plain {
        core: RecordCore,
        a: Slot<u8>,
        b: Slot<u32>,
    }

    impl Record for Plain {
        const NAME: &'static str = "Plain";

        fn initial_size() -> usize {
            1 + 2 + 1 + 4
        }

        fn init(mut core: RecordCore) -> Result<Self> {
            core.tag(0x42u8)?;
            core.length()?;
            let a = core.field("a")?;
            let b = core.field("b")?;
            Ok(Self { core, a, b })
        }

        record_core!();

        fn swap_fields(&mut self) {
            self.core.swap(self.b);
        }
    }

    impl Plain {
        fixed_fields! {
            /// a
            a / set_a: u8;
            /// b
            b / set_b: u32;
        }
    }

    #[test]
    fn test_build_fixed_fields() {
        let buf = ByteBuffer::with_capacity(32);
        let mut rec = Plain::build(&buf).unwrap();
        assert_eq!(rec.len(), 8);
        assert_eq!(rec.core().declared_length(), Some(5));

        rec.set_a(7).unwrap();
        rec.set_b(0x0102_0304).unwrap();
        rec.finalize().unwrap();

        assert_eq!(
            buf.to_bytes().as_ref(),
            &[0x42, 0x00, 0x05, 0x07, 0x01, 0x02, 0x03, 0x04]
        );
        // getters keep returning host values after the swap
        assert_eq!(rec.b(), 0x0102_0304);
        assert_eq!(rec.core().declared_length(), Some(5));
    }

    #[test]
    fn test_buffer_too_small() {
        let buf = ByteBuffer::with_capacity(7);
        let err = Plain::build(&buf).unwrap_err();
        assert_eq!(
            err,
            TlvError::BufferTooSmall {
                record: "Plain",
                needed: 8,
                available: 7
            }
        );
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_parse_and_validate() {
        let wire = [0x42, 0x00, 0x05, 0x09, 0xde, 0xad, 0xbe, 0xef];
        let rec = Plain::parse_bytes(&wire).unwrap();
        assert_eq!(rec.mode(), Mode::Parse);
        assert_eq!(rec.a(), 9);
        assert_eq!(rec.b(), 0xdead_beef);
        assert_eq!(rec.core().order(), ByteOrder::Host);
    }

    #[test]
    fn test_parse_type_mismatch() {
        let wire = [0x43, 0x00, 0x05, 0x09, 0xde, 0xad, 0xbe, 0xef];
        let err = Plain::parse_bytes(&wire).unwrap_err();
        assert_eq!(
            err,
            TlvError::TypeMismatch {
                expected: 0x42,
                actual: 0x43
            }
        );
    }

    #[test]
    fn test_parsed_record_is_read_only() {
        let wire = [0x42, 0x00, 0x05, 0x09, 0xde, 0xad, 0xbe, 0xef];
        let mut rec = Plain::parse_bytes(&wire).unwrap();
        assert_eq!(rec.set_a(1), Err(TlvError::ReadOnly));
        // finalize on a parsed record is a no-op
        rec.finalize().unwrap();
        assert_eq!(rec.b(), 0xdead_beef);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let buf = ByteBuffer::with_capacity(16);
        let mut rec = Plain::build(&buf).unwrap();
        rec.set_b(0x1122_3344).unwrap();
        rec.finalize().unwrap();
        let first = buf.to_bytes();
        rec.finalize().unwrap();
        assert_eq!(buf.to_bytes(), first);
        assert_eq!(rec.mode(), Mode::Finalized);
        assert_eq!(rec.set_a(1), Err(TlvError::ReadOnly));
    }

    #[test]
    fn test_parse_bounded_by_declared_length() {
        // declared length covers the fixed fields only; trailing bytes
        // belong to the next record
        let wire = [0x42, 0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x02, 0xff, 0xff];
        let buf = ByteBuffer::from_wire(wire);
        let rec = Plain::parse(&buf, 0).unwrap();
        assert_eq!(rec.len(), 8);
        assert_eq!(rec.core().remaining_bytes(), 0);
    }

    #[test]
    fn test_inner_record_tailroom_trimmed() {
        let buf = ByteBuffer::with_capacity(64);
        let mut outer = Plain::build(&buf).unwrap();
        outer.core_mut().attach_inner::<Plain>(Some(20)).unwrap();
        assert_eq!(outer.core().declared_length(), Some(25));

        let inner = outer.core_mut().inner_mut::<Plain>().unwrap();
        inner.set_a(3).unwrap();
        outer.finalize().unwrap();

        assert_eq!(outer.len(), 16);
        assert_eq!(buf.len(), 16);
        assert_eq!(outer.core().declared_length(), Some(13));
        assert_eq!(&buf.to_bytes()[8..11], &[0x42, 0x00, 0x05]);
    }

    #[test]
    fn test_second_inner_record_rejected() {
        let buf = ByteBuffer::with_capacity(64);
        let mut outer = Plain::build(&buf).unwrap();
        outer.core_mut().attach_inner::<Plain>(Some(8)).unwrap();
        assert_eq!(
            outer.core_mut().attach_inner::<Plain>(Some(8)).unwrap_err(),
            TlvError::AlreadyAllocated { field: "inner" }
        );
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn test_parsed_copy_is_host_order() {
        let wire = [0x42, 0x00, 0x05, 0x09, 0xde, 0xad, 0xbe, 0xef];
        let rec = Plain::parse_bytes(&wire).unwrap();
        let copy = rec.to_bytes();
        let b: [u8; 4] = copy[4..8].try_into().unwrap();
        assert_eq!(u32::from_ne_bytes(b), 0xdead_beef);
    }

    #[test]
    fn test_inner_reservation_too_small_rolls_back() {
        let buf = ByteBuffer::with_capacity(64);
        let mut outer = Plain::build(&buf).unwrap();
        let err = outer.core_mut().attach_inner::<Plain>(Some(4)).unwrap_err();
        assert!(matches!(err, TlvError::BufferTooSmall { .. }));
        assert_eq!(outer.len(), 8);
        assert_eq!(buf.len(), 8);
        assert_eq!(outer.core().declared_length(), Some(5));
    }

    #[test]
    fn test_parse_inner() {
        let wire = [
            0x42, 0x00, 0x0d, 0x01, 0x00, 0x00, 0x00, 0x02, // outer
            0x42, 0x00, 0x05, 0x03, 0x00, 0x00, 0x00, 0x04, // inner
        ];
        let mut outer = Plain::parse_bytes(&wire).unwrap();
        let inner = outer.core_mut().parse_inner::<Plain>().unwrap();
        assert_eq!(inner.a(), 3);
        assert_eq!(inner.b(), 4);
        assert_eq!(outer.len(), 16);
    }
}
