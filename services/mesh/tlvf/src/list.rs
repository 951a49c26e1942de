//! Repeated sub-records.
//!
//! A [`RecordList`] owns the elements laid out after its anchor and keeps
//! the record's count field in step with them. Elements are appended with a
//! two-step handshake so they can be populated in place:
//!
//! ```text
//! let elem = list.create_element(&mut core)?;   // slot opened, list locked
//! /* fill elem, grow its variable fields */
//! list.add_element(&mut core, elem)?;           // committed, count += 1
//! ```
//!
//! While an element is pending no other element of the record can be
//! created, and fields behind the list cannot be written.

use tracing::error;

use crate::error::{Result, TlvError};
use crate::record::{Mode, Record, RecordCore, Slot};
use crate::var::Count;

/// Ordered list of nested records.
#[derive(Debug)]
pub struct RecordList<E, C = u8> {
    name: &'static str,
    order: usize,
    count: Slot<C>,
    anchor: Slot<()>,
    items: Vec<E>,
}

impl<E: Record, C: Count> RecordList<E, C> {
    /// Lay out a list whose element count lives in `count`. In parse mode
    /// every element is parsed immediately.
    pub fn layout(
        core: &mut RecordCore,
        name: &'static str,
        order: usize,
        count: Slot<C>,
    ) -> Result<Self> {
        let mut list = Self {
            name,
            order,
            count,
            anchor: core.anchor(),
            items: Vec::new(),
        };
        if core.mode() == Mode::Parse {
            let expected: usize = core.get(count).into();
            for _ in 0..expected {
                let elem = list.open_element(core)?;
                list.add_element(core, elem)?;
            }
        }
        Ok(list)
    }

    fn next_offset(&self, core: &RecordCore) -> usize {
        core.offset(self.anchor) + self.items.iter().map(Record::len).sum::<usize>()
    }

    /// Open a slot for a new element at the end of the list.
    pub fn create_element(&self, core: &mut RecordCore) -> Result<E> {
        core.growable(self.name)?;
        self.open_element(core)
    }

    fn open_element(&self, core: &mut RecordCore) -> Result<E> {
        core.check_order(self.name, self.order)?;
        if let Some(list) = core.pending() {
            error!(record = core.name(), list, "previous element was not added");
            return Err(TlvError::PendingElement { list });
        }
        let min = E::initial_size();
        let available = core.remaining_bytes();
        if available < min {
            error!(
                record = core.name(),
                list = self.name,
                needed = min,
                available,
                "not enough available space on buffer for list element"
            );
            return Err(TlvError::CapacityExceeded {
                needed: min,
                available,
            });
        }
        if core.mode() == Mode::Build && C::try_from(self.items.len() + 1).is_err() {
            error!(record = core.name(), list = self.name, "list count overflow");
            return Err(TlvError::LengthOverflow { field: self.name });
        }

        core.raise_lock(self.order);
        let at = self.next_offset(core);
        if core.mode() == Mode::Build {
            core.grow_at(at, min)?;
            core.reanchor_after(self.anchor.index(), min);
        }
        let elem = E::construct(RecordCore::element(E::NAME, core, at, min))?;
        core.set_pending(Some((self.name, self.anchor.index())));
        Ok(elem)
    }

    /// Commit the element returned by the last [`RecordList::create_element`].
    pub fn add_element(&mut self, core: &mut RecordCore, mut elem: E) -> Result<()> {
        if core.pending() != Some(self.name) {
            error!(record = core.name(), list = self.name, "add without a pending element");
            return Err(TlvError::NoPendingElement { list: self.name });
        }
        let expected = self.next_offset(core);
        let actual = elem.core().start();
        if actual != expected {
            error!(
                record = core.name(),
                list = self.name,
                expected,
                actual,
                "element does not belong to this list slot"
            );
            return Err(TlvError::ElementMismatch {
                list: self.name,
                expected,
                actual,
            });
        }

        let len = elem.len();
        if core.mode() == Mode::Build {
            core.check_length(self.name, len)?;
            let count = C::try_from(self.items.len() + 1)
                .map_err(|_| TlvError::LengthOverflow { field: self.name })?;
            // the element's own growth already moved every byte behind it
            let growth = len.saturating_sub(E::initial_size());
            core.extend(growth);
            core.reanchor_after(self.anchor.index(), growth);
            core.put(self.count, count);
            core.add_length(len)?;
        } else if let Err(err) = core.advance(len) {
            error!(record = core.name(), list = self.name, "list element runs past the record");
            return Err(err);
        }

        elem.core_mut().seal();
        self.items.push(elem);
        core.set_pending(None);
        Ok(())
    }

    /// Number of committed elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no element has been committed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element at `idx`.
    pub fn get(&self, idx: usize) -> Option<&E> {
        self.items.get(idx)
    }

    /// Mutable element at `idx`. Fixed fields stay writable until the
    /// owning record is finalized; the element can no longer grow.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut E> {
        self.items.get_mut(idx)
    }

    /// Iterate over committed elements.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    /// List name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Swap every element. Called from the owner's `swap_fields`.
    pub fn swap_all(&mut self) {
        for elem in self.items.iter_mut() {
            elem.class_swap();
        }
    }
}

impl<'a, E, C> IntoIterator for &'a RecordList<E, C> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarField;
    use crate::{fixed_fields, record_core, ByteBuffer};

    /// id(u16) label_len(u8) label[]
    #[derive(Debug)]
    struct Entry {
        core: RecordCore,
        id: Slot<u16>,
        label: VarField,
    }

    impl Record for Entry {
        const NAME: &'static str = "Entry";

        fn initial_size() -> usize {
            2 + 1
        }

        fn init(mut core: RecordCore) -> Result<Self> {
            let id = core.field("id")?;
            let label_len = core.field::<u8>("label_length")?;
            let label = VarField::with_prefix(&mut core, "label", 0, label_len)?;
            Ok(Self { core, id, label })
        }

        record_core!();

        fn swap_fields(&mut self) {
            self.core.swap(self.id);
        }
    }

    impl Entry {
        fixed_fields! {
            /// Entry id
            id / set_id: u16;
        }

        fn set_label(&mut self, label: &str) -> Result<()> {
            self.label.set_str(&mut self.core, label)
        }
    }

    /// tag length count(u8) entries[] trailer(u16)
    struct Table {
        core: RecordCore,
        entries: RecordList<Entry>,
        trailer: Slot<u16>,
    }

    impl Record for Table {
        const NAME: &'static str = "Table";

        fn initial_size() -> usize {
            1 + 2 + 1 + 2
        }

        fn init(mut core: RecordCore) -> Result<Self> {
            core.tag(0x30u8)?;
            core.length()?;
            let count = core.field::<u8>("entry_count")?;
            let entries = RecordList::layout(&mut core, "entries", 0, count)?;
            let trailer = core.field("trailer")?;
            Ok(Self {
                core,
                entries,
                trailer,
            })
        }

        record_core!();

        fn swap_fields(&mut self) {
            self.core.swap(self.trailer);
            self.entries.swap_all();
        }
    }

    fn add_entry(table: &mut Table, id: u16, label: &str) -> Result<()> {
        let mut entry = table.entries.create_element(&mut table.core)?;
        entry.set_id(id)?;
        entry.set_label(label)?;
        table.entries.add_element(&mut table.core, entry)
    }

    #[test]
    fn test_build_list_with_growing_elements() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        table.core.set(table.trailer, 0xbeef).unwrap();

        add_entry(&mut table, 0x0102, "ab").unwrap();
        add_entry(&mut table, 0x0304, "").unwrap();
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.core.get(table.trailer), 0xbeef);
        assert_eq!(table.core.declared_length(), Some(3 + 5 + 3));

        table.finalize().unwrap();
        assert_eq!(
            buf.to_bytes().as_ref(),
            &[
                0x30, 0x00, 0x0b, 0x02, // header + count
                0x01, 0x02, 0x02, b'a', b'b', // entry 0
                0x03, 0x04, 0x00, // entry 1
                0xbe, 0xef, // trailer
            ]
        );
    }

    #[test]
    fn test_create_while_pending_fails() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        let _pending = table.entries.create_element(&mut table.core).unwrap();
        let err = table.entries.create_element(&mut table.core).unwrap_err();
        assert_eq!(err, TlvError::PendingElement { list: "entries" });
        assert_eq!(
            table.core.set(table.trailer, 1),
            Err(TlvError::PendingElement { list: "entries" })
        );
        assert_eq!(table.finalize(), Err(TlvError::PendingElement { list: "entries" }));
    }

    #[test]
    fn test_add_without_create_fails() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        let entry = table.entries.create_element(&mut table.core).unwrap();
        table.entries.add_element(&mut table.core, entry).unwrap();

        let other = ByteBuffer::with_capacity(64);
        let mut stray = Table::build(&other).unwrap();
        let foreign = stray.entries.create_element(&mut stray.core).unwrap();
        let err = table.entries.add_element(&mut table.core, foreign).unwrap_err();
        assert_eq!(err, TlvError::NoPendingElement { list: "entries" });
    }

    #[test]
    fn test_add_mismatched_element_fails() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        let _mine = table.entries.create_element(&mut table.core).unwrap();

        let other = ByteBuffer::with_capacity(64);
        let mut stray = Table::build(&other).unwrap();
        let mut padding = stray.entries.create_element(&mut stray.core).unwrap();
        padding.set_label("xyz").unwrap();
        stray.entries.add_element(&mut stray.core, padding).unwrap();
        let foreign = stray.entries.create_element(&mut stray.core).unwrap();

        let err = table.entries.add_element(&mut table.core, foreign).unwrap_err();
        assert!(matches!(err, TlvError::ElementMismatch { list: "entries", .. }));
    }

    #[test]
    fn test_committed_element_is_sealed() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        add_entry(&mut table, 1, "").unwrap();

        let entry = table.entries.get_mut(0).unwrap();
        entry.set_id(7).unwrap();
        assert_eq!(entry.set_label("late"), Err(TlvError::Sealed));
        assert_eq!(table.entries.get(0).map(Entry::id), Some(7));
    }

    #[test]
    fn test_element_cannot_finalize_alone() {
        let buf = ByteBuffer::with_capacity(64);
        let mut table = Table::build(&buf).unwrap();
        let mut entry = table.entries.create_element(&mut table.core).unwrap();
        assert_eq!(entry.finalize(), Err(TlvError::Nested));
    }

    #[test]
    fn test_list_capacity_exceeded() {
        let buf = ByteBuffer::with_capacity(8);
        let mut table = Table::build(&buf).unwrap();
        let err = table.entries.create_element(&mut table.core).unwrap_err();
        assert_eq!(
            err,
            TlvError::CapacityExceeded {
                needed: 3,
                available: 2
            }
        );
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_parse_list() {
        let wire = [
            0x30, 0x00, 0x0b, 0x02, 0x01, 0x02, 0x02, b'a', b'b', 0x03, 0x04, 0x00, 0xbe, 0xef,
        ];
        let table = Table::parse_bytes(&wire).unwrap();
        let ids: Vec<u16> = table.entries.iter().map(Entry::id).collect();
        assert_eq!(ids, vec![0x0102, 0x0304]);
        let first = table.entries.get(0).unwrap();
        assert_eq!(first.label.as_str(&first.core), "ab");
        assert_eq!(table.core.get(table.trailer), 0xbeef);
        assert_eq!(table.len(), wire.len());
    }
}
