//! Shared byte store that records are laid over.
//!
//! A [`ByteBuffer`] is a cheap handle onto one `BytesMut` arena. Every record
//! built or parsed in a single pass holds a clone of the same handle and
//! addresses its fields by absolute offset, so growing one field (which
//! shifts everything behind it) never leaves another record with a dangling
//! reference. Records fix up their own offsets after a shift.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TlvError};

/// Handle onto a shared, fixed-capacity byte arena.
///
/// The arena is zero-initialized and never reallocates. `tail` marks the end
/// of the bytes written so far; everything in `[tail, base + capacity)` is free.
/// A handle may be narrowed to a window of the arena with [`ByteBuffer::window`];
/// the window keeps its own tail so growth inside it cannot escape it.
#[derive(Clone)]
pub struct ByteBuffer {
    store: Rc<RefCell<BytesMut>>,
    base: usize,
    capacity: usize,
    tail: Rc<Cell<usize>>,
}

impl ByteBuffer {
    /// Create an empty, zeroed build buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Rc::new(RefCell::new(BytesMut::zeroed(capacity))),
            base: 0,
            capacity,
            tail: Rc::new(Cell::new(0)),
        }
    }

    /// Wrap received bytes for parsing. The whole input counts as written.
    pub fn from_wire(data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        Self {
            store: Rc::new(RefCell::new(BytesMut::from(data))),
            base: 0,
            capacity: data.len(),
            tail: Rc::new(Cell::new(data.len())),
        }
    }

    /// Narrow this handle to `[at, at + len)`. The window starts empty.
    pub fn window(&self, at: usize, len: usize) -> Result<Self> {
        if at < self.base || at + len > self.end() {
            return Err(TlvError::CapacityExceeded {
                needed: len,
                available: self.end().saturating_sub(at),
            });
        }
        Ok(Self {
            store: Rc::clone(&self.store),
            base: at,
            capacity: len,
            tail: Rc::new(Cell::new(at)),
        })
    }

    /// First absolute offset covered by this handle.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Size of the region covered by this handle.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One past the last absolute offset covered by this handle.
    pub fn end(&self) -> usize {
        self.base + self.capacity
    }

    /// Absolute offset of the first unwritten byte.
    pub fn tail(&self) -> usize {
        self.tail.get()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.tail() - self.base
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free bytes behind the tail.
    pub fn free(&self) -> usize {
        self.end() - self.tail()
    }

    /// Open a zeroed gap of `n` bytes at `at`, shifting `[at, tail)` forward.
    pub fn insert(&self, at: usize, n: usize) -> Result<()> {
        let tail = self.tail();
        if at < self.base || at > tail {
            return Err(TlvError::CapacityExceeded {
                needed: n,
                available: 0,
            });
        }
        if n > self.free() {
            return Err(TlvError::CapacityExceeded {
                needed: n,
                available: self.free(),
            });
        }
        if n == 0 {
            return Ok(());
        }
        let mut store = self.store.borrow_mut();
        store.copy_within(at..tail, at + n);
        store[at..at + n].fill(0);
        self.tail.set(tail + n);
        Ok(())
    }

    /// Close `n` bytes at `at`, shifting `[at + n, tail)` back and zeroing
    /// the freed tail.
    pub fn remove(&self, at: usize, n: usize) -> Result<()> {
        let tail = self.tail();
        if at < self.base || at + n > tail {
            return Err(TlvError::CapacityExceeded {
                needed: n,
                available: tail.saturating_sub(at),
            });
        }
        if n == 0 {
            return Ok(());
        }
        let mut store = self.store.borrow_mut();
        store.copy_within(at + n..tail, at);
        store[tail - n..tail].fill(0);
        self.tail.set(tail - n);
        Ok(())
    }

    /// Run `f` over `len` bytes at `at`.
    pub fn with_slice<R>(&self, at: usize, len: usize, f: impl FnOnce(&[u8]) -> R) -> R {
        let store = self.store.borrow();
        f(&store[at..at + len])
    }

    /// Run `f` over `len` mutable bytes at `at`.
    pub fn with_slice_mut<R>(&self, at: usize, len: usize, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut store = self.store.borrow_mut();
        f(&mut store[at..at + len])
    }

    /// Copy `len` bytes at `at` out of the arena.
    pub fn copy_out(&self, at: usize, len: usize) -> Vec<u8> {
        self.with_slice(at, len, <[u8]>::to_vec)
    }

    /// Copy `data` into the arena at `at`.
    pub fn copy_in(&self, at: usize, data: &[u8]) {
        self.with_slice_mut(at, data.len(), |dst| dst.copy_from_slice(data));
    }

    /// The written bytes of this handle, `[base, tail)`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.copy_out(self.base, self.len()))
    }

    /// Hand the written bytes over to a transport.
    pub fn freeze(self) -> Bytes {
        self.to_bytes()
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .field("tail", &self.tail())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_shifts_trailing_bytes() {
        let buf = ByteBuffer::with_capacity(8);
        buf.insert(0, 3).unwrap();
        buf.copy_in(0, &[1, 2, 3]);

        buf.insert(1, 2).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.to_bytes().as_ref(), &[1, 0, 0, 2, 3]);
    }

    #[test]
    fn test_insert_beyond_capacity() {
        let buf = ByteBuffer::with_capacity(4);
        buf.insert(0, 3).unwrap();
        let err = buf.insert(3, 2).unwrap_err();
        assert_eq!(
            err,
            TlvError::CapacityExceeded {
                needed: 2,
                available: 1
            }
        );
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_remove_zeroes_freed_tail() {
        let buf = ByteBuffer::with_capacity(6);
        buf.insert(0, 5).unwrap();
        buf.copy_in(0, &[1, 2, 3, 4, 5]);

        buf.remove(1, 2).unwrap();
        assert_eq!(buf.to_bytes().as_ref(), &[1, 4, 5]);
        buf.with_slice(3, 2, |rest| assert_eq!(rest, &[0, 0]));
    }

    #[test]
    fn test_window_growth_is_bounded() {
        let buf = ByteBuffer::with_capacity(16);
        buf.insert(0, 10).unwrap();
        let win = buf.window(4, 6).unwrap();
        assert_eq!(win.tail(), 4);
        win.insert(4, 6).unwrap();
        assert!(win.insert(10, 1).is_err());
        // the parent tail is untouched by the window
        assert_eq!(buf.tail(), 10);
    }

    #[test]
    fn test_from_wire() {
        let buf = ByteBuffer::from_wire([0x0b, 0x00, 0x00]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.free(), 0);
        assert_eq!(buf.freeze().as_ref(), &[0x0b, 0x00, 0x00]);
    }
}
