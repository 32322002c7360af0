//! Uninitialised ring storage cells.
//!
//! Every bounded queue in this crate stores its elements in an array of
//! [`Slot<T>`]s that starts out uninitialised. A slot becomes initialised
//! when a producer writes it between reserving and committing, and turns
//! uninitialised again when a consumer moves the value out. The queue's
//! cursor protocol is what makes each transition race-free; the helpers
//! here only perform the raw placement work.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;

/// One cell of ring storage.
#[repr(transparent)]
pub(crate) struct Slot<T>(UnsafeCell<MaybeUninit<T>>);

// Safety: a slot is logically owned by exactly one actor at a time — the
// producer that reserved it until its tail commit, then the consumer that
// reserved it until its own commit. The cursor protocol's release/acquire
// edges order every access.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn uninit() -> Self {
        Self(UnsafeCell::new(MaybeUninit::uninit()))
    }

    /// Allocates `len` uninitialised slots as a boxed slice.
    pub(crate) fn boxed_array(len: usize) -> Box<[Slot<T>]> {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, Slot::uninit);
        slots.into_boxed_slice()
    }

    /// Constructs a value in place.
    ///
    /// # Safety
    ///
    /// The slot must be uninitialised and reserved for the calling producer.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.0.get()).write(value);
    }

    /// Moves the value out, leaving the slot uninitialised.
    ///
    /// # Safety
    ///
    /// The slot must be initialised and reserved for the calling consumer.
    #[inline]
    pub(crate) unsafe fn read(&self) -> T {
        (*self.0.get()).assume_init_read()
    }

    /// Returns a shared borrow of the value.
    ///
    /// # Safety
    ///
    /// The slot must be initialised, and must not be consumed or overwritten
    /// while the borrow is live.
    #[inline]
    pub(crate) unsafe fn as_ref(&self) -> &T {
        (*self.0.get()).assume_init_ref()
    }

    /// Destroys the value in place.
    ///
    /// # Safety
    ///
    /// The slot must be initialised and not concurrently accessed.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&self) {
        ptr::drop_in_place((*self.0.get()).as_mut_ptr());
    }
}
