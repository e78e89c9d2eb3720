use std::cell::UnsafeCell;
use std::mem;
use std::sync::Arc;

use crate::lbounds::TimeRange;
use crate::prim_ref::PrimRefMB;

/// Advisory sink for primitive-buffer memory traffic. Deltas are in bytes,
/// positive on allocation and negative on release.
pub trait MemoryMonitor: Send + Sync {
    fn notify(&self, bytes: isize);
}

/// Monitor that discards all signals.
pub struct IgnoreMemory;

impl MemoryMonitor for IgnoreMemory {
    fn notify(&self, _bytes: isize) {}
}

/// Contiguous primitive storage shared between sibling build records.
///
/// Cloning the `Arc` handle is the incref, dropping it the decref; the
/// array is released when the last handle unwinds. Sibling records alias
/// disjoint index ranges of one vector. A range is written only by the
/// frame that exclusively drives it: object-split rearrangement happens
/// before that frame's children are spawned, so concurrent frames never
/// overlap a mutation.
pub struct SharedPrimVec {
    prims: UnsafeCell<Vec<PrimRefMB>>,
    monitor: Option<Arc<dyn MemoryMonitor>>,
}

unsafe impl Send for SharedPrimVec {}
unsafe impl Sync for SharedPrimVec {}

impl SharedPrimVec {
    pub fn new(prims: Vec<PrimRefMB>, monitor: Option<Arc<dyn MemoryMonitor>>) -> Arc<Self> {
        if let Some(monitor) = &monitor {
            monitor.notify(Self::bytes_of(&prims));
        }
        Arc::new(Self {
            prims: UnsafeCell::new(prims),
            monitor,
        })
    }

    fn bytes_of(prims: &Vec<PrimRefMB>) -> isize {
        (prims.capacity() * mem::size_of::<PrimRefMB>()) as isize
    }

    pub fn len(&self) -> usize {
        unsafe { (*self.prims.get()).len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slice(&self, begin: usize, end: usize) -> &[PrimRefMB] {
        unsafe { &(&*self.prims.get())[begin..end] }
    }

    /// Exclusive view of `[begin, end)`.
    ///
    /// # Safety
    ///
    /// The caller's frame must be the only one driving this range: no other
    /// live view of an overlapping range may be read or written for the
    /// lifetime of the returned slice.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self, begin: usize, end: usize) -> &mut [PrimRefMB] {
        &mut (&mut *self.prims.get())[begin..end]
    }
}

impl Drop for SharedPrimVec {
    fn drop(&mut self) {
        if let Some(monitor) = &self.monitor {
            monitor.notify(-Self::bytes_of(self.prims.get_mut()));
        }
    }
}

/// A view over a shared primitive buffer: the half-open object-index range
/// `[begin, end)` and the time range the contained references are valid for.
#[derive(Clone)]
pub struct SetMB {
    pub prims: Arc<SharedPrimVec>,
    pub begin: usize,
    pub end: usize,
    pub time_range: TimeRange,
}

impl SetMB {
    pub fn new(prims: Arc<SharedPrimVec>, begin: usize, end: usize, time_range: TimeRange) -> Self {
        debug_assert!(begin <= end && end <= prims.len());
        Self {
            prims,
            begin,
            end,
            time_range,
        }
    }

    pub fn size(&self) -> usize {
        self.end - self.begin
    }

    pub fn slice(&self) -> &[PrimRefMB] {
        self.prims.slice(self.begin, self.end)
    }

    /// Exclusive view of the set's range; see [`SharedPrimVec::slice_mut`].
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut(&self) -> &mut [PrimRefMB] {
        self.prims.slice_mut(self.begin, self.end)
    }

    /// Whether two sets alias the same underlying buffer.
    pub fn same_vec(&self, other: &SetMB) -> bool {
        Arc::ptr_eq(&self.prims, &other.prims)
    }
}
