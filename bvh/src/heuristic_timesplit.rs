//! Temporal split heuristic: partitions a set's time range instead of its
//! object range. Both sides keep every primitive, recomputed against the
//! narrowed window, which pays off when motion makes full-range bounds fat.

use log::debug;
use std::sync::Arc;

use crate::lbounds::{LinearBounds, TimeRange};
use crate::prim_ref::{blocks, PrimInfoMB, RecalculatePrimRef};
use crate::prim_vec::{MemoryMonitor, SetMB, SharedPrimVec};
use crate::split::SplitMB;

/// Number of time bins; with two bins the single candidate cut is the
/// segment-aligned center of the set's time range.
pub const NUM_TEMPORAL_BINS: usize = 2;

/// Cost the candidate cut of `set`'s time range. Bounds are recomputed per
/// side through the recalculator without materializing references.
pub fn find_temporal_split<R: RecalculatePrimRef + ?Sized>(
    set: &SetMB,
    pinfo: &PrimInfoMB,
    recalc: &R,
    log_block_size: usize,
) -> SplitMB {
    // snap the cut to the segment grid of the finest-grained primitive
    let num = pinfo.max_total_segments as f32;
    let time = (set.time_range.center() * num).round() / num;
    if !(time > set.time_range.lo && time < set.time_range.hi) {
        return SplitMB::Invalid;
    }

    let lrange = TimeRange::new(set.time_range.lo, time);
    let rrange = TimeRange::new(time, set.time_range.hi);

    let mut lbounds = LinearBounds::empty();
    let mut rbounds = LinearBounds::empty();
    let mut lsegments = 0usize;
    let mut rsegments = 0usize;

    for prim in set.slice() {
        let (lb, lseg) = recalc.linear_bounds(prim, lrange);
        lbounds.extend(&lb);
        lsegments += (lseg.end - lseg.start) as usize;

        let (rb, rseg) = recalc.linear_bounds(prim, rrange);
        rbounds.extend(&rb);
        rsegments += (rseg.end - rseg.start) as usize;
    }

    let sah = lbounds.expected_half_area() * blocks(lsegments, log_block_size)
        + rbounds.expected_half_area() * blocks(rsegments, log_block_size);

    SplitMB::Temporal { sah, time }
}

/// Perform a temporal split: materialize one fresh primitive buffer per
/// sub-time-range, each reference recomputed against its narrowed window.
pub fn split_temporal<R: RecalculatePrimRef + ?Sized>(
    time: f32,
    set: &SetMB,
    recalc: &R,
    monitor: Option<Arc<dyn MemoryMonitor>>,
) -> ((PrimInfoMB, SetMB), (PrimInfoMB, SetMB)) {
    let lrange = TimeRange::new(set.time_range.lo, time);
    let rrange = TimeRange::new(time, set.time_range.hi);
    let count = set.size();

    debug!(
        "temporal split at t={} over {} primitives ([{}, {}] -> two buffers)",
        time, count, set.time_range.lo, set.time_range.hi
    );

    let side = |range: TimeRange, monitor: Option<Arc<dyn MemoryMonitor>>| {
        let mut prims = Vec::with_capacity(count);
        for prim in set.slice() {
            let (prim, _segments) = recalc.recalculate(prim, range);
            prims.push(prim);
        }
        let info = PrimInfoMB::from_prims(&prims, 0, range);
        let vec = SharedPrimVec::new(prims, monitor);
        let set = SetMB::new(vec, 0, count, range);
        (info, set)
    };

    (side(lrange, monitor.clone()), side(rrange, monitor))
}
