use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;

use crate::aabb::Aabb;
use crate::lbounds::{LinearBounds, TimeRange};

/// Motion-blur primitive reference: a time-linear bound over a time range,
/// together with the number of shutter segments the primitive occupies
/// inside that range and in the scene overall.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct PrimRefMB {
    pub lbounds: LinearBounds,
    pub active_segments: u32,
    pub total_segments: u32,
    pub geom_id: u32,
    pub prim_id: u32,
}

impl PrimRefMB {
    pub fn new(
        lbounds: LinearBounds,
        active_segments: u32,
        total_segments: u32,
        geom_id: u32,
        prim_id: u32,
    ) -> Self {
        debug_assert!(active_segments > 0);
        Self {
            lbounds,
            active_segments,
            total_segments,
            geom_id,
            prim_id,
        }
    }

    /// Number of shutter segments occupied within the reference's time range.
    pub fn size(&self) -> usize {
        self.active_segments as usize
    }

    pub fn bounds(&self) -> Aabb {
        self.lbounds.interpolate(0.5)
    }

    pub fn bin_center(&self) -> Vec3 {
        self.bounds().center()
    }
}

/* the stable total order used to restore determinism after in-place
 * partitioning has scrambled the array */
impl PartialEq for PrimRefMB {
    fn eq(&self, other: &Self) -> bool {
        self.geom_id == other.geom_id && self.prim_id == other.prim_id
    }
}

impl Eq for PrimRefMB {}

impl PartialOrd for PrimRefMB {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrimRefMB {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.geom_id, self.prim_id).cmp(&(other.geom_id, other.prim_id))
    }
}

/// Half-open window of shutter-segment indices a time range covers, for a
/// primitive with `total_segments` segments over `[0, 1]`. Never empty.
pub fn time_segment_range(time_range: TimeRange, total_segments: u32) -> Range<i32> {
    let num = total_segments as f32;
    let lo = (time_range.lo * num * (1.0 + 2.0 * f32::EPSILON)).floor() as i32;
    let hi = (time_range.hi * num * (1.0 - 2.0 * f32::EPSILON)).ceil() as i32;
    let lo = lo.max(0);
    let hi = hi.min(total_segments as i32).max(lo + 1);
    lo..hi
}

/// Round a segment count up to SAH blocks.
pub(crate) fn blocks(n: usize, log_block_size: usize) -> f32 {
    ((n + (1 << log_block_size) - 1) >> log_block_size) as f32
}

/// Aggregate statistics over a contiguous primitive range.
///
/// Monoidal: [`PrimInfoMB::empty`] is the identity of [`PrimInfoMB::merge`].
/// `num_time_segments` sums the contained references' active segments; SAH
/// counts are segment counts throughout, which keeps object and temporal
/// split costs comparable.
#[derive(Debug, Copy, Clone)]
pub struct PrimInfoMB {
    pub begin: usize,
    pub end: usize,
    pub geom_bounds: LinearBounds,
    pub cent_bounds: Aabb,
    pub time_range: TimeRange,
    pub num_time_segments: usize,
    pub max_total_segments: u32,
}

impl PrimInfoMB {
    pub fn empty() -> Self {
        Self {
            begin: 0,
            end: 0,
            geom_bounds: LinearBounds::empty(),
            cent_bounds: Aabb::new(),
            time_range: TimeRange::new(1.0, 0.0),
            num_time_segments: 0,
            max_total_segments: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.end - self.begin
    }

    /// Fold one reference into the bounds and segment statistics. The
    /// object range and time range are set by the caller once the scan
    /// is done.
    pub fn add_prim_ref(&mut self, prim: &PrimRefMB) {
        self.geom_bounds.extend(&prim.lbounds);
        self.cent_bounds.grow(prim.bin_center());
        self.num_time_segments += prim.size();
        self.max_total_segments = self.max_total_segments.max(prim.total_segments);
    }

    pub fn merge(&self, other: &PrimInfoMB) -> PrimInfoMB {
        let mut geom_bounds = self.geom_bounds;
        geom_bounds.extend(&other.geom_bounds);
        let mut time_range = self.time_range;
        time_range.extend(other.time_range);
        // an empty range carries no position
        let (begin, end) = if self.begin == self.end {
            (other.begin, other.end)
        } else if other.begin == other.end {
            (self.begin, self.end)
        } else {
            (self.begin.min(other.begin), self.end.max(other.end))
        };
        PrimInfoMB {
            begin,
            end,
            geom_bounds,
            cent_bounds: self.cent_bounds.union_of(&other.cent_bounds),
            time_range,
            num_time_segments: self.num_time_segments + other.num_time_segments,
            max_total_segments: self.max_total_segments.max(other.max_total_segments),
        }
    }

    /// Scan a primitive slice laid out at `[begin, end)` of its buffer.
    pub fn from_prims(prims: &[PrimRefMB], begin: usize, time_range: TimeRange) -> Self {
        let mut info = Self::empty();
        for prim in prims {
            info.add_prim_ref(prim);
        }
        info.begin = begin;
        info.end = begin + prims.len();
        info.time_range = time_range;
        info
    }

    pub fn half_area(&self) -> f32 {
        self.geom_bounds.expected_half_area()
    }

    pub fn leaf_sah(&self, log_block_size: usize) -> f32 {
        self.geom_bounds.expected_half_area() * blocks(self.num_time_segments, log_block_size)
    }
}

/// Recomputes a primitive reference against a narrower time window.
///
/// Backed by the primitive database: given a reference and a time range, it
/// answers with the linear bounds over that range and the covered segment
/// window. The bounds-only variant lets temporal binning cost a candidate
/// cut without materializing references.
pub trait RecalculatePrimRef: Sync {
    fn recalculate(&self, prim: &PrimRefMB, time_range: TimeRange) -> (PrimRefMB, Range<i32>);

    fn linear_bounds(&self, prim: &PrimRefMB, time_range: TimeRange)
        -> (LinearBounds, Range<i32>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn static_prim(x: f32, id: u32) -> PrimRefMB {
        let bb = Aabb::from((Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)));
        PrimRefMB::new(LinearBounds::new(bb, bb), 1, 1, 0, id)
    }

    #[test]
    fn segment_range_full_shutter() {
        assert_eq!(time_segment_range(TimeRange::ALL, 4), 0..4);
    }

    #[test]
    fn segment_range_halves() {
        assert_eq!(time_segment_range(TimeRange::new(0.0, 0.5), 4), 0..2);
        assert_eq!(time_segment_range(TimeRange::new(0.5, 1.0), 4), 2..4);
    }

    #[test]
    fn segment_range_never_empty() {
        let r = time_segment_range(TimeRange::new(0.5, 0.5), 4);
        assert_eq!(r.end - r.start, 1);
    }

    #[test]
    fn blocks_rounds_up() {
        assert_eq!(blocks(1, 0), 1.0);
        assert_eq!(blocks(5, 1), 3.0);
        assert_eq!(blocks(8, 2), 2.0);
        assert_eq!(blocks(9, 2), 3.0);
    }

    #[test]
    fn prim_order_is_by_ids() {
        let a = static_prim(0.0, 1);
        let b = static_prim(5.0, 2);
        assert!(a < b);

        let mut c = static_prim(0.0, 0);
        c.geom_id = 1;
        assert!(b < c);
    }

    #[test]
    fn info_is_monoidal() {
        let prims: Vec<PrimRefMB> = (0..4).map(|i| static_prim(i as f32, i)).collect();

        let whole = PrimInfoMB::from_prims(&prims, 0, TimeRange::ALL);
        let left = PrimInfoMB::from_prims(&prims[..2], 0, TimeRange::ALL);
        let right = PrimInfoMB::from_prims(&prims[2..], 2, TimeRange::ALL);
        let merged = left.merge(&right);

        assert_eq!(merged.begin, whole.begin);
        assert_eq!(merged.end, whole.end);
        assert_eq!(merged.num_time_segments, whole.num_time_segments);
        assert_eq!(merged.geom_bounds.bounds0.min, whole.geom_bounds.bounds0.min);
        assert_eq!(merged.geom_bounds.bounds1.max, whole.geom_bounds.bounds1.max);

        let id = PrimInfoMB::empty().merge(&whole);
        assert_eq!(id.begin, whole.begin);
        assert_eq!(id.end, whole.end);
        assert_eq!(id.num_time_segments, whole.num_time_segments);
    }

    #[test]
    fn leaf_sah_scales_with_segments() {
        let prims: Vec<PrimRefMB> = (0..4).map(|i| static_prim(i as f32, i)).collect();
        let info = PrimInfoMB::from_prims(&prims, 0, TimeRange::ALL);
        assert_eq!(info.leaf_sah(0), info.half_area() * 4.0);
        assert_eq!(info.leaf_sah(2), info.half_area() * 1.0);
    }
}
