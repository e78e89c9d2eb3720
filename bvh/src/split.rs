use glam::Vec3;

use crate::aabb::Aabb;

/// Number of spatial bins per axis used by the object-split heuristic.
pub const NUM_OBJECT_BINS: usize = 32;

/// Linear mapping from bin centers to spatial bin indices over the
/// centroid bounds of a set. Axes with no centroid extent map nowhere and
/// are skipped by the sweep.
#[derive(Debug, Copy, Clone)]
pub struct BinMapping {
    pub ofs: [f32; 3],
    pub scale: [f32; 3],
}

impl BinMapping {
    pub fn new(cent_bounds: &Aabb, bins: usize) -> Self {
        let diag = cent_bounds.lengths();
        let mut scale = [0.0f32; 3];
        for i in 0..3 {
            if diag[i] > 0.0 {
                scale[i] = 0.99 * bins as f32 / diag[i];
            }
        }
        Self {
            ofs: cent_bounds.min,
            scale,
        }
    }

    pub fn bin(&self, center: Vec3, dim: usize) -> usize {
        (((center[dim] - self.ofs[dim]) * self.scale[dim]) as usize).min(NUM_OBJECT_BINS - 1)
    }

    /// Whether any axis has enough centroid extent to bin on.
    pub fn any_axis(&self) -> bool {
        self.scale.iter().any(|&s| s != 0.0)
    }
}

/// Split decision for one build record.
#[derive(Debug, Copy, Clone)]
pub enum SplitMB {
    /// Spatial partition at a bin boundary: primitives whose bin index on
    /// `dim` is below `pos` go left.
    Object {
        sah: f32,
        dim: usize,
        pos: usize,
        mapping: BinMapping,
    },
    /// Time partition at `time`; every primitive appears on both sides,
    /// recomputed against the narrowed windows.
    Temporal { sah: f32, time: f32 },
    /// Deterministic median split on object index.
    Fallback,
    Invalid,
}

impl SplitMB {
    pub fn split_sah(&self) -> f32 {
        match *self {
            SplitMB::Object { sah, .. } | SplitMB::Temporal { sah, .. } => sah,
            SplitMB::Fallback | SplitMB::Invalid => f32::INFINITY,
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, SplitMB::Temporal { .. })
    }
}
