use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// Sub-interval of the normalized shutter time `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub lo: f32,
    pub hi: f32,
}

impl TimeRange {
    pub const ALL: TimeRange = TimeRange { lo: 0.0, hi: 1.0 };

    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    pub fn size(&self) -> f32 {
        self.hi - self.lo
    }

    pub fn center(&self) -> f32 {
        0.5 * (self.lo + self.hi)
    }

    pub fn lerp(&self, f: f32) -> f32 {
        self.lo + f * self.size()
    }

    /// Union, with the inverted range `(1, 0)` as identity.
    pub fn extend(&mut self, other: TimeRange) {
        self.lo = self.lo.min(other.lo);
        self.hi = self.hi.max(other.hi);
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::ALL
    }
}

/// Time-linear bound: a box at each end of a time range, with every
/// intermediate bound obtained by linear interpolation.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct LinearBounds {
    pub bounds0: Aabb,
    pub bounds1: Aabb,
}

impl LinearBounds {
    pub fn new(bounds0: Aabb, bounds1: Aabb) -> Self {
        Self { bounds0, bounds1 }
    }

    pub fn empty() -> Self {
        Self {
            bounds0: Aabb::new(),
            bounds1: Aabb::new(),
        }
    }

    /// The interpolated box at relative position `f` in `[0, 1]`.
    pub fn interpolate(&self, f: f32) -> Aabb {
        let min = Vec3::from(self.bounds0.min).lerp(Vec3::from(self.bounds1.min), f);
        let max = Vec3::from(self.bounds0.max).lerp(Vec3::from(self.bounds1.max), f);
        Aabb {
            min: min.into(),
            max: max.into(),
        }
    }

    /// Pairwise union of the endpoint boxes.
    pub fn extend(&mut self, other: &LinearBounds) {
        self.bounds0.grow_bb(&other.bounds0);
        self.bounds1.grow_bb(&other.bounds1);
    }

    /// Widen the endpoints so the interpolated bound at relative position
    /// `f` contains `bb`. Growing both ends by the containment deficit
    /// keeps every already-covered time covered.
    pub fn extend_to_contain(&mut self, f: f32, bb: &Aabb) {
        let at = self.interpolate(f);
        for i in 0..3 {
            let lower = (at.min[i] - bb.min[i]).max(0.0);
            let upper = (bb.max[i] - at.max[i]).max(0.0);
            self.bounds0.min[i] -= lower;
            self.bounds1.min[i] -= lower;
            self.bounds0.max[i] += upper;
            self.bounds1.max[i] += upper;
        }
    }

    /// Time-averaged half area, the SAH cost of this bound.
    pub fn expected_half_area(&self) -> f32 {
        0.5 * (self.bounds0.half_area() + self.bounds1.half_area())
    }

    pub fn is_valid(&self) -> bool {
        self.bounds0.is_valid() && self.bounds1.is_valid()
    }
}
