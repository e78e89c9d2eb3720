use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Axis-aligned bounding box over `[min, max]`.
///
/// Freshly constructed boxes are inverted (`+inf`/`-inf`) so that growing
/// them by any point or box yields that point or box.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[repr(C)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Display for Aabb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(min: ({}, {}, {}), max: ({}, {}, {}))",
            self.min[0], self.min[1], self.min[2], self.max[0], self.max[1], self.max[2]
        )
    }
}

impl Aabb {
    pub const DEFAULT_INF: f32 = 1e34;

    pub fn new() -> Aabb {
        Aabb {
            min: [Self::DEFAULT_INF; 3],
            max: [-Self::DEFAULT_INF; 3],
        }
    }

    pub fn grow(&mut self, pos: Vec3) {
        let min = Vec3::from(self.min).min(pos);
        let max = Vec3::from(self.max).max(pos);
        self.min = min.into();
        self.max = max.into();
    }

    pub fn grow_bb(&mut self, aabb: &Aabb) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(aabb.min[i]);
            self.max[i] = self.max[i].max(aabb.max[i]);
        }
    }

    pub fn union_of(&self, bb: &Aabb) -> Aabb {
        let new_min = Vec3::from(self.min).min(Vec3::from(bb.min));
        let new_max = Vec3::from(self.max).max(Vec3::from(bb.max));

        Aabb {
            min: new_min.into(),
            max: new_max.into(),
        }
    }

    pub fn offset_by(&mut self, delta: f32) {
        let delta = Vec3::splat(delta);
        let min = Vec3::from(self.min) - delta;
        let max = Vec3::from(self.max) + delta;
        self.min = min.into();
        self.max = max.into();
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from(self.min) + Vec3::from(self.max)) * 0.5
    }

    /// Half of the surface area, the quantity SAH costs are expressed in.
    pub fn half_area(&self) -> f32 {
        let e = Vec3::from(self.max) - Vec3::from(self.min);
        let value: f32 = e.x * e.y + e.x * e.z + e.y * e.z;

        0.0_f32.max(value)
    }

    pub fn lengths(&self) -> Vec3 {
        Vec3::from(self.max) - Vec3::from(self.min)
    }

    pub fn extend(&self, axis: usize) -> f32 {
        self.max[axis] - self.min[axis]
    }

    pub fn longest_axis(&self) -> usize {
        let mut a: usize = 0;
        if self.extend(1) > self.extend(0) {
            a = 1;
        }
        if self.extend(2) > self.extend(a) {
            a = 2
        }
        a
    }

    pub fn is_valid(&self) -> bool {
        let min = Vec3::from(self.min);
        let max = Vec3::from(self.max);
        max.cmpge(min).all()
    }

    pub fn is_empty(&self) -> bool {
        let mask1 = Vec3::from(self.min).cmpeq(Vec3::splat(Self::DEFAULT_INF));
        let mask2 = Vec3::from(self.max).cmpeq(Vec3::splat(-Self::DEFAULT_INF));

        (mask1 & mask2).all()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl From<(Vec3, Vec3)> for Aabb {
    fn from((min, max): (Vec3, Vec3)) -> Self {
        Aabb {
            min: min.into(),
            max: max.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_from_empty() {
        let mut bb = Aabb::new();
        assert!(bb.is_empty());

        bb.grow(Vec3::new(1.0, 2.0, 3.0));
        bb.grow(Vec3::new(-1.0, 0.0, 1.0));

        assert!(bb.is_valid());
        assert_eq!(bb.min, [-1.0, 0.0, 1.0]);
        assert_eq!(bb.max, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn half_area_of_unit_cube() {
        let bb = Aabb::from((Vec3::ZERO, Vec3::ONE));
        assert_eq!(bb.half_area(), 3.0);
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb::from((Vec3::ZERO, Vec3::ONE));
        let b = Aabb::from((Vec3::splat(2.0), Vec3::splat(3.0)));
        let u = a.union_of(&b);
        assert_eq!(u.min, [0.0; 3]);
        assert_eq!(u.max, [3.0; 3]);
    }

    #[test]
    fn longest_axis_picks_widest() {
        let bb = Aabb::from((Vec3::ZERO, Vec3::new(1.0, 5.0, 2.0)));
        assert_eq!(bb.longest_axis(), 1);
    }
}
