use anyhow::{bail, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use mblur_bvh::{Aabb, LinearBounds, TimeRange};

/// Triangle mesh with one vertex array per keyframe. `S + 1` keyframes
/// span the shutter `[0, 1]` uniformly, giving `S` time segments; vertex
/// motion within a segment is linear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshMB {
    keyframes: Vec<Vec<[f32; 3]>>,
    indices: Vec<[u32; 3]>,
}

impl MeshMB {
    pub fn new(keyframes: Vec<Vec<[f32; 3]>>, indices: Vec<[u32; 3]>) -> Result<Self> {
        if keyframes.len() < 2 {
            bail!("mesh needs at least two keyframes, got {}", keyframes.len());
        }
        let vertex_count = keyframes[0].len();
        if keyframes.iter().any(|kf| kf.len() != vertex_count) {
            bail!("keyframes disagree on vertex count");
        }
        for tri in &indices {
            if tri.iter().any(|&i| i as usize >= vertex_count) {
                bail!("triangle index out of bounds");
            }
        }
        Ok(Self { keyframes, indices })
    }

    /// A mesh whose every vertex translates by `velocity` over the shutter.
    pub fn translating(
        vertices: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
        velocity: Vec3,
        num_time_segments: u32,
    ) -> Result<Self> {
        let keyframes = (0..=num_time_segments)
            .map(|k| {
                let t = k as f32 / num_time_segments as f32;
                vertices
                    .iter()
                    .map(|v| (Vec3::from(*v) + velocity * t).into())
                    .collect()
            })
            .collect();
        Self::new(keyframes, indices)
    }

    pub fn num_time_segments(&self) -> u32 {
        (self.keyframes.len() - 1) as u32
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }

    /// Triangle bounds at keyframe `kf`.
    fn keyframe_bounds(&self, kf: usize, prim_id: u32) -> Aabb {
        let verts = &self.keyframes[kf];
        let tri = self.indices[prim_id as usize];
        let mut bb = Aabb::new();
        for &i in &tri {
            bb.grow(Vec3::from(verts[i as usize]));
        }
        bb
    }

    /// Triangle bounds at time `t`, interpolating the enclosing keyframes.
    fn bounds_at(&self, t: f32, prim_id: u32) -> Aabb {
        let segments = self.num_time_segments() as f32;
        let scaled = t.clamp(0.0, 1.0) * segments;
        let kf = (scaled.floor() as usize).min(segments as usize - 1);
        let f = scaled - kf as f32;

        let tri = self.indices[prim_id as usize];
        let v0 = &self.keyframes[kf];
        let v1 = &self.keyframes[kf + 1];
        let mut bb = Aabb::new();
        for &i in &tri {
            let p = Vec3::from(v0[i as usize]).lerp(Vec3::from(v1[i as usize]), f);
            bb.grow(p);
        }
        bb
    }

    /// Tightest time-linear bound of a triangle over `time_range`:
    /// endpoint boxes at the window edges, widened until every keyframe
    /// box inside the window is contained by the interpolated bound.
    pub fn linear_bounds(&self, prim_id: u32, time_range: TimeRange) -> LinearBounds {
        let mut lb = LinearBounds::new(
            self.bounds_at(time_range.lo, prim_id),
            self.bounds_at(time_range.hi, prim_id),
        );

        let segments = self.num_time_segments();
        for kf in 1..segments as usize {
            let t = kf as f32 / segments as f32;
            if t <= time_range.lo || t >= time_range.hi {
                continue;
            }
            let f = (t - time_range.lo) / time_range.size();
            lb.extend_to_contain(f, &self.keyframe_bounds(kf, prim_id));
        }

        lb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_at(x: f32) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        (
            vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn rejects_degenerate_input() {
        let (verts, indices) = triangle_at(0.0);
        assert!(MeshMB::new(vec![verts.clone()], indices.clone()).is_err());
        assert!(MeshMB::new(vec![verts.clone(), vec![]], indices.clone()).is_err());
        assert!(MeshMB::new(vec![verts.clone(), verts], vec![[0, 1, 7]]).is_err());
    }

    #[test]
    fn translating_mesh_interpolates_linearly() {
        let (verts, indices) = triangle_at(0.0);
        let mesh = MeshMB::translating(verts, indices, Vec3::new(4.0, 0.0, 0.0), 4).unwrap();

        assert_eq!(mesh.num_time_segments(), 4);
        let lb = mesh.linear_bounds(0, TimeRange::ALL);
        assert_eq!(lb.bounds0.min[0], 0.0);
        assert_eq!(lb.bounds1.min[0], 4.0);

        let half = mesh.linear_bounds(0, TimeRange::new(0.25, 0.75));
        assert_eq!(half.bounds0.min[0], 1.0);
        assert_eq!(half.bounds1.min[0], 3.0);
    }

    #[test]
    fn nonlinear_motion_stays_contained() {
        // vertex jumps sideways at the middle keyframe
        let keyframes = vec![
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 5.0, 0.0], [1.0, 5.0, 0.0], [0.0, 6.0, 0.0]],
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        ];
        let mesh = MeshMB::new(keyframes, vec![[0, 1, 2]]).unwrap();

        let lb = mesh.linear_bounds(0, TimeRange::ALL);
        // the interpolated bound at t=0.5 must contain the bulged keyframe
        let mid = lb.interpolate(0.5);
        assert!(mid.max[1] >= 6.0);
    }
}
