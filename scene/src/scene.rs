use log::info;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;

use crate::mesh::MeshMB;
use mblur_bvh::{
    time_segment_range, BuildRecordMB, LinearBounds, MemoryMonitor, PrimRefMB, RecalculatePrimRef,
    SharedPrimVec, TimeRange,
};

/// Ordered collection of motion-blur meshes; the primitive database the
/// builder resolves references through.
#[derive(Default)]
pub struct SceneMB {
    meshes: Vec<MeshMB>,
}

impl SceneMB {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    pub fn add_mesh(&mut self, mesh: MeshMB) -> u32 {
        self.meshes.push(mesh);
        (self.meshes.len() - 1) as u32
    }

    pub fn mesh(&self, geom_id: u32) -> &MeshMB {
        &self.meshes[geom_id as usize]
    }

    pub fn num_prims(&self) -> usize {
        self.meshes.iter().map(|m| m.num_triangles()).sum()
    }

    /// Generate the primitive references of every triangle over the full
    /// shutter.
    pub fn prim_refs(&self) -> Vec<PrimRefMB> {
        self.meshes
            .par_iter()
            .enumerate()
            .flat_map_iter(|(geom_id, mesh)| {
                let total = mesh.num_time_segments();
                (0..mesh.num_triangles() as u32).map(move |prim_id| {
                    let lbounds = mesh.linear_bounds(prim_id, TimeRange::ALL);
                    PrimRefMB::new(lbounds, total, total, geom_id as u32, prim_id)
                })
            })
            .collect()
    }

    /// Root build record over a freshly allocated shared buffer.
    pub fn root_record(&self, monitor: Option<Arc<dyn MemoryMonitor>>) -> BuildRecordMB {
        let prims = self.prim_refs();
        info!("scene generated {} motion-blur prim refs", prims.len());
        BuildRecordMB::root(SharedPrimVec::new(prims, monitor), TimeRange::ALL)
    }
}

impl RecalculatePrimRef for SceneMB {
    fn recalculate(&self, prim: &PrimRefMB, time_range: TimeRange) -> (PrimRefMB, Range<i32>) {
        let mesh = self.mesh(prim.geom_id);
        let lbounds = mesh.linear_bounds(prim.prim_id, time_range);
        let total = mesh.num_time_segments();
        let segments = time_segment_range(time_range, total);
        debug_assert!(segments.end > segments.start);
        let active = (segments.end - segments.start) as u32;
        (
            PrimRefMB::new(lbounds, active, total, prim.geom_id, prim.prim_id),
            segments,
        )
    }

    fn linear_bounds(&self, prim: &PrimRefMB, time_range: TimeRange) -> (LinearBounds, Range<i32>) {
        let mesh = self.mesh(prim.geom_id);
        let lbounds = mesh.linear_bounds(prim.prim_id, time_range);
        let segments = time_segment_range(time_range, mesh.num_time_segments());
        (lbounds, segments)
    }
}
