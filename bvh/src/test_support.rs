//! Shared fixtures for the builder tests: an analytic primitive database
//! with constant-velocity boxes, and a caller that records every node and
//! leaf materialization.

use glam::Vec3;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::aabb::Aabb;
use crate::build::{BuildOps, BuildRecordMB};
use crate::lbounds::{LinearBounds, TimeRange};
use crate::prim_ref::{time_segment_range, PrimRefMB, RecalculatePrimRef};
use crate::prim_vec::{MemoryMonitor, SetMB, SharedPrimVec};
use crate::split::SplitMB;

pub fn unit(x: f32) -> Aabb {
    Aabb::from((Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)))
}

pub fn boxed(min: Vec3, max: Vec3) -> Aabb {
    Aabb::from((min, max))
}

/// Boxes translating at constant velocity over the shutter; linear bounds
/// over any time window are exact, so the recalculator needs no widening.
pub struct MovingBoxes {
    /// (box at t=0, velocity, total time segments)
    pub boxes: Vec<(Aabb, Vec3, u32)>,
}

impl MovingBoxes {
    pub fn at(&self, prim_id: u32, t: f32) -> Aabb {
        let (bb, vel, _) = &self.boxes[prim_id as usize];
        let ofs = *vel * t;
        Aabb {
            min: (Vec3::from(bb.min) + ofs).into(),
            max: (Vec3::from(bb.max) + ofs).into(),
        }
    }

    pub fn prim_refs(&self) -> Vec<PrimRefMB> {
        (0..self.boxes.len() as u32)
            .map(|id| {
                let total = self.boxes[id as usize].2;
                let lb = LinearBounds::new(self.at(id, 0.0), self.at(id, 1.0));
                PrimRefMB::new(lb, total, total, 0, id)
            })
            .collect()
    }

    pub fn root_record(&self, monitor: Option<Arc<dyn MemoryMonitor>>) -> BuildRecordMB {
        let vec = SharedPrimVec::new(self.prim_refs(), monitor);
        BuildRecordMB::root(vec, TimeRange::ALL)
    }
}

impl RecalculatePrimRef for MovingBoxes {
    fn recalculate(&self, prim: &PrimRefMB, time_range: TimeRange) -> (PrimRefMB, Range<i32>) {
        let (lb, segments) = self.linear_bounds(prim, time_range);
        let active = (segments.end - segments.start) as u32;
        let total = self.boxes[prim.prim_id as usize].2;
        (
            PrimRefMB::new(lb, active, total, prim.geom_id, prim.prim_id),
            segments,
        )
    }

    fn linear_bounds(&self, prim: &PrimRefMB, time_range: TimeRange) -> (LinearBounds, Range<i32>) {
        let total = self.boxes[prim.prim_id as usize].2;
        let lb = LinearBounds::new(
            self.at(prim.prim_id, time_range.lo),
            self.at(prim.prim_id, time_range.hi),
        );
        (lb, time_segment_range(time_range, total))
    }
}

pub fn split_tag(split: &SplitMB) -> &'static str {
    match split {
        SplitMB::Object { .. } => "object",
        SplitMB::Temporal { .. } => "temporal",
        SplitMB::Fallback => "fallback",
        SplitMB::Invalid => "invalid",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Node {
        depth: usize,
        size: usize,
        children: usize,
        split: &'static str,
    },
    Leaf {
        depth: usize,
        time_range: TimeRange,
        prims: Vec<(u32, u32)>,
    },
}

/// Deterministic bottom-up signature of a built subtree: leaf count, height,
/// and the `(prim_id, active_segments)` pairs of every leaf reference in
/// traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub leaves: usize,
    pub height: usize,
    pub prim_refs: Vec<(u32, u32)>,
}

/// Instrumented caller: records every `create_node`/`create_leaf` call and
/// reduces subtrees to [`Summary`] values.
pub struct RecordingOps {
    pub events: Mutex<Vec<Event>>,
    pub progress_calls: AtomicUsize,
}

impl RecordingOps {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            progress_calls: AtomicUsize::new(0),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn nodes(&self) -> Vec<(usize, usize, usize, &'static str)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Node {
                    depth,
                    size,
                    children,
                    split,
                } => Some((depth, size, children, split)),
                _ => None,
            })
            .collect()
    }

    pub fn leaves(&self) -> Vec<(usize, TimeRange, Vec<(u32, u32)>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Leaf {
                    depth,
                    time_range,
                    prims,
                } => Some((depth, time_range, prims)),
                _ => None,
            })
            .collect()
    }
}

impl BuildOps for RecordingOps {
    type Alloc = ();
    type Node = usize;
    type Reduction = Summary;

    fn create_alloc(&self) -> Self::Alloc {}

    fn create_node(
        &self,
        parent: &BuildRecordMB,
        children: &[BuildRecordMB],
        _alloc: &mut Self::Alloc,
    ) -> Self::Node {
        let mut events = self.events.lock().unwrap();
        events.push(Event::Node {
            depth: parent.depth,
            size: parent.size(),
            children: children.len(),
            split: split_tag(&parent.split),
        });
        events.len() - 1
    }

    fn update_node(
        &self,
        _node: Self::Node,
        _prims: &SetMB,
        values: &[Self::Reduction],
    ) -> Self::Reduction {
        Summary {
            leaves: values.iter().map(|v| v.leaves).sum(),
            height: values.iter().map(|v| v.height).max().unwrap_or(0) + 1,
            prim_refs: values.iter().flat_map(|v| v.prim_refs.clone()).collect(),
        }
    }

    fn create_leaf(&self, record: &BuildRecordMB, _alloc: &mut Self::Alloc) -> Self::Reduction {
        let prims: Vec<(u32, u32)> = record
            .prims
            .slice()
            .iter()
            .map(|p| (p.prim_id, p.active_segments))
            .collect();
        self.events.lock().unwrap().push(Event::Leaf {
            depth: record.depth,
            time_range: record.prims.time_range,
            prims: prims.clone(),
        });
        Summary {
            leaves: 1,
            height: 1,
            prim_refs: prims,
        }
    }

    fn progress_monitor(&self, _size_hint: usize) {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Memory monitor summing signed byte deltas.
pub struct Balance(pub std::sync::atomic::AtomicIsize);

impl Balance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(std::sync::atomic::AtomicIsize::new(0)))
    }

    pub fn get(&self) -> isize {
        self.0.load(Ordering::SeqCst)
    }
}

impl MemoryMonitor for Balance {
    fn notify(&self, bytes: isize) {
        self.0.fetch_add(bytes, Ordering::SeqCst);
    }
}
