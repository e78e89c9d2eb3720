//! Top-down recursive driver for motion-blur BVH construction.
//!
//! Every node weighs an object-space partition against a temporal one
//! under a single SAH cost model, fills inner nodes up to the branching
//! factor by repeatedly refining the largest child, and hands the caller
//! materialization of nodes and leaves through its callback set.

use anyhow::{bail, Result};
use log::info;
use rayon::prelude::*;
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

use crate::build::{
    BuildOps, BuildRecordMB, BuildSettings, ChildList, MIN_LARGE_LEAF_LEVELS,
    SINGLE_THREADED_THRESHOLD,
};
use crate::heuristic_binning::{find_object_split, partition_object};
use crate::heuristic_timesplit::{find_temporal_split, split_temporal};
use crate::prim_ref::{time_segment_range, PrimInfoMB, RecalculatePrimRef};
use crate::prim_vec::{MemoryMonitor, SetMB};
use crate::split::SplitMB;

/// Restore the stable primitive order inside a set's range; in-place
/// partitioning scrambles it, and fallback splits must not depend on
/// the scrambled order.
fn deterministic_order(set: &SetMB) {
    let prims = unsafe { set.slice_mut() };
    prims.sort_unstable();
}

/// Median split on object index; both halves alias the parent buffer.
fn split_fallback(set: &SetMB) -> ((PrimInfoMB, SetMB), (PrimInfoMB, SetMB)) {
    let center = (set.begin + set.end) / 2;
    let prims = set.slice();
    let mid = center - set.begin;

    let linfo = PrimInfoMB::from_prims(&prims[..mid], set.begin, set.time_range);
    let rinfo = PrimInfoMB::from_prims(&prims[mid..], center, set.time_range);

    let lset = SetMB::new(set.prims.clone(), set.begin, center, set.time_range);
    let rset = SetMB::new(set.prims.clone(), center, set.end, set.time_range);

    ((linfo, lset), (rinfo, rset))
}

pub struct MSMBlurBuilder<'a, Ops: BuildOps, Recalc: RecalculatePrimRef> {
    ops: &'a Ops,
    recalc: &'a Recalc,
    settings: BuildSettings,
    monitor: Option<Arc<dyn MemoryMonitor>>,
}

impl<'a, Ops: BuildOps, Recalc: RecalculatePrimRef> MSMBlurBuilder<'a, Ops, Recalc> {
    pub fn new(ops: &'a Ops, recalc: &'a Recalc, settings: BuildSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            ops,
            recalc,
            settings,
            monitor: None,
        })
    }

    pub fn with_memory_monitor(mut self, monitor: Arc<dyn MemoryMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Build the tree for `record` and return the root reduction.
    pub fn build(&self, mut record: BuildRecordMB) -> Result<Ops::Reduction> {
        info!(
            "building motion-blur bvh over {} primitives, branching factor {}",
            record.size(),
            self.settings.branching_factor
        );

        record.split = self.find(&record.prims, &record.pinfo);
        let reduction = self.recurse(record, None, true)?;
        // flush non-temporal stores the caller's node writers may have used
        fence(Ordering::SeqCst);

        info!("motion-blur bvh build finished");
        Ok(reduction)
    }

    /// Best split for a set: the object split, displaced by the temporal
    /// split iff the time range is wide enough to cut on the finest
    /// segment grid present and the cut strictly improves the SAH.
    fn find(&self, prims: &SetMB, pinfo: &PrimInfoMB) -> SplitMB {
        let object_split = find_object_split(prims, pinfo, self.settings.log_block_size);

        if prims.time_range.size() > 1.01 / pinfo.max_total_segments as f32 {
            let temporal_split =
                find_temporal_split(prims, pinfo, self.recalc, self.settings.log_block_size);
            if temporal_split.split_sah() < object_split.split_sah() {
                return temporal_split;
            }
        }

        object_split
    }

    /// Fallback split for leaf formation. Under the one-segment-per-leaf
    /// constraint a primitive straddling several segments forces a time
    /// cut at the middle of its segment window; otherwise the median
    /// object split is used.
    fn find_fallback(&self, record: &BuildRecordMB) -> SplitMB {
        if self.settings.single_leaf_time_segment {
            for prim in record.prims.slice() {
                let segments = time_segment_range(record.prims.time_range, prim.total_segments);
                debug_assert!(segments.end > segments.start);
                if segments.end - segments.start > 1 {
                    let icenter = (segments.start + segments.end) / 2;
                    let time = icenter as f32 / prim.total_segments as f32;
                    return SplitMB::Temporal { sah: 1.0, time };
                }
            }
        }

        SplitMB::Fallback
    }

    /// Produce the two child records of `brecord` according to its split.
    fn partition(&self, brecord: &BuildRecordMB, depth: usize) -> (BuildRecordMB, BuildRecordMB) {
        let ((linfo, lset), (rinfo, rset)) = match brecord.split {
            // an invalid split degrades to the deterministic median
            SplitMB::Fallback | SplitMB::Invalid => {
                deterministic_order(&brecord.prims);
                split_fallback(&brecord.prims)
            }
            SplitMB::Temporal { time, .. } => {
                split_temporal(time, &brecord.prims, self.recalc, self.monitor.clone())
            }
            SplitMB::Object {
                dim, pos, mapping, ..
            } => partition_object(&brecord.prims, dim, pos, &mapping),
        };

        (
            BuildRecordMB::new(depth, linfo, lset),
            BuildRecordMB::new(depth, rinfo, rset),
        )
    }

    /// Leafify a subtree the driver has committed to. The leaf capacity or
    /// the one-segment-per-leaf constraint may still demand structural
    /// splits, so this can emit a small subtree of fallback-split nodes
    /// whose children are all leaves.
    fn create_large_leaf(
        &self,
        mut current: BuildRecordMB,
        alloc: &mut Ops::Alloc,
    ) -> Result<Ops::Reduction> {
        if current.depth > self.settings.max_depth {
            bail!(
                "depth limit {} reached while forming a leaf over {} primitives",
                self.settings.max_depth,
                current.size()
            );
        }

        current.split = self.find_fallback(&current);

        if current.size() <= self.settings.max_leaf_size && !current.split.is_temporal() {
            return Ok(self.ops.create_leaf(&current, alloc));
        }

        let mut children = ChildList::new(current.clone());
        loop {
            // split the largest still-splittable child; lowest index wins ties
            let mut best: Option<usize> = None;
            let mut best_size = 0;
            for i in 0..children.len() {
                let child = children.record(i);
                if child.size() <= self.settings.max_leaf_size && !child.split.is_temporal() {
                    continue;
                }
                if child.size() > best_size {
                    best_size = child.size();
                    best = Some(i);
                }
            }
            let Some(best) = best else { break };

            let (mut lrecord, mut rrecord) =
                self.partition(children.record(best), current.depth + 1);
            lrecord.split = self.find_fallback(&lrecord);
            rrecord.split = self.find_fallback(&rrecord);
            children.split(best, lrecord, rrecord);

            if children.len() >= self.settings.branching_factor {
                break;
            }
        }

        let node = self.ops.create_node(&current, children.records(), alloc);

        let mut values = Vec::with_capacity(children.len());
        for i in 0..children.len() {
            values.push(self.create_large_leaf(children.record(i).clone(), alloc)?);
        }

        Ok(self.ops.update_node(node, &current.prims, &values))
    }

    fn recurse(
        &self,
        current: BuildRecordMB,
        alloc: Option<&mut Ops::Alloc>,
        toplevel: bool,
    ) -> Result<Ops::Reduction> {
        let mut fresh = None;
        let alloc = match alloc {
            Some(alloc) => alloc,
            None => fresh.get_or_insert_with(|| self.ops.create_alloc()),
        };

        if toplevel && current.size() <= SINGLE_THREADED_THRESHOLD {
            self.ops.progress_monitor(current.size());
        }

        let leaf_sah = self.settings.int_cost * current.pinfo.leaf_sah(self.settings.log_block_size);
        let split_sah = self.settings.trav_cost * current.pinfo.half_area()
            + self.settings.int_cost * current.split.split_sah();

        if current.size() <= self.settings.min_leaf_size
            || current.depth + MIN_LARGE_LEAF_LEVELS >= self.settings.max_depth
            || (current.size() <= self.settings.max_leaf_size && leaf_sah <= split_sah)
        {
            deterministic_order(&current.prims);
            return self.create_large_leaf(current, alloc);
        }

        let mut children = ChildList::new(current.clone());
        loop {
            // refine the child with the largest expected half area; lowest
            // index wins ties, children at leaf size are left alone
            let mut best: Option<usize> = None;
            let mut best_area = f32::NEG_INFINITY;
            for i in 0..children.len() {
                let child = children.record(i);
                if child.size() <= self.settings.min_leaf_size {
                    continue;
                }
                let area = child.pinfo.half_area();
                if area > best_area {
                    best_area = area;
                    best = Some(i);
                }
            }
            let Some(best) = best else { break };

            let (mut lrecord, mut rrecord) =
                self.partition(children.record(best), current.depth + 1);
            lrecord.split = self.find(&lrecord.prims, &lrecord.pinfo);
            rrecord.split = self.find(&rrecord.prims, &rrecord.pinfo);
            children.split(best, lrecord, rrecord);

            if children.len() >= self.settings.branching_factor {
                break;
            }
        }

        let node = self.ops.create_node(&current, children.records(), alloc);

        if current.size() > SINGLE_THREADED_THRESHOLD {
            // spawn children as parallel tasks, each a top-level frame
            let values = children
                .records()
                .par_iter()
                .map(|child| {
                    let value = self.recurse(child.clone(), None, true)?;
                    // make the child's non-temporal stores visible to the reduction
                    fence(Ordering::SeqCst);
                    Ok(value)
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(self.ops.update_node(node, &current.prims, &values))
        } else {
            // reverse order keeps the allocator close to the last partition
            let mut values = Vec::with_capacity(children.len());
            for child in children.records().iter().rev() {
                values.push(self.recurse(child.clone(), Some(alloc), false)?);
            }
            values.reverse();

            Ok(self.ops.update_node(node, &current.prims, &values))
        }
    }
}
