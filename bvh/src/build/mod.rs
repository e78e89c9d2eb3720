pub mod child_list;
pub mod msmblur;

pub use child_list::*;
pub use msmblur::*;

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::lbounds::TimeRange;
use crate::prim_ref::PrimInfoMB;
use crate::prim_vec::{SetMB, SharedPrimVec};
use crate::split::SplitMB;

/// Maximal supported branching factor.
pub const MAX_BRANCHING_FACTOR: usize = 8;

/// Within this many levels of the depth limit, subtrees are balanced
/// through the large-leaf path instead of the SAH loop.
pub const MIN_LARGE_LEAF_LEVELS: usize = 8;

/// Subtrees at or below this size recurse on the calling thread.
pub const SINGLE_THREADED_THRESHOLD: usize = 1024;

/// Builder configuration.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub branching_factor: usize,
    pub max_depth: usize,
    pub log_block_size: usize,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
    pub trav_cost: f32,
    pub int_cost: f32,
    /// Restrict leaves to primitives covering one shutter segment,
    /// forcing temporal splits until the constraint holds.
    pub single_leaf_time_segment: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            branching_factor: 2,
            max_depth: 32,
            log_block_size: 0,
            min_leaf_size: 1,
            max_leaf_size: 8,
            trav_cost: 1.0,
            int_cost: 1.0,
            single_leaf_time_segment: false,
        }
    }
}

impl BuildSettings {
    pub fn validate(&self) -> Result<()> {
        if self.branching_factor < 2 || self.branching_factor > MAX_BRANCHING_FACTOR {
            bail!(
                "branching factor {} outside 2..={}",
                self.branching_factor,
                MAX_BRANCHING_FACTOR
            );
        }
        if self.min_leaf_size > self.max_leaf_size {
            bail!(
                "min leaf size {} exceeds max leaf size {}",
                self.min_leaf_size,
                self.max_leaf_size
            );
        }
        if self.max_depth <= MIN_LARGE_LEAF_LEVELS {
            bail!(
                "max depth {} must exceed {}",
                self.max_depth,
                MIN_LARGE_LEAF_LEVELS
            );
        }
        Ok(())
    }
}

/// Unit of work for one recursion frame: a primitive set view, its
/// aggregate statistics, and the best split found for it so far.
#[derive(Clone)]
pub struct BuildRecordMB {
    pub depth: usize,
    pub pinfo: PrimInfoMB,
    pub prims: SetMB,
    pub split: SplitMB,
}

impl BuildRecordMB {
    pub fn new(depth: usize, pinfo: PrimInfoMB, prims: SetMB) -> Self {
        debug_assert_eq!(pinfo.size(), prims.size());
        Self {
            depth,
            pinfo,
            prims,
            split: SplitMB::Invalid,
        }
    }

    /// Root record over a whole buffer, statistics computed by scan.
    pub fn root(prims: Arc<SharedPrimVec>, time_range: TimeRange) -> Self {
        let n = prims.len();
        let pinfo = PrimInfoMB::from_prims(prims.slice(0, n), 0, time_range);
        Self::new(1, pinfo, SetMB::new(prims, 0, n, time_range))
    }

    pub fn size(&self) -> usize {
        self.pinfo.size()
    }
}

/// The caller's capability set: allocator production, node and leaf
/// materialization, and progress reporting. Invoked concurrently from
/// distinct subtrees, so implementations must be reentrant.
pub trait BuildOps: Sync {
    type Alloc: Send;
    type Node: Copy + Send;
    type Reduction: Send;

    fn create_alloc(&self) -> Self::Alloc;

    fn create_node(
        &self,
        parent: &BuildRecordMB,
        children: &[BuildRecordMB],
        alloc: &mut Self::Alloc,
    ) -> Self::Node;

    fn update_node(
        &self,
        node: Self::Node,
        prims: &SetMB,
        values: &[Self::Reduction],
    ) -> Self::Reduction;

    fn create_leaf(&self, record: &BuildRecordMB, alloc: &mut Self::Alloc) -> Self::Reduction;

    fn progress_monitor(&self, size_hint: usize);
}
