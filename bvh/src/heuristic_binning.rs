//! Binned SAH object-split heuristic over motion-blur primitive references.

use crate::lbounds::LinearBounds;
use crate::prim_ref::{blocks, PrimInfoMB};
use crate::prim_vec::SetMB;
use crate::split::{BinMapping, SplitMB, NUM_OBJECT_BINS};

/// Find the best axis-aligned spatial partition of `set` by sweeping the
/// binned SAH on every axis with centroid extent.
pub fn find_object_split(set: &SetMB, pinfo: &PrimInfoMB, log_block_size: usize) -> SplitMB {
    let mapping = BinMapping::new(&pinfo.cent_bounds, NUM_OBJECT_BINS);
    if !mapping.any_axis() {
        return SplitMB::Invalid;
    }

    let mut bin_bounds = [[LinearBounds::empty(); NUM_OBJECT_BINS]; 3];
    let mut bin_counts = [[0usize; NUM_OBJECT_BINS]; 3];

    for prim in set.slice() {
        let center = prim.bin_center();
        for dim in 0..3 {
            let b = mapping.bin(center, dim);
            bin_counts[dim][b] += prim.size();
            bin_bounds[dim][b].extend(&prim.lbounds);
        }
    }

    let mut best_sah = f32::INFINITY;
    let mut best_dim = None;
    let mut best_pos = 0;

    for dim in 0..3 {
        if mapping.scale[dim] == 0.0 {
            continue;
        }

        // suffix bounds/counts, right to left
        let mut right_bounds = [LinearBounds::empty(); NUM_OBJECT_BINS];
        let mut right_counts = [0usize; NUM_OBJECT_BINS];
        let mut acc = LinearBounds::empty();
        let mut count = 0;
        for i in (1..NUM_OBJECT_BINS).rev() {
            count += bin_counts[dim][i];
            acc.extend(&bin_bounds[dim][i]);
            right_counts[i] = count;
            right_bounds[i] = acc;
        }

        // prefix sweep, evaluating every interior boundary
        let mut left_bounds = LinearBounds::empty();
        let mut left_count = 0;
        for pos in 1..NUM_OBJECT_BINS {
            left_count += bin_counts[dim][pos - 1];
            left_bounds.extend(&bin_bounds[dim][pos - 1]);

            if left_count == 0 || right_counts[pos] == 0 {
                continue;
            }

            let sah = left_bounds.expected_half_area() * blocks(left_count, log_block_size)
                + right_bounds[pos].expected_half_area() * blocks(right_counts[pos], log_block_size);

            if sah < best_sah {
                best_sah = sah;
                best_dim = Some(dim);
                best_pos = pos;
            }
        }
    }

    match best_dim {
        Some(dim) => SplitMB::Object {
            sah: best_sah,
            dim,
            pos: best_pos,
            mapping,
        },
        None => SplitMB::Invalid,
    }
}

/// Rearrange the set's buffer range in place so left-belonging primitives
/// occupy `[begin, mid)` and right-belonging `[mid, end)`. Both child sets
/// alias the parent buffer and inherit its time range.
pub fn partition_object(
    set: &SetMB,
    dim: usize,
    pos: usize,
    mapping: &BinMapping,
) -> ((PrimInfoMB, SetMB), (PrimInfoMB, SetMB)) {
    // the parent frame drives this range exclusively until its children spawn
    let prims = unsafe { set.slice_mut() };

    let mut left = 0;
    for i in 0..prims.len() {
        if mapping.bin(prims[i].bin_center(), dim) < pos {
            prims.swap(i, left);
            left += 1;
        }
    }

    let mid = set.begin + left;
    let linfo = PrimInfoMB::from_prims(&prims[..left], set.begin, set.time_range);
    let rinfo = PrimInfoMB::from_prims(&prims[left..], mid, set.time_range);

    let lset = SetMB::new(set.prims.clone(), set.begin, mid, set.time_range);
    let rset = SetMB::new(set.prims.clone(), mid, set.end, set.time_range);

    ((linfo, lset), (rinfo, rset))
}
