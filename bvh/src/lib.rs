pub mod aabb;
pub mod lbounds;
pub mod prim_ref;
pub mod prim_vec;
pub mod split;
pub mod heuristic_binning;
pub mod heuristic_timesplit;
pub mod build;

pub use aabb::*;
pub use lbounds::*;
pub use prim_ref::*;
pub use prim_vec::*;
pub use split::*;
pub use build::*;

#[cfg(test)]
pub(crate) mod test_support;
