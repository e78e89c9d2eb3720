pub mod mesh;
pub mod scene;

pub use mesh::*;
pub use scene::*;
