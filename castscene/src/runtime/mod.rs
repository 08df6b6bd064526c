mod animation;
mod export;
mod importer;
mod instance;
mod material;
mod mesh;
mod rig;
mod skeleton;

pub use animation::*;
pub use export::*;
pub use importer::*;
pub use instance::*;
pub use material::*;
pub use mesh::*;
pub use rig::*;
pub use skeleton::*;





#[cfg(test)]
mod animation_tests;
