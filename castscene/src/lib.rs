//! Scene reconstruction and export for Cast documents.
//!
//! The engine is host-agnostic: it drives any [`SceneHost`]. [`MemoryScene`] is the
//! in-crate host used for headless conversion and tests.

#![forbid(unsafe_code)]

mod document;
mod error;
mod host;
mod ids;
mod math;
mod notifications;
mod rest_pose;
mod runtime;
mod scene;
mod session;
mod settings;
mod version;

#[cfg(feature = "binary")]
pub mod binary;

pub use document::*;
pub use error::*;
pub use host::*;
pub use math::*;
pub use notifications::*;
pub use rest_pose::*;
pub use runtime::*;
pub use scene::*;
pub use session::*;
pub use settings::*;
pub use version::*;

#[cfg(test)]
mod math_tests;

#[cfg(test)]
mod document_tests;


#[cfg(test)]
mod scene_tests;

#[cfg(test)]
mod settings_tests;


#[cfg(test)]
mod rest_pose_tests;
