//! Physics families that are not tied to solid mechanics.
//!
//! Linear elasticity lives in the `weakform-solid` crate.
mod gray_scott;
mod heat_conduction;

pub use gray_scott::*;
pub use heat_conduction::*;
