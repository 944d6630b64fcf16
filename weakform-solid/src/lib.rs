//! Solid mechanics functionality for `weakform`.
//!
//! [`materials::MaterialProperties`] describes a linear elastic, thermally conducting material,
//! [`SolidConstitutive`] turns it into a [`Constitutive`](weakform::constitutive::Constitutive)
//! law with a thickness design variable, and [`LinearElasticity3D`] is the corresponding
//! small-strain elasticity model.
pub mod materials;

mod constitutive;
mod elasticity;

pub use constitutive::*;
pub use elasticity::*;

/// Number of stress components of a 3D solid, in Voigt order `xx, yy, zz, yz, xz, xy`.
pub const NUM_STRESSES: usize = 6;
