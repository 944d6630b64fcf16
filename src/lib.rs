//! Discretization-independent weak-form physics for finite element analysis.
//!
//! A physics model ([`model::ElementModel`]) evaluates, at a single quadrature point, the
//! coefficients of the weak form of its governing equations, their exact Jacobian with respect
//! to the state and the adjoint-weighted derivative with respect to design variables. Material
//! behaviour is delegated to a constitutive law ([`constitutive::Constitutive`]). The
//! [`verification`] module checks every analytic derivative against central differences or
//! complex-step differentiation.
//!
//! Basis functions, meshes, quadrature rules and global assembly are deliberately absent: they
//! are the business of the caller, which drives the models point by point.
pub mod constitutive;
pub mod design;
pub mod jacobian;
pub mod model;
pub mod output;
pub mod physics;
pub mod point;
pub mod verification;

pub mod optimize {
    pub use weakform_optimize::*;
}

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use weakform_traits::num;
pub use weakform_traits::DiffScalar;
