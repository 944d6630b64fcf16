//! Strategies for property-based testing of models and constitutive laws.
use crate::physics::GrayScottParameters;
use crate::point::NUM_TIME_DERIVATIVES;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::Point3;

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    // Keep coordinates moderate so that position-dependent quantities stay well scaled
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range.clone()].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Strains of engineering magnitude.
pub fn strain(num_stresses: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(-1e-2..1e-2, num_stresses)
}

/// Pairs `(ut, ux)` of state values for `vars_per_node` variables in `spatial_dim` dimensions.
pub fn point_state(vars_per_node: usize, spatial_dim: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (
        vec(-1.0..1.0, NUM_TIME_DERIVATIVES * vars_per_node),
        vec(-1.0..1.0, spatial_dim * vars_per_node),
    )
}

impl Arbitrary for GrayScottParameters {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (0.0..1e-3, 0.0..1e-3, 0.0..0.1, 0.0..0.1)
            .prop_map(|(diffusivity_u, diffusivity_v, feed, kill)| GrayScottParameters {
                diffusivity_u,
                diffusivity_v,
                feed,
                kill,
            })
            .boxed()
    }
}
