/// Numerical differentiation by central differences or complex step
pub mod calculus;
