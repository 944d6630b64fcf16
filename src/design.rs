//! Design variables owned by constitutive laws and physics models.
//!
//! A design variable is an entry of the global design vector held by the optimizer. Models own
//! zero or more of them through [`DesignParameter`]s, and exchange values with the optimizer
//! through small element-local arrays ordered like the numbers reported by
//! [`design_var_nums`].
use parking_lot::RwLock;
use weakform_traits::DiffScalar;

/// A scalar model parameter that may be tied to a global design variable.
///
/// Parameters are shared between many elements, so the value lives behind a lock and can be
/// updated through a shared reference. Updates are expected to happen between analyses, never
/// concurrently with evaluation.
#[derive(Debug)]
pub struct DesignParameter<T> {
    value: RwLock<T>,
    num: Option<usize>,
    lower: T,
    upper: T,
}

impl<T: DiffScalar> DesignParameter<T> {
    /// A parameter that is not a design variable.
    pub fn fixed(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            num: None,
            lower: value,
            upper: value,
        }
    }

    /// A parameter tied to global design variable `num`, with the given bounds.
    pub fn variable(value: T, num: usize, lower: T, upper: T) -> Self {
        Self {
            value: RwLock::new(value),
            num: Some(num),
            lower,
            upper,
        }
    }

    /// A parameter that is a design variable if `num` is given, and fixed otherwise.
    pub fn new(value: T, num: Option<usize>, lower: T, upper: T) -> Self {
        match num {
            Some(num) => Self::variable(value, num, lower, upper),
            None => Self::fixed(value),
        }
    }

    pub fn value(&self) -> T {
        *self.value.read()
    }

    pub fn num(&self) -> Option<usize> {
        self.num
    }

    pub fn is_design_variable(&self) -> bool {
        self.num.is_some()
    }

    pub fn bounds(&self) -> (T, T) {
        (self.lower, self.upper)
    }

    /// Updates the value. Fixed parameters ignore the update.
    pub fn set_value(&self, value: T) {
        if self.is_design_variable() {
            *self.value.write() = value;
        }
    }
}

impl<T: Clone> Clone for DesignParameter<T> {
    fn clone(&self) -> Self {
        Self {
            value: RwLock::new(self.value.read().clone()),
            num: self.num,
            lower: self.lower.clone(),
            upper: self.upper.clone(),
        }
    }
}

fn active<'a, T: DiffScalar>(
    params: &'a [&'a DesignParameter<T>],
) -> impl Iterator<Item = &'a DesignParameter<T>> + 'a {
    params.iter().copied().filter(|p| p.is_design_variable())
}

/// Returns the number of design variables among `params`.
///
/// If `dv_nums` is given and long enough, the global design variable numbers are written to it
/// in order. A missing or too short buffer turns the call into a pure size query: nothing is
/// written.
pub fn design_var_nums<T: DiffScalar>(params: &[&DesignParameter<T>], dv_nums: Option<&mut [usize]>) -> usize {
    let count = active(params).count();
    if let Some(dv_nums) = dv_nums {
        if dv_nums.len() >= count {
            for (dv_num, param) in dv_nums.iter_mut().zip(active(params)) {
                // Active parameters always carry a number
                *dv_num = param.num().unwrap_or_default();
            }
        }
    }
    count
}

/// Copies element-local design variable values into the parameters.
///
/// Entries beyond the end of `dvs` leave the corresponding parameters untouched.
pub fn set_design_vars<T: DiffScalar>(params: &[&DesignParameter<T>], dvs: &[T]) {
    for (param, value) in active(params).zip(dvs) {
        param.set_value(*value);
    }
}

/// Copies the parameter values into an element-local design variable array.
pub fn get_design_vars<T: DiffScalar>(params: &[&DesignParameter<T>], dvs: &mut [T]) {
    for (param, value) in active(params).zip(dvs.iter_mut()) {
        *value = param.value();
    }
}

/// Writes the lower and upper bounds of the design variables among `params`.
pub fn design_var_range<T: DiffScalar>(params: &[&DesignParameter<T>], lower: &mut [T], upper: &mut [T]) {
    for (param, (lb, ub)) in active(params).zip(lower.iter_mut().zip(upper.iter_mut())) {
        (*lb, *ub) = param.bounds();
    }
}

/// Position of `param` in the element-local design variable array of `params`, if it is a
/// design variable there.
pub fn local_index<T: DiffScalar>(params: &[&DesignParameter<T>], param: &DesignParameter<T>) -> Option<usize> {
    active(params).position(|p| std::ptr::eq(p, param))
}

/// Adds `value` to the entry of `param` in the element-local sensitivity array `dfdx`.
///
/// Does nothing if `param` is not a design variable or `dfdx` is too short.
pub fn add_design_sens<T: DiffScalar>(
    params: &[&DesignParameter<T>],
    param: &DesignParameter<T>,
    value: T,
    dfdx: &mut [T],
) {
    if let Some(i) = local_index(params, param) {
        if let Some(entry) = dfdx.get_mut(i) {
            *entry += value;
        }
    }
}

/// Adds element-local design sensitivities into a global sensitivity vector.
///
/// Several elements may share a design variable, so contributions are always accumulated.
/// Numbers outside of `global` are skipped.
pub fn scatter_design_sens<T: DiffScalar>(dv_nums: &[usize], local: &[T], global: &mut [T]) {
    for (&num, &value) in dv_nums.iter().zip(local) {
        if let Some(entry) = global.get_mut(num) {
            *entry += value;
        }
    }
}
