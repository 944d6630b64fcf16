use weakform::design::{
    design_var_nums, design_var_range, get_design_vars, local_index, scatter_design_sens, set_design_vars,
    DesignParameter,
};

fn parameters() -> [DesignParameter<f64>; 3] {
    [
        DesignParameter::variable(1.0, 4, 0.0, 2.0),
        DesignParameter::fixed(3.0),
        DesignParameter::variable(5.0, 1, 4.0, 6.0),
    ]
}

#[test]
fn design_var_nums_skips_fixed_parameters() {
    let [a, b, c] = parameters();
    let params = [&a, &b, &c];

    assert_eq!(design_var_nums(&params, None), 2);
    let mut nums = [0; 2];
    assert_eq!(design_var_nums(&params, Some(&mut nums[..])), 2);
    assert_eq!(nums, [4, 1]);
}

#[test]
fn design_var_nums_with_short_buffer_is_a_size_query() {
    let [a, b, c] = parameters();
    let params = [&a, &b, &c];

    let mut nums = [usize::MAX];
    assert_eq!(design_var_nums(&params, Some(&mut nums[..])), 2);
    assert_eq!(nums, [usize::MAX]);
    assert_eq!(design_var_nums(&params, Some(&mut [][..])), 2);
}

#[test]
fn set_get_and_range_follow_design_variable_order() {
    let [a, b, c] = parameters();
    let params = [&a, &b, &c];

    set_design_vars(&params, &[1.5, 4.5]);
    assert_eq!((a.value(), b.value(), c.value()), (1.5, 3.0, 4.5));

    let mut dvs = [0.0; 2];
    get_design_vars(&params, &mut dvs);
    assert_eq!(dvs, [1.5, 4.5]);

    let (mut lower, mut upper) = ([0.0; 2], [0.0; 2]);
    design_var_range(&params, &mut lower, &mut upper);
    assert_eq!(lower, [0.0, 4.0]);
    assert_eq!(upper, [2.0, 6.0]);

    assert_eq!(local_index(&params, &c), Some(1));
    assert_eq!(local_index(&params, &b), None);
}

#[test]
fn fixed_parameters_ignore_updates() {
    let param = DesignParameter::fixed(2.0);
    param.set_value(3.0);
    assert_eq!(param.value(), 2.0);
    assert_eq!(param.bounds(), (2.0, 2.0));

    let cloned = DesignParameter::variable(1.0, 0, 0.0, 1.0).clone();
    cloned.set_value(0.5);
    assert_eq!(cloned.value(), 0.5);
}

#[test]
fn scatter_design_sens_accumulates() {
    let mut global = [1.0; 5];
    scatter_design_sens(&[4, 1], &[2.0, 3.0], &mut global);
    scatter_design_sens(&[4, 7], &[1.0, 10.0], &mut global);
    assert_eq!(global, [1.0, 4.0, 1.0, 1.0, 4.0]);
}
