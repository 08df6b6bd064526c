use crate::{compose, euler_to_quat, lerp, quat_to_euler, slerp};
use glam::{Quat, Vec3};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_quat_approx(actual: Quat, expected: Quat) {
    assert_approx(actual.x, expected.x);
    assert_approx(actual.y, expected.y);
    assert_approx(actual.z, expected.z);
    assert_approx(actual.w, expected.w);
}

#[test]
fn lerp_endpoints_and_midpoint() {
    assert_eq!(lerp(5.0, 7.0, 0.0), 5.0);
    assert_eq!(lerp(5.0, 7.0, 1.0), 7.0);
    assert_eq!(lerp(5.0, 7.0, 0.5), 6.0);
}

#[test]
fn slerp_of_identical_quaternions_is_unchanged() {
    let q = Quat::from_rotation_y(0.7);
    for t in [0.0, 0.25, 0.5, 1.0] {
        assert_eq!(slerp(q, q, t), q);
    }
}

#[test]
fn slerp_hits_both_endpoints() {
    let qa = Quat::from_rotation_x(0.3);
    let qb = Quat::from_rotation_z(1.2);
    assert_quat_approx(slerp(qa, qb, 0.0), qa);
    assert_quat_approx(slerp(qa, qb, 1.0), qb);
}

#[test]
fn slerp_midpoint_halves_the_angle() {
    let qa = Quat::IDENTITY;
    let qb = Quat::from_rotation_z(1.0);
    assert_quat_approx(slerp(qa, qb, 0.5), Quat::from_rotation_z(0.5));
}

#[test]
fn slerp_of_antipodal_inputs_returns_first() {
    let qa = Quat::from_rotation_y(0.4);
    let qb = -qa;
    assert_eq!(slerp(qa, qb, 0.5), qa);
}

#[test]
fn slerp_near_parallel_falls_back_to_normalized_blend() {
    let qa = Quat::from_rotation_x(0.0);
    let qb = Quat::from_rotation_x(1.0e-3);
    let blended = slerp(qa, qb, 0.5);
    assert_approx(blended.length(), 1.0);
    assert_quat_approx(blended, Quat::from_rotation_x(0.5e-3));
}

#[test]
fn slerp_near_parallel_keeps_its_endpoints() {
    let qa = Quat::from_rotation_x(0.0);
    let qb = Quat::from_rotation_x(1.0e-3);
    assert_eq!(slerp(qa, qb, 0.0), qa);
    assert_quat_approx(slerp(qa, qb, 1.0), qb);
}

#[test]
fn euler_round_trip_is_xyz_ordered() {
    let euler = Vec3::new(0.3, -0.2, 0.9);
    let q = euler_to_quat(euler);
    let expected = Quat::from_rotation_z(0.9) * Quat::from_rotation_y(-0.2) * Quat::from_rotation_x(0.3);
    assert_quat_approx(q, expected);

    let back = quat_to_euler(q);
    assert_approx(back.x, euler.x);
    assert_approx(back.y, euler.y);
    assert_approx(back.z, euler.z);
}

#[test]
fn compose_applies_first_then_second() {
    let first = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
    let second = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    // Y goes to Z under the first rotation, and Z is fixed by the second.
    let v = compose(first, second) * Vec3::Y;
    assert_approx(v.x, 0.0);
    assert_approx(v.y, 0.0);
    assert_approx(v.z, 1.0);
}
