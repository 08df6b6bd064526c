//! Scalar and rotation helpers shared by curve import and export.
//!
//! Euler angles are radians in XYZ rotation order: X is applied first, then Y, then Z.

use glam::{EulerRot, Quat, Vec3};

/// Below this `sin(theta)` the spherical blend falls back to a normalized linear blend.
pub const SLERP_SIN_EPSILON: f32 = 1.0e-3;

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Spherical interpolation with the degenerate-angle handling curve import relies on.
///
/// Identical (or sign-flipped identical) inputs return `qa` untouched. Everything else uses the
/// standard sine-ratio weights, except when the sine is within `1e-3` of zero: then the
/// components blend linearly by `t` and are renormalized. Other Cast importers blend that case
/// at a fixed `0.5` without renormalizing, which jumps away from `qa` at `t = 0` and can leave a
/// non-unit rotation; weighting by `t` keeps both endpoints exact. No shortest-path flip is
/// applied.
pub fn slerp(qa: Quat, qb: Quat, t: f32) -> Quat {
    let cos_half_theta = qa.dot(qb);
    if cos_half_theta.abs() >= 1.0 {
        return qa;
    }

    let half_theta = cos_half_theta.acos();
    let sin_half_theta = (1.0 - cos_half_theta * cos_half_theta).sqrt();

    if sin_half_theta.abs() < SLERP_SIN_EPSILON {
        let blended = Quat::from_xyzw(
            qa.x * (1.0 - t) + qb.x * t,
            qa.y * (1.0 - t) + qb.y * t,
            qa.z * (1.0 - t) + qb.z * t,
            qa.w * (1.0 - t) + qb.w * t,
        );
        return if blended.length_squared() > f32::EPSILON {
            blended.normalize()
        } else {
            qa
        };
    }

    let ratio_a = ((1.0 - t) * half_theta).sin() / sin_half_theta;
    let ratio_b = (t * half_theta).sin() / sin_half_theta;

    Quat::from_xyzw(
        qa.x * ratio_a + qb.x * ratio_b,
        qa.y * ratio_a + qb.y * ratio_b,
        qa.z * ratio_a + qb.z * ratio_b,
        qa.w * ratio_a + qb.w * ratio_b,
    )
}

pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, euler.z, euler.y, euler.x)
}

pub fn quat_to_euler(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.normalize().to_euler(EulerRot::ZYX);
    Vec3::new(x, y, z)
}

/// Composes two rotations so that `first` is applied before `second`.
pub fn compose(first: Quat, second: Quat) -> Quat {
    second * first
}
