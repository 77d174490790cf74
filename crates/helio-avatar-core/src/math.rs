//! Rotation helpers shared by the IK solver.

use glam::{Mat3, Mat4, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Component-wise quaternion comparison.
///
/// `q` and `-q` encode the same rotation, so both signs of `v` are accepted.
pub fn quat_almost_equals(epsilon: f32, u: Quat, v: Quat) -> bool {
    let close = |a: Quat, b: Quat| {
        (a.x - b.x).abs() < epsilon
            && (a.y - b.y).abs() < epsilon
            && (a.z - b.z).abs() < epsilon
            && (a.w - b.w).abs() < epsilon
    };
    close(u, v) || close(-u, v)
}

/// Angle between the Z axes of two matrices after projecting both onto the ground plane.
///
/// Degenerate projections (an axis pointing straight up or down) report a right angle.
pub fn angle_on_xz_plane_between(a: &Mat4, b: &Mat4) -> f32 {
    let project = |m: &Mat4| {
        let z = m.z_axis.truncate();
        Vec3::new(z.x, 0.0, z.z)
    };
    let (v1, v2) = (project(a), project(b));

    let denominator = (v1.length_squared() * v2.length_squared()).sqrt();
    if denominator < 1e-6 {
        return FRAC_PI_2;
    }
    (v1.dot(v2) / denominator).clamp(-1.0, 1.0).acos()
}

/// Yaw of a transform using Y-X-Z Euler decomposition.
pub fn yaw_angle(m: &Mat4) -> f32 {
    let rotation = Mat3::from_cols(
        m.x_axis.truncate().normalize_or_zero(),
        m.y_axis.truncate().normalize_or_zero(),
        m.z_axis.truncate().normalize_or_zero(),
    );

    // Near +/-90 degrees of pitch the Z column loses its heading, fall back to X.
    if rotation.z_axis.y.abs() < 0.999_999_9 {
        rotation.z_axis.x.atan2(rotation.z_axis.z)
    } else {
        (-rotation.x_axis.z).atan2(rotation.x_axis.x)
    }
}

/// The yaw-only part of a transform's rotation, pitch and roll removed.
pub fn yaw_rotation(m: &Mat4) -> Quat {
    Quat::from_rotation_y(yaw_angle(m))
}
