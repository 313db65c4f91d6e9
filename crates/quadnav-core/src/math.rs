//! Orientation helpers shared by the controller, the reward and the markers.
//!
//! Quaternions are stored scalar-last (`[x, y, z, w]`), which is the layout
//! the simulator uses for free-joint DOFs.

use std::f32::consts::{PI, TAU};

use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};

/// Scalar-last quaternion `[x, y, z, w]`.
pub type QuatXyzw = [f32; 4];

/// Identity rotation in `[x, y, z, w]` layout.
pub const IDENTITY_QUAT: QuatXyzw = [0.0, 0.0, 0.0, 1.0];

/// Quaternions with a norm at or below this are treated as degenerate.
pub const MIN_QUAT_NORM: f32 = 1e-6;

/// Rescale to unit norm; degenerate or non-finite input yields the identity.
pub fn normalize_quat_or_identity(q: QuatXyzw) -> QuatXyzw {
    let norm = q.iter().map(|c| c * c).sum::<f32>().sqrt();
    if !norm.is_finite() || norm <= MIN_QUAT_NORM {
        return IDENTITY_QUAT;
    }
    q.map(|c| c / norm)
}

fn to_unit(q: QuatXyzw) -> UnitQuaternion<f32> {
    let [x, y, z, w] = normalize_quat_or_identity(q);
    UnitQuaternion::new_unchecked(Quaternion::new(w, x, y, z))
}

/// World gravity direction `[0, 0, -1]` expressed in the body frame.
pub fn projected_gravity(q: QuatXyzw) -> Vector3<f32> {
    to_unit(q).inverse_transform_vector(&Vector3::new(0.0, 0.0, -1.0))
}

/// Rotate a world-frame vector into the body frame.
pub fn world_to_body(q: QuatXyzw, v: &Vector3<f32>) -> Vector3<f32> {
    to_unit(q).inverse_transform_vector(v)
}

/// Yaw of the body x-axis in the world frame.
pub fn heading(q: QuatXyzw) -> f32 {
    let [x, y, z, w] = q;
    let siny_cosp = 2.0 * w.mul_add(z, x * y);
    let cosy_cosp = 2.0f32.mul_add(-y.mul_add(y, z * z), 1.0);
    siny_cosp.atan2(cosy_cosp)
}

/// Roll/pitch/yaw (XYZ intrinsic, radians) to `[x, y, z, w]`.
pub fn euler_to_quat(roll: f32, pitch: f32, yaw: f32) -> QuatXyzw {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();

    let w = cr * cp * cy + sr * sp * sy;
    let x = sr * cp * cy - cr * sp * sy;
    let y = cr * sp * cy + sr * cp * sy;
    let z = cr * cp * sy - sr * sp * cy;
    [x, y, z, w]
}

/// Pure yaw rotation.
pub fn yaw_quat(yaw: f32) -> QuatXyzw {
    euler_to_quat(0.0, 0.0, yaw)
}

/// Wrap an angle into `(-PI, PI]`. NaN stays NaN.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Unsigned tilt of the body z-axis away from vertical, from projected gravity.
pub fn tilt_angle(gravity: &Vector3<f32>) -> f32 {
    Vector2::new(gravity.x, gravity.y).norm().atan2(gravity.z.abs())
}

/// Tilt with a sign: negative when the nose points down the slope.
///
/// A nose-down pitch leaves a positive x component in body-frame gravity.
pub fn signed_slope(gravity: &Vector3<f32>) -> f32 {
    let tilt = tilt_angle(gravity);
    if gravity.x > 0.0 {
        -tilt
    } else {
        tilt
    }
}

/// Yaw of a planar vector, or zero when it is shorter than `min_norm`.
pub fn planar_yaw(v: &Vector2<f32>, min_norm: f32) -> f32 {
    if v.norm() > min_norm {
        v.y.atan2(v.x)
    } else {
        0.0
    }
}

/// `+1`, `-1` or `0`, matching the sign convention used by array libraries.
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
