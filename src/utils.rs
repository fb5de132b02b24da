use crate::types::{Channel, Position, Quaternion};
use cgmath::{Deg, InnerSpace, Rotation3, Vector3};

/// Linear interpolation between two positions.
pub fn lerp(a: Position, b: Position, t: f64) -> Position {
    a + (b - a) * t
}

/// Spherical interpolation along the shortest arc.
///
/// Returns `a` untouched when the two rotations are (anti)parallel or identical, instead of
/// dividing by a vanishing sine.
pub fn slerp(a: Quaternion, b: Quaternion, t: f64) -> Quaternion {
    let cos = a.dot(b);
    if cos <= -1.0 || cos >= 1.0 {
        return a;
    }
    let sign = if cos < 0.0 { -1.0 } else { 1.0 };
    let theta = (cos * sign).acos();
    if theta == 0.0 {
        return a;
    }
    let d = 1.0 / theta.sin();
    let u = ((1.0 - t) * theta).sin() * d;
    let v = (t * theta).sin() * d * sign;
    a * u + b * v
}

/// Rotation of `degrees` about the axis of a rotation channel. Positional channels give identity.
pub fn axis_rotation(channel: Channel, degrees: f64) -> Quaternion {
    let axis = match channel {
        Channel::Xrotation => Vector3::unit_x(),
        Channel::Yrotation => Vector3::unit_y(),
        Channel::Zrotation => Vector3::unit_z(),
        _ => return Quaternion::new(1.0, 0.0, 0.0, 0.0),
    };
    Quaternion::from_axis_angle(axis, Deg(degrees))
}
