//! Vector and matrix helpers shared by the log, the mode machine and the facade.
//!
//! Camera orientations are camera-to-world rotations: the camera looks down its
//! local `-Z`, `+Y` is screen up and `+X` is screen right.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Squared length below which a direction is treated as zero.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-12;
/// Squared sine of the angle below which two unit vectors count as parallel.
pub const PARALLEL_SIN_SQ: f32 = 1e-8;

/// Whether `a` and `b` point along the same line (either direction).
pub fn is_parallel(a: Vec3, b: Vec3) -> bool {
    let (Some(a), Some(b)) = (a.try_normalize(), b.try_normalize()) else {
        return true;
    };
    a.cross(b).length_squared() < PARALLEL_SIN_SQ
}

/// Rotation whose local `+Z` is `back` and whose local `+Y` leans towards `up_hint`.
///
/// Returns `None` for a zero-length `back` or when `up_hint` is parallel to it;
/// callers substitute their last valid orientation.
pub fn basis_rotation(back: Vec3, up_hint: Vec3) -> Option<Quat> {
    let back = back.try_normalize()?;
    if is_parallel(back, up_hint) {
        return None;
    }
    let right = up_hint.cross(back).try_normalize()?;
    let up = back.cross(right);
    let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize();
    rotation.is_finite().then_some(rotation)
}

/// Like [`basis_rotation`] but falls back to `fallback_up` and then to `previous`.
pub fn look_rotation(back: Vec3, up_hint: Vec3, fallback_up: Vec3, previous: Quat) -> Quat {
    basis_rotation(back, up_hint)
        .or_else(|| basis_rotation(back, fallback_up))
        .or_else(|| {
            // Fallback up is parallel too: swing the previous frame onto `back`.
            let back = back.try_normalize()?;
            let swing = Quat::from_rotation_arc(previous * Vec3::Z, back);
            Some((swing * previous).normalize())
        })
        .unwrap_or(previous)
}

/// Right-handed look-at view matrix.
pub fn view_matrix(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, center, up)
}

/// Cubic Hermite basis `[h00, h10, h01, h11]` at `s` in `[0, 1]`.
pub fn hermite_basis(s: f32) -> [f32; 4] {
    let s2 = s * s;
    let s3 = s2 * s;
    [
        2.0 * s3 - 3.0 * s2 + 1.0,
        s3 - 2.0 * s2 + s,
        -2.0 * s3 + 3.0 * s2,
        s3 - s2,
    ]
}
