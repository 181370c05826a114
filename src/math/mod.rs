pub mod mach_cone;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type, used for every Jacobian block (`m[(i, j)] = ∂out_i / ∂in_j`).
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Unit-length 3D vector.
pub type UnitVector3 = nalgebra::Unit<Vector3>;

/// Rotation quaternion.
pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

/// Geometric tolerance for zero-length checks on user-supplied vectors.
pub const TOLERANCE: f64 = 1e-10;

/// Projector `t tᵀ` onto a unit direction.
#[must_use]
pub fn axis_projector(axis: &UnitVector3) -> Matrix3 {
    let t: Vector3 = **axis;
    t * t.transpose()
}

/// Jacobian of `v / |v|` with respect to `v`: `(I - v̂ v̂ᵀ) / |v|`.
///
/// Returns the zero matrix for a zero vector.
#[must_use]
pub fn normalize_jacobian(v: &Vector3) -> Matrix3 {
    let norm = v.norm();
    if norm == 0.0 {
        return Matrix3::zeros();
    }
    let unit = v / norm;
    (Matrix3::identity() - unit * unit.transpose()) / norm
}
