//! Unit dual quaternion for rigid transforms
//!
//! A dual quaternion stores a rotation+translation as a pair `(real, dual)`
//! where `real` is the rotation and `dual = 0.5 * t * real` with `t` the pure
//! quaternion `(x, y, z, 0)` of the translation. Unit dual quaternions satisfy
//! `|real| = 1` and `real · dual = 0`.

use std::ops::{Add, Mul, Neg};

use crate::core::types::{Mat4, Quat, Vec3, Vec4};

/// A dual quaternion representing a rigid transformation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualQuat {
    /// Rotation part
    pub real: Quat,
    /// Translation-encoding part
    pub dual: Quat,
}

impl DualQuat {
    /// No rotation, no translation
    pub const IDENTITY: Self = Self {
        real: Quat::IDENTITY,
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// All eight components zero. Used as a blend accumulator.
    pub const ZERO: Self = Self {
        real: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        dual: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Create from raw parts without normalizing
    pub const fn from_parts(real: Quat, dual: Quat) -> Self {
        Self { real, dual }
    }

    /// Create from a rotation and a translation
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        let real = rotation.normalize();
        let t = Quat::from_xyzw(translation.x, translation.y, translation.z, 0.0);
        Self {
            real,
            dual: (t * real) * 0.5,
        }
    }

    /// Create from an affine matrix. Scale and shear are discarded.
    pub fn from_mat4(matrix: Mat4) -> Self {
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        Self::from_rotation_translation(rotation, translation)
    }

    /// The translation encoded in the dual part
    pub fn translation(&self) -> Vec3 {
        let t = (self.dual * self.real.conjugate()) * 2.0;
        Vec3::new(t.x, t.y, t.z)
    }

    /// The rotation part
    pub fn rotation(&self) -> Quat {
        self.real
    }

    /// Split into rotation and translation
    pub fn to_rotation_translation(&self) -> (Quat, Vec3) {
        (self.real, self.translation())
    }

    /// Convert to a rigid transformation matrix
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.real, self.translation())
    }

    /// Conjugate of both parts. Inverse of a unit dual quaternion.
    pub fn conjugate(&self) -> Self {
        Self {
            real: self.real.conjugate(),
            dual: self.dual.conjugate(),
        }
    }

    /// Dot product of the rotation parts
    pub fn dot(&self, other: &Self) -> f32 {
        self.real.dot(other.real)
    }

    /// Normalize to a unit dual quaternion.
    ///
    /// Both parts are divided by the length of the rotation part, then the
    /// component of the dual part parallel to the rotation part is removed so
    /// `real · dual = 0` holds. A zero rotation part yields non-finite output.
    pub fn normalize(&self) -> Self {
        let inv_length = 1.0 / self.real.length();
        let real = self.real * inv_length;
        let dual = self.dual * inv_length;
        Self {
            real,
            dual: dual - real * real.dot(dual),
        }
    }

    /// Check the unit constraints within `tolerance`
    pub fn is_normalized(&self, tolerance: f32) -> bool {
        (self.real.length() - 1.0).abs() <= tolerance
            && self.real.dot(self.dual).abs() <= tolerance
    }

    /// Rotate then translate a point
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.real.mul_vec3(point) + self.translation()
    }

    /// Rotate a direction. Translation is ignored.
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.real.mul_vec3(vector)
    }

    /// Rotate the xyz of a tangent, keeping the handedness in w
    #[inline]
    pub fn transform_tangent(&self, tangent: Vec4) -> Vec4 {
        self.real.mul_vec3(tangent.truncate()).extend(tangent.w)
    }
}

impl Default for DualQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Add for DualQuat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            real: self.real + rhs.real,
            dual: self.dual + rhs.dual,
        }
    }
}

impl Mul<f32> for DualQuat {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            real: self.real * rhs,
            dual: self.dual * rhs,
        }
    }
}

/// Composition: `a * b` applies `b` first, then `a`.
impl Mul for DualQuat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            real: self.real * rhs.real,
            dual: self.real * rhs.dual + self.dual * rhs.real,
        }
    }
}

impl Neg for DualQuat {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            real: -self.real,
            dual: -self.dual,
        }
    }
}
