//! Column-major 4x4 transformation matrices as delivered by the tracking
//! runtime, and their decomposition into a [`Pose`].
//!
//! # Layout
//!
//! The runtime hands over 16 floats in column-major order, so element
//! `(row, col)` lives at index `col * 4 + row`:
//!
//! ```text
//! | m[0]  m[4]  m[8]   m[12] |     | r00 r01 r02 tx |
//! | m[1]  m[5]  m[9]   m[13] |  =  | r10 r11 r12 ty |
//! | m[2]  m[6]  m[10]  m[14] |     | r20 r21 r22 tz |
//! | m[3]  m[7]  m[11]  m[15] |     |  0   0   0   1 |
//! ```
//!
//! Translation is the fourth column (indices 12, 13, 14). Rotation is the
//! upper-left 3x3 block.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use thiserror::Error;

use super::Pose;

/// Determinant magnitude below which the rotation block is considered collapsed.
const DEGENERATE_DETERMINANT: f64 = 1e-9;

/// Reasons a transformation matrix cannot be turned into a pose.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PoseError {
    #[error("transformation matrix element {index} is not finite")]
    NonFinite { index: usize },
    #[error("rotation block does not describe a rotation")]
    Degenerate,
}

/// A 4x4 homogeneous transform stored as 16 column-major elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix(pub [f64; 16]);

impl TransformMatrix {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn from_column_major(m: [f64; 16]) -> Self {
        Self(m)
    }

    /// Build the matrix for a rigid transform (rotation then translation).
    pub fn from_pose(pose: &Pose) -> Self {
        let r = pose.rotation.to_rotation_matrix().into_inner();
        let t = pose.position;
        let mut m = Self::IDENTITY.0;
        for col in 0..3 {
            for row in 0..3 {
                m[col * 4 + row] = r[(row, col)];
            }
        }
        m[12] = t.x;
        m[13] = t.y;
        m[14] = t.z;
        Self(m)
    }

    pub fn translation(position: Vector3<f64>) -> Self {
        Self::from_pose(&Pose::from_position(position))
    }

    pub fn as_slice(&self) -> &[f64; 16] {
        &self.0
    }

    /// Element at (`row`, `col`).
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[col * 4 + row]
    }

    /// Translation column.
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.0[12], self.0[13], self.0[14])
    }

    /// Upper-left 3x3 block.
    pub fn rotation_block(&self) -> Matrix3<f64> {
        Matrix3::from_fn(|row, col| self.at(row, col))
    }

    /// Decompose into position and unit-quaternion orientation.
    ///
    /// The quaternion is recovered with the trace-based method: when the
    /// trace is positive `w` is the largest component and is solved first;
    /// otherwise the largest diagonal element picks which of `x`, `y`, `z`
    /// to solve first, which keeps the divisor away from zero. The result is
    /// normalized so that a slightly non-orthonormal block (sensor noise)
    /// still yields a unit rotation.
    pub fn decompose(&self) -> Result<Pose, PoseError> {
        if let Some(index) = self.0.iter().position(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite { index });
        }

        let rotation = quaternion_from_rotation_block(&self.rotation_block())?;
        Ok(Pose {
            position: self.position(),
            rotation,
        })
    }
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Convert a 3x3 rotation block into a unit quaternion (Shepperd's method).
pub fn quaternion_from_rotation_block(
    r: &Matrix3<f64>,
) -> Result<UnitQuaternion<f64>, PoseError> {
    if r.determinant().abs() < DEGENERATE_DETERMINANT {
        return Err(PoseError::Degenerate);
    }

    let (m11, m12, m13) = (r[(0, 0)], r[(0, 1)], r[(0, 2)]);
    let (m21, m22, m23) = (r[(1, 0)], r[(1, 1)], r[(1, 2)]);
    let (m31, m32, m33) = (r[(2, 0)], r[(2, 1)], r[(2, 2)]);
    let trace = m11 + m22 + m33;

    let (w, x, y, z) = if trace > 0.0 {
        let s = 0.5 / (trace + 1.0).sqrt();
        (0.25 / s, (m32 - m23) * s, (m13 - m31) * s, (m21 - m12) * s)
    } else if m11 > m22 && m11 > m33 {
        let s = 2.0 * (1.0 + m11 - m22 - m33).sqrt();
        ((m32 - m23) / s, 0.25 * s, (m12 + m21) / s, (m13 + m31) / s)
    } else if m22 > m33 {
        let s = 2.0 * (1.0 + m22 - m11 - m33).sqrt();
        ((m13 - m31) / s, (m12 + m21) / s, 0.25 * s, (m23 + m32) / s)
    } else {
        let s = 2.0 * (1.0 + m33 - m11 - m22).sqrt();
        ((m21 - m12) / s, (m13 + m31) / s, (m23 + m32) / s, 0.25 * s)
    };

    Ok(UnitQuaternion::new_normalize(Quaternion::new(w, x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_same_rotation(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) {
        // q and -q are the same rotation
        assert_relative_eq!(a.coords.dot(&b.coords).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_translation_with_identity_rotation() {
        let m = TransformMatrix::from_column_major([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.5, -2.0, 3.25, 1.0,
        ]);
        let pose = m.decompose().unwrap();

        assert_relative_eq!(pose.position, Vector3::new(0.5, -2.0, 3.25), epsilon = 1e-6);
        let q = pose.rotation.quaternion();
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-6);
        assert_relative_eq!(q.i, 0.0, epsilon = 1e-6);
        assert_relative_eq!(q.j, 0.0, epsilon = 1e-6);
        assert_relative_eq!(q.k, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_position_reads_indices_12_to_14() {
        let mut raw = [0.0; 16];
        raw[0] = 1.0;
        raw[5] = 1.0;
        raw[10] = 1.0;
        raw[15] = 1.0;
        raw[3] = 7.0; // bottom row, must not leak into position
        raw[12] = 1.0;
        raw[13] = 2.0;
        raw[14] = 3.0;
        let pose = TransformMatrix(raw).decompose().unwrap();
        assert_eq!(pose.position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_column_major_rotation_about_z() {
        // 90° about +Z maps +X to +Y: first column is (0, 1, 0).
        let m = TransformMatrix::from_column_major([
            0.0, 1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let pose = m.decompose().unwrap();
        let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert_same_rotation(&pose.rotation, &expected);

        let rotated = pose.rotation * Vector3::x();
        assert_relative_eq!(rotated, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_every_branch_round_trips() {
        // trace > 0, then 180° turns about x, y and z which force the three
        // diagonal branches.
        let cases = [
            UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI),
            UnitQuaternion::from_euler_angles(2.8, 0.1, -2.9),
        ];

        for rotation in cases {
            let pose = Pose {
                position: Vector3::new(-0.4, 0.05, 1.2),
                rotation,
            };
            let decomposed = TransformMatrix::from_pose(&pose).decompose().unwrap();
            assert_relative_eq!(decomposed.position, pose.position, epsilon = 1e-12);
            assert_same_rotation(&decomposed.rotation, &rotation);
        }
    }

    #[test]
    fn test_noisy_block_still_yields_unit_rotation() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let mut m = TransformMatrix::from_pose(&Pose {
            position: Vector3::zeros(),
            rotation,
        });
        m.0[1] += 1e-4;
        m.0[8] -= 2e-4;
        let pose = m.decompose().unwrap();
        assert_relative_eq!(pose.rotation.quaternion().norm(), 1.0, epsilon = 1e-12);
        assert!(pose.rotation.angle_to(&rotation) < 1e-3);
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let mut m = TransformMatrix::IDENTITY;
        m.0[13] = f64::NAN;
        assert_eq!(m.decompose(), Err(PoseError::NonFinite { index: 13 }));

        m.0[13] = 0.0;
        m.0[4] = f64::INFINITY;
        assert_eq!(m.decompose(), Err(PoseError::NonFinite { index: 4 }));
    }

    #[test]
    fn test_zero_block_is_degenerate() {
        let mut raw = [0.0; 16];
        raw[15] = 1.0;
        assert_eq!(TransformMatrix(raw).decompose(), Err(PoseError::Degenerate));
    }
}
