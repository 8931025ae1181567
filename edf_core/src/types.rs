//! Core geometric types: points and proper rotations.

use core::ops::{Add, Div, Mul, Neg, Sub};

/// A 3D point (or displacement) with named fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Point3 {
    /// Create a new Point3.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Create a Point3 with all components set to the same value.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Convert to an array.
    #[inline]
    pub const fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product with another point (treating both as vectors).
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another point (treating both as vectors).
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Squared length of the vector.
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length (magnitude) of the vector.
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Normalize the vector to unit length.
    /// Returns a zero vector if the length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            Self::splat(0.0)
        } else {
            self / len
        }
    }

    /// Read point `i` from a flat `[x0, y0, z0, x1, ...]` buffer.
    #[inline]
    pub fn from_flat(flat: &[f32], i: usize) -> Self {
        Self::new(flat[3 * i], flat[3 * i + 1], flat[3 * i + 2])
    }
}

impl From<[f32; 3]> for Point3 {
    #[inline]
    fn from(arr: [f32; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }
}

impl From<Point3> for [f32; 3] {
    #[inline]
    fn from(p: Point3) -> Self {
        p.as_array()
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Point3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f32> for Point3 {
    type Output = Self;

    #[inline]
    fn div(self, scalar: f32) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Point3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A proper rotation stored as a row-major 3x3 matrix.
///
/// Rotating a point `p` gives `R p`. Composition follows matrix products:
/// `a.compose(b)` applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation3 {
    m: [[f32; 3]; 3],
}

impl Default for Rotation3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation3 {
    /// The identity rotation.
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation of `angle` radians about `axis` (Rodrigues' formula).
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: Point3, angle: f32) -> Self {
        let k = axis.normalize();
        if k.length_squared() == 0.0 {
            return Self::identity();
        }
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Self {
            m: [
                [c + t * k.x * k.x, t * k.x * k.y - s * k.z, t * k.x * k.z + s * k.y],
                [t * k.y * k.x + s * k.z, c + t * k.y * k.y, t * k.y * k.z - s * k.x],
                [t * k.z * k.x - s * k.y, t * k.z * k.y + s * k.x, c + t * k.z * k.z],
            ],
        }
    }

    /// Rotation from Z-Y-Z Euler angles: `Rz(alpha) Ry(beta) Rz(gamma)`.
    pub fn from_euler_zyz(alpha: f32, beta: f32, gamma: f32) -> Self {
        let z = Point3::new(0.0, 0.0, 1.0);
        let y = Point3::new(0.0, 1.0, 0.0);
        Self::from_axis_angle(z, alpha)
            .compose(&Self::from_axis_angle(y, beta))
            .compose(&Self::from_axis_angle(z, gamma))
    }

    /// Row-major matrix entries.
    #[inline]
    pub const fn matrix(&self) -> [[f32; 3]; 3] {
        self.m
    }

    /// Matrix product `self * other`.
    pub fn compose(&self, other: &Self) -> Self {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (0..3).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self { m }
    }

    /// Inverse rotation.
    pub fn transpose(&self) -> Self {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.m[j][i];
            }
        }
        Self { m }
    }

    /// Rotate a point.
    #[inline]
    pub fn apply(&self, p: Point3) -> Point3 {
        let m = &self.m;
        Point3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
        )
    }

    /// Rotate every point of a flat `[x, y, z, ...]` buffer.
    pub fn apply_flat(&self, flat: &[f32]) -> Vec<f32> {
        flat.chunks_exact(3)
            .flat_map(|c| self.apply(Point3::new(c[0], c[1], c[2])).as_array())
            .collect()
    }
}
