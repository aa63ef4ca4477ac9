use glam::{Mat3, Quat, Vec3, Vec4};

/// Added to squared lengths before taking reciprocal square roots.
pub const EPSILON: f32 = f32::EPSILON;

/// Stored exponent meaning "coefficient of one" (`log2(0)` clamped).
pub const LOG2_OF_ZERO: f32 = -(f32::MAX_EXP as f32);

/// `log2(x)` for positive `x`, otherwise a large negative sentinel.
#[inline]
pub fn safe_log2(x: f32) -> f32 {
    if x > 0.0 {
        x.log2()
    } else {
        LOG2_OF_ZERO
    }
}

/// Inverse of [`safe_log2`]; the sentinel maps back to exactly zero.
#[inline]
pub fn safe_exp2(x: f32) -> f32 {
    if x <= LOG2_OF_ZERO {
        0.0
    } else {
        x.exp2()
    }
}

pub fn safe_log2_vec(v: Vec3) -> Vec3 {
    Vec3::new(safe_log2(v.x), safe_log2(v.y), safe_log2(v.z))
}

pub fn safe_exp2_vec(v: Vec3) -> Vec3 {
    Vec3::new(safe_exp2(v.x), safe_exp2(v.y), safe_exp2(v.z))
}

/// Component-wise `exp2`.
#[inline]
pub fn exp2_vec(v: Vec3) -> Vec3 {
    Vec3::new(v.x.exp2(), v.y.exp2(), v.z.exp2())
}

/// Store a user coefficient in `[0, 1]` as `log2(1 - c)`.
#[inline]
pub fn to_log_coefficient(c: f32) -> f32 {
    safe_log2(1.0 - c)
}

/// Recover the user coefficient from its log-scaled form.
#[inline]
pub fn from_log_coefficient(log: f32) -> f32 {
    1.0 - safe_exp2(log)
}

/// Per-iteration coefficient compounded over `exponent` time units.
#[inline]
pub fn compound(log: f32, exponent: f32) -> f32 {
    1.0 - (log * exponent).exp2()
}

/// Rotation vector of a unit quaternion (axis times half angle).
pub fn quat_log(q: Quat) -> Vec3 {
    let imaginary = Vec3::new(q.x, q.y, q.z);
    let theta = imaginary.length();
    let mut scale = if theta > 1e-6 { theta.asin() / theta } else { 1.0 };
    if q.w < 0.0 {
        scale = -scale;
    }
    imaginary * scale
}

/// Inverse of [`quat_log`].
pub fn quat_exp(v: Vec3) -> Quat {
    let theta = v.length();
    let scale = if theta > 1e-6 { theta.sin() / theta } else { 1.0 };
    Quat::from_xyzw(v.x * scale, v.y * scale, v.z * scale, theta.cos())
}

/// Skew-symmetric cross product matrix: `star(a) * b == a.cross(b)`.
pub fn star(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Rigid motion of a cloth's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Local point to world space.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// World point to local space.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.conjugate() * (p - self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[inline]
pub fn lerp4(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a + (b - a) * t
}

/// Interpolated view of a start/target pair. `alpha == None` selects target.
#[inline]
pub fn blend(start: &[Vec4], target: &[Vec4], i: usize, alpha: Option<f32>) -> Vec4 {
    match alpha {
        Some(t) => lerp4(start[i], target[i], t),
        None => target[i],
    }
}
