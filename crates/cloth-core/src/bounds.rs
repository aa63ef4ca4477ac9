use glam::{Vec3, Vec4};

/// Axis-aligned bounding box. An empty box has `lower > upper`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        lower: Vec3::splat(f32::MAX),
        upper: Vec3::splat(-f32::MAX),
    };

    pub fn new(lower: Vec3, upper: Vec3) -> Self {
        Self { lower, upper }
    }

    /// Bounds of the xyz part of `points`.
    pub fn from_points(points: &[Vec4]) -> Self {
        points.iter().fold(Self::EMPTY, |b, p| b.include(p.truncate()))
    }

    /// Bounds of spheres given as `(center, radius)` in xyzw.
    pub fn from_spheres(spheres: &[Vec4]) -> Self {
        Self::EMPTY.expand_spheres(spheres)
    }

    pub fn include(self, p: Vec3) -> Self {
        Self {
            lower: self.lower.min(p),
            upper: self.upper.max(p),
        }
    }

    pub fn expand_spheres(self, spheres: &[Vec4]) -> Self {
        spheres.iter().fold(self, |b, s| {
            let c = s.truncate();
            Self {
                lower: b.lower.min(c - s.w),
                upper: b.upper.max(c + s.w),
            }
        })
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn intersect(self, other: Self) -> Self {
        Self {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }

    /// True if any axis has negative extent.
    pub fn is_empty(&self) -> bool {
        let e = self.upper - self.lower;
        e.x < 0.0 || e.y < 0.0 || e.z < 0.0
    }

    pub fn center(&self) -> Vec3 {
        (self.upper + self.lower) * 0.5
    }

    pub fn half_extent(&self) -> Vec3 {
        (self.upper - self.lower) * 0.5
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
