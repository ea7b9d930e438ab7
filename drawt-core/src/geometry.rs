//! # Geometry
//!
//! Axis-aligned bounds, cached on every entity for hit-testing. Bounds are always derived from an entity's
//! geometry and placement and are never persisted.

use crate::state::transform::Similarity;

/// An axis-aligned box. May be empty, in which case it contains nothing and is the identity for [`Aabb::union`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 2],
    pub max: [f32; 2],
}
impl Aabb {
    pub const EMPTY: Self = Self {
        min: [f32::INFINITY; 2],
        max: [f32::NEG_INFINITY; 2],
    };
    #[must_use]
    pub fn from_min_max(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }
    #[must_use]
    pub fn from_point(point: [f32; 2]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }
    /// The smallest box around every point. Empty if there are none.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = [f32; 2]>) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |bounds, point| bounds.including(point))
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Written so that NaN extents count as empty, too.
        !(self.min[0] <= self.max[0] && self.min[1] <= self.max[1])
    }
    #[must_use]
    pub fn including(self, point: [f32; 2]) -> Self {
        Self {
            min: [self.min[0].min(point[0]), self.min[1].min(point[1])],
            max: [self.max[0].max(point[0]), self.max[1].max(point[1])],
        }
    }
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        self.including(other.min).including(other.max)
    }
    /// Grow every side outward by `by`. Empty boxes stay empty.
    #[must_use]
    pub fn inflate(self, by: f32) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            min: [self.min[0] - by, self.min[1] - by],
            max: [self.max[0] + by, self.max[1] + by],
        }
    }
    #[must_use]
    pub fn contains(&self, point: [f32; 2]) -> bool {
        (self.min[0]..=self.max[0]).contains(&point[0])
            && (self.min[1]..=self.max[1]).contains(&point[1])
    }
    #[must_use]
    pub fn size(&self) -> [f32; 2] {
        if self.is_empty() {
            [0.0; 2]
        } else {
            [self.max[0] - self.min[0], self.max[1] - self.min[1]]
        }
    }
    #[must_use]
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            self.min,
            [self.max[0], self.min[1]],
            self.max,
            [self.min[0], self.max[1]],
        ]
    }
    /// Bounds of this box after it has been placed by `transform`. Conservative for rotated boxes.
    #[must_use]
    pub fn transformed(&self, transform: &Similarity) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(
            self.corners()
                .into_iter()
                .map(|corner| transform.transform_point(corner)),
        )
    }
}
impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;
    use crate::state::transform::Similarity;

    #[test]
    fn empty_identity() {
        let a = Aabb::from_min_max([0.0, 0.0], [1.0, 2.0]);
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(a.union(Aabb::EMPTY), a);
        assert_eq!(Aabb::EMPTY.union(a), a);
        assert!(Aabb::EMPTY.inflate(5.0).is_empty());
        assert!(!Aabb::EMPTY.contains([0.0, 0.0]));
    }
    #[test]
    fn from_points() {
        let bounds = Aabb::from_points([[1.0, 5.0], [-2.0, 3.0], [0.0, 7.0]]);
        assert_eq!(bounds, Aabb::from_min_max([-2.0, 3.0], [1.0, 7.0]));
        assert_eq!(bounds.size(), [3.0, 4.0]);
        assert!(bounds.contains([0.0, 4.0]));
        assert!(!bounds.contains([2.0, 4.0]));
    }
    #[test]
    fn rotated_square() {
        let square = Aabb::from_min_max([-1.0, -1.0], [1.0, 1.0]);
        let rotated = square.transformed(&Similarity::new([10.0, 0.0], std::f32::consts::FRAC_PI_4));
        let half_diagonal = std::f32::consts::SQRT_2;
        assert!((rotated.max[0] - (10.0 + half_diagonal)).abs() < 1e-5);
        assert!((rotated.min[1] + half_diagonal).abs() < 1e-5);
    }
}
