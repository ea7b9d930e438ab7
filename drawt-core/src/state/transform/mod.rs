/// A rotation followed by a translation - the placement of an entity's local geometry in the world.
///
/// This transform maintains the "Similarity" of shapes and their image, maintaining
/// all angles and lengths.
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq, PartialOrd)]
#[repr(C)]
pub struct Similarity {
    /// Rotation, in radians CCW from positive X
    pub rotation: f32,
    /// Translation, in world units. This is the entity's pivot.
    pub translation: [f32; 2],
}

impl Similarity {
    #[must_use]
    pub fn new(translation: [f32; 2], rotation: f32) -> Self {
        Self {
            rotation,
            translation,
        }
    }
    /// Map a point from local space into world space.
    #[must_use]
    pub fn transform_point(&self, point: [f32; 2]) -> [f32; 2] {
        Matrix::from(*self).transform_point(point)
    }
    /// Map a point from world space back into local space.
    #[must_use]
    pub fn inverse_transform_point(&self, point: [f32; 2]) -> [f32; 2] {
        let local = [
            point[0] - self.translation[0],
            point[1] - self.translation[1],
        ];
        let (sin, cos) = self.rotation.sin_cos();
        // Transpose of the rotation.
        [
            local[0] * cos + local[1] * sin,
            -local[0] * sin + local[1] * cos,
        ]
    }
}

impl Default for Similarity {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            translation: [0.0; 2],
        }
    }
}

/// An arbitrary affine transform, as handed to renderers.
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq, PartialOrd)]
#[repr(C)]
pub struct Matrix {
    /// Column-major matrix elements
    pub elements: [[f32; 2]; 3],
}

impl Matrix {
    #[must_use]
    pub fn transform_point(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [a, b, t] = self.elements;
        [a[0] * x + b[0] * y + t[0], a[1] * x + b[1] * y + t[1]]
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            elements: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
        }
    }
}

impl From<Similarity> for Matrix {
    fn from(value: Similarity) -> Self {
        let (sin, cos) = value.rotation.sin_cos();

        Self {
            // Rotation, and then translate.
            elements: [[cos, sin], [-sin, cos], value.translation],
        }
    }
}

impl From<[[f32; 2]; 3]> for Matrix {
    fn from(elements: [[f32; 2]; 3]) -> Self {
        Self { elements }
    }
}

impl From<Matrix> for [[f32; 2]; 3] {
    fn from(value: Matrix) -> Self {
        value.elements
    }
}
