/// A linear RGB color, as stored in documents. Three `f32` channels, no alpha -
/// entities are always drawn opaque over the canvas.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, PartialOrd, bytemuck::Pod, bytemuck::Zeroable, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct Color(pub [f32; 3]);
impl Color {
    pub const WHITE: Self = Self([1.0; 3]);
    pub const BLACK: Self = Self([0.0; 3]);
    /// Dark gray the canvas is cleared to in a fresh scene.
    pub const CANVAS: Self = Self([0.25; 3]);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b])
    }
    #[must_use]
    pub fn as_array(&self) -> [f32; 3] {
        self.0
    }
    /// Channels as a mutable array, used when a color is read from a document.
    pub fn as_array_mut(&mut self) -> &mut [f32; 3] {
        &mut self.0
    }
    /// Bitwise equality. Unlike `==`, two NaN channels with the same payload compare equal,
    /// which is what "did the persisted bytes change" asks.
    #[must_use]
    pub fn bits_eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
impl From<[f32; 3]> for Color {
    fn from(value: [f32; 3]) -> Self {
        Self(value)
    }
}
impl From<Color> for [f32; 3] {
    fn from(value: Color) -> Self {
        value.0
    }
}
