//! # Render
//!
//! The boundary to the rendering backend. The document model decides *when* per-entity and per-image
//! resources come and go, the [`Renderer`] decides what they are.

use crate::repositories::images::DecodedImage;
use crate::state::entities::Entity;

/// Opaque renderer-owned resource of a single entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);
/// Opaque renderer-owned image texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);
/// Opaque renderer-owned surface a whole scene is drawn into. Survives loads into the scene.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u64);

pub trait Renderer {
    /// Allocate whatever the backend needs to draw this entity.
    fn init_entity(&mut self, entity: &Entity) -> RenderHandle;
    fn release_entity(&mut self, handle: RenderHandle);
    fn create_texture(&mut self, image: &DecodedImage) -> TextureHandle;
    fn release_texture(&mut self, handle: TextureHandle);
}

/// A renderer that draws nothing, but keeps track of every handle it has given out and not
/// gotten back. Used by the headless front-end and to check resource balance.
#[derive(Default, Debug)]
pub struct NullRenderer {
    next: u64,
    entities: hashbrown::HashSet<RenderHandle>,
    textures: hashbrown::HashSet<TextureHandle>,
}
impl NullRenderer {
    #[must_use]
    pub fn live_entities(&self) -> usize {
        self.entities.len()
    }
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }
    fn next(&mut self) -> u64 {
        let next = self.next;
        self.next += 1;
        next
    }
}
impl Renderer for NullRenderer {
    fn init_entity(&mut self, _: &Entity) -> RenderHandle {
        let handle = RenderHandle(self.next());
        self.entities.insert(handle);
        handle
    }
    fn release_entity(&mut self, handle: RenderHandle) {
        if !self.entities.remove(&handle) {
            log::warn!("released unknown {handle:?}");
        }
    }
    fn create_texture(&mut self, _: &DecodedImage) -> TextureHandle {
        let handle = TextureHandle(self.next());
        self.textures.insert(handle);
        handle
    }
    fn release_texture(&mut self, handle: TextureHandle) {
        if !self.textures.remove(&handle) {
            log::warn!("released unknown {handle:?}");
        }
    }
}
