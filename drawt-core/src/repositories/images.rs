//! # Images
//!
//! Pixel data for image entities, shared between every entity that names the same file.
//!
//! Entities hold an [`ImageHandle`], which is handed out immediately and never blocks. The file is read and
//! decoded by a background worker, and the main thread later hands the finished pixels to the renderer
//! through [`ImageCache::poll`]. Until then, the handle is simply [`ImageStatus::Unloaded`] and the renderer
//! is free to draw a placeholder.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::render::{Renderer, TextureHandle};

/// Get the shared global instance of the image cache.
pub fn global() -> &'static ImageCache {
    static CACHE: std::sync::OnceLock<ImageCache> = std::sync::OnceLock::new();
    CACHE.get_or_init(|| ImageCache::new(DefaultDecoder))
}

/// Tightly packed 8-bit RGBA pixels.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Other(String),
}

/// Turns the bytes of an image file into pixels. Runs on the worker thread.
pub trait ImageDecoder: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}
/// Decodes whatever formats the `image` crate was built with.
pub struct DefaultDecoder;
impl ImageDecoder for DefaultDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let image = image::load_from_memory(bytes)?.into_rgba8();
        Ok(DecodedImage {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }
}

enum SlotState {
    Unloaded,
    Decoded(DecodedImage),
    Uploaded(TextureHandle),
    Failed,
}
struct Slot {
    path: PathBuf,
    state: parking_lot::Mutex<SlotState>,
    /// Textures whose every handle has been dropped, waiting for the main thread to release them.
    orphans: Arc<parking_lot::Mutex<Vec<TextureHandle>>>,
}
impl Drop for Slot {
    fn drop(&mut self) {
        if let SlotState::Uploaded(texture) = *self.state.get_mut() {
            self.orphans.lock().push(texture);
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    /// Still waiting on the worker.
    Unloaded,
    /// Pixels are ready, waiting on [`ImageCache::poll`] to upload them.
    Decoded,
    Ready(TextureHandle),
    /// The file could not be read or decoded. Will not be retried.
    Failed,
}

/// Shared reference to the pixels of one image file.
#[derive(Clone)]
pub struct ImageHandle(Arc<Slot>);
impl ImageHandle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0.path
    }
    #[must_use]
    pub fn status(&self) -> ImageStatus {
        match &*self.0.state.lock() {
            SlotState::Unloaded => ImageStatus::Unloaded,
            SlotState::Decoded(_) => ImageStatus::Decoded,
            SlotState::Uploaded(texture) => ImageStatus::Ready(*texture),
            SlotState::Failed => ImageStatus::Failed,
        }
    }
    #[must_use]
    pub fn texture(&self) -> Option<TextureHandle> {
        match self.status() {
            ImageStatus::Ready(texture) => Some(texture),
            _ => None,
        }
    }
    /// Do both handles refer to the same image?
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ImageHandle").field(&self.0.path).finish()
    }
}

#[derive(Default)]
struct Queue {
    requests: std::collections::VecDeque<Weak<Slot>>,
    shutdown: bool,
}
#[derive(Default)]
struct Shared {
    queue: parking_lot::Mutex<Queue>,
    wake: parking_lot::Condvar,
    /// Slots the worker has finished decoding.
    decoded: parking_lot::Mutex<Vec<Weak<Slot>>>,
}

pub struct ImageCache {
    slots: parking_lot::Mutex<hashbrown::HashMap<PathBuf, Weak<Slot>>>,
    shared: Arc<Shared>,
    orphans: Arc<parking_lot::Mutex<Vec<TextureHandle>>>,
    worker: Option<std::thread::JoinHandle<()>>,
}
impl ImageCache {
    pub fn new(decoder: impl ImageDecoder) -> Self {
        let shared = Arc::new(Shared::default());
        let worker = {
            let shared = shared.clone();
            std::thread::Builder::new()
                .name("image decode worker".to_owned())
                .spawn(move || decode_worker(&shared, &decoder))
        };
        let worker = match worker {
            Ok(worker) => Some(worker),
            Err(err) => {
                // Images will stay unloaded, but documents still work.
                log::error!("failed to start image worker: {err}");
                None
            }
        };
        Self {
            slots: parking_lot::Mutex::default(),
            shared,
            orphans: Arc::default(),
            worker,
        }
    }
    /// Get a handle to the image at `path`, queueing it for decode if no one else holds it.
    pub fn acquire(&self, path: impl AsRef<Path>) -> ImageHandle {
        let path = path.as_ref();
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(path).and_then(Weak::upgrade) {
            return ImageHandle(slot);
        }
        slots.retain(|_, slot| slot.strong_count() != 0);

        let slot = Arc::new(Slot {
            path: path.to_owned(),
            state: parking_lot::Mutex::new(SlotState::Unloaded),
            orphans: self.orphans.clone(),
        });
        slots.insert(path.to_owned(), Arc::downgrade(&slot));
        drop(slots);

        self.shared
            .queue
            .lock()
            .requests
            .push_back(Arc::downgrade(&slot));
        self.shared.wake.notify_one();

        ImageHandle(slot)
    }
    /// Number of distinct images with at least one live handle.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.strong_count() != 0)
            .count()
    }
    /// Upload every finished decode, and release the textures of images no one holds anymore.
    /// Call from the thread that owns the renderer. Returns the number of textures created.
    pub fn poll(&self, renderer: &mut dyn Renderer) -> usize {
        let decoded = std::mem::take(&mut *self.shared.decoded.lock());
        let mut uploaded = 0;
        for slot in decoded.iter().filter_map(Weak::upgrade) {
            let mut state = slot.state.lock();
            if let SlotState::Decoded(image) = &*state {
                let texture = renderer.create_texture(image);
                *state = SlotState::Uploaded(texture);
                uploaded += 1;
            }
        }
        let orphans = std::mem::take(&mut *self.orphans.lock());
        for texture in orphans {
            renderer.release_texture(texture);
        }
        uploaded
    }
}
impl Drop for ImageCache {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("image worker panicked");
            }
        }
    }
}

fn decode_worker(shared: &Shared, decoder: &dyn ImageDecoder) {
    loop {
        let request = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.shutdown {
                    return;
                }
                if let Some(request) = queue.requests.pop_front() {
                    break request;
                }
                shared.wake.wait(&mut queue);
            }
        };
        // Every handle was dropped before we got to it.
        let Some(slot) = request.upgrade() else {
            continue;
        };
        let result = std::fs::read(&slot.path)
            .map_err(DecodeError::from)
            .and_then(|bytes| decoder.decode(&bytes));
        match result {
            Ok(image) => {
                log::trace!(
                    "decoded {} ({}x{})",
                    slot.path.display(),
                    image.width,
                    image.height
                );
                *slot.state.lock() = SlotState::Decoded(image);
                shared.decoded.lock().push(Arc::downgrade(&slot));
            }
            Err(err) => {
                log::warn!("failed to load image {}: {err}", slot.path.display());
                *slot.state.lock() = SlotState::Failed;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DecodeError, DecodedImage, ImageCache, ImageDecoder, ImageStatus};
    use crate::render::NullRenderer;

    /// Every file is a single pixel, the color of its first byte.
    struct OnePixel;
    impl ImageDecoder for OnePixel {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            let first = *bytes
                .first()
                .ok_or_else(|| DecodeError::Other("empty".to_owned()))?;
            Ok(DecodedImage {
                width: 1,
                height: 1,
                pixels: vec![first; 4],
            })
        }
    }
    fn wait_for(handle: &super::ImageHandle, done: impl Fn(ImageStatus) -> bool) -> ImageStatus {
        let start = std::time::Instant::now();
        loop {
            let status = handle.status();
            if done(status) || start.elapsed() > std::time::Duration::from_secs(10) {
                return status;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }
    #[test]
    fn shared_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, [7]).unwrap();

        let cache = ImageCache::new(OnePixel);
        let a = cache.acquire(&path);
        let b = cache.acquire(&path);
        assert!(a.ptr_eq(&b));
        assert_eq!(cache.live(), 1);

        drop(a);
        assert_eq!(cache.live(), 1);
        drop(b);
        assert_eq!(cache.live(), 0);
    }
    #[test]
    fn upload_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, [7]).unwrap();

        let cache = ImageCache::new(OnePixel);
        let mut renderer = NullRenderer::default();
        let handle = cache.acquire(&path);
        assert_eq!(
            wait_for(&handle, |status| status != ImageStatus::Unloaded),
            ImageStatus::Decoded
        );
        assert!(handle.texture().is_none());

        assert_eq!(cache.poll(&mut renderer), 1);
        assert!(handle.texture().is_some());
        assert_eq!(renderer.live_textures(), 1);

        // Last handle gone, texture goes back on the next poll.
        drop(handle);
        assert_eq!(renderer.live_textures(), 1);
        assert_eq!(cache.poll(&mut renderer), 0);
        assert_eq!(renderer.live_textures(), 0);
    }
    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(OnePixel);
        let handle = cache.acquire(dir.path().join("nope.png"));
        assert_eq!(
            wait_for(&handle, |status| status != ImageStatus::Unloaded),
            ImageStatus::Failed
        );
        let mut renderer = NullRenderer::default();
        assert_eq!(cache.poll(&mut renderer), 0);
        assert_eq!(renderer.live_textures(), 0);
    }
    #[test]
    fn undecodable_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let cache = ImageCache::new(OnePixel);
        let handle = cache.acquire(&path);
        assert_eq!(
            wait_for(&handle, |status| status != ImageStatus::Unloaded),
            ImageStatus::Failed
        );
    }
}
