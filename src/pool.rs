use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::planner::session_image_limit;
use crate::session::SessionConfig;

/// Opaque handle to a displayable image: a file path or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn from_path(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// What to hand the system viewer: URLs as they are, paths as `file://` URLs.
    pub fn viewer_target(&self) -> String {
        if self.is_remote() {
            return self.0.clone();
        }
        let path = std::fs::canonicalize(&self.0).unwrap_or_else(|_| PathBuf::from(&self.0));
        format!("file://{}", path.display())
    }

    /// Short label for lists: the file name for paths, the last URL segment otherwise.
    pub fn display_name(&self) -> &str {
        self.0
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

pub type SlotId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// waiting on the image generator
    Pending,
    Ready(ImageRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSlot {
    pub id: SlotId,
    pub state: SlotState,
}

impl PoolSlot {
    pub fn image(&self) -> Option<&ImageRef> {
        match &self.state {
            SlotState::Ready(image) => Some(image),
            SlotState::Pending => None,
        }
    }
}

/// Owns every loaded or generated image handle and releases them on removal.
#[derive(Debug, Default)]
pub struct ImagePool {
    slots: Vec<PoolSlot>,
    next_id: SlotId,
}

impl ImagePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_slot_id(&mut self) -> SlotId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push(&mut self, image: ImageRef) -> SlotId {
        let id = self.next_slot_id();
        self.slots.push(PoolSlot {
            id,
            state: SlotState::Ready(image),
        });
        id
    }

    pub fn extend<I: IntoIterator<Item = ImageRef>>(&mut self, images: I) -> usize {
        let before = self.slots.len();
        for image in images {
            self.push(image);
        }
        self.slots.len() - before
    }

    /// Adds a placeholder for an image that is still being generated.
    pub fn reserve(&mut self) -> SlotId {
        let id = self.next_slot_id();
        self.slots.push(PoolSlot {
            id,
            state: SlotState::Pending,
        });
        id
    }

    /// Fills a pending slot. Returns false if the slot is gone (removed or cleared).
    pub fn fulfill(&mut self, id: SlotId, image: ImageRef) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) if slot.state == SlotState::Pending => {
                slot.state = SlotState::Ready(image);
                true
            }
            _ => false,
        }
    }

    /// Drops the placeholder of a failed generation; other slots are untouched.
    pub fn fail(&mut self, id: SlotId) -> bool {
        let before = self.slots.len();
        self.slots
            .retain(|s| !(s.id == id && s.state == SlotState::Pending));
        before != self.slots.len()
    }

    /// Removes the slot at `index` and releases its handle.
    pub fn remove(&mut self, index: usize) -> Option<ImageRef> {
        if index >= self.slots.len() {
            return None;
        }
        let slot = self.slots.remove(index);
        match slot.state {
            SlotState::Ready(image) => {
                self.release(&image);
                Some(image)
            }
            SlotState::Pending => None,
        }
    }

    pub fn clear(&mut self) {
        let slots = std::mem::take(&mut self.slots);
        for slot in slots {
            if let SlotState::Ready(image) = slot.state {
                self.release(&image);
            }
        }
    }

    fn release(&self, image: &ImageRef) {
        debug!("releasing image {}", image);
    }

    pub fn slots(&self) -> &[PoolSlot] {
        &self.slots
    }

    pub fn ready_images(&self) -> Vec<ImageRef> {
        self.slots.iter().filter_map(|s| s.image().cloned()).collect()
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|s| s.image().is_some()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len() - self.ready_count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Fisher-Yates: walk down from the last index, swapping each element with a
/// uniformly chosen one at or below it.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Derives the session ordering from the pool's ready images.
pub fn start_ordering<R: Rng + ?Sized>(
    images: &[ImageRef],
    config: &SessionConfig,
    rng: &mut R,
) -> Vec<ImageRef> {
    let mut order = images.to_vec();
    if config.shuffle {
        shuffle(&mut order, rng);
    }
    if config.mode.is_ramped() {
        let limit = session_image_limit(config.total_session_secs, config.minimum_image_secs);
        order.truncate(limit);
    }
    order
}
