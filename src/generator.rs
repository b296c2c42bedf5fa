use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};
use rand::Rng;

use crate::error::GenerationError;
use crate::pool::{ImageRef, SlotId};

pub const DEFAULT_GENERATED_COUNT: usize = 10;

/// What kind of reference a generated session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Shape,
    Pose,
}

impl PromptKind {
    pub fn minimum_description_len(self) -> usize {
        match self {
            PromptKind::Shape => 3,
            PromptKind::Pose => 10,
        }
    }

    /// Expands a short description into the full generation prompt.
    pub fn build(self, description: &str) -> Result<String, GenerationError> {
        let description = description.trim();
        let minimum = self.minimum_description_len();
        if description.chars().count() < minimum {
            return Err(GenerationError::PromptTooShort { minimum });
        }

        let prompt = match self {
            PromptKind::Shape => format!(
                "A clean, high-contrast, black and white drawing reference of a single object: {description}. \
                 Plain neutral grey background, an unusual camera angle, clear lighting with \
                 well-defined shadows that show the form. No textures, colours or other elements."
            ),
            PromptKind::Pose => format!(
                "A clean, high-contrast, black and white drawing reference of a single character: {description}. \
                 Plain light grey background, a dynamic camera angle, dramatic but clear lighting \
                 with well-defined shadows that show form, volume and gesture."
            ),
        };
        Ok(prompt)
    }
}

/// Anything that can turn a prompt into an image handle.
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<ImageRef, GenerationError>;
}

/// Stand-in generator that hands out placeholder image URLs of varying size.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderGenerator;

impl ImageGenerator for PlaceholderGenerator {
    fn generate(&self, _prompt: &str) -> Result<ImageRef, GenerationError> {
        let mut rng = rand::thread_rng();
        let width = 600 + rng.gen_range(0..200);
        let height = 800 + rng.gen_range(0..200);
        Ok(ImageRef::new(format!("https://placehold.co/{width}x{height}.png")))
    }
}

/// Result for one reserved pool slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUpdate {
    pub slot: SlotId,
    pub result: Result<ImageRef, GenerationError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Slot(GenerationUpdate),
    Done,
}

/// Generates one image per slot, in order, on a background thread.
pub struct GenerationQueue;

impl GenerationQueue {
    pub fn spawn<E>(
        generator: Arc<dyn ImageGenerator>,
        prompt: String,
        slots: Vec<SlotId>,
        tx: Sender<E>,
    ) -> JoinHandle<()>
    where
        E: From<GenerationEvent> + Send + 'static,
    {
        thread::spawn(move || {
            let total = slots.len();
            for (i, slot) in slots.into_iter().enumerate() {
                let result = generator.generate(&prompt);
                match &result {
                    Ok(image) => info!("generated image {}/{}: {}", i + 1, total, image),
                    Err(e) => warn!("generation for slot {} failed: {}", slot, e),
                }
                let update = GenerationUpdate { slot, result };
                if tx.send(GenerationEvent::Slot(update).into()).is_err() {
                    // receiver gone, nobody wants the rest
                    return;
                }
            }
            let _ = tx.send(GenerationEvent::Done.into());
        })
    }
}
