//! In-memory animal records and uploaded images shared by all sessions

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use trellis_core::{StateMap, StateProvider};
use trellis_session::{Blob, BlobSource};
use trellis_widgets::BasicList;

const SAMPLE_NAMES: &[&str] = &[
    "Aardvark", "Bison", "Cheetah", "Dingo", "Elephant", "Flamingo", "Gazelle", "Hedgehog",
    "Ibex", "Jaguar", "Koala", "Lemur", "Meerkat", "Narwhal", "Ocelot", "Pangolin", "Quokka",
];

pub const MAX_NAME_LENGTH: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Animal {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub likes: u32,
}

impl Animal {
    /// State shown by one card of the animal list
    pub fn card_state(&self) -> StateMap {
        let mut state = StateMap::new();
        state.put("name", self.name.as_str());
        state.put("summary", self.summary.as_str());
        state.put("likes", likes_text(self.likes));
        state
    }
}

pub fn likes_text(likes: u32) -> String {
    match likes {
        0 => "No likes yet".to_string(),
        1 => "1 like".to_string(),
        n => format!("{n} likes"),
    }
}

#[derive(Default)]
pub struct Zoo {
    animals: RwLock<BTreeMap<i64, Animal>>,
}

impl Zoo {
    pub fn sample() -> Self {
        let animals = SAMPLE_NAMES
            .iter()
            .zip(1..)
            .map(|(name, id)| {
                let animal = Animal {
                    id,
                    name: name.to_string(),
                    summary: format!("The {} is animal number {id} in our collection.", name.to_lowercase()),
                    likes: 0,
                };
                (id, animal)
            })
            .collect();
        Self {
            animals: RwLock::new(animals),
        }
    }

    pub fn ids(&self) -> Vec<i64> {
        self.animals.read().keys().copied().collect()
    }

    pub fn get(&self, id: i64) -> Option<Animal> {
        self.animals.read().get(&id).cloned()
    }

    /// A paged list over every animal, reading card data at render time
    pub fn list(self: &Arc<Self>, per_page: usize) -> BasicList {
        let zoo = Arc::clone(self);
        BasicList::new(self.ids(), per_page).with_items(move |id| {
            let state = zoo.get(id).map(|a| a.card_state()).unwrap_or_default();
            StateProvider::new("", state)
        })
    }

    /// Add a like; returns the updated animal
    pub fn like(&self, id: i64) -> Option<Animal> {
        let mut animals = self.animals.write();
        let animal = animals.get_mut(&id)?;
        animal.likes += 1;
        Some(animal.clone())
    }

    pub fn rename(&self, id: i64, name: &str) -> Result<String, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Please enter a name".to_string());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!("Names are at most {MAX_NAME_LENGTH} characters"));
        }
        let mut animals = self.animals.write();
        let animal = animals.get_mut(&id).ok_or("This animal no longer exists")?;
        animal.name = name.to_string();
        Ok(animal.name.clone())
    }

    pub fn set_summary(&self, id: i64, summary: &str) -> Result<String, String> {
        let mut animals = self.animals.write();
        let animal = animals.get_mut(&id).ok_or("This animal no longer exists")?;
        animal.summary = summary.trim().to_string();
        Ok(animal.summary.clone())
    }
}

// =============================================================================
// Uploads
// =============================================================================

/// Images uploaded through the gallery, served under the blob URL prefix
#[derive(Default)]
pub struct UploadStore {
    blobs: RwLock<FxHashMap<i64, Blob>>,
    next_id: AtomicI64,
}

impl UploadStore {
    /// Store an image; fails unless the data looks like a PNG, JPEG or GIF
    pub fn insert_image(&self, data: &[u8]) -> Result<Blob, String> {
        let extension = image_extension(data).ok_or("Please choose a PNG, JPEG or GIF image")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let blob = Blob {
            id,
            name: format!("upload{id}.{extension}"),
            data: data.to_vec(),
        };
        self.blobs.write().insert(id, blob.clone());
        tracing::info!(blob = id, bytes = data.len(), "stored upload");
        Ok(blob)
    }
}

impl BlobSource for UploadStore {
    fn read_blob(&self, id: i64) -> trellis_session::Result<Option<Blob>> {
        Ok(self.blobs.read().get(&id).cloned())
    }

    fn read_blob_with_name(&self, name: &str) -> trellis_session::Result<Option<Blob>> {
        Ok(self.blobs.read().values().find(|b| b.name == name).cloned())
    }
}

fn image_extension(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("gif")
    } else {
        None
    }
}
