use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TilesetDescriptor {
    pub name: String,
    pub first_id: u32,
    pub columns: u32,
    pub tile_count: u32,
    /// Asset key of the tileset sheet, resolved to `assets/<key>.png`.
    pub image: String,
}

impl TilesetDescriptor {
    pub fn contains(&self, clean_id: u32) -> bool {
        clean_id >= self.first_id && clean_id - self.first_id < self.tile_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tileset '{name}' declares zero columns")]
    ZeroColumns { name: String },
}

/// Ordered tileset table. Ranges may overlap; the last match wins.
#[derive(Debug, Clone, Default)]
pub struct TilesetRegistry {
    descriptors: Vec<TilesetDescriptor>,
}

impl TilesetRegistry {
    pub fn new(descriptors: Vec<TilesetDescriptor>) -> Result<Self, RegistryError> {
        if let Some(bad) = descriptors.iter().find(|descriptor| descriptor.columns == 0) {
            return Err(RegistryError::ZeroColumns {
                name: bad.name.clone(),
            });
        }
        Ok(Self { descriptors })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[TilesetDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, index: usize) -> Option<&TilesetDescriptor> {
        self.descriptors.get(index)
    }

    pub fn resolve(&self, clean_id: u32) -> Option<(usize, &TilesetDescriptor)> {
        // Later overlapping descriptors override earlier ones.
        let mut found = None;
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.contains(clean_id) {
                found = Some((index, descriptor));
            }
        }
        found
    }
}
