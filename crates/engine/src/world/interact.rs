use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::{PixelRect, Vec2};

/// Closed set of things the UI layer knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractableType {
    Book,
    Letter,
    Calendar,
    Video,
    Gift,
    Photo,
    Map,
    Table,
}

impl InteractableType {
    pub const fn as_str(self) -> &'static str {
        match self {
            InteractableType::Book => "book",
            InteractableType::Letter => "letter",
            InteractableType::Calendar => "calendar",
            InteractableType::Video => "video",
            InteractableType::Gift => "gift",
            InteractableType::Photo => "photo",
            InteractableType::Map => "map",
            InteractableType::Table => "table",
        }
    }
}

impl fmt::Display for InteractableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger zone in cell units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InteractableZone {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InteractableType,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub label: String,
}

impl InteractableZone {
    pub fn pixel_rect(&self, tile_size: u32) -> PixelRect {
        let tile = tile_size as f32;
        PixelRect {
            x: self.x as f32 * tile,
            y: self.y as f32 * tile,
            width: self.width as f32 * tile,
            height: self.height as f32 * tile,
        }
    }
}

/// Raised when the player confirms an interaction; the UI collaborator opens its view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub kind: InteractableType,
    pub id: String,
}

/// Index and zone whose rectangle is closest to `point`, if that distance is below
/// `max_distance`. Ties keep the earlier zone.
pub fn nearest_interactable(
    zones: &[InteractableZone],
    point: Vec2,
    tile_size: u32,
    max_distance: f32,
) -> Option<(usize, &InteractableZone)> {
    let mut closest: Option<(usize, f32)> = None;
    for (index, zone) in zones.iter().enumerate() {
        let distance = zone.pixel_rect(tile_size).distance_to(point);
        if distance >= max_distance {
            continue;
        }
        if closest.map_or(true, |(_, best)| distance < best) {
            closest = Some((index, distance));
        }
    }
    closest.map(|(index, _)| (index, &zones[index]))
}
