//! Resource kinds and the colors each tile shows on its light.
//!
//! The palette is a pure lookup: a [`Terrain`] maps to exactly one [`Rgb`].
//! The hue wheel used by the idle animation lives here too so every color
//! the board can show is defined in one place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Producing resource kinds. The desert is not a resource; see [`Terrain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Brick,
    Wood,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource kinds
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Wood,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

/// What a board position holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    /// Fixed center tile with no light attached
    Desert,
}

impl Terrain {
    /// Get the resource this terrain produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Resource(r) => Some(*r),
            Terrain::Desert => None,
        }
    }
}

impl From<Resource> for Terrain {
    fn from(resource: Resource) -> Self {
        Terrain::Resource(resource)
    }
}

/// 8-bit RGB color as sent to an indicator unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

/// Brightness used by the hue wheel
const HUE_CHROMA: f32 = 200.0;

/// Mapping from terrain to display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorPalette;

impl ColorPalette {
    /// The palette tuned for the board's light units
    pub fn standard() -> Self {
        ColorPalette
    }

    /// Color shown for a terrain
    pub fn color(&self, terrain: Terrain) -> Rgb {
        match terrain {
            Terrain::Resource(Resource::Brick) => Rgb(130, 3, 3),
            Terrain::Resource(Resource::Wood) => Rgb(0, 120, 0),
            Terrain::Resource(Resource::Sheep) => Rgb(0, 100, 30),
            Terrain::Resource(Resource::Wheat) => Rgb(130, 85, 0),
            Terrain::Resource(Resource::Ore) => Rgb(10, 10, 128),
            Terrain::Desert => Rgb::OFF,
        }
    }

    /// Color for an optional terrain; empty positions are dark
    pub fn color_or_off(&self, terrain: Option<Terrain>) -> Rgb {
        terrain.map_or(Rgb::OFF, |t| self.color(t))
    }

    /// Every terrain with its color, keyed by lowercase name
    pub fn entries(&self) -> BTreeMap<String, Rgb> {
        Resource::ALL
            .iter()
            .map(|&r| Terrain::Resource(r))
            .chain(std::iter::once(Terrain::Desert))
            .map(|t| (terrain_name(t).to_string(), self.color(t)))
            .collect()
    }
}

fn terrain_name(terrain: Terrain) -> &'static str {
    match terrain {
        Terrain::Resource(Resource::Brick) => "brick",
        Terrain::Resource(Resource::Wood) => "wood",
        Terrain::Resource(Resource::Sheep) => "sheep",
        Terrain::Resource(Resource::Wheat) => "wheat",
        Terrain::Resource(Resource::Ore) => "ore",
        Terrain::Desert => "desert",
    }
}

/// Convert a hue (wrapped into 0..1) to a fully saturated color.
///
/// 0 is red, 1/3 green, 2/3 blue.
pub fn hue_to_rgb(hue: f32) -> Rgb {
    let hue = hue.rem_euclid(1.0);
    let h = hue * 6.0;
    let c = HUE_CHROMA;

    let (r, g, b) = if h < 1.0 {
        (c, c * h, 0.0)
    } else if h < 2.0 {
        (c * (2.0 - h), c, 0.0)
    } else if h < 3.0 {
        (0.0, c, c * (h - 2.0))
    } else if h < 4.0 {
        (0.0, c * (4.0 - h), c)
    } else if h < 5.0 {
        (c * (h - 4.0), 0.0, c)
    } else {
        (c, 0.0, c * (6.0 - h))
    };

    Rgb(r as u8, g as u8, b as u8)
}
