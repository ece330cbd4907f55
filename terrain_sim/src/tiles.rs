//! Terrain categories, their frequency weights and the value classifier.
//!
//! The value domain `[0, value_range)` is split into one contiguous sub-range per
//! category, sized proportionally to the category weight and ordered as the table is.

use serde::Deserialize;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileCategory {
    Water,
    Sand,
    Grass,
    Stone,
    Snow,
}

impl TileCategory {
    pub const ALL: [TileCategory; 5] = [
        TileCategory::Water,
        TileCategory::Sand,
        TileCategory::Grass,
        TileCategory::Stone,
        TileCategory::Snow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TileCategory::Water => "water",
            TileCategory::Sand => "sand",
            TileCategory::Grass => "grass",
            TileCategory::Stone => "stone",
            TileCategory::Snow => "snow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TileWeight {
    pub category: TileCategory,
    pub weight: u32,
}

impl TileWeight {
    pub fn new(category: TileCategory, weight: u32) -> Self {
        Self { category, weight }
    }
}

/// Ordered, non-empty sequence of positive category weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileWeightTable {
    entries: Vec<TileWeight>,
    total: u64,
}

impl TileWeightTable {
    pub fn new(entries: Vec<TileWeight>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::Invalid("tile weight table is empty"));
        }
        if entries.iter().any(|entry| entry.weight == 0) {
            return Err(ConfigError::Invalid("tile weights must be positive"));
        }
        let total = entries.iter().map(|entry| entry.weight as u64).sum();
        Ok(Self { entries, total })
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn entries(&self) -> &[TileWeight] {
        &self.entries
    }

    pub fn weight_of(&self, category: TileCategory) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.weight)
    }
}

/// Result of classifying one cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: TileCategory,
    /// Zero-based offset inside the category's weight span, always `< weight`.
    pub position: u32,
    pub weight: u32,
}

impl Classification {
    pub fn color(&self) -> u32 {
        tile_color(self.category, self.position, self.weight)
    }
}

#[derive(Debug, Clone)]
pub struct TileClassifier {
    table: TileWeightTable,
    value_range: u32,
}

impl TileClassifier {
    pub fn new(table: TileWeightTable, value_range: u32) -> Result<Self, ConfigError> {
        if value_range == 0 {
            return Err(ConfigError::Invalid("value_range must be non-zero"));
        }
        Ok(Self { table, value_range })
    }

    pub fn table(&self) -> &TileWeightTable {
        &self.table
    }

    pub fn value_range(&self) -> u32 {
        self.value_range
    }

    /// Map `value` to its category and offset. Values at or above the range saturate
    /// to the last representable value.
    pub fn classify(&self, value: u32) -> Classification {
        let value = value.min(self.value_range - 1) as u64;
        let scaled = value * self.table.total / self.value_range as u64;

        let mut acc = 0u64;
        for entry in &self.table.entries {
            let weight = entry.weight as u64;
            acc += weight;
            if scaled < acc {
                return Classification {
                    category: entry.category,
                    position: (scaled - (acc - weight)) as u32,
                    weight: entry.weight,
                };
            }
        }

        // scaled < total by construction, so the walk above always returns.
        let last = self.table.entries[self.table.entries.len() - 1];
        Classification {
            category: last.category,
            position: last.weight - 1,
            weight: last.weight,
        }
    }
}

/// Packed `0xAARRGGBB` color for a classified cell.
pub fn tile_color(category: TileCategory, position: u32, weight: u32) -> u32 {
    let weight = weight.max(1);
    let rgb = match category {
        TileCategory::Water => ramp(position, weight, 0x77),
        TileCategory::Sand => 0xFF_DA00,
        TileCategory::Grass => ramp(position, weight, 0x66) << 8,
        TileCategory::Stone => {
            let gray = position * (0xFF - 0x21) / weight + 0x21;
            (gray << 16) | (gray << 8) | gray
        }
        TileCategory::Snow => 0xFF_FFFF,
    };
    0xFF00_0000 | rgb
}

// Linear ramp ending just below full intensity across the category span.
fn ramp(position: u32, weight: u32, span: u32) -> u32 {
    position * span / weight + 0xFF - span
}
