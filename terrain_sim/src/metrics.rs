use crate::{
    grid::FieldGrid,
    tiles::{TileCategory, TileClassifier},
};

/// Summary of a freshly generated field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMetrics {
    pub cells: usize,
    pub min_value: u32,
    pub max_value: u32,
    pub mean_value: f64,
    /// Cell count per category, in weight-table order.
    pub category_counts: Vec<(TileCategory, usize)>,
}

impl FieldMetrics {
    pub fn collect(grid: &FieldGrid, classifier: &TileClassifier) -> Self {
        let mut counts: Vec<(TileCategory, usize)> = classifier
            .table()
            .entries()
            .iter()
            .map(|entry| (entry.category, 0))
            .collect();

        let mut min_value = u32::MAX;
        let mut max_value = 0u32;
        let mut total = 0u64;

        for cell in grid.cells() {
            min_value = min_value.min(cell.value);
            max_value = max_value.max(cell.value);
            total += cell.value as u64;

            let category = classifier.classify(cell.value).category;
            if let Some(slot) = counts.iter_mut().find(|(c, _)| *c == category) {
                slot.1 += 1;
            }
        }

        let cells = grid.len();
        Self {
            cells,
            min_value: if cells > 0 { min_value } else { 0 },
            max_value,
            mean_value: if cells > 0 {
                total as f64 / cells as f64
            } else {
                0.0
            },
            category_counts: counts,
        }
    }

    pub fn count_for(&self, category: TileCategory) -> usize {
        self.category_counts
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Fraction of cells classified as `category`.
    pub fn share(&self, category: TileCategory) -> f32 {
        if self.cells == 0 {
            return 0.0;
        }
        self.count_for(category) as f32 / self.cells as f32
    }
}
