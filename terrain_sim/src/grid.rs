//! Fixed-size row-major scalar grid.

/// One cell of the scalar field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCell {
    pub value: u32,
    /// Scratch value used only by the diffusion generator.
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<GridCell>,
}

/// Offsets of the 8-connected neighbourhood.
const NEIGHBOUR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl FieldGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![GridCell::default(); width as usize * height as usize],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index for signed coordinates, `None` when outside the grid.
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64 {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (u32, u32) {
        let width = self.width.max(1) as usize;
        ((idx % width) as u32, (idx / width) as u32)
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<&GridCell> {
        self.index(x, y).and_then(|idx| self.cells.get(idx))
    }

    #[inline]
    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut GridCell> {
        self.index(x, y).and_then(|idx| self.cells.get_mut(idx))
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [GridCell] {
        &mut self.cells
    }

    /// Reset every cell to zero in place.
    pub fn clear(&mut self) {
        self.cells.fill(GridCell::default());
    }

    /// In-bounds 8-connected neighbour indices of `(x, y)`.
    ///
    /// Interior cells have eight neighbours, edge cells five and corner cells three,
    /// identically on every side of the grid.
    pub fn neighbours(&self, x: u32, y: u32) -> impl Iterator<Item = usize> + '_ {
        NEIGHBOUR_OFFSETS
            .iter()
            .filter_map(move |&(dx, dy)| self.index(x as i64 + dx, y as i64 + dy))
    }

    pub fn max_value(&self) -> u32 {
        self.cells.iter().map(|cell| cell.value).max().unwrap_or(0)
    }
}
