/// The complete computational grid.
pub struct Mesh {
    pub cells: Vec<Cell>,
    pub faces: Vec<Face>,
    pub nodes: Vec<Node>,
}

/// A single control volume.
pub struct Cell {
    pub id: usize,
    pub volume: f64,
    pub centroid: [f64; 3],
    /// Faces touching this cell (cell-to-face adjacency).
    pub face_ids: Vec<usize>,
}

/// An interface between two cells.
pub struct Face {
    pub area: f64,
    pub normal: [f64; 3],
    /// Tuple of (cell1_id, optional cell2_id). `None` indicates a boundary face.
    pub neighbor_cell_ids: (usize, Option<usize>),
    pub centroid: [f64; 3],
}

pub struct Node {
    pub position: [f64; 3],
}

impl Mesh {
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Total volume of the discretized domain.
    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}
