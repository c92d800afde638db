use super::mesh::{Cell, Face, Mesh, Node};
use glam::DVec3;
use meshless_voronoi::{Dimensionality, Voronoi};

/// Build the raw Voronoi diagram using the external library.
pub fn build_voronoi(generators: &[DVec3], width: [f64; 3]) -> Voronoi {
    Voronoi::build(
        generators,
        [-width[0] / 2.0, -width[1] / 2.0, -width[2] / 2.0].into(),
        width.into(),
        Dimensionality::ThreeD,
        false,
    )
}

/// Convert a `Voronoi` diagram into the library's [`Mesh`] representation.
pub fn parse_voronoi(voronoi: &Voronoi, generators: &[DVec3]) -> Mesh {
    let mut cells = Vec::new();
    let mut faces = Vec::new();
    let mut nodes = Vec::new();

    for (cell_id, cell) in voronoi.cells().iter().enumerate() {
        cells.push(Cell {
            id: cell_id,
            volume: cell.volume(),
            centroid: cell.centroid().to_array(),
            face_ids: cell.face_indices(voronoi).to_vec(),
        });
    }

    for face in voronoi.faces().iter() {
        faces.push(Face {
            area: face.area(),
            normal: face.normal().to_array(),
            neighbor_cell_ids: (face.left(), face.right()),
            centroid: face.centroid().to_array(),
        });
    }

    for node in generators.iter() {
        nodes.push(Node {
            position: node.to_array(),
        });
    }

    Mesh {
        cells,
        faces,
        nodes,
    }
}

/// Convenience wrapper that builds and immediately parses a Voronoi mesh.
pub fn create_voronoi_mesh(generators: &[DVec3], width: [f64; 3]) -> Mesh {
    let voronoi = build_voronoi(generators, width);
    parse_voronoi(&voronoi, generators)
}

/// Create a box-shaped mesh of `nx` x `ny` control volumes, one cell thick in z.
/// The domain is centered on the origin. Used for cavity-style solidification
/// cases.
pub fn create_box_mesh(nx: usize, ny: usize, width: [f64; 2], thickness: f64) -> Mesh {
    let dx = width[0] / nx as f64;
    let dy = width[1] / ny as f64;

    let mut generators = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let x = (i as f64 + 0.5) * dx - width[0] / 2.0;
            let y = (j as f64 + 0.5) * dy - width[1] / 2.0;
            generators.push(DVec3::new(x, y, 0.0));
        }
    }

    create_voronoi_mesh(&generators, [width[0], width[1], thickness])
}

/// Create a 1D row of cells along the x axis, for profile-style cases.
pub fn create_line_mesh(n: usize, length: f64) -> Mesh {
    let dx = length / n as f64;
    let generators: Vec<DVec3> = (0..n)
        .map(|i| DVec3::new((i as f64 + 0.5) * dx - length / 2.0, 0.0, 0.0))
        .collect();

    create_voronoi_mesh(&generators, [length, dx, dx])
}
