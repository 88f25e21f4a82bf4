use std::fs;
use std::path::Path;

use tracing::info;
use vtkio::model::*; // import model definition of a VTK file

use crate::error::WriterError;
use crate::structs_and_impls::*;


pub struct VTUWriter;  // Writes structural nodes and their modal displacement to VTK XML (.vtu)

impl VTUWriter {

    pub fn write_displacement(
        modes: &ModeShapeData,
        field: &DisplacementField,
        output_path: &Path,
    ) -> Result<(), WriterError> {

        let vtu = Self::displacement_vtu(modes, field)?;

        fs::write(output_path, &vtu)?;
        info!("displacement field written to {}", output_path.display());

        Ok(())
    }

    pub fn displacement_vtu(
        modes: &ModeShapeData,
        field: &DisplacementField,
    ) -> Result<Vec<u8>, WriterError> {

        let num_nodes = modes.coordinates.len();
        if field.nodes.len() != num_nodes {
            return Err(WriterError::InvalidData(format!(
                "{} displacement values for {} nodes",
                field.nodes.len(),
                num_nodes
            )));
        }

        // 1. Points, padded to 3D
        let points_data: Vec<f64> = modes
            .coordinates
            .iter()
            .flat_map(|c| [c[0], c[1], c.get(2).copied().unwrap_or(0.0)])
            .collect();

        // 2. One vertex cell per node, there is no element connectivity in a mode file
        let connectivity: Vec<u64> = (0..num_nodes as u64).collect();
        let offsets: Vec<u64> = (1..=num_nodes as u64).collect();
        let cell_types = vec![CellType::Vertex; num_nodes];

        // 3. Point data
        let displacement: Vec<f64> = field.nodes.iter().flat_map(|n| n.cartesian).collect();
        let magnitude: Vec<f64> = field.nodes.iter().map(|n| n.magnitude).collect();
        let radial: Vec<f64> = field.nodes.iter().map(|n| n.radial).collect();

        let point_attributes = vec![
            Attribute::vectors("Displacement").with_data(IOBuffer::F64(displacement)),
            Attribute::scalars("DisplacementMagnitude", 1).with_data(IOBuffer::F64(magnitude)),
            Attribute::scalars("RadialDisplacement", 1).with_data(IOBuffer::F64(radial)),
        ];

        let mut vtu = Vec::new();
        Vtk {
            version: Version { major: 2, minor: 2 },
            title: String::new(),
            byte_order: ByteOrder::LittleEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(points_data),
                cells: Cells {
                    cell_verts: VertexNumbers::XML {
                        connectivity,
                        offsets,
                    },
                    types: cell_types,
                },
                data: Attributes {
                    point: point_attributes,
                    cell: Vec::new(),
                },
            }),
        }.write_xml(&mut vtu)?;

        Ok(vtu)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn single_node() -> (ModeShapeData, DisplacementField) {
        let modes = ModeShapeData {
            header: ModeFileHeader { dimension: 2, num_modes: 1, num_nodes: 1, initial_deformation: false },
            eigenfrequencies: vec![50.0],
            coordinates: vec![vec![0.5, 1.5]],
            mode_shapes: vec![vec![1.0, 0.0]],
        };
        let node = NodeDisplacement { cartesian: [1.0, 0.0, 0.0], radial: 1.0, theta: 0.0, magnitude: 1.0 };
        let field = DisplacementField {
            dimension: 2,
            nodes: vec![node],
            maxima: DisplacementMaxima { x: 1.0, y: 0.0, z: None, radial: 1.0, theta: 0.0, magnitude: 1.0, magnitude_node: 0 },
        };
        (modes, field)
    }

    #[test]
    fn test_vertex_cells_with_point_data() {
        let (modes, field) = single_node();
        let xml = String::from_utf8(VTUWriter::displacement_vtu(&modes, &field).unwrap()).unwrap();
        assert!(xml.contains("RadialDisplacement"));
        assert!(xml.contains("NumberOfPoints=\"1\""));
    }

    #[test]
    fn test_node_count_mismatch() {
        let (modes, mut field) = single_node();
        field.nodes.clear();
        assert!(matches!(VTUWriter::displacement_vtu(&modes, &field), Err(WriterError::InvalidData(_))));
    }
}
