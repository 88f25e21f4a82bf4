use std::fs;

use approx::assert_relative_eq;

use fineflow::modal_analysis::displacement::ModalDisplacement;
use fineflow::modal_analysis::ibpa::IbpaPlan;
use fineflow::parser::fine_turbo::modes::ModeFileParser;
use fineflow::writer::xml_writer::VTUWriter;

const MODE_FILE: &str = "\
FINE/Turbo structure file
 Number of dimensions : 3
 Number of modes : 2
 Number of nodes : 3
 Initial deformation : 0
 Eigenfrequencies
 ----------------
 152.3
 488.1
 Mode shapes
 -----------
 1.0 0.0 0.0    0.0 1.0 0.0    0.0 0.0 1.0
 0.0 1.0 0.0    1.0 0.0 0.0    0.0 0.0 -2.0
 0.0 0.0 1.0    0.0 0.0 3.0    1.0 1.0 0.0
";

#[test]
fn displacement_from_mode_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modes.dat");
    fs::write(&path, MODE_FILE).unwrap();

    let modes = ModeFileParser::parse_file(&path).unwrap();
    let field = ModalDisplacement::compute(&modes, &[0.0005, 0.0004]).unwrap();

    assert_eq!(field.nodes.len(), 3);
    assert_relative_eq!(field.nodes[0].cartesian[1], 0.0005);
    assert_relative_eq!(field.nodes[1].cartesian[2], -0.0008);
    assert_relative_eq!(field.nodes[2].cartesian[0], 0.0004);
    assert_relative_eq!(field.nodes[2].cartesian[1], 0.0004);
    assert_relative_eq!(field.nodes[2].cartesian[2], 0.0015, epsilon = 1e-12);

    let expected = (2.0 * 0.0004f64 * 0.0004 + 0.0015 * 0.0015).sqrt();
    assert_relative_eq!(field.maxima.magnitude, expected, epsilon = 1e-12);
    assert_eq!(field.maxima.magnitude_node, 2);
    assert_relative_eq!(field.maxima.z.unwrap(), 0.0015, epsilon = 1e-12);
    assert_relative_eq!(field.maxima.x, 0.0005);
}

#[test]
fn displacement_vtu_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modes.dat");
    fs::write(&path, MODE_FILE).unwrap();
    let modes = ModeFileParser::parse_file(&path).unwrap();
    let field = ModalDisplacement::compute(&modes, &[1.0]).unwrap();

    let vtu = dir.path().join("displacement.vtu");
    VTUWriter::write_displacement(&modes, &field, &vtu).unwrap();

    let xml = fs::read_to_string(&vtu).unwrap();
    assert!(xml.contains("UnstructuredGrid"));
    assert!(xml.contains("Displacement"));
    assert!(xml.contains("DisplacementMagnitude"));
}

#[test]
fn ibpa_plan_for_four_blades() {
    let plan = IbpaPlan::from_nodal_diameters(3, 4, None).unwrap();
    let radians: Vec<f64> = plan.angles.iter().map(|a| a.radians).collect();
    let expected = [3.0 * std::f64::consts::PI / 2.0, std::f64::consts::PI, std::f64::consts::FRAC_PI_2, std::f64::consts::PI];
    assert_eq!(radians.len(), expected.len());
    for (got, want) in radians.iter().zip(expected) {
        assert_relative_eq!(*got, want, epsilon = 1e-12);
    }
    let degrees: Vec<f64> = plan.angles.iter().map(|a| a.degrees).collect();
    assert_eq!(degrees, vec![270.0, 180.0, 90.0, 180.0]);
}
