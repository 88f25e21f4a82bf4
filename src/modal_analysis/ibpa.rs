use std::f64::consts::PI;

use tracing::warn;

use crate::error::*;
use crate::structs_and_impls::IbpaAngle;


/// Interblade phase angles for a forced-response sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct IbpaPlan {
    pub nodal_diameters: u32,
    pub blades: u32,
    pub angles: Vec<IbpaAngle>,             // backward waves first, then forward waves
}

impl IbpaPlan {
    /// Angles for nodal diameters `1..nodal_diameters` on a row of `blades` blades.
    /// With a computation name, each angle gets `<computation>_IBPA_<degrees>`.
    pub fn from_nodal_diameters(nodal_diameters: u32, blades: u32, computation: Option<&str>) -> Result<IbpaPlan> {
        if blades == 0 {
            return Err(Error::Validation("number of blades must be positive".to_string()));
        }
        if nodal_diameters > blades / 2 + 1 {
            warn!(
                "{} nodal diameters on {} blades repeat phase angles",
                nodal_diameters, blades
            );
        }

        let n_blades = f64::from(blades);
        let forward = (1..nodal_diameters).map(|n| 2.0 * PI * f64::from(n) / n_blades);
        let backward = (1..nodal_diameters).map(|n| 2.0 * PI * (n_blades - f64::from(n)) / n_blades);

        let angles = backward
            .chain(forward)
            .map(|radians| {
                let degrees = radians.to_degrees().round();
                IbpaAngle {
                    radians,
                    degrees,
                    computation_name: computation.map(|c| format!("{}_IBPA_{}", c, degrees as i64)),
                }
            })
            .collect();

        Ok(IbpaPlan { nodal_diameters, blades, angles })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn backward_then_forward_waves() {
        let plan = IbpaPlan::from_nodal_diameters(3, 4, Some("FSI")).unwrap();
        let expected = [3.0 * PI / 2.0, PI, PI / 2.0, PI];
        assert_eq!(plan.angles.len(), 4);
        for (angle, want) in plan.angles.iter().zip(expected) {
            assert_relative_eq!(angle.radians, want, epsilon = 1e-12);
        }
        let names: Vec<_> = plan.angles.iter().filter_map(|a| a.computation_name.clone()).collect();
        assert_eq!(names, vec!["FSI_IBPA_270", "FSI_IBPA_180", "FSI_IBPA_90", "FSI_IBPA_180"]);
    }

    #[test]
    fn single_nodal_diameter_is_empty() {
        assert!(IbpaPlan::from_nodal_diameters(1, 30, None).unwrap().angles.is_empty());
    }

    #[test]
    fn zero_blades_is_rejected() {
        assert!(IbpaPlan::from_nodal_diameters(3, 0, None).is_err());
    }
}
