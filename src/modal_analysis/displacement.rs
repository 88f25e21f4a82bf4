use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::*;
use crate::structs_and_impls::*;


pub struct ModalDisplacement;  // Physical displacement from mode shapes and generalized displacements

impl ModalDisplacement {
    /// One weight per mode. Missing trailing weights are taken as zero.
    pub fn pad_generalized(generalized: &[f64], num_modes: usize) -> Result<Vec<f64>> {
        if generalized.len() > num_modes {
            return Err(Error::Validation(format!(
                "{} generalized displacements given for {} modes",
                generalized.len(),
                num_modes
            )));
        }
        if generalized.len() < num_modes {
            warn!(
                "{} generalized displacements for {} modes, the remaining ones are set to zero",
                generalized.len(),
                num_modes
            );
        }
        let mut weights = generalized.to_vec();
        weights.resize(num_modes, 0.0);
        Ok(weights)
    }

    /// `d = sum_m g_m * phi_m` at every node, with its cylindrical form and magnitude.
    pub fn compute(modes: &ModeShapeData, generalized: &[f64]) -> Result<DisplacementField> {
        let dim = modes.header.dimension;
        let weights = Self::pad_generalized(generalized, modes.header.num_modes)?;

        if modes.mode_shapes.is_empty() {
            return Err(Error::Validation("mode file has no nodes".to_string()));
        }

        let nodes: Vec<NodeDisplacement> = (0..modes.mode_shapes.len())
            .into_par_iter()
            .map(|node| {
                let mut d = [0.0f64; 3];
                for (mode, g) in weights.iter().enumerate() {
                    for (k, phi) in modes.mode_at(node, mode).iter().enumerate() {
                        d[k] += g * phi;
                    }
                }
                let radial = d[0].hypot(d[1]);
                NodeDisplacement {
                    cartesian: d,
                    radial,
                    theta: d[1].atan2(d[0]),
                    magnitude: (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt(),
                }
            })
            .collect();

        let max_of = |f: fn(&NodeDisplacement) -> f64| nodes.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        let (magnitude_node, magnitude) = nodes
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, n)| if n.magnitude > best.1 { (i, n.magnitude) } else { best });

        let maxima = DisplacementMaxima {
            x: max_of(|n| n.cartesian[0]),
            y: max_of(|n| n.cartesian[1]),
            z: if dim == 3 { Some(max_of(|n| n.cartesian[2])) } else { None },
            radial: max_of(|n| n.radial),
            theta: max_of(|n| n.theta),
            magnitude,
            magnitude_node,
        };
        info!("maximum displacement magnitude {:e} at node {}", maxima.magnitude, maxima.magnitude_node);

        Ok(DisplacementField { dimension: dim, nodes, maxima })
    }
}
