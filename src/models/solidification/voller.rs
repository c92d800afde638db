//! Voller and Prakash model, "A fixed grid numerical modelling methodology
//! for convection-diffusion mushy region phase-change problems", Int. J.
//! Heat Transfer, 30 (8), 1987. No tracer: only the physical constants
//! describing the solidification process.

use super::{forcing_coefficient, CellState, N_STATES};
use crate::discretization::mesh::Mesh;
use nalgebra::DVector;
use rayon::prelude::*;

/// Physical parameters of the Voller-Prakash liquid-fraction law:
/// `g(T) = 0` below `t_solidus`, `1` above `t_liquidus`, linear in between.
#[derive(Clone, Copy, Debug)]
pub struct VollerParams {
    pub t_solidus: f64,
    pub t_liquidus: f64,
    /// Latent heat between the liquid and solid phases.
    pub latent_heat: f64,
    /// Coefficient of the porous-media-like reaction term in the momentum
    /// equation.
    pub forcing_coef: f64,
}

/// Per-cell outcome of one update pass, evaluated in parallel and applied
/// serially.
struct CellPhase {
    g_l: f64,
    tag: CellState,
    thermal_reaction_coef: f64,
    thermal_source_term: f64,
    forcing_mom: f64,
}

/// One update pass over all cells: liquid fraction, cell state, thermal
/// reaction/source coefficients and momentum forcing. Returns the local
/// per-state cell counts.
#[allow(clippy::too_many_arguments)]
pub(super) fn update_cells(
    params: &VollerParams,
    mesh: &Mesh,
    temp: &DVector<f64>,
    rho: f64,
    dt: f64,
    forcing_eps: f64,
    g_l: &mut DVector<f64>,
    cell_state: &mut [CellState],
    thermal_reaction_coef: &mut DVector<f64>,
    thermal_source_term: &mut DVector<f64>,
    forcing_mom: &mut DVector<f64>,
) -> [u64; N_STATES] {
    // 1/(t_liquidus - t_solidus) = dg/dT on the mushy branch
    let dgldt = 1.0 / (params.t_liquidus - params.t_solidus);
    let inv_forcing_eps = 1.0 / forcing_eps;
    let dgldt_coef = rho * params.latent_heat * dgldt / dt;

    let updates: Vec<CellPhase> = mesh
        .cells
        .par_iter()
        .map(|cell| {
            let t = temp[cell.id];

            if t < params.t_solidus {
                CellPhase {
                    g_l: 0.0,
                    tag: CellState::Solid,
                    thermal_reaction_coef: 0.0,
                    thermal_source_term: 0.0,
                    forcing_mom: params.forcing_coef * inv_forcing_eps,
                }
            } else if t > params.t_liquidus {
                CellPhase {
                    g_l: 1.0,
                    tag: CellState::Liquid,
                    thermal_reaction_coef: 0.0,
                    thermal_source_term: 0.0,
                    forcing_mom: 0.0,
                }
            } else {
                let glc = (t - params.t_solidus) * dgldt;
                CellPhase {
                    g_l: glc,
                    tag: CellState::Mushy,
                    thermal_reaction_coef: dgldt_coef,
                    thermal_source_term: dgldt_coef * t * cell.volume,
                    forcing_mom: forcing_coefficient(params.forcing_coef, glc, forcing_eps),
                }
            }
        })
        .collect();

    let mut counts = [0u64; N_STATES];
    for (c, up) in updates.iter().enumerate() {
        g_l[c] = up.g_l;
        cell_state[c] = up.tag;
        thermal_reaction_coef[c] = up.thermal_reaction_coef;
        thermal_source_term[c] = up.thermal_source_term;
        forcing_mom[c] = up.forcing_mom;
        counts[up.tag as usize] += 1;
    }

    counts
}
