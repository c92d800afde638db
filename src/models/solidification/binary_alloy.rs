//! Binary-alloy solidification model. The transported unknown is the bulk
//! solute concentration of the mixture, `c = gs*c_s + gl*c_l` with
//! `c_s = kp * c_l`; the model tracks the liquid concentration at cells and
//! faces alongside the liquid fraction.

use super::phase_diagram::AlloyPhaseDiagram;
use super::{forcing_coefficient, CellState, N_STATES};
use crate::discretization::mesh::Mesh;
use crate::physics::equations::{AssemblyHook, CellSystemView, Equation};
use crate::physics::field::{shared_array, FieldRef, ScalarField, SharedArray};
use nalgebra::DVector;
use rayon::prelude::*;
use std::sync::Arc;

/// Physical parameters of the binary-alloy model.
#[derive(Clone, Copy, Debug)]
pub struct BinaryAlloyParams {
    /// Solutal dilatation coefficient for the Boussinesq source term.
    pub dilatation_coef: f64,
    /// Reference mixture concentration.
    pub ref_concentration: f64,
    /// Latent heat between the liquid and solid phases.
    pub latent_heat: f64,
    /// Coefficient of the momentum forcing (Darcy) term.
    pub forcing_coef: f64,
    /// Solutal diffusion coefficient in the liquid phase; the published
    /// diffusivity is `rho * diff_coef`.
    pub diff_coef: f64,
    pub diagram: AlloyPhaseDiagram,
}

/// Everything the binary-alloy model owns: its parameters, the solute
/// transport equation, and the liquid-concentration storage at cells and
/// faces.
pub struct BinaryAlloyContext {
    pub params: BinaryAlloyParams,
    pub(super) solute_equation: Equation,
    pub(super) c_l_field: FieldRef,
    pub(super) c_l_faces: SharedArray,
    /// Face temperature values, owned by the thermal system; captured at
    /// initialization.
    pub(super) temp_faces: Option<SharedArray>,
    /// Solutal diffusivity array, present when `diff_coef > 0`.
    pub(super) diff_pty: Option<SharedArray>,
}

impl BinaryAlloyContext {
    pub(super) fn new(
        params: BinaryAlloyParams,
        alloy_name: impl Into<String>,
        varname: impl Into<String>,
    ) -> Self {
        Self {
            params,
            solute_equation: Equation::new(alloy_name, varname),
            c_l_field: ScalarField::new("alloy_liquid_distrib", 0).into_ref(),
            c_l_faces: shared_array(0),
            temp_faces: None,
            diff_pty: None,
        }
    }

    pub fn solute_equation(&self) -> &Equation {
        &self.solute_equation
    }

    pub fn solute_equation_mut(&mut self) -> &mut Equation {
        &mut self.solute_equation
    }

    /// Solute concentration in the liquid phase, at cells.
    pub fn liquid_concentration(&self) -> FieldRef {
        Arc::clone(&self.c_l_field)
    }

    /// Solute concentration in the liquid phase, at faces.
    pub fn liquid_conc_faces(&self) -> SharedArray {
        Arc::clone(&self.c_l_faces)
    }

    pub fn diffusivity(&self) -> Option<SharedArray> {
        self.diff_pty.as_ref().map(Arc::clone)
    }
}

/// How the liquid concentration of a cell is touched by an update.
enum LiquidConc {
    Assign(f64),
    /// Written only on the step of full solidification, i.e. when the cell's
    /// liquid fraction was still positive; kept frozen afterwards.
    FreezeOnce(f64),
}

struct CellPhase {
    g_l: f64,
    tag: CellState,
    c_l: LiquidConc,
    thermal_reaction_coef: f64,
    thermal_source_term: f64,
    forcing_mom: f64,
}

/// One update pass over all cells. Returns the local per-state cell counts.
///
/// The EUTECTIC classification is folded into the MUSHY bucket for both the
/// cell tag and the counts; only the liquid concentration and the thermal
/// source term distinguish it.
#[allow(clippy::too_many_arguments)]
pub(super) fn update_cells(
    params: &BinaryAlloyParams,
    mesh: &Mesh,
    temp: &DVector<f64>,
    conc: &DVector<f64>,
    conc_prev: &DVector<f64>,
    rho: f64,
    dt: f64,
    forcing_eps: f64,
    g_l: &mut DVector<f64>,
    c_l: &mut DVector<f64>,
    cell_state: &mut [CellState],
    thermal_reaction_coef: &mut DVector<f64>,
    thermal_source_term: &mut DVector<f64>,
    forcing_mom: &mut DVector<f64>,
) -> [u64; N_STATES] {
    let d = &params.diagram;
    let rho_l_ovdt = rho * params.latent_heat / dt;
    let inv_kpm1 = 1.0 / (d.kp - 1.0);
    let eut_slope = 1.0 / (d.c_eutec - d.c_eutec_a);
    let inv_forcing_eps = 1.0 / forcing_eps;

    let updates: Vec<CellPhase> = mesh
        .cells
        .par_iter()
        .map(|cell| {
            let t = temp[cell.id];
            let c = conc[cell.id];
            let bounds = d.classify(t, c);

            match bounds.state {
                CellState::Solid => {
                    let frozen = if c >= d.c_eutec_a {
                        d.c_eutec
                    } else {
                        c * d.inv_kp
                    };
                    CellPhase {
                        g_l: 0.0,
                        tag: CellState::Solid,
                        c_l: LiquidConc::FreezeOnce(frozen),
                        thermal_reaction_coef: 0.0,
                        thermal_source_term: 0.0,
                        forcing_mom: params.forcing_coef * inv_forcing_eps,
                    }
                }
                CellState::Mushy => {
                    let c_prev = conc_prev[cell.id];
                    let dtm = t - d.t_melt;
                    let glc = 1.0 + inv_kpm1 * (t - bounds.t_liquidus) / dtm;

                    let dgldt = inv_kpm1 * (bounds.t_liquidus - d.t_melt) / (dtm * dtm);
                    let dgldc = inv_kpm1 * d.ml / dtm;

                    CellPhase {
                        g_l: glc,
                        tag: CellState::Mushy,
                        c_l: LiquidConc::Assign(dtm * d.inv_ml),
                        thermal_reaction_coef: dgldt * rho_l_ovdt,
                        thermal_source_term: cell.volume
                            * (dgldt * t + dgldc * (c_prev - c))
                            * rho_l_ovdt,
                        forcing_mom: forcing_coefficient(params.forcing_coef, glc, forcing_eps),
                    }
                }
                CellState::Liquid => CellPhase {
                    g_l: 1.0,
                    tag: CellState::Liquid,
                    c_l: LiquidConc::Assign(c),
                    thermal_reaction_coef: 0.0,
                    thermal_source_term: 0.0,
                    forcing_mom: 0.0,
                },
                CellState::Eutectic => {
                    let c_prev = conc_prev[cell.id];
                    let glc = (c - d.c_eutec_a) * eut_slope;

                    CellPhase {
                        g_l: glc,
                        tag: CellState::Mushy,
                        c_l: LiquidConc::Assign(d.c_eutec),
                        thermal_reaction_coef: 0.0,
                        thermal_source_term: cell.volume * rho_l_ovdt * eut_slope * (c - c_prev),
                        forcing_mom: forcing_coefficient(params.forcing_coef, glc, forcing_eps),
                    }
                }
            }
        })
        .collect();

    let mut counts = [0u64; N_STATES];
    for (c, up) in updates.iter().enumerate() {
        match up.c_l {
            LiquidConc::Assign(v) => c_l[c] = v,
            LiquidConc::FreezeOnce(v) => {
                if g_l[c] > 0.0 {
                    c_l[c] = v;
                }
            }
        }
        g_l[c] = up.g_l;
        cell_state[c] = up.tag;
        thermal_reaction_coef[c] = up.thermal_reaction_coef;
        thermal_source_term[c] = up.thermal_source_term;
        forcing_mom[c] = up.forcing_mom;
        counts[up.tag as usize] += 1;
    }

    counts
}

/// Recompute the liquid concentration at faces from the face-sampled
/// temperature and bulk concentration, with the same four phase-diagram
/// branches as the cell pass. No coefficients, no state counting.
pub(super) fn update_faces(
    diagram: &AlloyPhaseDiagram,
    temp_faces: &DVector<f64>,
    conc_faces: &DVector<f64>,
    c_l_faces: &mut DVector<f64>,
) {
    c_l_faces
        .as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(f, c_l)| {
            let t = temp_faces[f];
            let c = conc_faces[f];

            *c_l = match diagram.classify(t, c).state {
                CellState::Solid => {
                    if c >= diagram.c_eutec_a {
                        diagram.c_eutec
                    } else {
                        c * diagram.inv_kp
                    }
                }
                CellState::Mushy => (t - diagram.t_melt) * diagram.inv_ml,
                CellState::Liquid => c,
                CellState::Eutectic => diagram.c_eutec,
            };
        });
}

/// Drift correction added to the solute equation's cellwise assembly: the
/// transported unknown is the bulk mixture concentration, but diffusion and
/// advection physically act on the liquid phase only, so both operators are
/// applied to `(bulk - liquid)` and accumulated into the local RHS.
pub(super) fn drift_hook(c_l_field: FieldRef, c_l_faces: SharedArray) -> AssemblyHook {
    Arc::new(move |sys: &mut CellSystemView<'_>| {
        let cells = c_l_field.read();
        let c_l_c = cells.val();
        let faces = c_l_faces.read();

        let n_fc = sys.face_ids.len();
        let mut drift = DVector::zeros(n_fc + 1);
        for (i, &f) in sys.face_ids.iter().enumerate() {
            drift[i] = sys.val_faces[i] - faces[f];
        }
        drift[n_fc] = sys.val_cell - c_l_c[sys.cell_id];

        if let Some(stiffness) = sys.diffusion {
            *sys.rhs += stiffness * &drift;
        }
        *sys.rhs += sys.advection * &drift;
    })
}
