//! Solidification / phase-change module.
//!
//! Tracks the liquid fraction of each cell through a phase-change model
//! (Voller-Prakash or binary alloy), publishes the thermal latent-heat
//! coefficients and the momentum Darcy forcing as shared arrays, enforces
//! zero velocity on fully solid cells, and monitors the solid/mushy/liquid
//! repartition of the domain.

pub mod binary_alloy;
pub mod phase_diagram;
pub mod voller;

pub use binary_alloy::{BinaryAlloyContext, BinaryAlloyParams};
pub use phase_diagram::AlloyPhaseDiagram;
pub use voller::VollerParams;

use crate::discretization::mesh::Mesh;
use crate::physics::buoyancy::{thermal_buoyancy, thermal_solutal_buoyancy};
use crate::physics::equations::{AdvectionField, Equation, ThermalSystem};
use crate::physics::field::{shared_array, FieldRef, ScalarField, SharedArray};
use crate::physics::{ParallelOps, SingleProcess, TimeStep};
use crate::processing::monitoring::MonitoringSnapshot;
use std::sync::Arc;
use thiserror::Error;

/// Number of tracked cell states.
pub const N_STATES: usize = 4;

/// Physical state of a cell with respect to the phase change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Solid = 0,
    Mushy = 1,
    Liquid = 2,
    Eutectic = 3,
}

impl CellState {
    pub fn name(self) -> &'static str {
        match self {
            CellState::Solid => "solid",
            CellState::Mushy => "mushy",
            CellState::Liquid => "liquid",
            CellState::Eutectic => "eutectic",
        }
    }
}

/// Porous-media-like momentum forcing (Carman-Kozeny), regularized near
/// `g = 0` by `forcing_eps`.
pub(crate) fn forcing_coefficient(forcing_coef: f64, g: f64, forcing_eps: f64) -> f64 {
    let one_minus_g = 1.0 - g;
    forcing_coef * one_minus_g * one_minus_g / (g * g * g + forcing_eps)
}

/// Fatal configuration errors. All of them indicate a caller mistake; there
/// is no recovery path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the active model is `{active}`; this setter belongs to `{expected}`")]
    WrongModelVariant {
        active: &'static str,
        expected: &'static str,
    },
    #[error("model `{0}` is activated but its physical parameters were never set")]
    NotConfigured(&'static str),
    #[error("setup has not been finalized; cell/face arrays are unallocated")]
    NotFinalized,
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Which liquid-fraction model drives the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolidificationModel {
    /// Voller-Prakash: liquid fraction linear in temperature between a fixed
    /// solidus and liquidus.
    Voller,
    /// Binary alloy: liquid fraction and liquid concentration driven by the
    /// equilibrium phase diagram, with a transported bulk solute.
    BinaryAlloy,
}

impl SolidificationModel {
    fn name(self) -> &'static str {
        match self {
            SolidificationModel::Voller => "Voller",
            SolidificationModel::BinaryAlloy => "BinaryAlloy",
        }
    }
}

/// Flow model coupled to the phase change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowModel {
    Stokes,
    NavierStokes,
}

/// Which variable the coupled thermal equation solves for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThermalVariable {
    Temperature,
    Enthalpy,
}

/// Model context, bound once at activation. The inner `Option` is filled by
/// the matching parameter setter.
enum ModelContext {
    Voller(Option<VollerParams>),
    BinaryAlloy(Option<Box<BinaryAlloyContext>>),
}

/// Default regularization of the momentum forcing denominator.
const DEFAULT_FORCING_EPS: f64 = 1e-3;
/// Default half-width of the eutectic temperature band.
const DEFAULT_EUTECTIC_THRESHOLD: f64 = 1e-4;

/// The solidification module. Owned explicitly by the caller; one instance
/// per simulation.
pub struct Solidification {
    model_kind: SolidificationModel,
    model: ModelContext,
    flow_model: FlowModel,
    thermal_variable: ThermalVariable,

    /// Mass density, shared by every phase.
    rho: f64,
    forcing_eps: f64,
    eutectic_threshold: f64,

    g_l: FieldRef,
    cell_state: Vec<CellState>,

    /// Published arrays; the `Arc` handles are registered with the thermal
    /// and momentum equations before they are sized.
    thermal_reaction_coef: SharedArray,
    thermal_source_term: SharedArray,
    forcing_mom: SharedArray,

    temperature: Option<FieldRef>,
    advection: Option<AdvectionField>,

    n_g_cells: [u64; N_STATES],
    state_ratio: [f64; N_STATES],

    parallel: Arc<dyn ParallelOps>,
    logging: bool,
    finalized: bool,
}

impl Solidification {
    /// Activate the module with the chosen model selection. Parameters,
    /// setup and initialization follow as separate lifecycle steps.
    pub fn activate(
        model: SolidificationModel,
        flow_model: FlowModel,
        thermal_variable: ThermalVariable,
        rho: f64,
        logging: bool,
    ) -> Result<Self, ConfigError> {
        if !(rho > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "rho",
                reason: format!("mass density must be positive, got {rho}"),
            });
        }

        let context = match model {
            SolidificationModel::Voller => ModelContext::Voller(None),
            SolidificationModel::BinaryAlloy => ModelContext::BinaryAlloy(None),
        };

        Ok(Self {
            model_kind: model,
            model: context,
            flow_model,
            thermal_variable,
            rho,
            forcing_eps: DEFAULT_FORCING_EPS,
            eutectic_threshold: DEFAULT_EUTECTIC_THRESHOLD,
            g_l: ScalarField::new("liquid_fraction", 0).into_ref(),
            cell_state: Vec::new(),
            thermal_reaction_coef: shared_array(0),
            thermal_source_term: shared_array(0),
            forcing_mom: shared_array(0),
            temperature: None,
            advection: None,
            n_g_cells: [0; N_STATES],
            state_ratio: [0.0; N_STATES],
            parallel: Arc::new(SingleProcess),
            logging,
            finalized: false,
        })
    }

    /// Install the cross-process reduction layer. Defaults to
    /// [`SingleProcess`].
    pub fn set_parallel_ops(&mut self, ops: Arc<dyn ParallelOps>) {
        self.parallel = ops;
    }

    pub fn set_forcing_eps(&mut self, forcing_eps: f64) -> Result<(), ConfigError> {
        if !(forcing_eps > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "forcing_eps",
                reason: format!("regularization must be positive, got {forcing_eps}"),
            });
        }
        self.forcing_eps = forcing_eps;
        Ok(())
    }

    /// Half-width of the temperature band around the eutectic temperature
    /// treated as the eutectic transformation. Applies retroactively if the
    /// alloy parameters are already set.
    pub fn set_eutectic_threshold(&mut self, threshold: f64) -> Result<(), ConfigError> {
        if !(threshold >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "eutectic_threshold",
                reason: format!("threshold must be non-negative, got {threshold}"),
            });
        }
        self.eutectic_threshold = threshold;
        if let ModelContext::BinaryAlloy(Some(ctx)) = &mut self.model {
            let d = &mut ctx.params.diagram;
            d.t_eutec_inf = d.t_eutec - threshold;
            d.t_eutec_sup = d.t_eutec + threshold;
        }
        Ok(())
    }

    /// Set the physical parameters of the Voller-Prakash model.
    pub fn set_voller_model(
        &mut self,
        t_solidus: f64,
        t_liquidus: f64,
        latent_heat: f64,
        forcing_coef: f64,
    ) -> Result<(), ConfigError> {
        let slot = match &mut self.model {
            ModelContext::Voller(slot) => slot,
            ModelContext::BinaryAlloy(_) => {
                return Err(ConfigError::WrongModelVariant {
                    active: "BinaryAlloy",
                    expected: "Voller",
                })
            }
        };
        if !(t_solidus < t_liquidus) {
            return Err(ConfigError::InvalidParameter {
                name: "t_solidus",
                reason: format!("solidus {t_solidus} must lie below liquidus {t_liquidus}"),
            });
        }
        *slot = Some(VollerParams {
            t_solidus,
            t_liquidus,
            latent_heat,
            forcing_coef,
        });
        Ok(())
    }

    /// Set the physical parameters of the binary-alloy model and create its
    /// solute transport equation.
    #[allow(clippy::too_many_arguments)]
    pub fn set_binary_alloy_model(
        &mut self,
        name: &str,
        varname: &str,
        kp: f64,
        ml: f64,
        t_eutec: f64,
        t_melt: f64,
        diff_coef: f64,
        latent_heat: f64,
        forcing_coef: f64,
        dilatation_coef: f64,
        ref_concentration: f64,
    ) -> Result<(), ConfigError> {
        let eutectic_threshold = self.eutectic_threshold;
        let slot = match &mut self.model {
            ModelContext::BinaryAlloy(slot) => slot,
            ModelContext::Voller(_) => {
                return Err(ConfigError::WrongModelVariant {
                    active: "Voller",
                    expected: "BinaryAlloy",
                })
            }
        };
        if !(ml < 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "ml",
                reason: format!("liquidus slope must be negative, got {ml}"),
            });
        }
        if !(kp > 0.0 && kp < 1.0) {
            return Err(ConfigError::InvalidParameter {
                name: "kp",
                reason: format!("partition coefficient must lie in (0, 1), got {kp}"),
            });
        }

        let params = BinaryAlloyParams {
            dilatation_coef,
            ref_concentration,
            latent_heat,
            forcing_coef,
            diff_coef,
            diagram: AlloyPhaseDiagram::new(kp, ml, t_eutec, t_melt, eutectic_threshold),
        };
        *slot = Some(Box::new(BinaryAlloyContext::new(params, name, varname)));
        Ok(())
    }

    /// First setup step: register the terms whose arrays can still be empty.
    /// The momentum equation receives the Darcy forcing as a reaction term;
    /// the solute equation (alloy) receives its unsteady and diffusion terms.
    pub fn init_setup(&mut self, momentum: &mut Equation) -> Result<(), ConfigError> {
        self.require_configured()?;

        momentum.add_reaction("solidification_forcing", Arc::clone(&self.forcing_mom));

        if let ModelContext::BinaryAlloy(Some(ctx)) = &mut self.model {
            let rho = self.rho;
            ctx.solute_equation.add_unsteady_term(rho);
            if ctx.params.diff_coef > 0.0 {
                let diff = shared_array(0);
                ctx.diff_pty = Some(Arc::clone(&diff));
                ctx.solute_equation
                    .add_diffusion("solute_diffusivity", diff);
            }
        }
        Ok(())
    }

    /// Last setup step: size every cell/face array, register the thermal
    /// latent-heat terms and the Boussinesq source term, and set the
    /// all-liquid initial state.
    pub fn finalize_setup(
        &mut self,
        mesh: &Mesh,
        momentum: &mut Equation,
        thermal: &mut ThermalSystem,
        advection: &AdvectionField,
    ) -> Result<(), ConfigError> {
        self.require_configured()?;

        let n_cells = mesh.n_cells();
        let n_faces = mesh.n_faces();

        {
            let mut g_l = self.g_l.write();
            g_l.resize(n_cells);
            g_l.set_values(1.0);
        }
        self.cell_state = vec![CellState::Liquid; n_cells];
        self.thermal_reaction_coef.write().resize_vertically_mut(n_cells, 0.0);
        self.thermal_source_term.write().resize_vertically_mut(n_cells, 0.0);
        self.forcing_mom.write().resize_vertically_mut(n_cells, 0.0);

        // The latent-heat release enters the thermal equation as a reaction
        // coefficient plus an explicit source, both refreshed every step.
        let th_eq = thermal.equation_mut();
        th_eq.add_reaction("latent_heat", Arc::clone(&self.thermal_reaction_coef));
        th_eq.add_source_term_by_array(Arc::clone(&self.thermal_source_term));

        let bq = thermal.boussinesq_params();
        match &mut self.model {
            ModelContext::Voller(Some(_)) => {
                momentum.add_source_term_by_dof_func(thermal_buoyancy(bq));
            }
            ModelContext::BinaryAlloy(Some(ctx)) => {
                // The solutal contribution uses the liquid concentration.
                momentum.add_source_term_by_dof_func(thermal_solutal_buoyancy(
                    bq,
                    ctx.liquid_concentration(),
                    ctx.params.dilatation_coef,
                    ctx.params.ref_concentration,
                ));

                ctx.solute_equation.resize(n_cells, n_faces);
                {
                    let mut c_l = ctx.c_l_field.write();
                    c_l.resize(n_cells);
                    c_l.set_values(ctx.params.ref_concentration);
                }
                *ctx.c_l_faces.write() =
                    nalgebra::DVector::from_element(n_faces, ctx.params.ref_concentration);
                ctx.solute_equation.add_advection(advection.clone());

                if let Some(diff) = &ctx.diff_pty {
                    *diff.write() = nalgebra::DVector::from_element(
                        n_cells,
                        self.rho * ctx.params.diff_coef,
                    );
                }
            }
            _ => unreachable!("checked by require_configured"),
        }

        self.temperature = Some(thermal.temperature());
        if let ModelContext::BinaryAlloy(Some(ctx)) = &mut self.model {
            ctx.temp_faces = Some(thermal.temp_faces());
        }
        self.advection = Some(advection.clone());
        self.finalized = true;

        self.n_g_cells = [0; N_STATES];
        self.n_g_cells[CellState::Liquid as usize] = n_cells as u64;
        self.parallel.sum_counts(&mut self.n_g_cells);
        Ok(())
    }

    /// Initial update pass: register the species drift correction (alloy)
    /// and evaluate every coefficient from the initial temperature and
    /// concentration. No snapshot rotation.
    pub fn initialize(
        &mut self,
        mesh: &Mesh,
        ts: &TimeStep,
        momentum: &mut Equation,
    ) -> Result<(), ConfigError> {
        if !self.finalized {
            return Err(ConfigError::NotFinalized);
        }

        if let ModelContext::BinaryAlloy(Some(ctx)) = &mut self.model {
            ctx.solute_equation.add_assembly_hook(binary_alloy::drift_hook(
                ctx.liquid_concentration(),
                ctx.liquid_conc_faces(),
            ));
        }

        self.update(mesh, ts, momentum)?;
        self.do_monitoring(mesh, ts);
        Ok(())
    }

    /// Per-step update: rotate the field snapshots, run the model update
    /// pass, refresh the monitoring figures.
    pub fn compute(
        &mut self,
        mesh: &Mesh,
        ts: &TimeStep,
        momentum: &mut Equation,
    ) -> Result<(), ConfigError> {
        if !self.finalized {
            return Err(ConfigError::NotFinalized);
        }

        self.g_l.write().current_to_previous();
        if let ModelContext::BinaryAlloy(Some(ctx)) = &self.model {
            ctx.c_l_field.write().current_to_previous();
        }
        self.update(mesh, ts, momentum)?;
        self.do_monitoring(mesh, ts);
        Ok(())
    }

    /// Model dispatch for one update pass, followed by the solid-cell
    /// enforcement and the global count reduction.
    fn update(
        &mut self,
        mesh: &Mesh,
        ts: &TimeStep,
        momentum: &mut Equation,
    ) -> Result<(), ConfigError> {
        let temperature = self
            .temperature
            .as_ref()
            .ok_or(ConfigError::NotFinalized)?
            .clone();
        let temp = temperature.read();

        let mut g_l = self.g_l.write();
        let mut rc = self.thermal_reaction_coef.write();
        let mut st = self.thermal_source_term.write();
        let mut fm = self.forcing_mom.write();

        let mut counts = match &self.model {
            ModelContext::Voller(Some(params)) => voller::update_cells(
                params,
                mesh,
                temp.val(),
                self.rho,
                ts.dt,
                self.forcing_eps,
                g_l.val_mut(),
                &mut self.cell_state,
                &mut rc,
                &mut st,
                &mut fm,
            ),
            ModelContext::BinaryAlloy(Some(ctx)) => {
                let conc_field = ctx.solute_equation.field();
                let conc = conc_field.read();
                let mut c_l = ctx.c_l_field.write();

                binary_alloy::update_cells(
                    &ctx.params,
                    mesh,
                    temp.val(),
                    conc.val(),
                    conc.val_prev(),
                    self.rho,
                    ts.dt,
                    self.forcing_eps,
                    g_l.val_mut(),
                    c_l.val_mut(),
                    &mut self.cell_state,
                    &mut rc,
                    &mut st,
                    &mut fm,
                )
            }
            ModelContext::Voller(None) => {
                return Err(ConfigError::NotConfigured("Voller"));
            }
            ModelContext::BinaryAlloy(None) => {
                return Err(ConfigError::NotConfigured("BinaryAlloy"));
            }
        };
        drop((temp, g_l, rc, st, fm));

        if counts[CellState::Solid as usize] > 0 {
            self.enforce_solid_cells(mesh, momentum, counts[CellState::Solid as usize]);
        }

        self.parallel.sum_counts(&mut counts);
        self.n_g_cells = counts;

        // Alloy face pass: liquid concentration at faces, from the
        // face-sampled temperature and bulk concentration.
        if let ModelContext::BinaryAlloy(Some(ctx)) = &self.model {
            let temp_faces = ctx.temp_faces.as_ref().ok_or(ConfigError::NotFinalized)?;
            let temp_f = temp_faces.read();
            let conc_f = ctx.solute_equation.face_values();
            let conc_f = conc_f.read();
            let mut c_l_f = ctx.c_l_faces.write();
            binary_alloy::update_faces(&ctx.params.diagram, &temp_f, &conc_f, &mut c_l_f);
        }

        Ok(())
    }

    /// Zero the three velocity components on every face of each fully solid
    /// cell, then register a hard zero-velocity enforcement on that cell
    /// selection with the momentum equation. Re-registration replaces the
    /// previous selection, so repeating the call is harmless.
    fn enforce_solid_cells(&mut self, mesh: &Mesh, momentum: &mut Equation, n_solid: u64) {
        let advection = self
            .advection
            .as_ref()
            .expect("enforcement runs after finalize_setup");
        let velocity = advection.face_velocity();
        let mut vel = velocity.write();

        let mut solid_cells = Vec::with_capacity(n_solid as usize);
        for cell in &mesh.cells {
            if self.cell_state[cell.id] == CellState::Solid {
                solid_cells.push(cell.id);
                for &f in &cell.face_ids {
                    vel[3 * f] = 0.0;
                    vel[3 * f + 1] = 0.0;
                    vel[3 * f + 2] = 0.0;
                }
            }
        }
        assert_eq!(
            solid_cells.len() as u64,
            n_solid,
            "solid-cell tags diverged from the update-pass count"
        );

        momentum.enforce_by_cell_selection(solid_cells, [0.0; 3]);
    }

    /// Refresh the volume ratio occupied by each state and print the
    /// monitoring report when logging is on.
    fn do_monitoring(&mut self, mesh: &Mesh, ts: &TimeStep) {
        let mut ratio = [0.0_f64; N_STATES];
        for cell in &mesh.cells {
            ratio[self.cell_state[cell.id] as usize] += cell.volume;
        }
        self.parallel.sum_volumes(&mut ratio);

        let inv_vol = 1.0 / mesh.total_volume();
        for r in &mut ratio {
            *r *= inv_vol;
        }
        self.state_ratio = ratio;

        if self.logging {
            self.monitoring(ts.t_cur).print_to_console();
        }
    }

    /// Current monitoring figures as a formatted snapshot.
    pub fn monitoring(&self, t_cur: f64) -> MonitoringSnapshot {
        MonitoringSnapshot {
            t_cur,
            state_ratio: self.state_ratio,
            n_g_cells: self.n_g_cells,
            with_eutectic: self.model_kind == SolidificationModel::BinaryAlloy,
        }
    }

    /// Print a setup summary of the active model and its parameters.
    pub fn log_setup(&self) {
        println!("## Solidification module");
        println!("  * Model: {}", self.model_kind.name());
        println!("  * Flow model: {:?}", self.flow_model);
        println!("  * Thermal variable: {:?}", self.thermal_variable);
        println!("  * Mass density: {:.6e}", self.rho);
        println!("  * Forcing regularization: {:.6e}", self.forcing_eps);
        match &self.model {
            ModelContext::Voller(Some(p)) => {
                println!("  * Solidus temperature:  {:.6e}", p.t_solidus);
                println!("  * Liquidus temperature: {:.6e}", p.t_liquidus);
                println!("  * Latent heat:          {:.6e}", p.latent_heat);
                println!("  * Forcing coefficient:  {:.6e}", p.forcing_coef);
            }
            ModelContext::BinaryAlloy(Some(ctx)) => {
                let p = &ctx.params;
                let d = &p.diagram;
                println!("  * Alloy equation: {}", ctx.solute_equation.name());
                println!("  * kp: {:.6e}  ml: {:.6e}", d.kp, d.ml);
                println!(
                    "  * T_melt: {:.6e}  T_eutec: {:.6e} (band +/- {:.3e})",
                    d.t_melt, d.t_eutec, self.eutectic_threshold
                );
                println!(
                    "  * C_eutec: {:.6e}  C_eutec_a: {:.6e}",
                    d.c_eutec, d.c_eutec_a
                );
                println!("  * Latent heat:          {:.6e}", p.latent_heat);
                println!("  * Forcing coefficient:  {:.6e}", p.forcing_coef);
                println!("  * Solutal diffusivity:  {:.6e}", p.diff_coef);
            }
            _ => println!("  * Physical parameters: not set"),
        }
    }

    pub fn model(&self) -> SolidificationModel {
        self.model_kind
    }

    pub fn flow_model(&self) -> FlowModel {
        self.flow_model
    }

    pub fn thermal_variable(&self) -> ThermalVariable {
        self.thermal_variable
    }

    pub fn liquid_fraction(&self) -> FieldRef {
        Arc::clone(&self.g_l)
    }

    pub fn cell_states(&self) -> &[CellState] {
        &self.cell_state
    }

    /// Integer tag per cell, for visualization export.
    pub fn cell_state_tags(&self) -> Vec<u32> {
        self.cell_state.iter().map(|&s| s as u32).collect()
    }

    pub fn state_ratio(&self, state: CellState) -> f64 {
        self.state_ratio[state as usize]
    }

    pub fn n_g_cells(&self, state: CellState) -> u64 {
        self.n_g_cells[state as usize]
    }

    pub fn forcing_term(&self) -> SharedArray {
        Arc::clone(&self.forcing_mom)
    }

    pub fn thermal_reaction(&self) -> SharedArray {
        Arc::clone(&self.thermal_reaction_coef)
    }

    pub fn thermal_source(&self) -> SharedArray {
        Arc::clone(&self.thermal_source_term)
    }

    pub fn binary_alloy(&self) -> Option<&BinaryAlloyContext> {
        match &self.model {
            ModelContext::BinaryAlloy(Some(ctx)) => Some(ctx),
            _ => None,
        }
    }

    pub fn binary_alloy_mut(&mut self) -> Option<&mut BinaryAlloyContext> {
        match &mut self.model {
            ModelContext::BinaryAlloy(Some(ctx)) => Some(ctx),
            _ => None,
        }
    }

    fn require_configured(&self) -> Result<(), ConfigError> {
        match &self.model {
            ModelContext::Voller(None) => Err(ConfigError::NotConfigured("Voller")),
            ModelContext::BinaryAlloy(None) => Err(ConfigError::NotConfigured("BinaryAlloy")),
            _ => Ok(()),
        }
    }
}
