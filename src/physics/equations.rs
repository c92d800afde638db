//! Narrow registration surface of the external equation-solving subsystem.
//!
//! The solidification core never assembles or solves an equation itself; it
//! publishes reaction/diffusion/source terms, point-evaluated source
//! functors, cellwise assembly hooks and cell-selection enforcements into
//! these structures, and the external solver consumes them when building its
//! systems.

use crate::physics::field::{shared_array, FieldRef, ScalarField, SharedArray};
use glam::DVec3;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Point-evaluated vector source published to an equation. Fills three
/// components per queried element: `retval[3*i..3*i+3]` for `elt_ids[i]`.
pub type DofFunction = Arc<dyn Fn(&[usize], &mut [f64]) + Send + Sync>;

/// Cellwise hook invoked by the discretization while building the local
/// system of an equation.
pub type AssemblyHook = Arc<dyn for<'a> Fn(&mut CellSystemView<'a>) + Send + Sync>;

/// Cellwise view of a local system under assembly, handed to
/// [`AssemblyHook`]s. Local degrees of freedom are ordered faces first, then
/// the cell entry.
pub struct CellSystemView<'a> {
    pub cell_id: usize,
    /// Mesh ids of the faces of this cell, in local order.
    pub face_ids: &'a [usize],
    /// Unknown values at the faces of this cell, in local order.
    pub val_faces: &'a [f64],
    /// Unknown value at the cell itself.
    pub val_cell: f64,
    /// Local diffusion (stiffness) matrix, when a diffusion term is present.
    pub diffusion: Option<&'a DMatrix<f64>>,
    /// Local advection matrix.
    pub advection: &'a DMatrix<f64>,
    /// Local right-hand side.
    pub rhs: &'a mut DVector<f64>,
}

/// Hard Dirichlet-style enforcement on a cell selection.
#[derive(Clone, Debug, PartialEq)]
pub struct CellEnforcement {
    pub cell_ids: Vec<usize>,
    pub ref_value: [f64; 3],
}

/// Velocity values at mesh faces (3 components per face), owned by the flow
/// system and shared with whoever advects with it.
#[derive(Clone)]
pub struct AdvectionField {
    face_velocity: SharedArray,
}

impl AdvectionField {
    pub fn new(n_faces: usize) -> Self {
        Self {
            face_velocity: shared_array(3 * n_faces),
        }
    }

    pub fn face_velocity(&self) -> SharedArray {
        Arc::clone(&self.face_velocity)
    }
}

/// Registration surface of one externally-solved transport equation.
///
/// Owns its unknown (cell values with current/previous snapshots plus
/// face-sampled values) and records every term a physics module published
/// into it.
pub struct Equation {
    name: String,
    variable: String,
    field: FieldRef,
    face_values: SharedArray,

    reactions: Vec<(String, SharedArray)>,
    source_arrays: Vec<SharedArray>,
    source_functions: Vec<DofFunction>,
    assembly_hooks: Vec<AssemblyHook>,
    unsteady_coef: Option<f64>,
    advection: Option<AdvectionField>,
    diffusion: Option<(String, SharedArray)>,
    enforcement: Option<CellEnforcement>,
}

impl Equation {
    /// Create an equation with an unallocated unknown; storage is sized later
    /// with [`Equation::resize`], once the mesh is known.
    pub fn new(name: impl Into<String>, variable: impl Into<String>) -> Self {
        let variable = variable.into();
        Self {
            name: name.into(),
            field: ScalarField::new(variable.clone(), 0).into_ref(),
            variable,
            face_values: shared_array(0),
            reactions: Vec::new(),
            source_arrays: Vec::new(),
            source_functions: Vec::new(),
            assembly_hooks: Vec::new(),
            unsteady_coef: None,
            advection: None,
            diffusion: None,
            enforcement: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Size the unknown's cell and face storage.
    pub fn resize(&mut self, n_cells: usize, n_faces: usize) {
        self.field.write().resize(n_cells);
        *self.face_values.write() = DVector::zeros(n_faces);
    }

    pub fn field(&self) -> FieldRef {
        Arc::clone(&self.field)
    }

    pub fn face_values(&self) -> SharedArray {
        Arc::clone(&self.face_values)
    }

    /// Register a cell-indexed reaction coefficient array.
    pub fn add_reaction(&mut self, name: impl Into<String>, coef: SharedArray) {
        self.reactions.push((name.into(), coef));
    }

    /// Register a cell-indexed source-term array.
    pub fn add_source_term_by_array(&mut self, values: SharedArray) {
        self.source_arrays.push(values);
    }

    /// Register a point-evaluated source-term functor.
    pub fn add_source_term_by_dof_func(&mut self, func: DofFunction) {
        self.source_functions.push(func);
    }

    /// Register an unsteady (time-derivative) term with the given coefficient.
    pub fn add_unsteady_term(&mut self, coef: f64) {
        self.unsteady_coef = Some(coef);
    }

    /// Bind an advective term to an externally supplied velocity field.
    pub fn add_advection(&mut self, field: AdvectionField) {
        self.advection = Some(field);
    }

    /// Bind a diffusive term to a cell-indexed diffusivity array.
    pub fn add_diffusion(&mut self, name: impl Into<String>, values: SharedArray) {
        self.diffusion = Some((name.into(), values));
    }

    /// Register a cellwise assembly hook.
    pub fn add_assembly_hook(&mut self, hook: AssemblyHook) {
        self.assembly_hooks.push(hook);
    }

    /// Enforce an exact value of the unknown on a cell selection for the
    /// remainder of the step's solve. Replaces any previous enforcement, so
    /// repeating a registration with an unchanged selection is a no-op.
    pub fn enforce_by_cell_selection(&mut self, cell_ids: Vec<usize>, ref_value: [f64; 3]) {
        self.enforcement = Some(CellEnforcement { cell_ids, ref_value });
    }

    pub fn enforcement(&self) -> Option<&CellEnforcement> {
        self.enforcement.as_ref()
    }

    pub fn reactions(&self) -> &[(String, SharedArray)] {
        &self.reactions
    }

    pub fn source_arrays(&self) -> &[SharedArray] {
        &self.source_arrays
    }

    pub fn source_functions(&self) -> &[DofFunction] {
        &self.source_functions
    }

    pub fn assembly_hooks(&self) -> &[AssemblyHook] {
        &self.assembly_hooks
    }

    pub fn unsteady_coef(&self) -> Option<f64> {
        self.unsteady_coef
    }

    pub fn advection(&self) -> Option<&AdvectionField> {
        self.advection.as_ref()
    }

    pub fn diffusion(&self) -> Option<&(String, SharedArray)> {
        self.diffusion.as_ref()
    }
}

/// Parameters handed to the Boussinesq source-term functors.
#[derive(Clone)]
pub struct BoussinesqParams {
    pub rho0: f64,
    /// Thermal dilatation coefficient.
    pub beta: f64,
    /// Reference value of the driving variable (temperature).
    pub var0: f64,
    pub gravity: DVec3,
    /// Cell values of the driving variable.
    pub var: FieldRef,
}

/// The externally-owned thermal subsystem, reduced to what the
/// solidification module consumes: the temperature field, its face-sampled
/// values, the energy equation's registration surface, and the data needed
/// to build Boussinesq source terms.
pub struct ThermalSystem {
    temperature: FieldRef,
    temp_faces: SharedArray,
    equation: Equation,
    gravity: DVec3,
    rho0: f64,
    beta: f64,
    t_ref: f64,
}

impl ThermalSystem {
    pub fn new(gravity: DVec3, rho0: f64, beta: f64, t_ref: f64) -> Self {
        Self {
            temperature: ScalarField::new("temperature", 0).into_ref(),
            temp_faces: shared_array(0),
            equation: Equation::new("thermal", "temperature"),
            gravity,
            rho0,
            beta,
            t_ref,
        }
    }

    pub fn resize(&mut self, n_cells: usize, n_faces: usize) {
        self.temperature.write().resize(n_cells);
        *self.temp_faces.write() = DVector::zeros(n_faces);
        self.equation.resize(n_cells, n_faces);
    }

    pub fn temperature(&self) -> FieldRef {
        Arc::clone(&self.temperature)
    }

    pub fn temp_faces(&self) -> SharedArray {
        Arc::clone(&self.temp_faces)
    }

    pub fn equation(&self) -> &Equation {
        &self.equation
    }

    pub fn equation_mut(&mut self) -> &mut Equation {
        &mut self.equation
    }

    /// Metadata for a Boussinesq source term driven by the temperature.
    pub fn boussinesq_params(&self) -> BoussinesqParams {
        BoussinesqParams {
            rho0: self.rho0,
            beta: self.beta,
            var0: self.t_ref,
            gravity: self.gravity,
            var: self.temperature(),
        }
    }
}
