//! Solidification / phase-change module for a finite-volume multiphysics
//! solver.
//!
//! The crate tracks the liquid fraction of every cell through a phase-change
//! model (Voller-Prakash or binary alloy) and feeds the surrounding solver
//! through shared coefficient arrays: a latent-heat reaction/source pair for
//! the thermal equation, a Darcy forcing term plus a Boussinesq buoyancy
//! source for the momentum equation, and a hard zero-velocity enforcement on
//! fully solid cells. Equation assembly and solving stay outside; this crate
//! only registers terms and refreshes their values each time step.

pub mod discretization;
pub mod models;
pub mod physics;
pub mod processing;
