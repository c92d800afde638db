//! Boussinesq source-term functors for the momentum equation.
//!
//! Both functors are invoked by the momentum equation at quadrature points
//! (here: cell centers) and fill one reaction force vector per queried
//! element.

use crate::physics::equations::{BoussinesqParams, DofFunction};
use crate::physics::field::FieldRef;
use std::sync::Arc;

/// Buoyancy driven by the temperature only:
/// `f = rho0 * (-beta * (T - T_ref)) * g`.
pub fn thermal_buoyancy(bq: BoussinesqParams) -> DofFunction {
    Arc::new(move |elt_ids: &[usize], retval: &mut [f64]| {
        let var = bq.var.read();
        let temp = var.val();

        for (i, &id) in elt_ids.iter().enumerate() {
            let coef = bq.rho0 * (-bq.beta * (temp[id] - bq.var0));
            let r = &mut retval[3 * i..3 * i + 3];
            r[0] = coef * bq.gravity.x;
            r[1] = coef * bq.gravity.y;
            r[2] = coef * bq.gravity.z;
        }
    })
}

/// Buoyancy driven by temperature and solute concentration:
/// `f = rho0 * (-beta_t*(T - T_ref) - beta_c*(c_l - C_ref)) * g`.
///
/// The concentration effect uses the *liquid* concentration field, not the
/// transported bulk one.
pub fn thermal_solutal_buoyancy(
    bq: BoussinesqParams,
    liquid_conc: FieldRef,
    dilatation_coef: f64,
    ref_concentration: f64,
) -> DofFunction {
    Arc::new(move |elt_ids: &[usize], retval: &mut [f64]| {
        let var = bq.var.read();
        let temp = var.val();
        let conc = liquid_conc.read();
        let c_l = conc.val();

        for (i, &id) in elt_ids.iter().enumerate() {
            let mut coef = -bq.beta * (temp[id] - bq.var0);
            coef += -dilatation_coef * (c_l[id] - ref_concentration);
            coef *= bq.rho0;

            let r = &mut retval[3 * i..3 * i + 3];
            r[0] = coef * bq.gravity.x;
            r[1] = coef * bq.gravity.y;
            r[2] = coef * bq.gravity.z;
        }
    })
}
