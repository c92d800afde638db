//! Equilibrium phase diagram of a binary alloy with components A and B.

use super::CellState;

/// Phase-diagram description of a binary alloy, with the derived constants
/// precomputed at configuration time.
///
/// The liquidus is the line `T = t_melt + ml * C`; below the eutectic
/// composition `c_eutec_a` the solidus is `T = t_melt + ml * C / kp`, beyond
/// it the eutectic plateau `t_eutec` applies.
#[derive(Clone, Copy, Debug)]
pub struct AlloyPhaseDiagram {
    /// Phase-change temperature of the pure material (C = 0).
    pub t_melt: f64,
    /// Eutectic point: temperature and concentration.
    pub t_eutec: f64,
    pub t_eutec_inf: f64,
    pub t_eutec_sup: f64,
    pub c_eutec: f64,
    /// Solid-side partner of the eutectic concentration (`c_eutec * kp`).
    pub c_eutec_a: f64,
    /// Partition (distribution) coefficient and its reciprocal.
    pub kp: f64,
    pub inv_kp: f64,
    /// Liquidus slope and its reciprocal.
    pub ml: f64,
    pub inv_ml: f64,
}

/// Result of one phase-diagram evaluation.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBounds {
    pub t_liquidus: f64,
    pub t_solidus: f64,
    pub state: CellState,
}

impl AlloyPhaseDiagram {
    /// Derive the full diagram from the configured physical parameters.
    /// `eutectic_threshold` is the half-width of the temperature band around
    /// `t_eutec` treated as the eutectic transformation.
    pub fn new(kp: f64, ml: f64, t_eutec: f64, t_melt: f64, eutectic_threshold: f64) -> Self {
        let inv_kp = 1.0 / kp;
        let inv_ml = 1.0 / ml;
        let c_eutec = (t_eutec - t_melt) * inv_ml;
        Self {
            t_melt,
            t_eutec,
            t_eutec_inf: t_eutec - eutectic_threshold,
            t_eutec_sup: t_eutec + eutectic_threshold,
            c_eutec,
            c_eutec_a: c_eutec * kp,
            kp,
            inv_kp,
            ml,
            inv_ml,
        }
    }

    /// Compute the liquidus/solidus temperatures for the given concentration
    /// and classify the `(temp, conc)` point. Pure and total: every finite
    /// input pair maps to exactly one state.
    pub fn classify(&self, temp: f64, conc: f64) -> PhaseBounds {
        let t_liquidus = self.t_melt + self.ml * conc;

        let t_solidus = if conc < self.c_eutec_a {
            self.t_melt + self.ml * conc * self.inv_kp
        } else {
            self.t_eutec
        };

        let state = if conc < self.c_eutec_a {
            if temp > t_liquidus {
                CellState::Liquid
            } else if temp > t_solidus {
                CellState::Mushy
            } else {
                CellState::Solid
            }
        } else if conc <= self.c_eutec {
            if temp > t_liquidus {
                CellState::Liquid
            } else if temp > self.t_eutec_sup {
                CellState::Mushy
            } else if temp > self.t_eutec_inf {
                CellState::Eutectic
            } else {
                CellState::Solid
            }
        } else {
            CellState::Solid
        };

        PhaseBounds {
            t_liquidus,
            t_solidus,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // kp = 1/3, ml = -500, t_eutec = 1000, t_melt = 1150
    // => c_eutec = 0.3, c_eutec_a = 0.1
    fn diagram() -> AlloyPhaseDiagram {
        AlloyPhaseDiagram::new(1.0 / 3.0, -500.0, 1000.0, 1150.0, 1e-4)
    }

    #[test]
    fn derived_constants() {
        let d = diagram();
        assert!((d.c_eutec - 0.3).abs() < 1e-12);
        assert!((d.c_eutec_a - 0.1).abs() < 1e-12);
        assert!((d.t_eutec_sup - 1000.0001).abs() < 1e-12);
        assert!((d.t_eutec_inf - 999.9999).abs() < 1e-12);
    }

    #[test]
    fn dilute_region_splits_on_liquidus_and_solidus() {
        let d = diagram();
        let conc = 0.05;
        let liq = d.t_melt + d.ml * conc; // 1125
        let sol = d.t_melt + d.ml * conc * d.inv_kp; // 1075

        assert_eq!(d.classify(liq + 1.0, conc).state, CellState::Liquid);
        assert_eq!(d.classify(liq, conc).state, CellState::Mushy);
        assert_eq!(d.classify(sol + 1.0, conc).state, CellState::Mushy);
        assert_eq!(d.classify(sol, conc).state, CellState::Solid);
    }

    #[test]
    fn eutectic_band_around_plateau() {
        let d = diagram();
        let conc = 0.2;
        assert_eq!(d.classify(1000.0, conc).state, CellState::Eutectic);
        assert_eq!(d.classify(1000.001, conc).state, CellState::Mushy);
        assert_eq!(d.classify(999.999, conc).state, CellState::Solid);
    }

    #[test]
    fn beyond_eutectic_concentration_is_always_solid() {
        let d = diagram();
        assert_eq!(d.classify(2000.0, 0.4).state, CellState::Solid);
        assert_eq!(d.classify(500.0, 0.4).state, CellState::Solid);
    }

    #[test]
    fn solidus_never_exceeds_liquidus() {
        let d = diagram();
        for i in 0..60 {
            let conc = i as f64 * 0.005;
            for j in 0..40 {
                let temp = 900.0 + j as f64 * 10.0;
                let b = d.classify(temp, conc);
                assert!(b.t_solidus <= b.t_liquidus + 1e-12);
            }
        }
    }
}
