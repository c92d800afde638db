pub mod buoyancy;
pub mod equations;
pub mod field;

/// Fixed time-step description shared with the external solver loop.
#[derive(Clone, Copy, Debug)]
pub struct TimeStep {
    pub t_cur: f64,
    pub dt: f64,
}

/// Cross-process reduction primitives consumed by the solidification module.
///
/// The only collective operation this crate needs is the sum of a fixed-size
/// vector of per-state counts/ratios. On a distributed mesh each process owns
/// a disjoint cell subset and implements these with its communication layer.
pub trait ParallelOps: Send + Sync {
    /// Sum a per-state cell-count vector across all processes, in place.
    fn sum_counts(&self, counts: &mut [u64; 4]);

    /// Sum a per-state volume vector across all processes, in place.
    ///
    /// The monitoring pass divides the summed volumes by the local mesh
    /// total. A distributed implementation must also make that divisor
    /// global, or the reported ratios only hold per process.
    fn sum_volumes(&self, volumes: &mut [f64; 4]);
}

/// Single-process implementation: every reduction is the identity.
pub struct SingleProcess;

impl ParallelOps for SingleProcess {
    fn sum_counts(&self, _counts: &mut [u64; 4]) {}

    fn sum_volumes(&self, _volumes: &mut [f64; 4]) {}
}
