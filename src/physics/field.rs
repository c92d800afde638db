use nalgebra::DVector;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to a [`ScalarField`], cloned between the owning subsystem
/// and every consumer that registered it.
pub type FieldRef = Arc<RwLock<ScalarField>>;

/// Shared handle to a plain value array published to an equation
/// (reaction coefficients, source terms, diffusivities, face values).
pub type SharedArray = Arc<RwLock<DVector<f64>>>;

pub fn shared_array(len: usize) -> SharedArray {
    Arc::new(RwLock::new(DVector::zeros(len)))
}

/// A named, cell-indexed scalar field with current/previous snapshot
/// semantics. The previous snapshot is rotated explicitly, once per time
/// step, by whoever drives the field.
pub struct ScalarField {
    name: String,
    val: DVector<f64>,
    val_prev: DVector<f64>,
}

impl ScalarField {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            val: DVector::zeros(len),
            val_prev: DVector::zeros(len),
        }
    }

    pub fn into_ref(self) -> FieldRef {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.val.len()
    }

    pub fn is_empty(&self) -> bool {
        self.val.len() == 0
    }

    /// Resize both snapshots, zero-filled. Allocation happens once the mesh
    /// sizes are known, which may be after the field handle was shared.
    pub fn resize(&mut self, len: usize) {
        self.val = DVector::zeros(len);
        self.val_prev = DVector::zeros(len);
    }

    /// Fill both snapshots with a uniform value.
    pub fn set_values(&mut self, value: f64) {
        self.val.fill(value);
        self.val_prev.fill(value);
    }

    /// Snapshot rotate: the current values become the previous ones.
    pub fn current_to_previous(&mut self) {
        self.val_prev.copy_from(&self.val);
    }

    pub fn val(&self) -> &DVector<f64> {
        &self.val
    }

    pub fn val_mut(&mut self) -> &mut DVector<f64> {
        &mut self.val
    }

    pub fn val_prev(&self) -> &DVector<f64> {
        &self.val_prev
    }
}
