use glam::DVec3;
use nalgebra::{DMatrix, DVector};

use solidfvm::discretization::generator::create_line_mesh;
use solidfvm::discretization::mesh::Mesh;
use solidfvm::models::solidification::{
    AlloyPhaseDiagram, CellState, FlowModel, Solidification, SolidificationModel, ThermalVariable,
};
use solidfvm::physics::equations::{AdvectionField, CellSystemView, Equation, ThermalSystem};
use solidfvm::physics::TimeStep;

const RHO: f64 = 7000.0;
// kp = 1/3, ml = -500, T_eutec = 1000, T_melt = 1150
// => C_eutec = 0.3, C_eutec_a = 0.1
const KP: f64 = 1.0 / 3.0;
const ML: f64 = -500.0;
const T_EUTEC: f64 = 1000.0;
const T_MELT: f64 = 1150.0;

struct Harness {
    mesh: Mesh,
    solid: Solidification,
    momentum: Equation,
    thermal: ThermalSystem,
}

fn setup(mesh: Mesh, diff_coef: f64, conc0: f64) -> Harness {
    let mut thermal = ThermalSystem::new(DVec3::new(0.0, -9.81, 0.0), RHO, 2.0e-4, T_MELT);
    thermal.resize(mesh.n_cells(), mesh.n_faces());
    let mut momentum = Equation::new("momentum", "velocity");
    momentum.resize(mesh.n_cells(), mesh.n_faces());
    let advection = AdvectionField::new(mesh.n_faces());

    let mut solid = Solidification::activate(
        SolidificationModel::BinaryAlloy,
        FlowModel::NavierStokes,
        ThermalVariable::Temperature,
        RHO,
        false,
    )
    .unwrap();
    solid
        .set_binary_alloy_model(
            "alloy", "c_bulk", KP, ML, T_EUTEC, T_MELT, diff_coef, 3.0e5, 1.6e6, 0.3, conc0,
        )
        .unwrap();
    solid.init_setup(&mut momentum).unwrap();
    solid
        .finalize_setup(&mesh, &mut momentum, &mut thermal, &advection)
        .unwrap();

    // The bulk concentration initial condition belongs to the caller.
    let ctx = solid.binary_alloy().unwrap();
    ctx.solute_equation().field().write().set_values(conc0);
    ctx.solute_equation()
        .face_values()
        .write()
        .fill(conc0);

    Harness {
        mesh,
        solid,
        momentum,
        thermal,
    }
}

fn set_temperature(h: &Harness, temp: f64) {
    h.thermal.temperature().write().set_values(temp);
    h.thermal.temp_faces().write().fill(temp);
}

#[test]
fn diagram_partitions_the_state_space() {
    let d = AlloyPhaseDiagram::new(KP, ML, T_EUTEC, T_MELT, 1e-4);
    assert!((d.c_eutec - 0.3).abs() < 1e-12);
    assert!((d.c_eutec_a - 0.1).abs() < 1e-12);

    for i in 0..60 {
        for j in 0..40 {
            let temp = 800.0 + 10.0 * i as f64;
            let conc = 0.01 * j as f64;
            let b = d.classify(temp, conc);

            // Every finite point maps to exactly one state, and below the
            // eutectic concentration the bounds are ordered.
            if conc <= d.c_eutec {
                assert!(
                    b.t_solidus <= b.t_liquidus + 1e-12,
                    "bounds out of order at T={temp} C={conc}"
                );
            }
        }
    }
}

#[test]
fn eutectic_plateau_cell_through_the_full_lifecycle() {
    let mut h = setup(create_line_mesh(1, 1.0), 0.0, 0.2);
    set_temperature(&h, T_EUTEC);

    let ts = TimeStep { t_cur: 0.0, dt: 0.1 };
    let Harness {
        mesh,
        solid,
        momentum,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();

    let g_l = solid.liquid_fraction();
    assert!((g_l.read().val()[0] - 0.5).abs() < 1e-12);

    let ctx = solid.binary_alloy().unwrap();
    let c_l = ctx.liquid_concentration();
    assert!((c_l.read().val()[0] - 0.3).abs() < 1e-12);

    // The eutectic classification is folded into the mushy bucket.
    assert_eq!(solid.cell_states()[0], CellState::Mushy);
    assert_eq!(solid.n_g_cells(CellState::Mushy), 1);
    assert_eq!(solid.n_g_cells(CellState::Eutectic), 0);
    assert_eq!(solid.state_ratio(CellState::Eutectic), 0.0);

    // Unchanged bulk concentration: no eutectic heat release.
    let st = solid.thermal_source();
    assert_eq!(st.read()[0], 0.0);
    let rc = solid.thermal_reaction();
    assert_eq!(rc.read()[0], 0.0);
}

#[test]
fn eutectic_source_follows_the_concentration_increment() {
    let mut h = setup(create_line_mesh(1, 1.0), 0.0, 0.2);
    set_temperature(&h, T_EUTEC);

    // Bulk concentration moved by the transport solve this step.
    {
        let ctx = h.solid.binary_alloy().unwrap();
        let field = ctx.solute_equation().field();
        field.write().val_mut()[0] = 0.25;
    }

    let ts = TimeStep { t_cur: 0.0, dt: 0.1 };
    let Harness {
        mesh,
        solid,
        momentum,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();

    let g_l = solid.liquid_fraction();
    assert!((g_l.read().val()[0] - 0.75).abs() < 1e-12);

    // vol * rho * L / dt * (C - C_prev) / (C_eutec - C_eutec_a)
    let expected = 1.0 * RHO * 3.0e5 / 0.1 * 0.05 / 0.2;
    let st = solid.thermal_source();
    assert!((st.read()[0] - expected).abs() / expected < 1e-9);
}

#[test]
fn liquid_concentration_freezes_on_full_solidification() {
    let mut h = setup(create_line_mesh(1, 1.0), 0.0, 0.05);

    let mut ts = TimeStep { t_cur: 0.0, dt: 0.1 };

    // Mushy first: solidus is 1075, liquidus 1125 at C = 0.05.
    set_temperature(&h, 1100.0);
    let Harness {
        mesh,
        solid,
        momentum,
        thermal,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();
    assert_eq!(solid.cell_states()[0], CellState::Mushy);
    {
        let ctx = solid.binary_alloy().unwrap();
        let c_l = ctx.liquid_concentration();
        // (T - T_melt) / ml
        assert!((c_l.read().val()[0] - 0.1).abs() < 1e-12);
    }

    // Full solidification: the liquid concentration freezes at C / kp.
    thermal.temperature().write().set_values(900.0);
    thermal.temp_faces().write().fill(900.0);
    ts.t_cur += ts.dt;
    solid.compute(mesh, &ts, momentum).unwrap();
    assert_eq!(solid.cell_states()[0], CellState::Solid);
    {
        let ctx = solid.binary_alloy().unwrap();
        let c_l = ctx.liquid_concentration();
        assert!((c_l.read().val()[0] - 0.15).abs() < 1e-12);
    }

    // Staying solid leaves the frozen value untouched.
    thermal.temperature().write().set_values(800.0);
    thermal.temp_faces().write().fill(800.0);
    ts.t_cur += ts.dt;
    solid.compute(mesh, &ts, momentum).unwrap();
    let ctx = solid.binary_alloy().unwrap();
    let c_l = ctx.liquid_concentration();
    assert!((c_l.read().val()[0] - 0.15).abs() < 1e-12);
}

#[test]
fn face_liquid_concentration_tracks_the_face_state() {
    let mut h = setup(create_line_mesh(4, 1.0), 0.0, 0.05);
    set_temperature(&h, 1200.0);

    // One representative face temperature per branch of the diagram.
    {
        let temp_faces = h.thermal.temp_faces();
        let mut tf = temp_faces.write();
        tf[0] = 1200.0; // liquid
        tf[1] = 1100.0; // mushy
        tf[2] = 900.0; // solid
        tf[3] = T_EUTEC;
    }
    {
        let ctx = h.solid.binary_alloy().unwrap();
        let faces = ctx.solute_equation().face_values();
        let mut cf = faces.write();
        cf[3] = 0.2; // eutectic plateau range
    }

    let ts = TimeStep { t_cur: 0.0, dt: 0.1 };
    let Harness {
        mesh,
        solid,
        momentum,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();

    let ctx = solid.binary_alloy().unwrap();
    let c_l_f = ctx.liquid_conc_faces();
    let c_l_f = c_l_f.read();
    assert_eq!(c_l_f[0], 0.05);
    assert!((c_l_f[1] - 0.1).abs() < 1e-12);
    assert!((c_l_f[2] - 0.15).abs() < 1e-12);
    assert!((c_l_f[3] - 0.3).abs() < 1e-12);
}

#[test]
fn drift_hook_corrects_the_local_rhs_with_bulk_minus_liquid() {
    let mut h = setup(create_line_mesh(2, 1.0), 0.0, 0.05);
    // Mushy everywhere: c_l = 0.1 while the bulk stays 0.05.
    set_temperature(&h, 1100.0);

    let ts = TimeStep { t_cur: 0.0, dt: 0.1 };
    let Harness {
        mesh,
        solid,
        momentum,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();

    let ctx = solid.binary_alloy().unwrap();
    let hooks = ctx.solute_equation().assembly_hooks();
    assert_eq!(hooks.len(), 1);

    // Local system of cell 0 with two faces, identity advection operator.
    let face_ids = [0_usize, 1];
    let val_faces = [0.05, 0.05];
    let advection = DMatrix::identity(3, 3);
    let mut rhs = DVector::zeros(3);
    let mut view = CellSystemView {
        cell_id: 0,
        face_ids: &face_ids,
        val_faces: &val_faces,
        val_cell: 0.05,
        diffusion: None,
        advection: &advection,
        rhs: &mut rhs,
    };
    hooks[0](&mut view);

    // drift = bulk - liquid = -0.05 at both faces and at the cell
    for i in 0..3 {
        assert!((rhs[i] + 0.05).abs() < 1e-12);
    }
}

#[test]
fn solutal_diffusivity_is_published_when_requested() {
    let h = setup(create_line_mesh(3, 1.0), 1e-8, 0.05);

    let ctx = h.solid.binary_alloy().unwrap();
    let diff = ctx.diffusivity().expect("diffusion array allocated");
    let diff = diff.read();
    assert_eq!(diff.len(), 3);
    for &v in diff.iter() {
        assert!((v - RHO * 1e-8).abs() < 1e-20);
    }

    let (name, _) = ctx.solute_equation().diffusion().expect("diffusion term");
    assert_eq!(name, "solute_diffusivity");
}

#[test]
fn snapshot_rotation_keeps_the_previous_liquid_concentration() {
    let mut h = setup(create_line_mesh(1, 1.0), 0.0, 0.05);

    let mut ts = TimeStep { t_cur: 0.0, dt: 0.1 };

    // Mushy at C = 0.05: solidus 1075, liquidus 1125.
    set_temperature(&h, 1100.0);
    let Harness {
        mesh,
        solid,
        momentum,
        thermal,
        ..
    } = &mut h;
    solid.initialize(mesh, &ts, momentum).unwrap();

    thermal.temperature().write().set_values(1110.0);
    thermal.temp_faces().write().fill(1110.0);
    ts.t_cur += ts.dt;
    solid.compute(mesh, &ts, momentum).unwrap();

    let ctx = solid.binary_alloy().unwrap();
    let c_l = ctx.liquid_concentration();
    let c_l = c_l.read();
    // (T - T_melt) / ml, before and after the step.
    assert!((c_l.val_prev()[0] - 0.1).abs() < 1e-12);
    assert!((c_l.val()[0] - 0.08).abs() < 1e-12);
}
