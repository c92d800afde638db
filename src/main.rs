use glam::DVec3;
use std::fs;

use solidfvm::discretization::generator::create_box_mesh;
use solidfvm::discretization::mesh::Mesh;
use solidfvm::models::solidification::{
    FlowModel, Solidification, SolidificationModel, ThermalVariable,
};
use solidfvm::physics::equations::{AdvectionField, Equation, ThermalSystem};
use solidfvm::physics::TimeStep;
use solidfvm::processing::csv_writer;

const RHO: f64 = 7000.0;
const T_SOLIDUS: f64 = 1700.0;
const T_LIQUIDUS: f64 = 1730.0;
const LATENT_HEAT: f64 = 3.0e5;
const FORCING_COEF: f64 = 1.6e6;

const T_INITIAL: f64 = 1750.0;
const COOLING_RATE: f64 = 2.0;
const WALL_GRADIENT: f64 = 300.0;

fn main() {
    fs::create_dir_all("output/cavity").expect("Failed to create output directory");

    // Square cavity, one cell thick, cooled from the left wall.
    let mesh = create_box_mesh(40, 40, [0.1, 0.1], 0.0025);
    println!(
        "Cavity mesh: {} cells, {} faces",
        mesh.n_cells(),
        mesh.n_faces()
    );

    let mut thermal = ThermalSystem::new(DVec3::new(0.0, -9.81, 0.0), RHO, 2.0e-4, T_LIQUIDUS);
    thermal.resize(mesh.n_cells(), mesh.n_faces());
    let mut momentum = Equation::new("momentum", "velocity");
    momentum.resize(mesh.n_cells(), mesh.n_faces());
    let advection = AdvectionField::new(mesh.n_faces());

    let mut solid = Solidification::activate(
        SolidificationModel::Voller,
        FlowModel::NavierStokes,
        ThermalVariable::Temperature,
        RHO,
        true,
    )
    .expect("Failed to activate the solidification module");
    solid
        .set_voller_model(T_SOLIDUS, T_LIQUIDUS, LATENT_HEAT, FORCING_COEF)
        .expect("Invalid Voller parameters");
    solid
        .init_setup(&mut momentum)
        .expect("Failed to run init_setup");
    solid
        .finalize_setup(&mesh, &mut momentum, &mut thermal, &advection)
        .expect("Failed to finalize the setup");
    solid.log_setup();

    let mut ts = TimeStep {
        t_cur: 0.0,
        dt: 0.5,
    };
    set_temperature(&thermal, &mesh, ts.t_cur);
    solid
        .initialize(&mesh, &ts, &mut momentum)
        .expect("Failed to initialize");

    let n_steps = 60;
    for _ in 0..n_steps {
        ts.t_cur += ts.dt;
        set_temperature(&thermal, &mesh, ts.t_cur);
        solid
            .compute(&mesh, &ts, &mut momentum)
            .expect("Update pass failed");
    }

    save_results(&solid, &mesh, ts.t_cur);
}

/// Prescribed cooling: uniform rate in time plus a fixed gradient from the
/// left wall. Stands in for the thermal solve, which lives outside this crate.
fn set_temperature(thermal: &ThermalSystem, mesh: &Mesh, t: f64) {
    let temperature = thermal.temperature();
    let mut field = temperature.write();
    field.current_to_previous();
    let values = field.val_mut();
    for cell in &mesh.cells {
        values[cell.id] = T_INITIAL - COOLING_RATE * t + WALL_GRADIENT * cell.centroid[0];
    }

    let temp_faces = thermal.temp_faces();
    let mut faces = temp_faces.write();
    for (f, face) in mesh.faces.iter().enumerate() {
        faces[f] = T_INITIAL - COOLING_RATE * t + WALL_GRADIENT * face.centroid[0];
    }
}

fn save_results(solid: &Solidification, mesh: &Mesh, t_cur: f64) {
    let x: Vec<f64> = mesh.cells.iter().map(|c| c.centroid[0]).collect();
    let y: Vec<f64> = mesh.cells.iter().map(|c| c.centroid[1]).collect();
    let g_l_field = solid.liquid_fraction();
    let g_l: Vec<f64> = g_l_field.read().val().iter().cloned().collect();

    csv_writer::write_csv(
        "output/cavity/liquid_fraction.csv",
        &["x", "y", "g_l"],
        &[x, y, g_l],
    )
    .expect("Failed to write liquid fraction");
    println!("Liquid fraction saved to output/cavity/liquid_fraction.csv");

    csv_writer::write_tag_column(
        "output/cavity/cell_state.csv",
        "cell_state",
        &solid.cell_state_tags(),
    )
    .expect("Failed to write cell states");
    println!("Cell states saved to output/cavity/cell_state.csv");

    let snapshot = solid.monitoring(t_cur);
    snapshot
        .write_to_file("output/cavity/monitoring.txt")
        .expect("Failed to write monitoring report");
    snapshot.print_to_console();
    println!("Monitoring report saved to output/cavity/monitoring.txt");
}
