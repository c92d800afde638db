use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::models::solidification::{CellState, N_STATES};

/// One step's solidification monitoring figures: the volume ratio occupied by
/// each cell state and the global cell count per state.
pub struct MonitoringSnapshot {
    pub t_cur: f64,
    pub state_ratio: [f64; N_STATES],
    pub n_g_cells: [u64; N_STATES],
    /// The eutectic line is only meaningful for the binary-alloy model.
    pub with_eutectic: bool,
}

impl MonitoringSnapshot {
    fn states(&self) -> &'static [CellState] {
        if self.with_eutectic {
            &[
                CellState::Solid,
                CellState::Mushy,
                CellState::Liquid,
                CellState::Eutectic,
            ]
        } else {
            &[CellState::Solid, CellState::Mushy, CellState::Liquid]
        }
    }

    pub fn print_to_console(&self) {
        println!("## Solidification monitoring (t = {:.6e})", self.t_cur);
        for &s in self.states() {
            println!(
                "  * {:<8} {:>8.2} %vol  {:>10} cells",
                s.name(),
                100.0 * self.state_ratio[s as usize],
                self.n_g_cells[s as usize]
            );
        }
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "SOLIDIFICATION MONITORING")?;
        writeln!(file, "{}", "=".repeat(60))?;
        writeln!(file, "Time:                {:.6e}", self.t_cur)?;
        writeln!(file)?;
        for &s in self.states() {
            writeln!(
                file,
                "{:<20} ratio = {:.6e}   cells = {}",
                s.name(),
                self.state_ratio[s as usize],
                self.n_g_cells[s as usize]
            )?;
        }
        writeln!(file, "{}", "=".repeat(60))?;

        Ok(())
    }
}
