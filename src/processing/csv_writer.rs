use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Write data to CSV file with headers
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], data: &[Vec<f64>]) -> io::Result<()> {
    if !headers.is_empty() && !data.is_empty() && headers.len() != data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match data columns ({})",
                headers.len(),
                data.len()
            ),
        ));
    }

    let mut file = File::create(path)?;

    writeln!(file, "{}", headers.join(","))?;

    let n_rows = data.iter().map(|col| col.len()).max().unwrap_or(0);

    for i in 0..n_rows {
        let row: Vec<String> = data
            .iter()
            .map(|col| {
                if i < col.len() {
                    format!("{:.15e}", col[i])
                } else {
                    String::new()
                }
            })
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }

    Ok(())
}

/// Write a single column of data with a header
pub fn write_single_column<P: AsRef<Path>>(path: P, header: &str, data: &[f64]) -> io::Result<()> {
    write_csv(path, &[header], &[data.to_vec()])
}

/// Write an integer tag column, e.g. per-cell state tags for visualization
pub fn write_tag_column<P: AsRef<Path>>(path: P, header: &str, tags: &[u32]) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "{header}")?;
    for tag in tags {
        writeln!(file, "{tag}")?;
    }
    Ok(())
}
