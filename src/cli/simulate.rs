use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::grid::Grid;
use crate::mapping::ColumnMapping;
use crate::simulator::simulate;

pub fn run(file: &str, mapping_file: &str) -> Result<()> {
    let mapping_json = std::fs::read_to_string(mapping_file)?;
    let mapping = ColumnMapping::from_json_str(&mapping_json)?;
    let grid = Grid::load(Path::new(file))?;

    let report = simulate(&grid.headers, &grid.rows, &mapping);

    println!("Simulation (no data written):");
    println!("  Disponibles:  {}", report.disponibles.to_string().green());
    println!("  Incompletos:  {}", report.incompletos.to_string().yellow());
    println!("  Cancelados:   {}", report.cancelados.to_string().red());
    println!("  Total:        {}", report.total);
    Ok(())
}
