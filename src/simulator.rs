use crate::mapping::ColumnMapping;
use crate::matcher::{classify_row, RowClass};

/// Dry-run preview counts. Deliberately coarser than a commit run: the
/// classification uses the matcher's normalization and required-field checks
/// but performs no existence lookups, so it cannot tell create from update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub disponibles: usize,
    pub incompletos: usize,
    pub cancelados: usize,
    pub total: usize,
}

/// Classify every row without touching storage. Pure: safe to run against
/// any input as many times as the user likes before committing.
pub fn simulate(headers: &[String], rows: &[Vec<String>], mapping: &ColumnMapping) -> SimulationReport {
    let resolved = mapping.resolve(headers);
    let mut report = SimulationReport::default();
    for row in rows {
        let record = resolved.map_row(row);
        match classify_row(&record) {
            RowClass::Cancelled => report.cancelados += 1,
            RowClass::Available => report.disponibles += 1,
            RowClass::Incomplete => report.incompletos += 1,
        }
        report.total += 1;
    }
    report
}
