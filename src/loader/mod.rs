//! CSV loader for the state → district → market reference table.

use crate::models::LocationEntry;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Parse a `state,district,market` CSV with a header row. Blank or short rows
/// are skipped with a warning.
pub fn read_locations<R: Read>(reader: R) -> Result<Vec<LocationEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {}: {}", i + 1, e);
                continue;
            }
        };

        let cell = |idx: usize| record.get(idx).filter(|s| !s.is_empty()).map(str::to_string);
        let (Some(state), Some(district), Some(market)) = (cell(0), cell(1), cell(2)) else {
            warn!("Row {}: expected state, district, market; got {:?}", i + 1, record);
            continue;
        };

        entries.push(LocationEntry { state, district, market });
    }

    Ok(entries)
}

pub fn load_locations(path: &Path) -> Result<Vec<LocationEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open location file {:?}", path))?;
    let entries = read_locations(file).with_context(|| format!("Reading {:?}", path))?;
    info!("{:?}: {} locations", path, entries.len());
    Ok(entries)
}
