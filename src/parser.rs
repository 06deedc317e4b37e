//! CSV decoder for observation files.

use std::io::Read;

use anyhow::Result;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::model::Observation;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decodes observations from CSV bytes, gunzipping first if the bytes carry
/// a gzip header.
///
/// Expects a header row with `date,time_block,pickup_location,passenger_count`
/// and an optional `day_of_week` column. Rows that cannot be decoded are
/// logged and skipped; semantic validation is left to the aggregator.
///
/// # Errors
///
/// Returns an error if the gzip stream is corrupt or the header row is unreadable.
pub fn parse_observations(bytes: &[u8]) -> Result<Vec<Observation>> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut decoded)?;
        debug!(compressed = bytes.len(), decoded = decoded.len(), "Gunzipped observations");
        return parse_csv(&decoded);
    }
    parse_csv(bytes)
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<Observation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    rdr.headers()?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;

    for result in rdr.deserialize::<Observation>() {
        match result {
            Ok(record) => rows.push(record),
            Err(e) => {
                malformed += 1;
                let line = e.position().map(|p| p.line());
                warn!(line, error = %e, "Skipping undecodable row");
            }
        }
    }

    debug!(rows = rows.len(), malformed, "Parsed observation CSV");
    Ok(rows)
}
