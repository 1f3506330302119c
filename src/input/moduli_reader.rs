// src/input/moduli_reader.rs

use crate::input::encoding;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info};
use num::bigint::Sign;
use num::BigInt;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Progress log cadence while loading large files.
const PROGRESS_INTERVAL: u64 = 250_000;

/// Read every modulus record in `path`, feeding each decoded modulus to
/// `sink`. `seen` holds the modulus fields already accepted during this run,
/// so exact input duplicates are loaded only once across all files. Lines
/// that fail to decode are skipped. Returns the number of lines read.
pub fn read_moduli<F>(path: &Path, seen: &mut HashSet<String>, mut sink: F) -> io::Result<u64>
where
    F: FnMut(BigInt),
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut count: u64 = 0;
    for line in reader.lines() {
        let line = line?;
        count += 1;
        if count % PROGRESS_INTERVAL == 0 {
            info!("Moduli read: {}", count);
        }

        // Accept CSV moduli, so long as the modulus is the first column.
        let field = match line.split_once(',') {
            Some((first, _)) => first,
            None => line.as_str(),
        };
        if !seen.insert(field.to_string()) {
            continue;
        }

        match parse_modulus_field(field) {
            Some(modulus) => sink(modulus),
            None => debug!(
                "skipping malformed record at {}:{}",
                path.display(),
                count
            ),
        }
    }
    Ok(count)
}

/// Decode one base64 modulus field. The record is three length-prefixed
/// chunks: application metadata (ignored), the public exponent (ignored),
/// and the modulus as a big-endian magnitude.
fn parse_modulus_field(field: &str) -> Option<BigInt> {
    let data = STANDARD.decode(field).ok()?;
    let (_metadata, offset) = encoding::read_chunk(&data, 0)?;
    let (_exponent, offset) = encoding::read_chunk(&data, offset)?;
    let (modulus, _) = encoding::read_chunk(&data, offset)?;
    if modulus.is_empty() {
        return None;
    }
    Some(BigInt::from_bytes_be(Sign::Plus, modulus))
}
