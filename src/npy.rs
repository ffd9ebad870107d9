//! NPY v1.0 output for piano rolls.
//!
//! Each roll is stored as a C-order `int8` matrix of shape
//! `(pitches, time_steps)`, readable with `numpy.load`.

use crate::segment::PianoRoll;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const MAGIC: &[u8] = b"\x93NUMPY";
/// Magic, two version bytes and the little-endian header length.
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;
const ALIGNMENT: usize = 64;

/// Encode a roll as the bytes of an `.npy` file.
pub fn npy_bytes(roll: &PianoRoll) -> Vec<u8> {
    let (rows, columns) = roll.shape();
    let mut header = format!(
        "{{'descr': '|i1', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, columns
    );
    // Pad with spaces so the data starts on an aligned offset; the header ends in '\n'.
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(PREAMBLE_LEN + header.len() + roll.as_slice().len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(roll.as_slice());
    bytes
}

/// Write a roll to `path` in NPY format.
pub fn write_npy(path: &Path, roll: &PianoRoll) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&npy_bytes(roll))?;
    writer.flush()
}
