//! Binary model persistence
//!
//! A saved model is a little-endian byte stream with this layout:
//!
//! | field                                   | type          |
//! |-----------------------------------------|---------------|
//! | magic `b"FTRL"`                         | 4 bytes       |
//! | format version                          | `u32`         |
//! | saved at (unix milliseconds)            | `i64`         |
//! | alpha, beta, l1, l2                     | `f32` x 4     |
//! | model type (0 classification, 1 regression) | `u32`     |
//! | n, z, w of the intercept                | `f32` x 3     |
//! | number of features `F`                  | `u64`         |
//! | `n`, then `z`, then `w`                 | `f32` x F each|
//!
//! Floats are written bit-for-bit, so a load returns exactly the state that
//! was saved. Weights are restored verbatim, never recomputed.

use crate::core::{FtrlError, FtrlParams, ModelType, Result};
use crate::optimizer::{Coordinate, ModelState};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading bytes of every model stream
pub const MAGIC: [u8; 4] = *b"FTRL";

/// Version written by this library
pub const FORMAT_VERSION: u32 = 1;

/// Byte length of everything before the per-feature arrays
pub const HEADER_LEN: usize = 4 + 4 + 8 + 4 * 4 + 4 + 3 * 4 + 8;

/// Read-ahead cap so a corrupt feature count cannot trigger a huge allocation
const MAX_PREALLOCATED_FEATURES: usize = 1 << 20;

/// Fixed-size prefix of a persisted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelHeader {
    pub format_version: u32,
    pub saved_at_millis: i64,
    pub params: FtrlParams,
    pub intercept_n: f32,
    pub intercept_z: f32,
    pub intercept_w: f32,
    pub num_features: u64,
}

impl ModelHeader {
    /// Save timestamp, if it is representable
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.saved_at_millis)
    }

    fn intercept(&self) -> Coordinate {
        Coordinate {
            n: self.intercept_n,
            z: self.intercept_z,
            w: self.intercept_w,
        }
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== FTRL Model Summary ===");
        println!("Model Type: {}", self.params.model_type());
        println!("Features: {}", self.num_features);
        println!("Intercept Weight: {:.6}", self.intercept_w);
        println!("Format Version: {}", self.format_version);
        match self.saved_at() {
            Some(ts) => println!("Saved: {}", ts.to_rfc3339()),
            None => println!("Saved: unknown"),
        }
        println!("Parameters:");
        println!("  alpha: {}", self.params.alpha());
        println!("  beta: {}", self.params.beta());
        println!("  l1: {}", self.params.l1());
        println!("  l2: {}", self.params.l2());
    }
}

/// Write `state` to `writer` in the binary format
pub fn write_model<W: Write>(state: &ModelState, writer: &mut W) -> Result<()> {
    let params = state.params();
    let intercept = state.intercept();

    writer.write_all(&MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&Utc::now().timestamp_millis().to_le_bytes())?;
    for value in [params.alpha(), params.beta(), params.l1(), params.l2()] {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.write_all(&params.model_type().code().to_le_bytes())?;
    for value in [intercept.n, intercept.z, intercept.w] {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.write_all(&(state.num_features() as u64).to_le_bytes())?;

    for array in [state.n(), state.z(), state.w()] {
        write_f32_slice(writer, array)?;
    }
    Ok(())
}

fn write_f32_slice<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Read only the header of a model stream
pub fn read_header<R: Read>(reader: &mut R) -> Result<ModelHeader> {
    let magic: [u8; 4] = read_array(reader, "magic")?;
    if magic != MAGIC {
        return Err(FtrlError::DecodeError(format!(
            "bad magic bytes {magic:02x?}, not an FTRL model"
        )));
    }

    let format_version = u32::from_le_bytes(read_array(reader, "format version")?);
    if format_version != FORMAT_VERSION {
        return Err(FtrlError::DecodeError(format!(
            "unsupported format version {format_version}; expected {FORMAT_VERSION}"
        )));
    }
    let saved_at_millis = i64::from_le_bytes(read_array(reader, "timestamp")?);

    let alpha = read_f32(reader, "alpha")?;
    let beta = read_f32(reader, "beta")?;
    let l1 = read_f32(reader, "l1")?;
    let l2 = read_f32(reader, "l2")?;
    let code = u32::from_le_bytes(read_array(reader, "model type")?);
    let model_type = ModelType::from_code(code)
        .ok_or_else(|| FtrlError::DecodeError(format!("unknown model type code {code}")))?;
    let params = FtrlParams::new(alpha, beta, l1, l2, model_type)
        .map_err(|e| FtrlError::DecodeError(format!("stored parameters are invalid: {e}")))?;

    let intercept_n = read_f32(reader, "intercept n")?;
    let intercept_z = read_f32(reader, "intercept z")?;
    let intercept_w = read_f32(reader, "intercept w")?;

    let num_features = u64::from_le_bytes(read_array(reader, "feature count")?);
    if num_features == 0 {
        return Err(FtrlError::DecodeError(
            "stored model has zero features".to_string(),
        ));
    }

    Ok(ModelHeader {
        format_version,
        saved_at_millis,
        params,
        intercept_n,
        intercept_z,
        intercept_w,
        num_features,
    })
}

/// Read a full model from `reader`
///
/// The stream must end right after the weight array; trailing bytes are a
/// decode error.
pub fn read_model<R: Read>(reader: &mut R) -> Result<ModelState> {
    read_model_with_header(reader).map(|(_, state)| state)
}

/// Read a full model along with the header it was stored under
pub fn read_model_with_header<R: Read>(reader: &mut R) -> Result<(ModelHeader, ModelState)> {
    let header = read_header(reader)?;
    let num_features = usize::try_from(header.num_features).map_err(|_| {
        FtrlError::DecodeError(format!(
            "feature count {} does not fit in memory",
            header.num_features
        ))
    })?;

    let n = read_f32_vec(reader, num_features, "n")?;
    let z = read_f32_vec(reader, num_features, "z")?;
    let w = read_f32_vec(reader, num_features, "w")?;

    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(FtrlError::DecodeError(
            "unexpected trailing bytes after model data".to_string(),
        ));
    }

    let state = ModelState::from_parts(header.params, header.intercept(), n, z, w)?;
    Ok((header, state))
}

fn read_array<R: Read, const N: usize>(reader: &mut R, field: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| decode_io(e, field))?;
    Ok(buf)
}

fn read_f32<R: Read>(reader: &mut R, field: &str) -> Result<f32> {
    Ok(f32::from_le_bytes(read_array(reader, field)?))
}

fn read_f32_vec<R: Read>(reader: &mut R, len: usize, field: &str) -> Result<Vec<f32>> {
    let mut values = Vec::with_capacity(len.min(MAX_PREALLOCATED_FEATURES));
    for _ in 0..len {
        values.push(read_f32(reader, field)?);
    }
    Ok(values)
}

/// Truncation is a decode error; other I/O failures pass through
fn decode_io(err: io::Error, field: &str) -> FtrlError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FtrlError::DecodeError(format!("stream truncated while reading {field}"))
    } else {
        FtrlError::IoError(err)
    }
}

/// Save a model to a file
pub fn save_to_file<P: AsRef<Path>>(state: &ModelState, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(FtrlError::IoError)?;
    let mut writer = BufWriter::new(file);
    write_model(state, &mut writer)?;
    writer.flush()?;
    debug!(
        "Saved model with {} features to {:?}",
        state.num_features(),
        path
    );
    Ok(())
}

/// Load a model from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ModelState> {
    load_with_header(path).map(|(_, state)| state)
}

/// Load a model and its header with a single read of the file
pub fn load_with_header<P: AsRef<Path>>(path: P) -> Result<(ModelHeader, ModelState)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(FtrlError::IoError)?;
    let mut reader = BufReader::new(file);
    let (header, state) = read_model_with_header(&mut reader)?;
    debug!(
        "Loaded model with {} features from {:?}",
        state.num_features(),
        path
    );
    Ok((header, state))
}

/// Load only the header of a model file
pub fn load_header<P: AsRef<Path>>(path: P) -> Result<ModelHeader> {
    let file = File::open(path).map_err(FtrlError::IoError)?;
    read_header(&mut BufReader::new(file))
}
