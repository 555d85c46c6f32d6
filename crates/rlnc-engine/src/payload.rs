//! Payload wire format.
//!
//! Every payload starts with a one-byte kind followed by a kind-specific
//! header, the packed coefficients (coded kinds only) and `L` bytes of symbol
//! data. All integers are big-endian.
//!
//! ```text
//! systematic: [0x00][index: u32][data: L]
//! dense:      [0x01][coefficients: elements_size(n)][data: L]
//! banded:     [0x02][pivot: u32][band: u16][coefficients: elements_size(band-1)][data: L]
//! ```
//!
//! For dense payloads `n` is the coefficient count of the coder: `S` for most
//! schemes, `S+E` inner GF(2) coefficients for fulcrum. Banded payloads carry
//! an implicit pivot coefficient of 1 followed by `band-1` explicit ones.

use crate::error::{CodingError, Result};
use crate::field::Field;

pub const KIND_SYSTEMATIC: u8 = 0x00;
pub const KIND_DENSE: u8 = 0x01;
pub const KIND_BANDED: u8 = 0x02;

const KIND_OFF: usize = 0;
const INDEX_OFF: usize = 1; // u32 BE
const SYSTEMATIC_HDR_END: usize = 5;
const DENSE_HDR_END: usize = 1;
const PIVOT_OFF: usize = 1; // u32 BE
const BAND_OFF: usize = 5; // u16 BE
const BANDED_HDR_END: usize = 7;

/// Shape a payload must match to belong to a coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLayout {
    /// Field the packed coefficients are drawn from.
    pub coefficient_field: Field,
    /// Number of coefficients in a dense vector.
    pub coefficients: usize,
    /// Symbol size `L` in bytes.
    pub symbol_size: usize,
}

impl PayloadLayout {
    pub fn systematic_size(&self) -> usize {
        SYSTEMATIC_HDR_END + self.symbol_size
    }

    pub fn dense_size(&self) -> usize {
        DENSE_HDR_END + self.coefficient_field.elements_size(self.coefficients) + self.symbol_size
    }

    pub fn banded_size(&self, band: usize) -> usize {
        BANDED_HDR_END
            + self.coefficient_field.elements_size(band.saturating_sub(1))
            + self.symbol_size
    }
}

/// A parsed payload borrowing from the wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Systematic {
        index: usize,
        data: &'a [u8],
    },
    Dense {
        coefficients: &'a [u8],
        data: &'a [u8],
    },
    Banded {
        pivot: usize,
        band: usize,
        /// The `band-1` coefficients following the pivot.
        coefficients: &'a [u8],
        data: &'a [u8],
    },
}

impl<'a> Payload<'a> {
    pub fn data(&self) -> &'a [u8] {
        match *self {
            Payload::Systematic { data, .. } => data,
            Payload::Dense { data, .. } => data,
            Payload::Banded { data, .. } => data,
        }
    }

    /// Expand to a dense packed coefficient vector of `layout.coefficients`
    /// elements.
    pub fn dense_coefficients(&self, layout: &PayloadLayout) -> Vec<u8> {
        let field = layout.coefficient_field;
        match *self {
            Payload::Dense { coefficients, .. } => coefficients.to_vec(),
            Payload::Systematic { index, .. } => {
                let mut out = vec![0u8; field.elements_size(layout.coefficients)];
                field.set_value(&mut out, index, 1);
                out
            }
            Payload::Banded {
                pivot,
                band,
                coefficients,
                ..
            } => {
                let mut out = vec![0u8; field.elements_size(layout.coefficients)];
                field.set_value(&mut out, pivot, 1);
                for k in 1..band {
                    let v = field.get_value(coefficients, k - 1);
                    field.set_value(&mut out, pivot + k, v);
                }
                out
            }
        }
    }
}

/// Parse and validate a payload against `layout`.
pub fn parse<'a>(layout: &PayloadLayout, bytes: &'a [u8]) -> Result<Payload<'a>> {
    let Some(&kind) = bytes.get(KIND_OFF) else {
        return Err(CodingError::MalformedPayload("empty payload".into()));
    };
    let l = layout.symbol_size;
    match kind {
        KIND_SYSTEMATIC => {
            expect_len(bytes, layout.systematic_size(), "systematic")?;
            let index = read_u32(bytes, INDEX_OFF) as usize;
            if index >= layout.coefficients {
                return Err(CodingError::MalformedPayload(format!(
                    "systematic index {} out of range for {} symbols",
                    index, layout.coefficients
                )));
            }
            Ok(Payload::Systematic {
                index,
                data: &bytes[SYSTEMATIC_HDR_END..SYSTEMATIC_HDR_END + l],
            })
        }
        KIND_DENSE => {
            expect_len(bytes, layout.dense_size(), "dense")?;
            let n = layout.coefficient_field.elements_size(layout.coefficients);
            let coefficients = &bytes[DENSE_HDR_END..DENSE_HDR_END + n];
            if layout
                .coefficient_field
                .first_nonzero(coefficients, layout.coefficients)
                .is_none()
            {
                return Err(CodingError::MalformedPayload(
                    "all-zero coefficient vector".into(),
                ));
            }
            Ok(Payload::Dense {
                coefficients,
                data: &bytes[DENSE_HDR_END + n..],
            })
        }
        KIND_BANDED => {
            if bytes.len() < BANDED_HDR_END {
                return Err(CodingError::MalformedPayload(format!(
                    "banded payload of {} bytes is shorter than its header",
                    bytes.len()
                )));
            }
            let pivot = read_u32(bytes, PIVOT_OFF) as usize;
            let band = u16::from_be_bytes([bytes[BAND_OFF], bytes[BAND_OFF + 1]]) as usize;
            let in_range = pivot
                .checked_add(band)
                .is_some_and(|end| band > 0 && end <= layout.coefficients);
            if !in_range {
                return Err(CodingError::MalformedPayload(format!(
                    "band of {} at pivot {} out of range for {} symbols",
                    band, pivot, layout.coefficients
                )));
            }
            expect_len(bytes, layout.banded_size(band), "banded")?;
            let n = layout.coefficient_field.elements_size(band - 1);
            Ok(Payload::Banded {
                pivot,
                band,
                coefficients: &bytes[BANDED_HDR_END..BANDED_HDR_END + n],
                data: &bytes[BANDED_HDR_END + n..],
            })
        }
        other => Err(CodingError::MalformedPayload(format!(
            "unknown payload kind {other:#04x}"
        ))),
    }
}

pub fn write_systematic(index: usize, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SYSTEMATIC_HDR_END + data.len());
    out.push(KIND_SYSTEMATIC);
    out.extend_from_slice(&(index as u32).to_be_bytes());
    out.extend_from_slice(data);
    out
}

pub fn write_dense(coefficients: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(DENSE_HDR_END + coefficients.len() + data.len());
    out.push(KIND_DENSE);
    out.extend_from_slice(coefficients);
    out.extend_from_slice(data);
    out
}

/// `coefficients` holds the packed `band-1` values after the pivot.
pub fn write_banded(pivot: usize, band: usize, coefficients: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BANDED_HDR_END + coefficients.len() + data.len());
    out.push(KIND_BANDED);
    out.extend_from_slice(&(pivot as u32).to_be_bytes());
    out.extend_from_slice(&(band as u16).to_be_bytes());
    out.extend_from_slice(coefficients);
    out.extend_from_slice(data);
    out
}

fn expect_len(bytes: &[u8], expected: usize, kind: &str) -> Result<()> {
    if bytes.len() != expected {
        return Err(CodingError::MalformedPayload(format!(
            "{} payload is {} bytes, expected {}",
            kind,
            bytes.len(),
            expected
        )));
    }
    Ok(())
}

fn read_u32(bytes: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}
