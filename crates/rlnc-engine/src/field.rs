//! Finite field arithmetic over GF(2), GF(2^4), GF(2^8) and GF(2^16).
//!
//! Addition is XOR in every field (characteristic 2). Multiplication and
//! inversion use log/antilog tables:
//!
//! | Field     | Polynomial                      | Tables                  |
//! |-----------|---------------------------------|-------------------------|
//! | GF(2)     | —                               | none (AND)              |
//! | GF(2^4)   | x^4 + x + 1 (0x13)              | `const`, plus byte LUT  |
//! | GF(2^8)   | x^8 + x^4 + x^3 + x^2 + 1 (0x11D) | `const`, plus 256×256 LUT |
//! | GF(2^16)  | x^16 + x^12 + x^3 + x + 1 (0x1100B) | built once on first use |
//!
//! ## Packed layout
//!
//! Symbol data and coefficient vectors share one packed layout, so the same
//! slice kernels serve both:
//!
//! * GF(2): 8 elements per byte, element `i` at bit `i % 8` of byte `i / 8`
//! * GF(2^4): 2 elements per byte, even index in the low nibble
//! * GF(2^8): 1 element per byte
//! * GF(2^16): 2 bytes per element, big-endian

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const POLY4: u16 = 0x13;
const POLY8: u16 = 0x11D;
const POLY16: u32 = 0x1_100B;

// ---------------------------------------------------------------------------
// Table generation
// ---------------------------------------------------------------------------

const fn build_tables4() -> ([u8; 16], [u8; 30]) {
    let mut log = [0u8; 16];
    let mut exp = [0u8; 30];
    let mut x: u16 = 1;
    let mut i = 0usize;
    while i < 15 {
        exp[i] = x as u8;
        exp[i + 15] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x10 != 0 {
            x ^= POLY4;
        }
        i += 1;
    }
    (log, exp)
}

const fn build_tables8() -> ([u8; 256], [u8; 510]) {
    let mut log = [0u8; 256];
    let mut exp = [0u8; 510];
    let mut x: u16 = 1;
    let mut i = 0usize;
    while i < 255 {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= POLY8;
        }
        i += 1;
    }
    (log, exp)
}

const TABLES4: ([u8; 16], [u8; 30]) = build_tables4();
const LOG4: [u8; 16] = TABLES4.0;
const EXP4: [u8; 30] = TABLES4.1;

const TABLES8: ([u8; 256], [u8; 510]) = build_tables8();
const LOG8: [u8; 256] = TABLES8.0;
const EXP8: [u8; 510] = TABLES8.1;

const fn mul4(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP4[LOG4[a as usize] as usize + LOG4[b as usize] as usize]
}

const fn mul8(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP8[LOG8[a as usize] as usize + LOG8[b as usize] as usize]
}

/// `MUL4_BYTES[c][x]` multiplies both nibbles of `x` by `c`.
const fn build_mul4_bytes() -> [[u8; 256]; 16] {
    let mut tables = [[0u8; 256]; 16];
    let mut c = 0usize;
    while c < 16 {
        let mut x = 0usize;
        while x < 256 {
            let lo = mul4((x & 0x0F) as u8, c as u8);
            let hi = mul4((x >> 4) as u8, c as u8);
            tables[c][x] = lo | (hi << 4);
            x += 1;
        }
        c += 1;
    }
    tables
}

#[allow(clippy::large_stack_arrays)]
const fn build_mul8() -> [[u8; 256]; 256] {
    let mut tables = [[0u8; 256]; 256];
    let mut c = 0usize;
    while c < 256 {
        let mut x = 0usize;
        while x < 256 {
            tables[c][x] = mul8(x as u8, c as u8);
            x += 1;
        }
        c += 1;
    }
    tables
}

static MUL4_BYTES: [[u8; 256]; 16] = build_mul4_bytes();
static MUL8: [[u8; 256]; 256] = build_mul8();

struct Tables16 {
    log: Vec<u16>,
    /// Doubled so `exp[log a + log b]` needs no reduction.
    exp: Vec<u16>,
}

static TABLES16: OnceLock<Tables16> = OnceLock::new();

fn tables16() -> &'static Tables16 {
    TABLES16.get_or_init(|| {
        let mut log = vec![0u16; 65_536];
        let mut exp = vec![0u16; 2 * 65_535];
        let mut x: u32 = 1;
        for i in 0..65_535usize {
            exp[i] = x as u16;
            exp[i + 65_535] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x & 0x1_0000 != 0 {
                x ^= POLY16;
            }
        }
        Tables16 { log, exp }
    })
}

#[inline]
fn mul16(a: u16, b: u16) -> u16 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables16();
    t.exp[t.log[a as usize] as usize + t.log[b as usize] as usize]
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// The finite fields supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// GF(2)
    Binary,
    /// GF(2^4)
    Binary4,
    /// GF(2^8)
    Binary8,
    /// GF(2^16)
    Binary16,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Binary, Field::Binary4, Field::Binary8, Field::Binary16];

    /// Bits per field element.
    #[inline]
    pub fn bits(self) -> usize {
        match self {
            Field::Binary => 1,
            Field::Binary4 => 4,
            Field::Binary8 => 8,
            Field::Binary16 => 16,
        }
    }

    /// Largest element value.
    #[inline]
    pub fn max_value(self) -> u16 {
        match self {
            Field::Binary => 1,
            Field::Binary4 => 15,
            Field::Binary8 => 255,
            Field::Binary16 => u16::MAX,
        }
    }

    /// Bytes needed to pack `elements` field elements.
    #[inline]
    pub fn elements_size(self, elements: usize) -> usize {
        (elements * self.bits()).div_ceil(8)
    }

    /// Number of whole elements held by a packed buffer of `bytes` bytes.
    #[inline]
    pub fn elements_in(self, bytes: usize) -> usize {
        bytes * 8 / self.bits()
    }

    #[inline]
    pub fn add(self, a: u16, b: u16) -> u16 {
        a ^ b
    }

    #[inline]
    pub fn multiply(self, a: u16, b: u16) -> u16 {
        match self {
            Field::Binary => a & b & 1,
            Field::Binary4 => mul4(a as u8, b as u8) as u16,
            Field::Binary8 => mul8(a as u8, b as u8) as u16,
            Field::Binary16 => mul16(a, b),
        }
    }

    /// Multiplicative inverse. Callers must never pass zero.
    #[inline]
    pub fn invert(self, a: u16) -> u16 {
        debug_assert!(a != 0, "zero has no inverse");
        match self {
            Field::Binary => 1,
            Field::Binary4 => EXP4[15 - LOG4[a as usize] as usize] as u16,
            Field::Binary8 => EXP8[255 - LOG8[a as usize] as usize] as u16,
            Field::Binary16 => {
                let t = tables16();
                t.exp[65_535 - t.log[a as usize] as usize]
            }
        }
    }

    /// Read element `index` from a packed buffer.
    #[inline]
    pub fn get_value(self, buf: &[u8], index: usize) -> u16 {
        match self {
            Field::Binary => ((buf[index / 8] >> (index % 8)) & 1) as u16,
            Field::Binary4 => {
                let b = buf[index / 2];
                if index % 2 == 0 {
                    (b & 0x0F) as u16
                } else {
                    (b >> 4) as u16
                }
            }
            Field::Binary8 => buf[index] as u16,
            Field::Binary16 => u16::from_be_bytes([buf[2 * index], buf[2 * index + 1]]),
        }
    }

    /// Write element `index` into a packed buffer.
    #[inline]
    pub fn set_value(self, buf: &mut [u8], index: usize, value: u16) {
        debug_assert!(value <= self.max_value());
        match self {
            Field::Binary => {
                let mask = 1u8 << (index % 8);
                if value & 1 == 1 {
                    buf[index / 8] |= mask;
                } else {
                    buf[index / 8] &= !mask;
                }
            }
            Field::Binary4 => {
                let b = &mut buf[index / 2];
                if index % 2 == 0 {
                    *b = (*b & 0xF0) | (value as u8 & 0x0F);
                } else {
                    *b = (*b & 0x0F) | ((value as u8) << 4);
                }
            }
            Field::Binary8 => buf[index] = value as u8,
            Field::Binary16 => buf[2 * index..2 * index + 2].copy_from_slice(&value.to_be_bytes()),
        }
    }

    /// `dst += src`
    #[inline]
    pub fn add_slice(self, dst: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dst.len(), src.len());
        for (d, s) in dst.iter_mut().zip(src) {
            *d ^= s;
        }
    }

    /// `dst *= c`
    pub fn multiply_slice(self, dst: &mut [u8], c: u16) {
        if c == 0 {
            dst.fill(0);
            return;
        }
        if c == 1 {
            return;
        }
        match self {
            Field::Binary => {}
            Field::Binary4 => {
                let table = &MUL4_BYTES[c as usize];
                for d in dst.iter_mut() {
                    *d = table[*d as usize];
                }
            }
            Field::Binary8 => {
                let table = &MUL8[c as usize];
                for d in dst.iter_mut() {
                    *d = table[*d as usize];
                }
            }
            Field::Binary16 => {
                for pair in dst.chunks_exact_mut(2) {
                    let v = mul16(u16::from_be_bytes([pair[0], pair[1]]), c);
                    pair.copy_from_slice(&v.to_be_bytes());
                }
            }
        }
    }

    /// `dst += c * src`
    pub fn multiply_add_slice(self, dst: &mut [u8], src: &[u8], c: u16) {
        debug_assert_eq!(dst.len(), src.len());
        if c == 0 {
            return;
        }
        if c == 1 {
            self.add_slice(dst, src);
            return;
        }
        match self {
            Field::Binary => self.add_slice(dst, src),
            Field::Binary4 => {
                let table = &MUL4_BYTES[c as usize];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d ^= table[*s as usize];
                }
            }
            Field::Binary8 => {
                let table = &MUL8[c as usize];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d ^= table[*s as usize];
                }
            }
            Field::Binary16 => {
                for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                    let v = mul16(u16::from_be_bytes([s[0], s[1]]), c);
                    let [hi, lo] = v.to_be_bytes();
                    d[0] ^= hi;
                    d[1] ^= lo;
                }
            }
        }
    }

    /// Indices of the non-zero elements among the first `count` of `buf`.
    pub fn nonzero_indices(self, buf: &[u8], count: usize) -> impl Iterator<Item = usize> + '_ {
        (0..count).filter(move |&i| self.get_value(buf, i) != 0)
    }

    /// Index of the first non-zero element among the first `count`.
    pub fn first_nonzero(self, buf: &[u8], count: usize) -> Option<usize> {
        self.nonzero_indices(buf, count).next()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Binary => "binary",
            Field::Binary4 => "binary4",
            Field::Binary8 => "binary8",
            Field::Binary16 => "binary16",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
