use crate::boxes::FourCC;
use crate::parser::{ParseError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::fmt;
use std::io::Read;

/// How the bytes of a primitive field are interpreted by [`read_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    Unsigned,
    Signed,
    /// Raw bytes, used for type tags and brand codes.
    Char,
    /// Reserved bytes; consumed and handed back untouched.
    Void,
    /// Two unsigned halves: 8.8 for 16-bit fields, 16.16 for 32-bit fields.
    FixPoint,
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueMode::Unsigned => "unsigned",
            ValueMode::Signed => "signed",
            ValueMode::Char => "char",
            ValueMode::Void => "void",
            ValueMode::FixPoint => "fix_point",
        };
        f.write_str(s)
    }
}

/// A decoded primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Bytes(Vec<u8>),
    Fixed(FixedPoint),
}

/// A binary fixed-point number split into its integer part and the raw
/// fractional register.
///
/// `Display` renders `integer.fraction` with the fraction printed as the raw
/// register value (a 16.16 value of 1.5 shows as `1.32768`). Use
/// [`FixedPoint::to_f64`] for the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixedPoint {
    pub integer: i32,
    pub fraction: u32,
    pub fraction_bits: u8,
}

impl FixedPoint {
    pub fn to_f64(&self) -> f64 {
        self.integer as f64 + self.fraction as f64 / (1u64 << self.fraction_bits) as f64
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.integer, self.fraction)
    }
}

/// Read one primitive of `bits` width, interpreted according to `mode`.
///
/// Supported combinations:
/// - unsigned: 8, 16, 24, 32, 48, 64
/// - signed: 8, 16, 32, 64
/// - char / void: any non-zero multiple of 8
/// - fix_point: 16, 32
///
/// Anything else fails with [`ParseError::Unsupported`] before any byte is
/// consumed.
pub fn read_value<R: Read>(r: &mut R, bits: u32, mode: ValueMode) -> Result<Value> {
    let unsupported = ParseError::Unsupported { bits, mode };
    match mode {
        ValueMode::Unsigned => {
            let v = match bits {
                8 => be_u8(r)? as u64,
                16 => be_u16(r)? as u64,
                24 => be_u24(r)? as u64,
                32 => be_u32(r)? as u64,
                48 => be_u48(r)?,
                64 => be_u64(r)?,
                _ => return Err(unsupported),
            };
            Ok(Value::Unsigned(v))
        }
        ValueMode::Signed => {
            let v = match bits {
                8 => be_i8(r)? as i64,
                16 => be_i16(r)? as i64,
                32 => be_i32(r)? as i64,
                64 => be_i64(r)?,
                _ => return Err(unsupported),
            };
            Ok(Value::Signed(v))
        }
        ValueMode::Char | ValueMode::Void => {
            if bits == 0 || bits % 8 != 0 {
                return Err(unsupported);
            }
            let mut buf = vec![0u8; (bits / 8) as usize];
            r.read_exact(&mut buf)?;
            Ok(Value::Bytes(buf))
        }
        ValueMode::FixPoint => match bits {
            16 | 32 => Ok(Value::Fixed(read_fixed(r, bits)?)),
            _ => Err(unsupported),
        },
    }
}

/// Unsigned field whose width is only known at decode time, such as the
/// version-dependent times of `mvhd`, `tkhd` and `mdhd`.
pub fn read_uint<R: Read>(r: &mut R, bits: u32) -> Result<u64> {
    match read_value(r, bits, ValueMode::Unsigned)? {
        Value::Unsigned(v) => Ok(v),
        _ => Err(ParseError::Unsupported {
            bits,
            mode: ValueMode::Unsigned,
        }),
    }
}

/// Signed counterpart of [`read_uint`].
pub fn read_int<R: Read>(r: &mut R, bits: u32) -> Result<i64> {
    match read_value(r, bits, ValueMode::Signed)? {
        Value::Signed(v) => Ok(v),
        _ => Err(ParseError::Unsupported {
            bits,
            mode: ValueMode::Signed,
        }),
    }
}

pub fn be_u8<R: Read>(r: &mut R) -> Result<u8> {
    Ok(r.read_u8()?)
}

pub fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(r.read_u16::<BigEndian>()?)
}

pub fn be_u24<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 3];
    r.read_exact(&mut b)?;
    Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32))
}

pub fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(r.read_u32::<BigEndian>()?)
}

pub fn be_u48<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 6];
    r.read_exact(&mut b)?;
    Ok(b.iter().fold(0u64, |acc, &x| (acc << 8) | x as u64))
}

pub fn be_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(r.read_u64::<BigEndian>()?)
}

pub fn be_i8<R: Read>(r: &mut R) -> Result<i8> {
    Ok(r.read_i8()?)
}

pub fn be_i16<R: Read>(r: &mut R) -> Result<i16> {
    Ok(r.read_i16::<BigEndian>()?)
}

pub fn be_i32<R: Read>(r: &mut R) -> Result<i32> {
    Ok(r.read_i32::<BigEndian>()?)
}

pub fn be_i64<R: Read>(r: &mut R) -> Result<i64> {
    Ok(r.read_i64::<BigEndian>()?)
}

pub fn read_fourcc<R: Read>(r: &mut R) -> Result<FourCC> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(FourCC(b))
}

/// Consume `n` reserved bytes.
pub fn skip_reserved<R: Read>(r: &mut R, n: u64) -> Result<()> {
    let copied = std::io::copy(&mut r.by_ref().take(n), &mut std::io::sink())?;
    if copied < n {
        return Err(ParseError::Truncated);
    }
    Ok(())
}

/// Unsigned fixed point with two equal halves (8.8 or 16.16).
pub fn read_fixed<R: Read>(r: &mut R, bits: u32) -> Result<FixedPoint> {
    match bits {
        16 => Ok(FixedPoint {
            integer: be_u8(r)? as i32,
            fraction: be_u8(r)? as u32,
            fraction_bits: 8,
        }),
        32 => Ok(FixedPoint {
            integer: be_u16(r)? as i32,
            fraction: be_u16(r)? as u32,
            fraction_bits: 16,
        }),
        _ => Err(ParseError::Unsupported {
            bits,
            mode: ValueMode::FixPoint,
        }),
    }
}

/// Two's complement fixed point with two equal halves; the integer part
/// carries the sign.
pub fn read_signed_fixed<R: Read>(r: &mut R, bits: u32) -> Result<FixedPoint> {
    match bits {
        16 => {
            let raw = be_i16(r)?;
            Ok(FixedPoint {
                integer: (raw >> 8) as i32,
                fraction: (raw as u16 & 0xff) as u32,
                fraction_bits: 8,
            })
        }
        32 => {
            let raw = be_i32(r)?;
            Ok(FixedPoint {
                integer: raw >> 16,
                fraction: raw as u32 & 0xffff,
                fraction_bits: 16,
            })
        }
        _ => Err(ParseError::Unsupported {
            bits,
            mode: ValueMode::FixPoint,
        }),
    }
}

/// Decode a packed ISO-639-2/T language code (three 5-bit letters).
pub fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char)
}
