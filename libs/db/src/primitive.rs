//! Byte-exact codecs for scalar leaf values.
//!
//! Fixed-width types are stored big-endian at their natural width (two's
//! complement for integers, IEEE-754 for floats). Variable-width types are
//! built on the raw byte-sequence codec through [`Adapter`]:
//!
//! ```text
//!   Native<i8>      ──Adapter──▶ bool
//!   Native<Vec<u8>> ──Adapter──▶ String | BigInt | Decimal
//! ```
//!
//! These layouts are shared with data already in storage and must not change.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};

use crate::error::ValueError;

// ============================================================================
// Codec
// ============================================================================

/// Encoder/decoder pair for one Rust type.
///
/// `decode(encode(v)) == v` for every `v`.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<T, ValueError>;

    /// Exact encoded width for fixed-width types, `None` for variable width.
    fn width(&self) -> Option<usize> {
        None
    }
}

/// A type with a native byte layout.
pub trait Primitive: Sized {
    const WIDTH: Option<usize>;

    fn to_bytes(&self) -> Vec<u8>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError>;
}

macro_rules! fixed_width_primitive {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: Option<usize> = Some($width);

                #[inline]
                fn to_bytes(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }

                #[inline]
                fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
                    let raw: [u8; $width] =
                        bytes.try_into().map_err(|_| ValueError::WidthMismatch {
                            expected: $width,
                            actual: bytes.len(),
                        })?;
                    Ok(<$ty>::from_be_bytes(raw))
                }
            }
        )*
    };
}

fixed_width_primitive! {
    i8 => 1,
    u16 => 2,
    i16 => 2,
    i32 => 4,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

impl Primitive for Vec<u8> {
    const WIDTH: Option<usize> = None;

    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        Ok(bytes.to_vec())
    }
}

/// Codec for a [`Primitive`] type, using its native layout.
pub struct Native<T>(PhantomData<fn() -> T>);

impl<T> Native<T> {
    pub const fn new() -> Self {
        Native(PhantomData)
    }
}

impl<T> Default for Native<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Native<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for Native<T> {}

impl<T: Primitive> Codec<T> for Native<T> {
    fn encode(&self, value: &T) -> Vec<u8> {
        value.to_bytes()
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, ValueError> {
        T::from_bytes(bytes)
    }

    fn width(&self) -> Option<usize> {
        T::WIDTH
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Codec for `U` derived from a codec for `T` and a pair of conversions.
///
/// `into` runs after the base decoder, `from` before the base encoder. The
/// two must be mutually inverse over every value the encoder can produce.
pub struct Adapter<C, T, U> {
    base: C,
    into: fn(T) -> Result<U, ValueError>,
    from: fn(&U) -> T,
}

impl<C, T, U> Adapter<C, T, U> {
    pub const fn new(base: C, into: fn(T) -> Result<U, ValueError>, from: fn(&U) -> T) -> Self {
        Adapter { base, into, from }
    }
}

impl<C: Clone, T, U> Clone for Adapter<C, T, U> {
    fn clone(&self) -> Self {
        Adapter {
            base: self.base.clone(),
            into: self.into,
            from: self.from,
        }
    }
}

impl<C, T, U> Codec<U> for Adapter<C, T, U>
where
    C: Codec<T>,
{
    fn encode(&self, value: &U) -> Vec<u8> {
        self.base.encode(&(self.from)(value))
    }

    fn decode(&self, bytes: &[u8]) -> Result<U, ValueError> {
        (self.into)(self.base.decode(bytes)?)
    }

    fn width(&self) -> Option<usize> {
        self.base.width()
    }
}

// ============================================================================
// Derived codecs
// ============================================================================

pub type BoolCodec = Adapter<Native<i8>, i8, bool>;
pub type TextCodec = Adapter<Native<Vec<u8>>, Vec<u8>, String>;
pub type BigIntCodec = Adapter<Native<Vec<u8>>, Vec<u8>, BigInt>;
pub type DecimalCodec = Adapter<Native<Vec<u8>>, Vec<u8>, Decimal>;

pub fn native<T: Primitive>() -> Native<T> {
    Native::new()
}

/// Booleans as a single byte: 1 is true, every other byte is false.
pub fn bool_codec() -> BoolCodec {
    Adapter::new(Native::new(), |byte| Ok(byte == 1), |flag| i8::from(*flag))
}

/// Text as its raw UTF-8 bytes.
pub fn text_codec() -> TextCodec {
    Adapter::new(
        Native::new(),
        |bytes| String::from_utf8(bytes).map_err(ValueError::from),
        |text| text.as_bytes().to_vec(),
    )
}

/// Arbitrary-precision integers as minimal two's-complement big-endian bytes.
pub fn big_int_codec() -> BigIntCodec {
    Adapter::new(
        Native::new(),
        |bytes| Ok(BigInt::from_signed_bytes_be(&bytes)),
        |n| n.to_signed_bytes_be(),
    )
}

/// Decimals as a 4-byte big-endian scale followed by the unscaled value.
pub fn decimal_codec() -> DecimalCodec {
    Adapter::new(Native::new(), Decimal::from_stored, Decimal::to_stored)
}

// ============================================================================
// Decimal
// ============================================================================

const SCALE_WIDTH: usize = 4;

/// Arbitrary-precision decimal: `unscaled * 10^-scale`.
///
/// Equality is representational: `1.0` and `1.00` differ in scale and are
/// not equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i32,
}

impl Decimal {
    pub fn new(unscaled: impl Into<BigInt>, scale: i32) -> Self {
        Decimal {
            unscaled: unscaled.into(),
            scale,
        }
    }

    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    fn to_stored(&self) -> Vec<u8> {
        let unscaled = self.unscaled.to_signed_bytes_be();
        let mut bytes = Vec::with_capacity(SCALE_WIDTH + unscaled.len());
        bytes.extend_from_slice(&self.scale.to_be_bytes());
        bytes.extend_from_slice(&unscaled);
        bytes
    }

    fn from_stored(bytes: Vec<u8>) -> Result<Self, ValueError> {
        if bytes.len() < SCALE_WIDTH {
            return Err(ValueError::Truncated {
                minimum: SCALE_WIDTH,
                actual: bytes.len(),
            });
        }
        let (scale, unscaled) = bytes.split_at(SCALE_WIDTH);
        let scale = i32::from_bytes(scale)?;
        Ok(Decimal {
            unscaled: BigInt::from_signed_bytes_be(unscaled),
            scale,
        })
    }
}

/// Most zeros plain notation pads with before switching to `<digits>E<exp>`.
const MAX_PLAIN_ZEROS: usize = 32;

impl fmt::Display for Decimal {
    /// Plain notation, e.g. `-12.50`; negative scales append zeros. When
    /// that would take more than 32 padding zeros the value is written as
    /// `<unscaled>E<-scale>` instead, e.g. `5E-40`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.magnitude().to_string();
        let sign = if self.unscaled.sign() == Sign::Minus {
            "-"
        } else {
            ""
        };

        let scale = self.scale.unsigned_abs() as usize;
        let zeros = match self.scale {
            _ if self.unscaled.sign() == Sign::NoSign && self.scale <= 0 => 0,
            s if s <= 0 => scale,
            _ => scale.saturating_sub(digits.len()),
        };
        if zeros > MAX_PLAIN_ZEROS {
            return write!(f, "{}{}E{}", sign, digits, -i64::from(self.scale));
        }

        if self.scale <= 0 {
            return write!(f, "{}{}{}", sign, digits, "0".repeat(zeros));
        }

        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            write!(
                f,
                "{}0.{}{}",
                sign,
                "0".repeat(scale - digits.len()),
                digits
            )
        }
    }
}

/// Error parsing a [`Decimal`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal: {:?}", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parses optional sign, digits, optional fraction, optional `E<exp>`.
    /// The scale is the number of fraction digits minus the exponent.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(s.to_string());

        let (mantissa, exponent) = match s.split_once(['E', 'e']) {
            Some((m, e)) => (m, e.parse::<i64>().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let (negative, body) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let digits = format!("{}{}", int_part, frac_part);
        let magnitude = BigInt::from_str(&digits).map_err(|_| invalid())?;
        let unscaled = if negative { -magnitude } else { magnitude };
        let scale = i64::try_from(frac_part.len())
            .ok()
            .and_then(|frac| frac.checked_sub(exponent))
            .and_then(|scale| i32::try_from(scale).ok())
            .ok_or_else(invalid)?;
        Ok(Decimal { unscaled, scale })
    }
}
