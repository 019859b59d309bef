//! Numeric coercion: which accumulation domain a weight type uses, and how a
//! single weight is converted into it.
//!
//! The representation is a property of the *type*, fixed by [`Weight::KIND`].
//! A collection never mixes domains: integers accumulate in `u64`, while
//! floats, decimals and numeric strings accumulate in [`Decimal`] so that
//! summing many small weights does not drift the way repeated `f64` addition
//! does.

use std::borrow::Cow;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::SampleError;

/// Static numeric category of a weight source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKind {
    /// Integral types.
    Integer,
    /// Binary floats and decimals.
    Float,
    /// Text that must parse as a number.
    NumericString,
    /// Anything else. Always rejected.
    NonNumeric,
}

/// Accumulation type used for one sampling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    UnsignedInteger,
    Decimal,
}

impl WeightKind {
    /// Map a kind to its accumulation domain.
    ///
    /// `source_name` only feeds the error message for [`WeightKind::NonNumeric`].
    pub fn domain(self, source_name: &str) -> Result<Domain, SampleError> {
        match self {
            Self::Integer => Ok(Domain::UnsignedInteger),
            Self::Float | Self::NumericString => Ok(Domain::Decimal),
            Self::NonNumeric => Err(SampleError::NonNumericWeight {
                source_name: source_name.to_owned(),
            }),
        }
    }
}

/// Why one element's weight could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Negative,
    NonFinite,
    Unparseable,
    Overflow,
}

impl Rejection {
    /// Attach the element position.
    pub fn at(self, index: usize) -> SampleError {
        match self {
            Self::Negative => SampleError::NegativeWeight { index },
            Self::NonFinite => SampleError::NonFiniteWeight { index },
            Self::Unparseable => SampleError::MixedRepresentationRejected { index },
            Self::Overflow => SampleError::WeightOverflow,
        }
    }
}

/// A value usable as a sampling weight.
///
/// Implemented for the primitive integers and floats, [`Decimal`], and text
/// (`str`, `String`, `Cow<str>`), plus references and boxes of those.
pub trait Weight {
    /// Representation shared by every value of this type.
    const KIND: WeightKind;

    /// Value in the unsigned integer domain.
    fn to_unsigned(&self) -> Result<u64, Rejection>;

    /// Value in the decimal domain.
    fn to_decimal(&self) -> Result<Decimal, Rejection>;

    /// `floor(log2(self))` for a positive binary float, `None` otherwise.
    fn binary_exponent(&self) -> Option<i32> {
        None
    }

    /// Value in the decimal domain after scaling by `2^lift`.
    ///
    /// Only binary floats scale; every other weight ignores `lift`.
    fn to_decimal_lifted(&self, _lift: i32) -> Result<Decimal, Rejection> {
        self.to_decimal()
    }
}

fn non_negative(value: Decimal) -> Result<Decimal, Rejection> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Rejection::Negative);
    }
    Ok(value)
}

fn decimal_to_unsigned(value: Decimal) -> Result<u64, Rejection> {
    non_negative(value)?.trunc().to_u64().ok_or(Rejection::Overflow)
}

macro_rules! impl_unsigned_weight {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::Integer;

            #[inline]
            fn to_unsigned(&self) -> Result<u64, Rejection> {
                u64::try_from(*self).map_err(|_| Rejection::Overflow)
            }

            #[inline]
            fn to_decimal(&self) -> Result<Decimal, Rejection> {
                self.to_unsigned().map(Decimal::from)
            }
        }
    )*};
}

macro_rules! impl_signed_weight {
    ($($t:ty),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::Integer;

            #[inline]
            fn to_unsigned(&self) -> Result<u64, Rejection> {
                if *self < 0 {
                    return Err(Rejection::Negative);
                }
                u64::try_from(*self).map_err(|_| Rejection::Overflow)
            }

            #[inline]
            fn to_decimal(&self) -> Result<Decimal, Rejection> {
                self.to_unsigned().map(Decimal::from)
            }
        }
    )*};
}

impl_unsigned_weight!(u8, u16, u32, u64, u128, usize);
impl_signed_weight!(i8, i16, i32, i64, i128, isize);

/// Largest binary exponent below which a float vector is lifted before
/// conversion, so tiny weights do not round to zero in `Decimal`.
const TINY_EXPONENT: i32 = -40;

/// Largest power of two applied in one multiplication while lifting.
const LIFT_STEP: i32 = 64;

macro_rules! impl_float_weight {
    ($($t:ty => $from:ident),*) => {$(
        impl Weight for $t {
            const KIND: WeightKind = WeightKind::Float;

            fn to_unsigned(&self) -> Result<u64, Rejection> {
                self.to_decimal().and_then(decimal_to_unsigned)
            }

            fn to_decimal(&self) -> Result<Decimal, Rejection> {
                self.to_decimal_lifted(0)
            }

            fn binary_exponent(&self) -> Option<i32> {
                (self.is_finite() && *self > 0.0).then(|| self.log2().floor() as i32)
            }

            fn to_decimal_lifted(&self, lift: i32) -> Result<Decimal, Rejection> {
                if !self.is_finite() {
                    return Err(Rejection::NonFinite);
                }
                if *self < 0.0 {
                    return Err(Rejection::Negative);
                }
                let mut value = *self;
                let mut remaining = lift;
                while remaining > 0 {
                    let step = remaining.min(LIFT_STEP);
                    value *= (2.0 as $t).powi(step);
                    remaining -= step;
                }
                // Finite but beyond Decimal's ~7.9e28 range.
                Decimal::$from(value).ok_or(Rejection::Overflow)
            }
        }
    )*};
}

impl_float_weight!(f32 => from_f32, f64 => from_f64);

impl Weight for Decimal {
    const KIND: WeightKind = WeightKind::Float;

    fn to_unsigned(&self) -> Result<u64, Rejection> {
        decimal_to_unsigned(*self)
    }

    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        non_negative(*self)
    }
}

/// Parse a numeric string: plain (`"2.5"`) or scientific (`"1e3"`) notation,
/// surrounding whitespace ignored.
pub fn parse_numeric(text: &str) -> Option<Decimal> {
    let text = text.trim();
    text.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

impl Weight for str {
    const KIND: WeightKind = WeightKind::NumericString;

    fn to_unsigned(&self) -> Result<u64, Rejection> {
        self.to_decimal().and_then(decimal_to_unsigned)
    }

    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        parse_numeric(self)
            .ok_or(Rejection::Unparseable)
            .and_then(non_negative)
    }
}

impl Weight for String {
    const KIND: WeightKind = WeightKind::NumericString;

    fn to_unsigned(&self) -> Result<u64, Rejection> {
        self.as_str().to_unsigned()
    }

    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        self.as_str().to_decimal()
    }
}

impl Weight for Cow<'_, str> {
    const KIND: WeightKind = WeightKind::NumericString;

    fn to_unsigned(&self) -> Result<u64, Rejection> {
        (**self).to_unsigned()
    }

    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        (**self).to_decimal()
    }
}

impl<W: Weight + ?Sized> Weight for &W {
    const KIND: WeightKind = W::KIND;

    #[inline]
    fn to_unsigned(&self) -> Result<u64, Rejection> {
        (**self).to_unsigned()
    }

    #[inline]
    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        (**self).to_decimal()
    }

    #[inline]
    fn binary_exponent(&self) -> Option<i32> {
        (**self).binary_exponent()
    }

    #[inline]
    fn to_decimal_lifted(&self, lift: i32) -> Result<Decimal, Rejection> {
        (**self).to_decimal_lifted(lift)
    }
}

impl<W: Weight + ?Sized> Weight for Box<W> {
    const KIND: WeightKind = W::KIND;

    #[inline]
    fn to_unsigned(&self) -> Result<u64, Rejection> {
        (**self).to_unsigned()
    }

    #[inline]
    fn to_decimal(&self) -> Result<Decimal, Rejection> {
        (**self).to_decimal()
    }

    #[inline]
    fn binary_exponent(&self) -> Option<i32> {
        (**self).binary_exponent()
    }

    #[inline]
    fn to_decimal_lifted(&self, lift: i32) -> Result<Decimal, Rejection> {
        (**self).to_decimal_lifted(lift)
    }
}

/// Coerced weights for one call, all in the same domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    Unsigned(Vec<u64>),
    Decimal(Vec<Decimal>),
}

impl Weights {
    /// Coerce every weight, in order, into the domain of `W::KIND`.
    ///
    /// This is the validation pass: the first element that cannot be coerced
    /// fails the whole call, and nothing is summed before every element has
    /// been checked.
    ///
    /// Float vectors whose largest weight is below `2^-40` are first scaled
    /// by one common power of two, bringing the largest into `[1, 2)`.
    /// Proportions are unchanged; weights more than `1e28` times smaller
    /// than the largest become zero.
    pub fn collect<I>(items: I) -> Result<Self, SampleError>
    where
        I: IntoIterator,
        I::Item: Weight,
    {
        let domain = <I::Item as Weight>::KIND.domain(std::any::type_name::<I::Item>())?;
        let items = items.into_iter().enumerate();
        match domain {
            Domain::UnsignedInteger => items
                .map(|(i, w)| w.to_unsigned().map_err(|r| r.at(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Unsigned),
            Domain::Decimal => {
                let items: Vec<_> = items.collect();
                let lift = match items.iter().filter_map(|(_, w)| w.binary_exponent()).max() {
                    Some(e) if e < TINY_EXPONENT => -e,
                    _ => 0,
                };
                items
                    .iter()
                    .map(|(i, w)| w.to_decimal_lifted(lift).map_err(|r| r.at(*i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::Decimal)
            }
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Unsigned(_) => Domain::UnsignedInteger,
            Self::Decimal(_) => Domain::Decimal,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Unsigned(w) => w.len(),
            Self::Decimal(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
