//! Weight extraction: where each element's weight comes from.
//!
//! - [`Direct`]: the element is its own weight.
//! - [`By`]: a closure reads the weight, checked at compile time.
//! - [`Named`]: a field looked up by name through [`FieldAccessor`].
//!
//! Every extractor resolves the weight domain from the element *type* before
//! reading any element, then coerces all weights in one pass.

use std::any::type_name;

use rust_decimal::Decimal;

use crate::coerce::{Domain, Weight, WeightKind, Weights};
use crate::error::SampleError;

/// Supplies the weights of a collection of `T`.
pub trait WeightExtractor<T: ?Sized> {
    /// Accumulation domain for this element type.
    ///
    /// Type-level: no element is inspected.
    fn domain(&self) -> Result<Domain, SampleError>;

    /// Extract and coerce every weight, in collection order.
    fn weights<'a, I>(&self, items: I) -> Result<Weights, SampleError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a;
}

/// The element itself is the weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl<T: Weight + ?Sized> WeightExtractor<T> for Direct {
    fn domain(&self) -> Result<Domain, SampleError> {
        T::KIND.domain(type_name::<T>())
    }

    fn weights<'a, I>(&self, items: I) -> Result<Weights, SampleError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        Weights::collect(items)
    }
}

/// Weight read by a closure, e.g. `By(|task: &Task| task.priority)`.
#[derive(Debug, Clone, Copy)]
pub struct By<F>(pub F);

impl<T, F, W> WeightExtractor<T> for By<F>
where
    F: Fn(&T) -> W,
    W: Weight,
{
    fn domain(&self) -> Result<Domain, SampleError> {
        W::KIND.domain(type_name::<W>())
    }

    fn weights<'a, I>(&self, items: I) -> Result<Weights, SampleError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        Weights::collect(items.into_iter().map(&self.0))
    }
}

/// Typed getter for one field of `T`, returned by [`FieldAccessor::field`].
pub enum Field<T> {
    Unsigned(fn(&T) -> u64),
    Signed(fn(&T) -> i64),
    Float(fn(&T) -> f64),
    Decimal(fn(&T) -> Decimal),
    Text(fn(&T) -> &str),
    /// The field exists but does not hold a number.
    Opaque,
}

impl<T> Field<T> {
    pub fn kind(&self) -> WeightKind {
        match self {
            Self::Unsigned(_) | Self::Signed(_) => WeightKind::Integer,
            Self::Float(_) | Self::Decimal(_) => WeightKind::Float,
            Self::Text(_) => WeightKind::NumericString,
            Self::Opaque => WeightKind::NonNumeric,
        }
    }
}

/// Name-based field lookup for an element type.
///
/// ```
/// use fukubiki::{Field, FieldAccessor};
///
/// struct Prize {
///     name: &'static str,
///     odds: u32,
/// }
///
/// impl FieldAccessor for Prize {
///     fn field(name: &str) -> Option<Field<Self>> {
///         match name {
///             "odds" => Some(Field::Unsigned(|p| u64::from(p.odds))),
///             "name" => Some(Field::Opaque),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait FieldAccessor: Sized {
    /// Getter for field `name`, or `None` if the type has no such field.
    fn field(name: &str) -> Option<Field<Self>>;
}

/// Weight read from the field called `.0`.
#[derive(Debug, Clone, Copy)]
pub struct Named<'n>(pub &'n str);

impl Named<'_> {
    fn resolve<T: FieldAccessor>(&self) -> Result<Field<T>, SampleError> {
        T::field(self.0).ok_or_else(|| SampleError::FieldNotFound {
            field: self.0.to_owned(),
            type_name: type_name::<T>(),
        })
    }
}

impl<T: FieldAccessor> WeightExtractor<T> for Named<'_> {
    fn domain(&self) -> Result<Domain, SampleError> {
        self.resolve::<T>()?.kind().domain(self.0)
    }

    fn weights<'a, I>(&self, items: I) -> Result<Weights, SampleError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let items = items.into_iter();
        match self.resolve::<T>()? {
            Field::Unsigned(get) => Weights::collect(items.map(get)),
            Field::Signed(get) => Weights::collect(items.map(get)),
            Field::Float(get) => Weights::collect(items.map(get)),
            Field::Decimal(get) => Weights::collect(items.map(get)),
            Field::Text(get) => Weights::collect(items.map(get)),
            Field::Opaque => Err(SampleError::NonNumericWeight {
                source_name: self.0.to_owned(),
            }),
        }
    }
}
