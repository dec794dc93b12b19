use crate::error::LimitError;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// The maximum number of tasks a limiter lets run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcurrencyLimit {
  /// At most this many tasks are active at once.
  Bounded(NonZeroUsize),
  /// Every submitted task is admitted on the next scheduling tick.
  Unbounded,
}

impl ConcurrencyLimit {
  /// Returns `true` if another task may start while `active` tasks are running.
  pub fn admits(&self, active: usize) -> bool {
    match self {
      ConcurrencyLimit::Bounded(max) => active < max.get(),
      ConcurrencyLimit::Unbounded => true,
    }
  }

  /// The bound as a plain number, `None` when unbounded.
  pub fn get(&self) -> Option<usize> {
    match self {
      ConcurrencyLimit::Bounded(max) => Some(max.get()),
      ConcurrencyLimit::Unbounded => None,
    }
  }
}

impl fmt::Display for ConcurrencyLimit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConcurrencyLimit::Bounded(max) => write!(f, "{}", max),
      ConcurrencyLimit::Unbounded => f.write_str("unbounded"),
    }
  }
}

impl From<NonZeroUsize> for ConcurrencyLimit {
  fn from(max: NonZeroUsize) -> Self {
    ConcurrencyLimit::Bounded(max)
  }
}

/// Accepts `"unbounded"`, `"infinity"`, `"inf"` (any case) or a positive integer.
impl FromStr for ConcurrencyLimit {
  type Err = LimitError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    match trimmed.to_ascii_lowercase().as_str() {
      "unbounded" | "infinity" | "inf" => Ok(ConcurrencyLimit::Unbounded),
      _ => trimmed
        .parse::<i64>()
        .map_err(|_| LimitError::InvalidConcurrency(format!("{:?}", s)))
        .and_then(IntoConcurrencyLimit::into_concurrency_limit),
    }
  }
}

/// Conversion into a validated [`ConcurrencyLimit`].
///
/// Implemented for the integer, float, optional and string forms a limit is
/// usually configured with. Zero, negative, fractional, NaN and missing values
/// are rejected with [`LimitError::InvalidConcurrency`].
pub trait IntoConcurrencyLimit {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError>;
}

impl IntoConcurrencyLimit for ConcurrencyLimit {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    Ok(self)
  }
}

impl IntoConcurrencyLimit for NonZeroUsize {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    Ok(ConcurrencyLimit::Bounded(self))
  }
}

impl IntoConcurrencyLimit for usize {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    NonZeroUsize::new(self)
      .map(ConcurrencyLimit::Bounded)
      .ok_or_else(|| LimitError::InvalidConcurrency(self.to_string()))
  }
}

macro_rules! impl_for_integer {
  ($($int:ty),*) => {
    $(
      impl IntoConcurrencyLimit for $int {
        fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
          usize::try_from(self)
            .map_err(|_| LimitError::InvalidConcurrency(self.to_string()))?
            .into_concurrency_limit()
        }
      }
    )*
  };
}

impl_for_integer!(u8, u16, u32, u64, i8, i16, i32, i64, isize);

impl IntoConcurrencyLimit for f64 {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    if self == f64::INFINITY {
      return Ok(ConcurrencyLimit::Unbounded);
    }
    if !self.is_finite() || self.fract() != 0.0 || self < 1.0 || self >= usize::MAX as f64 {
      return Err(LimitError::InvalidConcurrency(self.to_string()));
    }
    (self as usize).into_concurrency_limit()
  }
}

impl<T: IntoConcurrencyLimit> IntoConcurrencyLimit for Option<T> {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    match self {
      Some(value) => value.into_concurrency_limit(),
      None => Err(LimitError::InvalidConcurrency("none".to_string())),
    }
  }
}

impl IntoConcurrencyLimit for &str {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    self.parse()
  }
}

impl IntoConcurrencyLimit for String {
  fn into_concurrency_limit(self) -> Result<ConcurrencyLimit, LimitError> {
    self.parse()
  }
}
