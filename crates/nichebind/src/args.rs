//! Caller arguments and their coercion to raw parameter types.

use wasmi::core::ValType;
use wasmi::Val;

/// A host-side argument to a wrapped export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Number(f64),
    BigInt(i64),
}

impl Arg {
    /// Coerce to the raw export's parameter type.  Never fails.
    pub(crate) fn coerce(self, ty: ValType) -> Val {
        match ty {
            ValType::I32 => Val::I32(match self {
                Self::Number(x) => to_int32(x),
                Self::BigInt(x) => x as i32,
            }),
            ValType::I64 => Val::I64(match self {
                Self::Number(x) => x as i64,
                Self::BigInt(x) => x,
            }),
            ValType::F32 => Val::F32((self.to_f64() as f32).into()),
            _ => Val::F64(self.to_f64().into()),
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Number(x) => x,
            Self::BigInt(x) => x as f64,
        }
    }
}

/// ECMAScript `ToInt32`: truncate, then wrap modulo 2^32.
fn to_int32(x: f64) -> i32 {
    if !x.is_finite() {
        return 0;
    }
    x.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(x: $ty) -> Self {
                    Arg::Number(x as f64)
                }
            }
        )*
    };
}

impl_from_number!(f64, f32, i32, u32, i16, u16, i8, u8, usize);

impl From<i64> for Arg {
    fn from(x: i64) -> Self {
        Arg::BigInt(x)
    }
}

impl From<u64> for Arg {
    fn from(x: u64) -> Self {
        Arg::BigInt(x as i64)
    }
}

impl From<bool> for Arg {
    fn from(x: bool) -> Self {
        Arg::Number(x as u8 as f64)
    }
}

/// Build an argument list from mixed numeric literals.
///
/// ```
/// use nichebind::{args, Arg};
/// assert_eq!(args![1, 2.5], vec![Arg::Number(1.0), Arg::Number(2.5)]);
/// ```
#[macro_export]
macro_rules! args {
    ($($x:expr),* $(,)?) => {
        vec![$($crate::Arg::from($x)),*]
    };
}
