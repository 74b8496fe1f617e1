//! Typed element comparison.
//!
//! Tag buffers hold little-endian primitives. [`Scalar`] decodes one element
//! with the width and signedness of its datatype so that comparisons and
//! deadband differences use native semantics instead of raw bytes.

use std::cmp::Ordering;

use crate::datatype::DataType;

/// One decoded element of a numeric datatype.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

macro_rules! read_le {
    ($ty:ty, $bytes:expr) => {{
        const N: usize = std::mem::size_of::<$ty>();
        let raw: [u8; N] = $bytes.get(..N)?.try_into().ok()?;
        <$ty>::from_le_bytes(raw)
    }};
}

impl Scalar {
    /// Decode the element at the start of `bytes`.
    ///
    /// Returns `None` for `BOOL`, composite types, or a buffer shorter than
    /// one element.
    #[must_use]
    pub fn decode(datatype: DataType, bytes: &[u8]) -> Option<Self> {
        let value = match datatype {
            DataType::Byte => Self::U8(read_le!(u8, bytes)),
            DataType::Sint | DataType::Char => Self::I8(read_le!(i8, bytes)),
            DataType::Word | DataType::Uint => Self::U16(read_le!(u16, bytes)),
            DataType::Int => Self::I16(read_le!(i16, bytes)),
            DataType::Dword | DataType::Udint | DataType::Time => Self::U32(read_le!(u32, bytes)),
            DataType::Dint => Self::I32(read_le!(i32, bytes)),
            DataType::Lword | DataType::Ulint => Self::U64(read_le!(u64, bytes)),
            DataType::Lint => Self::I64(read_le!(i64, bytes)),
            DataType::Real => Self::F32(read_le!(f32, bytes)),
            DataType::Lreal => Self::F64(read_le!(f64, bytes)),
            DataType::Bool | DataType::Custom(_) => return None,
        };
        Some(value)
    }

    /// Three-way comparison of two values of the same variant.
    ///
    /// Mixed variants and NaN compare as `None`.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::U8(a), Self::U8(b)) => Some(a.cmp(b)),
            (Self::I8(a), Self::I8(b)) => Some(a.cmp(b)),
            (Self::U16(a), Self::U16(b)) => Some(a.cmp(b)),
            (Self::I16(a), Self::I16(b)) => Some(a.cmp(b)),
            (Self::U32(a), Self::U32(b)) => Some(a.cmp(b)),
            (Self::I32(a), Self::I32(b)) => Some(a.cmp(b)),
            (Self::U64(a), Self::U64(b)) => Some(a.cmp(b)),
            (Self::I64(a), Self::I64(b)) => Some(a.cmp(b)),
            (Self::F32(a), Self::F32(b)) => a.partial_cmp(b),
            (Self::F64(a), Self::F64(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Whether `|self - baseline| >= band`.
    ///
    /// Integer differences are exact (computed in `i128`); floats use their
    /// native width. Mixed variants never exceed.
    #[must_use]
    pub fn exceeds_deadband(&self, baseline: &Self, band: &Self) -> bool {
        match (self.as_i128(), baseline.as_i128(), band.as_i128()) {
            (Some(cur), Some(base), Some(band)) if self.same_variant(baseline) => {
                (cur - base).abs() >= band
            }
            _ => match (self, baseline, band) {
                (Self::F32(cur), Self::F32(base), Self::F32(band)) => (cur - base).abs() >= *band,
                (Self::F64(cur), Self::F64(base), Self::F64(band)) => (cur - base).abs() >= *band,
                _ => false,
            },
        }
    }

    fn as_i128(self) -> Option<i128> {
        match self {
            Self::U8(v) => Some(i128::from(v)),
            Self::I8(v) => Some(i128::from(v)),
            Self::U16(v) => Some(i128::from(v)),
            Self::I16(v) => Some(i128::from(v)),
            Self::U32(v) => Some(i128::from(v)),
            Self::I32(v) => Some(i128::from(v)),
            Self::U64(v) => Some(i128::from(v)),
            Self::I64(v) => Some(i128::from(v)),
            Self::F32(_) | Self::F64(_) => None,
        }
    }

    fn same_variant(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_respects_signedness() {
        let bytes = [0xFFu8, 0xFF];
        assert_eq!(Scalar::decode(DataType::Uint, &bytes), Some(Scalar::U16(u16::MAX)));
        assert_eq!(Scalar::decode(DataType::Int, &bytes), Some(Scalar::I16(-1)));
        assert_eq!(Scalar::decode(DataType::Byte, &bytes), Some(Scalar::U8(255)));
        assert_eq!(Scalar::decode(DataType::Sint, &bytes), Some(Scalar::I8(-1)));
    }

    #[test]
    fn decode_rejects_short_buffers_and_non_numeric() {
        assert_eq!(Scalar::decode(DataType::Dint, &[1, 2, 3]), None);
        assert_eq!(Scalar::decode(DataType::Bool, &[1]), None);
        assert_eq!(Scalar::decode(DataType::Custom(1), &[0; 8]), None);
    }

    #[test]
    fn float_compare_and_nan() {
        let a = Scalar::F32(1.5);
        let b = Scalar::F32(2.0);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(Scalar::F64(f64::NAN).compare(&Scalar::F64(0.0)), None);
    }

    #[test]
    fn deadband_uses_exact_integer_difference() {
        // 100 - (-100) overflows i8 but not the exact difference.
        let cur = Scalar::I8(100);
        let base = Scalar::I8(-100);
        assert!(cur.exceeds_deadband(&base, &Scalar::I8(127)));

        let cur = Scalar::U64(u64::MAX);
        let base = Scalar::U64(0);
        assert!(cur.exceeds_deadband(&base, &Scalar::U64(u64::MAX)));
        assert!(!Scalar::U64(5).exceeds_deadband(&Scalar::U64(7), &Scalar::U64(3)));
    }

    #[test]
    fn deadband_on_reals() {
        let band = Scalar::F32(2.0);
        assert!(!Scalar::F32(11.0).exceeds_deadband(&Scalar::F32(10.0), &band));
        assert!(Scalar::F32(13.0).exceeds_deadband(&Scalar::F32(10.0), &band));
        assert!(Scalar::F32(8.0).exceeds_deadband(&Scalar::F32(10.0), &band));
    }

    proptest! {
        #[test]
        fn dint_compare_matches_native(a in any::<i32>(), b in any::<i32>()) {
            let x = Scalar::decode(DataType::Dint, &a.to_le_bytes()).unwrap();
            let y = Scalar::decode(DataType::Dint, &b.to_le_bytes()).unwrap();
            prop_assert_eq!(x.compare(&y), Some(a.cmp(&b)));
        }

        #[test]
        fn udint_deadband_matches_abs_diff(a in any::<u32>(), b in any::<u32>(), band in any::<u32>()) {
            let expected = a.abs_diff(b) >= band;
            prop_assert_eq!(Scalar::U32(a).exceeds_deadband(&Scalar::U32(b), &Scalar::U32(band)), expected);
        }
    }
}
