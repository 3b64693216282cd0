use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// The primitive scalar: one extended-precision decimal number, carried by
/// copy on the value stack and reinterpreted as boolean/integer/bit pattern
/// as instructions require. Never heap-allocated.
///
/// Equality and hashing are defined over the numeric value, so a `Value`
/// can key a map directly.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Value {
    pub num: Decimal,
}

impl Value {
    pub fn new(num: Decimal) -> Self {
        Self { num }
    }

    pub fn as_bool(&self) -> bool {
        !self.num.is_zero()
    }

    pub fn set_bool(&mut self, value: bool) {
        self.num = if value { Decimal::ONE } else { Decimal::ZERO };
    }

    /// Floor, then saturate into i64.
    pub fn as_i64(&self) -> i64 {
        let floored = self.num.floor();
        floored.to_i64().unwrap_or_else(|| {
            if floored.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    }

    pub fn as_i32(&self) -> i32 {
        let floored = self.num.floor();
        floored.to_i32().unwrap_or_else(|| {
            if floored.is_sign_negative() {
                i32::MIN
            } else {
                i32::MAX
            }
        })
    }

    /// 64-bit bit pattern view, used to pack composite data such as
    /// date/time fields. Negative or fractional numbers have no pattern.
    pub fn as_u64(&self) -> u64 {
        self.num.floor().to_u64().unwrap_or(0)
    }

    /// Nonnegative integral index, or `None` when the number is negative or
    /// too large to address anything. Callers turn `None` into their own
    /// out-of-range handling.
    pub fn as_index(&self) -> Option<usize> {
        let floored = self.num.floor();
        if floored.is_sign_negative() && !floored.is_zero() {
            return None;
        }
        floored.to_usize()
    }
}

impl From<Decimal> for Value {
    fn from(num: Decimal) -> Self {
        Self { num }
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Self { num: Decimal::from(num) }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        let mut v = Self::default();
        v.set_bool(value);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn default_value_is_zero_and_false() {
        let v = Value::default();
        assert_eq!(v.num, Decimal::ZERO);
        assert!(!v.as_bool());
    }

    #[test]
    fn as_i64_floors_toward_negative_infinity() {
        let v = Value::new(Decimal::from_str("2.9").unwrap());
        assert_eq!(v.as_i64(), 2);
        let v = Value::new(Decimal::from_str("-2.1").unwrap());
        assert_eq!(v.as_i64(), -3);
    }

    #[test]
    fn as_index_rejects_negatives() {
        assert_eq!(Value::from(-1).as_index(), None);
        assert_eq!(Value::from(0).as_index(), Some(0));
        assert_eq!(Value::from(7).as_index(), Some(7));
    }

    #[test]
    fn equality_is_numeric_not_textual() {
        let a = Value::new(Decimal::from_str("1.50").unwrap());
        let b = Value::new(Decimal::from_str("1.5").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn bool_round_trip() {
        let mut v = Value::default();
        v.set_bool(true);
        assert!(v.as_bool());
        assert_eq!(v, Value::from(true));
        v.set_bool(false);
        assert!(!v.as_bool());
    }
}
