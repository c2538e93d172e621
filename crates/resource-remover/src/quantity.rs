//! Parsing of Kubernetes resource quantities.
//!
//! A quantity is a decimal number followed by an optional suffix: a binary SI
//! suffix (`Ki`, `Mi`, ...), a decimal SI suffix (`m`, `k`, `M`, ...) or a
//! decimal exponent (`e3`, `E-2`). Conversions round up, the same way the
//! Kubernetes API server computes `MilliValue()` and `Value()`.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::QuantityError;

lazy_static! {
    static ref QUANTITY_REGEX: Regex = Regex::new(
        r"^([+-]?)([0-9]*)(?:\.([0-9]*))?(Ki|Mi|Gi|Ti|Pi|Ei|[eE][+-]?[0-9]+|n|u|m|k|M|G|T|P|E)?$"
    )
    .expect("quantity regex must compile");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Multiplier {
    /// Power of 1024
    Binary(u32),
    /// Power of 10
    Decimal(i32),
}

/// Exact representation of a quantity: `mantissa / 10^fraction_digits * multiplier`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParsedQuantity {
    mantissa: u128,
    fraction_digits: u32,
    multiplier: Multiplier,
}

impl ParsedQuantity {
    pub(crate) fn parse(input: &str) -> Result<Self, QuantityError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }

        let captures = QUANTITY_REGEX
            .captures(trimmed)
            .ok_or_else(|| QuantityError::Malformed(input.to_owned()))?;

        let integer = captures.get(2).map_or("", |m| m.as_str());
        let fraction = captures.get(3).map_or("", |m| m.as_str());
        if integer.is_empty() && fraction.is_empty() {
            return Err(QuantityError::Malformed(input.to_owned()));
        }

        let digits = format!("{integer}{fraction}");
        let mantissa = digits
            .parse::<u128>()
            .map_err(|_| QuantityError::Overflow(input.to_owned()))?;

        if captures.get(1).map(|m| m.as_str()) == Some("-") && mantissa != 0 {
            return Err(QuantityError::Negative(input.to_owned()));
        }

        let multiplier = match captures.get(4).map(|m| m.as_str()) {
            None => Multiplier::Decimal(0),
            Some("Ki") => Multiplier::Binary(1),
            Some("Mi") => Multiplier::Binary(2),
            Some("Gi") => Multiplier::Binary(3),
            Some("Ti") => Multiplier::Binary(4),
            Some("Pi") => Multiplier::Binary(5),
            Some("Ei") => Multiplier::Binary(6),
            Some("n") => Multiplier::Decimal(-9),
            Some("u") => Multiplier::Decimal(-6),
            Some("m") => Multiplier::Decimal(-3),
            Some("k") => Multiplier::Decimal(3),
            Some("M") => Multiplier::Decimal(6),
            Some("G") => Multiplier::Decimal(9),
            Some("T") => Multiplier::Decimal(12),
            Some("P") => Multiplier::Decimal(15),
            Some("E") => Multiplier::Decimal(18),
            Some(exponent) => Multiplier::Decimal(
                exponent[1..]
                    .parse::<i32>()
                    .map_err(|_| QuantityError::Overflow(input.to_owned()))?,
            ),
        };

        Ok(ParsedQuantity {
            mantissa,
            fraction_digits: fraction.len() as u32,
            multiplier,
        })
    }

    /// Value expressed in units of `10^-scale`, rounded up.
    fn scaled_ceil(&self, scale: i32, original: &str) -> Result<u64, QuantityError> {
        let overflow = || QuantityError::Overflow(original.to_owned());

        let (binary_power, decimal_exponent) = match self.multiplier {
            Multiplier::Binary(power) => (power, 0),
            Multiplier::Decimal(exponent) => (0, exponent),
        };
        let exponent = decimal_exponent
            .checked_add(scale)
            .and_then(|e| e.checked_sub(self.fraction_digits as i32))
            .ok_or_else(overflow)?;

        let mut numerator = self
            .mantissa
            .checked_mul(1024u128.checked_pow(binary_power).ok_or_else(overflow)?)
            .ok_or_else(overflow)?;
        let mut denominator: u128 = 1;
        if exponent >= 0 {
            numerator = numerator
                .checked_mul(10u128.checked_pow(exponent as u32).ok_or_else(overflow)?)
                .ok_or_else(overflow)?;
        } else {
            match 10u128.checked_pow(exponent.unsigned_abs()) {
                Some(d) => denominator = d,
                // anything divided by a number this large rounds up to 0 or 1
                None => return Ok(u64::from(numerator != 0)),
            }
        }

        let value = numerator.div_ceil(denominator);
        u64::try_from(value).map_err(|_| overflow())
    }
}

/// CPU quantity in millicores, rounded up.
pub fn cpu_millis(quantity: &Quantity) -> Result<u64, QuantityError> {
    ParsedQuantity::parse(&quantity.0)?.scaled_ceil(3, &quantity.0)
}

/// Memory quantity in bytes, rounded up.
pub fn memory_bytes(quantity: &Quantity) -> Result<u64, QuantityError> {
    ParsedQuantity::parse(&quantity.0)?.scaled_ceil(0, &quantity.0)
}

pub fn cpu_quantity(millis: u64) -> Quantity {
    Quantity(format!("{millis}m"))
}

pub fn memory_quantity(bytes: u64) -> Quantity {
    Quantity(bytes.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn q(s: &str) -> Quantity {
        Quantity(s.to_owned())
    }

    #[rstest]
    #[case("100m", 100)]
    #[case("1", 1000)]
    #[case("0.5", 500)]
    #[case(".25", 250)]
    #[case("2.", 2000)]
    #[case("1.5k", 1_500_000)]
    #[case("1e-3", 1)]
    #[case("1E2", 100_000)]
    #[case("0.0001", 1)]
    #[case("100u", 1)]
    #[case("0", 0)]
    #[case("+3", 3000)]
    fn cpu_quantities(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(cpu_millis(&q(input)).unwrap(), expected);
    }

    #[rstest]
    #[case("200Mi", 209_715_200)]
    #[case("1Gi", 1_073_741_824)]
    #[case("1.5Gi", 1_610_612_736)]
    #[case("128974848", 128_974_848)]
    #[case("129e6", 129_000_000)]
    #[case("129M", 129_000_000)]
    #[case("123Ki", 125_952)]
    #[case("1k", 1000)]
    #[case("1500m", 2)]
    fn memory_quantities(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(memory_bytes(&q(input)).unwrap(), expected);
    }

    #[rstest]
    #[case("", QuantityError::Empty)]
    #[case("abc", QuantityError::Malformed("abc".to_owned()))]
    #[case("Mi", QuantityError::Malformed("Mi".to_owned()))]
    #[case("1.2.3", QuantityError::Malformed("1.2.3".to_owned()))]
    #[case("10Xi", QuantityError::Malformed("10Xi".to_owned()))]
    #[case("-1", QuantityError::Negative("-1".to_owned()))]
    #[case("1e40", QuantityError::Overflow("1e40".to_owned()))]
    fn invalid_quantities(#[case] input: &str, #[case] expected: QuantityError) {
        assert_eq!(cpu_millis(&q(input)).unwrap_err(), expected);
    }

    #[test]
    fn tiny_exponents_round_up() {
        assert_eq!(memory_bytes(&q("1e-50")).unwrap(), 1);
        assert_eq!(memory_bytes(&q("0e-50")).unwrap(), 0);
    }

    #[test]
    fn formatting() {
        assert_eq!(cpu_quantity(20), q("20m"));
        assert_eq!(memory_quantity(41_943_040), q("41943040"));
    }
}
