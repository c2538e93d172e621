use std::{collections::BTreeSet, fmt, str::FromStr};

use crate::{
    constants::{
        DEFAULT_CPU_REQUEST_FLOOR_MILLIS, DEFAULT_EXCLUDED_NAMESPACE,
        DEFAULT_MEMORY_REQUEST_FLOOR_BYTES,
    },
    errors::RatioError,
};

/// A ratio in `[0, 1]`, kept as an exact fraction so that scaling a request
/// is plain integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingRatio {
    numerator: u64,
    denominator: u64,
}

impl ScalingRatio {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, RatioError> {
        if denominator == 0 {
            return Err(RatioError::Malformed(format!("{numerator}/{denominator}")));
        }
        if numerator > denominator {
            return Err(RatioError::OutOfRange(format!(
                "{numerator}/{denominator}"
            )));
        }

        let divisor = gcd(numerator, denominator);
        Ok(ScalingRatio {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    /// Requests are removed instead of scaled.
    pub fn removes_requests(&self) -> bool {
        self.numerator == 0
    }

    /// `floor(value * ratio)`
    pub fn scale(&self, value: u64) -> u64 {
        let scaled = u128::from(value) * u128::from(self.numerator) / u128::from(self.denominator);
        // the ratio is at most 1, the result always fits
        scaled as u64
    }
}

impl Default for ScalingRatio {
    fn default() -> Self {
        ScalingRatio {
            numerator: 1,
            denominator: 5,
        }
    }
}

impl FromStr for ScalingRatio {
    type Err = RatioError;

    /// Accepts a decimal number (`0.2`, `1`, `.1`) or a fraction (`1/5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let malformed = || RatioError::Malformed(s.to_owned());

        if let Some((numerator, denominator)) = input.split_once('/') {
            let numerator = numerator.trim().parse::<u64>().map_err(|_| malformed())?;
            let denominator = denominator.trim().parse::<u64>().map_err(|_| malformed())?;
            return ScalingRatio::new(numerator, denominator).map_err(|e| match e {
                RatioError::OutOfRange(_) => RatioError::OutOfRange(s.to_owned()),
                RatioError::Malformed(_) => malformed(),
            });
        }

        let (integer, fraction) = input.split_once('.').unwrap_or((input, ""));
        if integer.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        // more digits than this cannot be represented exactly
        if fraction.len() > 18 {
            return Err(malformed());
        }

        let integer = if integer.is_empty() {
            0
        } else {
            integer
                .parse::<u64>()
                .map_err(|_| RatioError::OutOfRange(s.to_owned()))?
        };
        let fraction_value = if fraction.is_empty() {
            0
        } else {
            fraction.parse::<u64>().map_err(|_| malformed())?
        };
        let denominator = 10u64.pow(fraction.len() as u32);
        let numerator = integer
            .checked_mul(denominator)
            .and_then(|n| n.checked_add(fraction_value))
            .ok_or_else(|| RatioError::OutOfRange(s.to_owned()))?;

        ScalingRatio::new(numerator, denominator)
            .map_err(|_| RatioError::OutOfRange(s.to_owned()))
    }
}

impl fmt::Display for ScalingRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// The knobs shared by all the patch generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPolicy {
    pub request_ratio: ScalingRatio,
    pub cpu_request_floor_millis: u64,
    pub memory_request_floor_bytes: u64,
    pub excluded_namespaces: BTreeSet<String>,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        MutationPolicy {
            request_ratio: ScalingRatio::default(),
            cpu_request_floor_millis: DEFAULT_CPU_REQUEST_FLOOR_MILLIS,
            memory_request_floor_bytes: DEFAULT_MEMORY_REQUEST_FLOOR_BYTES,
            excluded_namespaces: BTreeSet::from([DEFAULT_EXCLUDED_NAMESPACE.to_owned()]),
        }
    }
}

impl MutationPolicy {
    pub fn is_namespace_excluded(&self, namespace: &str) -> bool {
        self.excluded_namespaces.contains(namespace)
    }

    pub fn scaled_cpu_request(&self, millis: u64) -> u64 {
        self.request_ratio
            .scale(millis)
            .max(self.cpu_request_floor_millis)
    }

    pub fn scaled_memory_request(&self, bytes: u64) -> u64 {
        self.request_ratio
            .scale(bytes)
            .max(self.memory_request_floor_bytes)
    }
}
