use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Exact rational tick position
///
/// Beat lengths are `ticks_per_quarter * 4 / denominator`, which is not a
/// whole number of ticks for small resolutions and short beat units. Walking
/// the score with rationals keeps the cursor exact over thousands of beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i64,
    pub denominator: i64,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };

    /// Create a new fraction in lowest terms
    ///
    /// # Panics
    /// Panics when `denominator` is zero.
    pub fn new(numerator: i64, denominator: i64) -> Self {
        assert!(denominator != 0, "Denominator cannot be zero");
        let mut f = Fraction {
            numerator,
            denominator,
        };
        f.simplify();
        f
    }

    /// Create a fraction from a whole number of ticks
    pub fn from_int(n: i64) -> Self {
        Fraction {
            numerator: n,
            denominator: 1,
        }
    }

    /// Round towards negative infinity
    pub fn floor(self) -> i64 {
        self.numerator.div_euclid(self.denominator)
    }

    fn simplify(&mut self) {
        let gcd = gcd(self.numerator.abs(), self.denominator.abs());
        if gcd > 1 {
            self.numerator /= gcd;
            self.denominator /= gcd;
        }

        if self.denominator < 0 {
            self.numerator = -self.numerator;
            self.denominator = -self.denominator;
        }
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let temp = b;
        b = a % b;
        a = temp;
    }
    a
}

fn lcm(a: i64, b: i64) -> i64 {
    a / gcd(a, b) * b
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_int(n)
    }
}

impl From<u64> for Fraction {
    fn from(n: u64) -> Self {
        Fraction::from_int(n as i64)
    }
}

impl Add for Fraction {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let lcm = lcm(self.denominator, other.denominator);
        let num1 = self.numerator * (lcm / self.denominator);
        let num2 = other.numerator * (lcm / other.denominator);
        Fraction::new(num1 + num2, lcm)
    }
}

impl Sub for Fraction {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        let lcm = lcm(self.denominator, other.denominator);
        let num1 = self.numerator * (lcm / self.denominator);
        let num2 = other.numerator * (lcm / other.denominator);
        Fraction::new(num1 - num2, lcm)
    }
}

impl Mul<i64> for Fraction {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Fraction::new(self.numerator * rhs, self.denominator)
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiply in i128 so large tick counts cannot overflow
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_simplification() {
        let f = Fraction::new(960, 64);
        assert_eq!(f.numerator, 15);
        assert_eq!(f.denominator, 1);

        let f = Fraction::new(480, -64);
        assert_eq!(f, Fraction::new(-15, 2));
    }

    #[test]
    fn test_fraction_addition() {
        let half_tick = Fraction::new(1, 2);
        let sum = half_tick + half_tick + Fraction::from_int(3);
        assert_eq!(sum, Fraction::from_int(4));
        assert_eq!(sum.denominator, 1);
    }

    #[test]
    fn test_fraction_comparison() {
        assert!(Fraction::new(15, 2) < Fraction::from_int(8));
        assert!(Fraction::new(15, 2) > Fraction::from_int(7));
        assert_eq!(Fraction::new(16, 2).cmp(&Fraction::from_int(8)), Ordering::Equal);
    }

    #[test]
    fn test_fraction_floor() {
        assert_eq!(Fraction::new(15, 2).floor(), 7);
        assert_eq!(Fraction::new(-1, 2).floor(), -1);
        assert_eq!((Fraction::new(3, 4) * 4).floor(), 3);
    }
}
