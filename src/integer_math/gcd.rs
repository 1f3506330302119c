// src/integer_math/gcd.rs

use num::BigInt;
use num::Integer;
use num::One;

pub struct GCD;

impl GCD {
    pub fn find_gcd_pair(left: &BigInt, right: &BigInt) -> BigInt {
        left.gcd(right)
    }

    pub fn are_coprime_pair(left: &BigInt, right: &BigInt) -> bool {
        Self::find_gcd_pair(left, right).is_one()
    }
}
