// src/core/collision.rs

use num::BigInt;
use std::fmt;

/// A modulus compromised by the batch: either factored because it shares a
/// prime with another modulus, or an exact duplicate of another modulus
/// (no factors recovered, but the key pair is not unique).
#[derive(Debug, Clone)]
pub struct Collision {
    pub modulus: BigInt,
    pub p: Option<BigInt>,
    pub q: Option<BigInt>,
}

impl Collision {
    pub fn factored(modulus: BigInt, p: BigInt, q: BigInt) -> Self {
        Collision {
            modulus,
            p: Some(p),
            q: Some(q),
        }
    }

    pub fn duplicate(modulus: BigInt) -> Self {
        Collision {
            modulus,
            p: None,
            q: None,
        }
    }

    /// The factor pair in canonical (ascending) order, if any.
    fn canonical_pair(&self) -> Option<(&BigInt, &BigInt)> {
        match (&self.p, &self.q) {
            (Some(p), Some(q)) if p <= q => Some((p, q)),
            (Some(p), Some(q)) => Some((q, p)),
            _ => None,
        }
    }

    /// True when the factors multiply back to the modulus. Duplicate records
    /// carry no factors and always verify.
    pub fn verify(&self) -> bool {
        match (&self.p, &self.q) {
            (Some(p), Some(q)) => p * q == self.modulus,
            _ => true,
        }
    }

    /// One-line CSV rendering: `n,p,q` for a factored modulus, the bare
    /// modulus for a duplicate.
    pub fn csv(&self) -> String {
        match self.canonical_pair() {
            Some((p, q)) => format!("{:x},{:x},{:x}", self.modulus, p, q),
            None => format!("{:x}", self.modulus),
        }
    }
}

impl PartialEq for Collision {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.canonical_pair() == other.canonical_pair()
    }
}

impl Eq for Collision {}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.canonical_pair() {
            Some((p, q)) => write!(
                f,
                "COLLISION: N={:x}\nP={:x}\nQ={:x}",
                self.modulus, p, q
            ),
            None => write!(f, "DUPLICATE: {:x}", self.modulus),
        }
    }
}
