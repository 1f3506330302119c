// src/algorithms/mul_accum.rs

use crate::core::collision::Collision;
use crate::integer_math::gcd::GCD;
use num::{BigInt, One};
use std::sync::mpsc::SyncSender;

/// Streaming accumulator engine: gcd each modulus against the product of
/// everything accepted so far, folding it in when coprime. A hit costs a
/// quadratic rescan to attribute the collision to specific moduli, but hits
/// are rare, so the common path stays one gcd and one multiply per modulus.
pub fn mul_accum_gcd(moduli: &[BigInt], output: SyncSender<Collision>) {
    let mut accum = BigInt::one();
    rayon::scope(|scope| {
        for (i, n) in moduli.iter().enumerate() {
            let g = GCD::find_gcd_pair(&accum, n);
            if g.is_one() {
                accum *= n;
                continue;
            }
            if &g == n {
                // The whole modulus divides the accumulated product; the
                // responsible moduli are somewhere in the prefix.
                let out = output.clone();
                scope.spawn(move |_| find_gcd(moduli, i, &out));
            } else {
                // Proper divisor: one private key right away, then scan for
                // every other modulus sharing a factor with this one.
                let out = output.clone();
                scope.spawn(move |_| find_divisors(moduli, i, g, &out));
            }
            // The hit modulus stays out of the accumulator: folding it in
            // would trigger a fresh rescan on every later modulus sharing
            // the same factor.
        }
    });
}

/// Prefix scan after the accumulated product absorbed all of moduli[i].
fn find_gcd(moduli: &[BigInt], i: usize, output: &SyncSender<Collision>) {
    let m = &moduli[i];
    for n in moduli[..i].iter() {
        if n == m {
            let _ = output.send(Collision::duplicate(m.clone()));
            continue;
        }
        let g = GCD::find_gcd_pair(m, n);
        if !g.is_one() {
            let _ = output.send(Collision::factored(m.clone(), g.clone(), m / &g));
            let _ = output.send(Collision::factored(n.clone(), g.clone(), n / &g));
        }
    }
}

/// Full scan after a proper divisor g of moduli[i] surfaced.
fn find_divisors(moduli: &[BigInt], i: usize, g: BigInt, output: &SyncSender<Collision>) {
    let m = &moduli[i];
    let _ = output.send(Collision::factored(m.clone(), g.clone(), m / &g));

    for (j, n) in moduli.iter().enumerate() {
        if j == i {
            continue;
        }
        if n == m {
            let _ = output.send(Collision::duplicate(m.clone()));
            continue;
        }
        // gcd rather than divisibility by g: since m never reaches the
        // accumulator, a later modulus sharing only the other factor of m
        // would collide with nothing else.
        let shared = GCD::find_gcd_pair(m, n);
        if !shared.is_one() {
            let _ = output.send(Collision::factored(n.clone(), shared.clone(), n / &shared));
        }
    }
}
