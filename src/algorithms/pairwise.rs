// src/algorithms/pairwise.rs

use crate::core::collision::Collision;
use crate::integer_math::gcd::GCD;
use num::{BigInt, One};
use std::sync::mpsc::SyncSender;

/// Naive batch GCD: test every unordered pair directly. O(N^2) pair GCDs,
/// so this is the baseline the subquadratic engines are checked against,
/// not something to run on a large batch.
pub fn basic_pairwise_gcd(moduli: &[BigInt], output: SyncSender<Collision>) {
    for i in 0..moduli.len() {
        let m = &moduli[i];
        for n in moduli[i + 1..].iter() {
            if m == n {
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
}
