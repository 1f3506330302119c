// src/algorithms/smooth_parts.rs

use crate::core::collision::Collision;
use crate::integer_math::gcd::GCD;
use log::debug;
use num::{BigInt, One};
use rayon::prelude::*;
use std::sync::mpsc::SyncSender;

/// Implementation of D.J. Bernstein's "How to find smooth parts of integers"
/// http://cr.yp.to/papers.html#smoothparts
///
/// Build the product tree of all moduli, reduce the batch product back down
/// modulo the square of every node, and read gcd(M_i, prod of the others)
/// off the leaf remainders. Subquadratic overall; every level is processed
/// by parallel workers, with the end of each parallel pass acting as the
/// level barrier.
pub fn smooth_parts_gcd(moduli: &[BigInt], output: SyncSender<Collision>) {
    if moduli.len() < 2 {
        return;
    }

    // Phase 1, product tree. Level 0 holds the pairwise products of the
    // moduli, each level above pairs the level below, the top level is the
    // batch product. An odd tail is promoted by copy.
    let mut tree: Vec<Vec<BigInt>> = Vec::new();
    let mut level = product_level(moduli);
    while level.len() > 1 {
        let next = product_level(&level);
        tree.push(level);
        level = next;
    }
    tree.push(level);
    debug!("product tree built: {} levels above the moduli", tree.len());

    // Phase 2, remainder descent. Top-down, replace every node x in place
    // with y mod x^2, y being the already-reduced parent. Distinct slots per
    // worker; levels strictly in order.
    for depth in (0..tree.len() - 1).rev() {
        let (lower, upper) = tree.split_at_mut(depth + 1);
        let nodes = &mut lower[depth];
        let parents = &upper[0];
        nodes.par_iter_mut().enumerate().for_each(|(i, x)| {
            let square = &*x * &*x;
            *x = &parents[i / 2] % &square;
        });
    }

    // Phase 3, leaf step. t = (y mod m^2) / m collects exactly the primes m
    // shares with the rest of the batch.
    let leaves = &tree[0];
    moduli
        .par_iter()
        .enumerate()
        .for_each_with(output, |out, (i, m)| {
            let square = m * m;
            let t = &(&leaves[i / 2] % &square) / m;
            let g = GCD::find_gcd_pair(&t, m);
            if g.is_one() {
                return;
            }
            if &g == m {
                // Degenerate leaf: m is duplicated, or both of its primes
                // appear elsewhere. Either way the factors cannot be read
                // off the remainder; find the partners directly.
                attribute_degenerate(moduli, i, out);
            } else {
                let _ = out.send(Collision::factored(m.clone(), g.clone(), m / &g));
            }
        });
}

fn product_level(input: &[BigInt]) -> Vec<BigInt> {
    input
        .par_chunks(2)
        .map(|pair| match pair {
            [a, b] => a * b,
            [lone] => lone.clone(),
            _ => unreachable!(),
        })
        .collect()
}

/// Full scan attributing a degenerate leaf result: equal moduli become
/// DUPLICATE records, partners sharing a single factor get factored.
fn attribute_degenerate(moduli: &[BigInt], i: usize, output: &SyncSender<Collision>) {
    let m = &moduli[i];
    for (j, n) in moduli.iter().enumerate() {
        if j == i {
            continue;
        }
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
