// tests/common/mod.rs

// Not every test binary uses every helper.
#![allow(dead_code)]

use batchgcd::algorithms::{
    basic_pairwise_gcd, low_mem_smooth_parts_gcd, mul_accum_gcd, smooth_parts_gcd,
};
use batchgcd::core::collision::Collision;
use num::bigint::RandBigInt;
use num::{BigInt, One, Zero};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread;

/// Run an in-memory engine over `moduli`, collecting everything it emits.
pub fn run_engine<F>(engine: F, moduli: Vec<BigInt>) -> Vec<Collision>
where
    F: FnOnce(&[BigInt], SyncSender<Collision>) + Send + 'static,
{
    let (tx, rx) = sync_channel(256);
    let worker = thread::spawn(move || engine(&moduli, tx));
    let collisions: Vec<Collision> = rx.iter().collect();
    worker.join().expect("engine thread panicked");
    collisions
}

/// Run the streaming engine over `moduli`, collecting everything it emits.
pub fn run_low_mem_engine(moduli: Vec<BigInt>) -> Vec<Collision> {
    let (moduli_tx, moduli_rx) = sync_channel(1);
    let (tx, rx) = sync_channel(256);
    low_mem_smooth_parts_gcd(moduli_rx, tx);
    let feeder = thread::spawn(move || {
        for m in moduli {
            moduli_tx.send(m).expect("low-mem pipeline hung up early");
        }
    });
    let collisions: Vec<Collision> = rx.iter().collect();
    feeder.join().expect("feeder thread panicked");
    collisions
}

/// Deduplicated canonical keys of a result set; the form every engine is
/// compared in.
pub fn canonical_keys(collisions: &[Collision]) -> BTreeSet<String> {
    collisions.iter().map(|c| c.to_string()).collect()
}

/// Canonical key sets of all four engines over the same input.
pub fn engine_key_sets(moduli: Vec<BigInt>) -> Vec<(&'static str, BTreeSet<String>)> {
    vec![
        (
            "pairwise",
            canonical_keys(&run_engine(basic_pairwise_gcd, moduli.clone())),
        ),
        (
            "mulaccum",
            canonical_keys(&run_engine(mul_accum_gcd, moduli.clone())),
        ),
        (
            "smoothparts",
            canonical_keys(&run_engine(smooth_parts_gcd, moduli.clone())),
        ),
        (
            "smoothparts_lowmem",
            canonical_keys(&run_low_mem_engine(moduli)),
        ),
    ]
}

pub fn moduli_from(values: &[i64]) -> Vec<BigInt> {
    values.iter().map(|&v| BigInt::from(v)).collect()
}

const PRIME_CHECK_BASES: [i64; 15] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

/// Deterministic Miller-Rabin over a fixed base set; plenty for fixtures.
pub fn is_probable_prime(input: &BigInt) -> bool {
    if input == &BigInt::from(2) || input == &BigInt::from(3) {
        return true;
    }
    if input < &BigInt::from(2) || (input % 2) == BigInt::zero() {
        return false;
    }

    let mut d = input - 1;
    let mut s = 0;
    while &d % 2 == BigInt::zero() {
        d /= 2;
        s += 1;
    }

    for &a in &PRIME_CHECK_BASES {
        let mut x = BigInt::from(a).modpow(&d, input);
        if x == BigInt::one() || x == input - 1 {
            continue;
        }
        let mut r = 1;
        while r < s {
            x = x.modpow(&BigInt::from(2), input);
            if x == BigInt::one() {
                return false;
            }
            if x == input - 1 {
                break;
            }
            r += 1;
        }
        if x != input - 1 {
            return false;
        }
    }
    true
}

/// Random probable prime of exactly `bits` bits.
pub fn gen_prime(bits: u64, rng: &mut ChaCha8Rng) -> BigInt {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        let candidate = BigInt::from(candidate);
        if is_probable_prime(&candidate) {
            return candidate;
        }
    }
}
