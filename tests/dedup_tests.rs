// tests/dedup_tests.rs

use batchgcd::core::collision::Collision;
use batchgcd::core::dedup::uniqify_collisions;
use num::BigInt;
use std::sync::mpsc::sync_channel;
use std::thread;

fn sample_stream() -> Vec<Collision> {
    vec![
        Collision::factored(BigInt::from(35), BigInt::from(5), BigInt::from(7)),
        // Same collision reported with the factors swapped.
        Collision::factored(BigInt::from(35), BigInt::from(7), BigInt::from(5)),
        Collision::duplicate(BigInt::from(77)),
        Collision::duplicate(BigInt::from(77)),
        Collision::factored(BigInt::from(77), BigInt::from(7), BigInt::from(11)),
        Collision::factored(BigInt::from(35), BigInt::from(5), BigInt::from(7)),
    ]
}

fn run_dedup(stream: Vec<Collision>) -> Vec<Collision> {
    let (tx, rx) = sync_channel(4);
    let feeder = thread::spawn(move || {
        for collision in stream {
            tx.send(collision).unwrap();
        }
    });
    let out: Vec<Collision> = uniqify_collisions(rx, 4).iter().collect();
    feeder.join().unwrap();
    out
}

#[test]
fn first_occurrence_of_each_key_passes_through() {
    let out = run_dedup(sample_stream());
    assert_eq!(
        out,
        vec![
            Collision::factored(BigInt::from(35), BigInt::from(5), BigInt::from(7)),
            Collision::duplicate(BigInt::from(77)),
            Collision::factored(BigInt::from(77), BigInt::from(7), BigInt::from(11)),
        ]
    );
}

#[test]
fn dedup_is_idempotent() {
    let once = run_dedup(sample_stream());
    let twice = run_dedup(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn bursty_input_does_not_stall_a_bounded_channel() {
    // Many more records than the channel capacity, all distinct.
    let stream: Vec<Collision> = (0..200)
        .map(|i| Collision::duplicate(BigInt::from(1000 + i)))
        .collect();
    assert_eq!(run_dedup(stream).len(), 200);
}
