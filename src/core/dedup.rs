// src/core/dedup.rs

use crate::core::collision::Collision;
use std::collections::HashSet;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// Filter a collision stream down to the first occurrence of each canonical
/// key. Engines are free to report the same collision several times (rescans,
/// duplicated moduli); downstream consumers see each exactly once. The
/// returned channel closes once the input stream closes.
pub fn uniqify_collisions(input: Receiver<Collision>, capacity: usize) -> Receiver<Collision> {
    let (tx, rx) = sync_channel(capacity);
    thread::spawn(move || uniqify_proc(input, tx));
    rx
}

fn uniqify_proc(input: Receiver<Collision>, output: SyncSender<Collision>) {
    let mut seen: HashSet<String> = HashSet::new();
    for collision in input.iter() {
        if !seen.insert(collision.to_string()) {
            continue;
        }
        if output.send(collision).is_err() {
            return;
        }
    }
}
