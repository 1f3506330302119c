// src/algorithms/smooth_parts_lowmem.rs

use crate::core::collision::Collision;
use crate::input::encoding;
use crate::integer_math::gcd::GCD;
use chrono::Utc;
use log::{debug, error};
use num::bigint::Sign;
use num::{BigInt, One};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// Capacity of every inter-stage channel. Keeping it this small bounds the
/// resident set to O(tree depth) integers; everything else is on disk.
const STAGE_CAPACITY: usize = 1;

/// Distinguishes concurrent runs started within the same clock tick.
static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One spilled tree level: the read-back stream plus the file it lives in.
struct SpillLevel {
    values: Receiver<BigInt>,
    path: PathBuf,
}

/// Streaming variant of the smooth-parts engine. The product tree is never
/// resident: each level flows through a bounded channel and is teed into a
/// temporary file in the working directory, which the remainder descent
/// later reads back in unwinding order. Returns immediately; the pipeline
/// signals completion by closing `output`.
pub fn low_mem_smooth_parts_gcd(moduli: Receiver<BigInt>, output: SyncSender<Collision>) {
    let prefix = format!(
        "{}.{}",
        Utc::now().format("%Y%m%dT%H%M%S%.9fZ"),
        RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    thread::spawn(move || product_tree_stage(prefix, 1, moduli, Vec::new(), output));
}

/// One product-tree stage: pair consecutive inputs, tee every input into the
/// level's spill file, push each product one level up. The stage that only
/// ever receives a lone value holds the batch product and starts the
/// remainder descent.
fn product_tree_stage(
    prefix: String,
    level: usize,
    input: Receiver<BigInt>,
    mut spilled: Vec<SpillLevel>,
    output: SyncSender<Collision>,
) {
    let Ok(first) = input.recv() else {
        return; // empty input, nothing to report
    };
    let second = match input.recv() {
        Ok(value) => value,
        Err(_) => {
            if level == 1 {
                return; // a single modulus cannot collide with anything
            }
            start_remainder_descent(first, spilled, output);
            return;
        }
    };

    // Level 1 spills the raw moduli for the leaf stage; every level above
    // spills products for the descent.
    let tag = if level == 1 { "moduli" } else { "product" };
    let path = PathBuf::from(format!("{}-{}-{}", tag, prefix, level));
    let (spill_tx, spill_rx) = sync_channel(STAGE_CAPACITY);
    let (read_tx, read_rx) = sync_channel(STAGE_CAPACITY);
    // The moduli spill outlives its read-back: the leaf stage may rescan it,
    // and removes it once done.
    let remove_after_read = level != 1;
    {
        let path = path.clone();
        thread::spawn(move || spill_read_writer(spill_rx, read_tx, path, remove_after_read));
    }
    spilled.push(SpillLevel {
        values: read_rx,
        path,
    });

    let (result_tx, result_rx) = sync_channel(STAGE_CAPACITY);
    {
        let prefix = prefix.clone();
        thread::spawn(move || product_tree_stage(prefix, level + 1, result_rx, spilled, output));
    }

    let product = &first * &second;
    send_value(&spill_tx, first, "spill");
    send_value(&spill_tx, second, "spill");
    send_value(&result_tx, product, "product");

    let mut pending: Option<BigInt> = None;
    for value in input.iter() {
        match pending.take() {
            Some(held) => {
                let product = &held * &value;
                send_value(&spill_tx, held, "spill");
                send_value(&spill_tx, value, "spill");
                send_value(&result_tx, product, "product");
            }
            None => pending = Some(value),
        }
    }

    if let Some(tail) = pending {
        send_value(&spill_tx, tail.clone(), "spill");
        drop(spill_tx);
        // An odd tail is promoted to the next level unchanged.
        send_value(&result_tx, tail, "product");
    }
}

/// The stage holding the batch product starts unwinding: remainders flow
/// back down through one stage per spilled product level, and the moduli
/// spill is left for the leaf stage.
fn start_remainder_descent(root: BigInt, spilled: Vec<SpillLevel>, output: SyncSender<Collision>) {
    let (tx, rx) = sync_channel(STAGE_CAPACITY);
    thread::spawn(move || remainder_tree_stage(rx, spilled, output));
    send_value(&tx, root, "descent root");
}

/// For each parent remainder y and each spilled product x it covers, compute
/// y mod x^2 and stream the result down. Pairing is strictly consecutive:
/// parent k covers products 2k and 2k+1.
fn remainder_tree_stage(
    input: Receiver<BigInt>,
    mut spilled: Vec<SpillLevel>,
    output: SyncSender<Collision>,
) {
    let Some(level) = spilled.pop() else {
        fail("remainder descent ran out of spilled levels");
    };
    if spilled.is_empty() {
        // `level` is the moduli spill: this stage is the leaf step.
        remainder_tree_final(input, level, output);
        return;
    }

    let (tx, rx) = sync_channel(STAGE_CAPACITY);
    thread::spawn(move || remainder_tree_stage(rx, spilled, output));

    for y in input.iter() {
        let Ok(x) = level.values.recv() else {
            fail("expecting more spilled products during the descent");
        };
        let square = &x * &x;
        send_value(&tx, &y % &square, "remainder");
        if let Ok(x) = level.values.recv() {
            let square = &x * &x;
            send_value(&tx, &y % &square, "remainder");
        }
    }
}

/// Leaf step over the spilled moduli: t = (y mod m^2) / m, gcd(t, m).
/// Degenerate results (gcd equal to the modulus itself) are put aside and
/// resolved against the spill file once the stream ends, since the stream
/// itself is gone by then.
fn remainder_tree_final(
    input: Receiver<BigInt>,
    moduli: SpillLevel,
    output: SyncSender<Collision>,
) {
    let mut degenerate: Vec<BigInt> = Vec::new();
    'parents: for y in input.iter() {
        for _ in 0..2 {
            let Ok(m) = moduli.values.recv() else {
                debug!("odd number of moduli at the leaf stage");
                continue 'parents;
            };
            let square = &m * &m;
            let t = &(&y % &square) / &m;
            let g = GCD::find_gcd_pair(&t, &m);
            if g.is_one() {
                continue;
            }
            if g == m {
                degenerate.push(m);
            } else {
                let q = &m / &g;
                let _ = output.send(Collision::factored(m, g, q));
            }
        }
    }

    if !degenerate.is_empty() {
        rescan_spilled_moduli(&moduli.path, &degenerate, &output);
    }
    let _ = fs::remove_file(&moduli.path);
}

/// Re-read the moduli spill to attribute degenerate leaf results: equal
/// moduli become DUPLICATE records, partners sharing a single factor get
/// their factorizations.
fn rescan_spilled_moduli(path: &Path, degenerate: &[BigInt], output: &SyncSender<Collision>) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => fail(&format!("reopening {}: {}", path.display(), e)),
    };
    let mut reader = BufReader::new(file);
    let mut equals = vec![0usize; degenerate.len()];
    loop {
        let frame = match encoding::read_frame(&mut reader) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => fail(&format!("rescanning {}: {}", path.display(), e)),
        };
        let n = BigInt::from_bytes_be(Sign::Plus, &frame);
        for (k, m) in degenerate.iter().enumerate() {
            if &n == m {
                equals[k] += 1;
                continue;
            }
            let g = GCD::find_gcd_pair(m, &n);
            if !g.is_one() {
                let _ = output.send(Collision::factored(m.clone(), g.clone(), m / &g));
                let _ = output.send(Collision::factored(n.clone(), g.clone(), &n / &g));
            }
        }
    }
    for (k, m) in degenerate.iter().enumerate() {
        // The file holds the degenerate modulus itself once.
        if equals[k] > 1 {
            let _ = output.send(Collision::duplicate(m.clone()));
        }
    }
}

/// Tee one level into its temporary file, then rewind and stream it back.
/// The write pass fully completes (input channel closed) before the read
/// pass starts; the two counts must agree.
fn spill_read_writer(
    input: Receiver<BigInt>,
    output: SyncSender<BigInt>,
    path: PathBuf,
    remove_after_read: bool,
) {
    let file = match OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => f,
        Err(e) => fail(&format!("creating spill file {}: {}", path.display(), e)),
    };

    let mut write_count: u64 = 0;
    {
        let mut writer = BufWriter::new(&file);
        for value in input.iter() {
            let (_, bytes) = value.to_bytes_be();
            if let Err(e) = encoding::write_frame(&mut writer, &bytes) {
                fail(&format!("writing {}: {}", path.display(), e));
            }
            write_count += 1;
        }
        if let Err(e) = writer.flush() {
            fail(&format!("flushing {}: {}", path.display(), e));
        }
    }

    if let Err(e) = (&file).seek(SeekFrom::Start(0)) {
        fail(&format!("rewinding {}: {}", path.display(), e));
    }

    let mut read_count: u64 = 0;
    let mut reader = BufReader::new(&file);
    loop {
        match encoding::read_frame(&mut reader) {
            Ok(Some(bytes)) => {
                read_count += 1;
                send_value(&output, BigInt::from_bytes_be(Sign::Plus, &bytes), "spill read-back");
            }
            Ok(None) => break,
            Err(e) => fail(&format!("reading back {}: {}", path.display(), e)),
        }
    }

    if write_count != read_count {
        fail(&format!(
            "spill count mismatch on {}: wrote {} read {}",
            path.display(),
            write_count,
            read_count
        ));
    }
    if remove_after_read {
        let _ = fs::remove_file(&path);
    }
}

fn send_value(tx: &SyncSender<BigInt>, value: BigInt, stage: &str) {
    if tx.send(value).is_err() {
        fail(&format!("{} consumer went away", stage));
    }
}

/// Pipeline invariant violations are not recoverable: log and abort the run.
fn fail(message: &str) -> ! {
    error!("smoothparts_lowmem: {}", message);
    process::exit(2);
}
