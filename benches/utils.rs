#![allow(dead_code)]

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

const SEED: u64 = 42;
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Profile contexts shared by every engine's benchmark.
///
/// Each context has a `user` object, at least three `items` and two boolean
/// flags. The seed is fixed so all engines render the same data.
pub fn generate_random_contexts(n: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..n).map(|_| random_profile(&mut rng)).collect()
}

fn random_profile(rng: &mut StdRng) -> Value {
    let item_count = rng.random_range(3..10);
    let items: Vec<Value> = (0..item_count).map(|_| random_item(rng)).collect();

    json!({
        "user": {
            "name": random_word(rng, 5..=10),
            "age": rng.random_range(18..80),
            "active": rng.random_bool(0.7),
        },
        "items": items,
        "show_details": rng.random_bool(0.8),
        "has_access": rng.random_bool(0.6),
    })
}

fn random_item(rng: &mut StdRng) -> Value {
    json!({
        "name": random_word(rng, 3..=8),
        "value": rng.random_range(10..1000),
        "special": rng.random_bool(0.3),
    })
}

fn random_word(rng: &mut StdRng, len: std::ops::RangeInclusive<usize>) -> String {
    let len = rng.random_range(len);
    (0..len)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect()
}

/// Prints the size of the running bench binary, to compare engine footprints.
pub fn print_binary_size() {
    let Ok(path) = std::env::current_exe() else {
        return;
    };
    let Ok(metadata) = std::fs::metadata(&path) else {
        return;
    };
    let bytes = metadata.len();
    let kib = bytes as f64 / 1024.0;
    println!(
        "Binary size: {:.2} MiB ({kib:.2} KiB, {bytes} bytes) at {}",
        kib / 1024.0,
        path.display()
    );
}
