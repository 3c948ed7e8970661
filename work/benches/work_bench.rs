use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use merit_crypto::hash_parts;
use merit_types::{Difficulty, Hash};
use merit_work::{meets_difficulty, CancelToken, Candidate, WorkGenerator};

struct Seeded([u8; 32]);

impl Candidate for Seeded {
    fn hash_with_proof(&self, proof: u64) -> Hash {
        hash_parts(&[&self.0, &proof.to_be_bytes()])
    }
}

fn bench_proof_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("proof_search");
    let candidate = Seeded([0x42; 32]);

    // Leading threshold bytes that complete quickly enough for benchmarking.
    for top in [0x00u8, 0x80, 0xF0, 0xFF] {
        let mut bytes = [0u8; 32];
        bytes[0] = top;
        let difficulty = Difficulty::from_be_bytes(bytes);
        group.bench_with_input(BenchmarkId::new("search", top), &difficulty, |b, &diff| {
            b.iter(|| {
                black_box(
                    WorkGenerator::default()
                        .search(&candidate, black_box(diff), 0, &CancelToken::new())
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let hash = Hash::new([0x42; 32]);
    let difficulty = Difficulty::from_be_bytes([0x40; 32]);

    c.bench_function("meets_difficulty", |b| {
        b.iter(|| black_box(meets_difficulty(black_box(&hash), black_box(difficulty))))
    });
}

criterion_group!(benches, bench_proof_search, bench_validation);
criterion_main!(benches);
