use criterion::{Criterion, criterion_group, criterion_main};
use rand::RngCore;
use rand::rngs::OsRng;
use storj_erasure::{ErasureCode, RedundancyScheme};

fn bench_encode(c: &mut Criterion) {
    let scheme = RedundancyScheme {
        required: 29,
        repair_threshold: 35,
        success_threshold: 80,
        total: 110,
        share_size: 256 * 1024,
    };
    let code = ErasureCode::new(scheme).unwrap();
    let mut data = vec![0u8; scheme.required * scheme.share_size];
    OsRng.fill_bytes(&mut data);

    c.bench_function("encode_segment", |b| {
        b.iter(|| code.encode(std::hint::black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
