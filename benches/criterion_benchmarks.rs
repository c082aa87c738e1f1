use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use savestream::container::{decode, decode_one, encode};
use serde_json::json;

fn make_state(buffer: &[u8], tick: u64) -> Vec<u8> {
    let info = serde_json::to_vec(&json!({
        "buffer_infos": [{ "offset": 0, "length": buffer.len() }],
        "state": { "tick": tick },
    }))
    .unwrap();
    let mut raw = vec![0u8; 12];
    raw.extend_from_slice(&(info.len() as u32).to_le_bytes());
    raw.extend_from_slice(&info);
    while raw.len() % 4 != 0 {
        raw.push(0);
    }
    raw.extend_from_slice(buffer);
    raw
}

/// A short VM-ish run: 1 MiB of RAM, a few KiB touched per frame.
fn vm_sequence(frames: usize) -> Vec<Vec<u8>> {
    let mut ram = vec![0u8; 1 << 20];
    for (i, b) in ram.iter_mut().enumerate() {
        *b = (i.wrapping_mul(2654435761) >> 16) as u8;
    }
    (0..frames)
        .map(|tick| {
            let start = tick * 4096 % (ram.len() - 8192);
            for b in &mut ram[start..start + 4096] {
                *b = b.wrapping_add(1);
            }
            make_state(&ram, tick as u64)
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let states = vm_sequence(8);
    let total: u64 = states.iter().map(|s| s.len() as u64).sum();

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(total));
    group.sample_size(10);
    group.bench_function("vm_sequence_8x1MiB", |b| {
        b.iter(|| encode(black_box(&states)).unwrap())
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let states = vm_sequence(8);
    let stream = encode(&states).unwrap();
    let total: u64 = states.iter().map(|s| s.len() as u64).sum();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(total));
    group.sample_size(10);
    group.bench_function("vm_sequence_8x1MiB", |b| {
        b.iter(|| {
            decode(black_box(&stream))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        })
    });
    group.bench_function("decode_one_last", |b| {
        b.iter(|| decode_one(black_box(&stream), 7).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
