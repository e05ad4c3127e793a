//! Benchmarks for the C3D codec
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mocap_rs::{Acquisition, AcquisitionFileIO, ByteOrder, C3DFileIO, StorageFormat, WritingFlags};

/// Gait-sized trial: `frames` point frames, 40 markers, 16 analogs at 10x
fn trial(frames: usize) -> Acquisition {
    let mut acq = Acquisition::new();
    acq.init(40, frames, 16, 10);
    acq.set_point_frequency(100.0);
    for (p, point) in acq.points_mut().iter_mut().enumerate() {
        for (f, value) in point.values_mut().iter_mut().enumerate() {
            let x = (f as f64 * 0.01 + p as f64).sin() * 500.0;
            *value = [x, -x, 900.0 + p as f64];
        }
        for residual in point.residuals_mut() {
            *residual = 0.8;
        }
    }
    for (a, analog) in acq.analogs_mut().iter_mut().enumerate() {
        for (s, value) in analog.values_mut().iter_mut().enumerate() {
            *value = (s as f64 * 0.003 + a as f64).cos() * 2.5;
        }
    }
    acq
}

fn codec(order: ByteOrder, format: StorageFormat) -> C3DFileIO {
    let mut io = C3DFileIO::new();
    io.set_byte_order(order);
    io.set_storage_format(format);
    io
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("c3d_encode");

    for frames in [100, 1000, 5000].iter() {
        let acq = trial(*frames);
        group.throughput(Throughput::Elements(*frames as u64));
        for format in [StorageFormat::Integer, StorageFormat::Float] {
            group.bench_with_input(
                BenchmarkId::new(format.as_str(), frames),
                &acq,
                |b, acq| {
                    let mut io = codec(ByteOrder::IeeeLittleEndian, format);
                    b.iter(|| black_box(io.encode(acq).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_encode_fixed_scale(c: &mut Criterion) {
    let acq = trial(1000);
    let mut io = codec(ByteOrder::IeeeLittleEndian, StorageFormat::Integer);
    io.set_writing_flags(WritingFlags::METADATA_FROM_DATA_UPDATE);
    io.set_point_scale(0.1);
    c.bench_function("c3d_encode_fixed_scale", |b| {
        b.iter(|| black_box(io.encode(&acq).unwrap()))
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("c3d_decode");

    for order in ByteOrder::all() {
        for format in [StorageFormat::Integer, StorageFormat::Float] {
            let bytes = codec(order, format).encode(&trial(1000)).unwrap();
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(order.as_str(), format.as_str()),
                &bytes,
                |b, bytes| {
                    let mut io = C3DFileIO::new();
                    b.iter(|| black_box(io.decode(bytes).unwrap()));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_encode_fixed_scale, bench_decode);
criterion_main!(benches);
