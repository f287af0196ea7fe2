//! Vertex buffer building benchmarks
//!
//! Measures decoding and geometry realization for models of increasing size.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use frame_models::fixtures::{DmdBuilder, FrameSpec, Md2Builder, RecordingUploader};
use frame_models::formats;
use frame_models::{MemoryArchive, ModelRegistry};

fn model_with(frames: usize, vertices: usize, triangles: usize) -> Vec<u8> {
    let mut builder = Md2Builder::new(vertices, triangles);
    for i in 0..frames {
        builder = builder.frame(FrameSpec::new(&format!("frame{i}")).vertex([1, 2, 3]));
    }
    builder.build()
}

fn bench_decode(c: &mut Criterion) {
    let mut data = DmdBuilder::new(200, 300);
    for i in 0..40 {
        data = data.frame(FrameSpec::new(&format!("run{i}")));
    }
    let data = data.build();

    c.bench_function("decode_dmd_header", |b| {
        b.iter(|| formats::decode(&data, "bench.dmd").unwrap())
    });
}

fn bench_build_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_geometry");

    for (name, frames, vertices, triangles) in [
        ("small", 4, 50, 30),
        ("medium", 40, 300, 500),
        ("large", 200, 500, 900),
    ] {
        let vertex_count = (frames * triangles * 3) as u64;
        group.throughput(Throughput::Elements(vertex_count));
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, _| {
            let mut archive = MemoryArchive::new();
            archive.insert("bench/model.md2", model_with(frames, vertices, triangles));

            b.iter(|| {
                let mut registry = ModelRegistry::new();
                let mut uploader = RecordingUploader::default();
                registry.load_model(&archive, "bench", "model.md2").unwrap();
                registry.build_all(&archive, &mut uploader)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_build_geometry);
criterion_main!(benches);
