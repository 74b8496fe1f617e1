use std::sync::Arc;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use tagcore::{
    ChannelTransport, DataType, EventKind, MemoryTagTable, ModuleId, TagEngine, TagFlags, TagHandle, TagIndex,
};

const HMI: ModuleId = ModuleId::new(1);

fn make_engine() -> (TagEngine<MemoryTagTable>, Arc<ChannelTransport>) {
    let transport = Arc::new(ChannelTransport::new(1 << 16));
    let engine = TagEngine::new(MemoryTagTable::new(), transport.clone());
    (engine, transport)
}

fn add(engine: &TagEngine<MemoryTagTable>, name: &str, dt: DataType, count: usize) -> (TagIndex, TagHandle) {
    let idx = engine
        .with_table(|t| t.add_tag(name, dt, count, TagFlags::NONE))
        .unwrap()
        .unwrap();
    let handle = engine.with_table(|t| t.handle(idx)).unwrap().unwrap();
    (idx, handle)
}

fn bench_write_with_events(c: &mut Criterion) {
    c.bench_function("write/dint_array_16_events", |b| {
        // Fresh engine per sample so queued notifications do not pile up.
        b.iter_custom(|iters| {
            let (engine, transport) = make_engine();
            let stream = transport.connect(HMI).unwrap();
            let (tag, _) = add(&engine, "analog_in", DataType::Dint, 64);

            // 16 deadband events spread over the array, one element each.
            for i in 0..16 {
                let h = TagHandle::elements(tag, DataType::Dint, i * 4, 1).unwrap();
                engine.event_add(h, EventKind::Deadband, &5i32.to_le_bytes(), HMI).unwrap();
            }

            let mut data = vec![0u8; 256];
            let start = Instant::now();
            for n in 0..iters {
                // Alternate so every other write crosses the band.
                let v = if n % 2 == 0 { 10i32 } else { 0 };
                for chunk in data.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&v.to_le_bytes());
                }
                engine.write(tag, 0, &data).unwrap();
                stream.drain().unwrap();
            }
            start.elapsed()
        });
    });
}

fn bench_bool_edges(c: &mut Criterion) {
    c.bench_function("write/bool_set_reset", |b| {
        b.iter_custom(|iters| {
            let (engine, transport) = make_engine();
            let stream = transport.connect(HMI).unwrap();
            let (tag, whole) = add(&engine, "coils", DataType::Bool, 128);
            engine.event_add(whole, EventKind::Set, &[], HMI).unwrap();
            engine.event_add(whole, EventKind::Reset, &[], HMI).unwrap();

            let start = Instant::now();
            for n in 0..iters {
                let byte = if n % 2 == 0 { 0xFF } else { 0x00 };
                engine.write(tag, 0, &[byte; 16]).unwrap();
                stream.drain().unwrap();
            }
            start.elapsed()
        });
    });
}

fn bench_mapping_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");
    group.throughput(Throughput::Elements(8));

    group.bench_function("chain_of_8", |b| {
        b.iter_custom(|iters| {
            let (engine, _transport) = make_engine();
            let tags: Vec<_> = (0..9)
                .map(|i| add(&engine, &format!("stage{i}"), DataType::Real, 4))
                .collect();
            for pair in tags.windows(2) {
                engine.map_add(pair[0].1, pair[1].1).unwrap();
            }
            let head = tags[0].0;

            let start = Instant::now();
            for n in 0..iters {
                #[allow(clippy::cast_precision_loss)]
                let v = (n as f32).to_le_bytes();
                engine.write(head, 4, &v).unwrap();
            }
            start.elapsed()
        });
    });

    group.bench_function("bool_fan_out_8", |b| {
        b.iter_custom(|iters| {
            let (engine, _transport) = make_engine();
            let (src, _) = add(&engine, "inputs", DataType::Bool, 16);
            let s = TagHandle::elements(src, DataType::Bool, 3, 9).unwrap();
            for i in 0..8 {
                let (dst, _) = add(&engine, &format!("out{i}"), DataType::Bool, 32);
                let d = TagHandle::elements(dst, DataType::Bool, i + 5, 9).unwrap();
                engine.map_add(s, d).unwrap();
            }

            let start = Instant::now();
            for n in 0..iters {
                let byte = (n & 0xFF) as u8;
                engine.write(src, 0, &[byte, !byte]).unwrap();
            }
            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(write_path, bench_write_with_events, bench_bool_edges, bench_mapping_chain);
criterion_main!(write_path);
