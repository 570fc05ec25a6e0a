use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};

use rdr::core::{decode_reader, Config, Counter};
use rdr::rdb::Decoder;

const NUM_KEYS: usize = 10_000;

// Version 9 dump of string keys, checksum disabled.
fn dump() -> Vec<u8> {
    let mut buf = b"REDIS0009".to_vec();
    buf.extend([0xFE, 0x00]);
    for i in 0..NUM_KEYS {
        let key = format!("user:{}:session", i);
        let value = vec![b'v'; i % 60];
        buf.push(0x00);
        buf.push(key.len() as u8);
        buf.extend(key.as_bytes());
        buf.push(value.len() as u8);
        buf.extend(value);
    }
    buf.push(0xFF);
    buf.extend([0_u8; 8]);
    buf
}

pub fn decode(c: &mut Criterion) {
    let data = dump();
    let size = data.len() as u64;

    c.bench_function("decode", |b| {
        b.iter(|| {
            let decoder = Decoder::new(Cursor::new(&data[..]), size, true);
            let mut counter = Counter::new(100);
            for entry in decoder {
                counter.count(entry.unwrap());
            }
            assert_eq!(counter.total().count, NUM_KEYS as u64);
        });
    });
}

pub fn pipeline(c: &mut Criterion) {
    let data = dump();
    let size = data.len() as u64;
    let config = Config::default();
    let rt = rt();

    c.bench_function("pipeline", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = decode_reader(Cursor::new(data.clone()), size, &config);
                let mut counter = Counter::with_config(&config);
                while let Some(entry) = stream.next().await {
                    counter.count(entry);
                }
                stream.finish().await.unwrap();
            });
        });
    });
}

fn rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

criterion_group!(benches, decode, pipeline);
criterion_main!(benches);
