#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use eventio::prelude::*;

const N_TELESCOPES: u16 = 100;

/// An event of `N_TELESCOPES` sub-items holding a small pixel vector each.
fn write_event(buf: &mut IoBuffer, pixels: &[u16]) {
    let mut event = ItemHeader::new(2010, 0, 1);
    buf.put_item_begin(&mut event).unwrap();
    for tel in 0..N_TELESCOPES {
        let mut data = ItemHeader::new(2100 + tel, 3, i32::from(tel));
        buf.put_item_begin(&mut data).unwrap();
        buf.put_count(pixels.len() as u64);
        buf.put_vector_of_u16(pixels);
        buf.put_item_end(&mut data).unwrap();
    }
    buf.put_item_end(&mut event).unwrap();
}

fn bench_framing(c: &mut Criterion) {
    let pixels: Vec<u16> = (0..256).collect();
    let mut buf = IoBuffer::with_capacity(0).unwrap();
    write_event(&mut buf, &pixels);
    let size = buf.block_bytes().map_or(0, <[u8]>::len);
    c.bench_function(
        &format!("Writing an event of {} sub-items, {} bytes", N_TELESCOPES, size),
        move |b| b.iter(|| write_event(&mut buf, black_box(&pixels))),
    );
}

fn bench_search(c: &mut Criterion) {
    let pixels: Vec<u16> = (0..256).collect();
    let mut buf = IoBuffer::with_capacity(0).unwrap();
    write_event(&mut buf, &pixels);
    c.bench_function("Searching for the last sub-item of an event", move |b| {
        b.iter(|| {
            let event = buf.get_item_begin(2010).unwrap();
            let found = buf
                .search_sub_item(&event, black_box(2100 + N_TELESCOPES - 1))
                .unwrap();
            buf.get_item_end(&event).unwrap();
            found
        })
    });
}

fn bench_sequential(c: &mut Criterion) {
    let pixels: Vec<u16> = (0..256).collect();
    let mut buf = IoBuffer::with_capacity(0).unwrap();
    write_event(&mut buf, &pixels);
    let mut out = vec![0u16; pixels.len()];
    c.bench_function("Decoding every sub-item of an event", move |b| {
        b.iter(|| {
            let event = buf.get_item_begin(2010).unwrap();
            while let Ok(data) = buf.get_item_begin(0) {
                let n = buf.get_count().unwrap() as usize;
                buf.get_vector_of_u16(&mut out[..n]).unwrap();
                buf.get_item_end(&data).unwrap();
            }
            buf.get_item_end(&event).unwrap();
            black_box(out[0])
        })
    });
}

criterion_group!(benches, bench_framing, bench_search, bench_sequential);
criterion_main!(benches);
