use eventio::{encoding::*, prelude::*, transport::pipe};
use eventio_strategy::*;
use proptest::prelude::*;
use std::{io::Cursor, process::Command};

fn block(ident: i32, order: ByteOrder) -> Vec<u8> {
    let mut buf = IoBuffer::new(BufferConfig::new().with_byte_order(order)).unwrap();
    let mut item = ItemHeader::new(1200, 2, ident);
    buf.put_item_begin(&mut item).unwrap();
    buf.put_var_string("run header").unwrap();
    buf.put_vector_of_i32(&[ident, -ident, 3]);
    buf.put_item_end(&mut item).unwrap();
    buf.block_bytes().unwrap().to_vec()
}

fn reader(stream: Vec<u8>, config: BufferConfig) -> IoBuffer {
    IoBuffer::new(config)
        .unwrap()
        .with_diagnostics(Diagnostics::silent())
        .with_input(Cursor::new(stream))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 500, ..ProptestConfig::default() })]

    #[test]
    fn resync_after_garbage(garbage in arb_garbage(300), swap in any::<bool>()) {
        let order = if swap { ByteOrder::Swapped } else { ByteOrder::Native };
        let mut stream = garbage.clone();
        stream.extend(block(5, order));
        stream.extend(block(6, order));

        let mut input = reader(stream, BufferConfig::new());
        let first = input.find_block().unwrap().unwrap();
        prop_assert_eq!(first.ident, 5);
        prop_assert_eq!(input.last_sync_skip(), garbage.len() as u64);
        prop_assert_eq!(input.sync_errors(), u32::from(!garbage.is_empty()));
        input.read_block().unwrap();
        let item = input.get_item_begin(1200).unwrap();
        prop_assert_eq!(input.get_var_string_bytes().unwrap(), "run header");
        input.get_item_end(&item).unwrap();

        prop_assert_eq!(input.find_block().unwrap().unwrap().ident, 6);
        prop_assert_eq!(input.last_sync_skip(), 0);
        input.skip_block().unwrap();
        prop_assert!(input.find_block().unwrap().is_none());
    }
}

#[test]
fn all_garbage_gives_up() {
    let mut input = reader(vec![0x42; 10_000], BufferConfig::new().with_max_sync_skip(4096));
    match input.find_block() {
        Err(Error::Desync { skipped, errors }) => {
            assert_eq!(skipped, 4097);
            assert_eq!(errors, 1);
        }
        other => panic!("expected a desync error, got {:?}", other),
    }
}

#[test]
fn too_many_resyncs() {
    let mut stream = Vec::new();
    for ident in 0..4 {
        stream.extend([0u8, 1, 2]);
        stream.extend(block(ident, ByteOrder::Native));
    }
    let mut input = reader(stream, BufferConfig::new().with_max_sync_errors(2));
    for _ in 0..2 {
        input.find_block().unwrap().unwrap();
        input.skip_block().unwrap();
    }
    assert!(matches!(input.find_block(), Err(Error::Desync { skipped: 3, errors: 3 })));
}

#[test]
fn protocol_misuse() {
    let mut input = reader(block(1, ByteOrder::Native), BufferConfig::new());
    assert!(matches!(input.read_block(), Err(Error::InvalidState(_))));
    assert!(matches!(input.skip_block(), Err(Error::InvalidState(_))));
    input.find_block().unwrap().unwrap();
    assert!(matches!(input.find_block(), Err(Error::InvalidState(_))));

    let mut no_input = IoBuffer::with_capacity(64).unwrap().with_diagnostics(Diagnostics::silent());
    assert!(matches!(no_input.find_block(), Err(Error::InvalidState(_))));
}

#[test]
fn workers_share_a_sink() {
    let sink = MemorySink::new();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let out = sink.clone();
            std::thread::spawn(move || {
                let mut buf = IoBuffer::with_capacity(256).unwrap().with_output(out);
                let mut item = ItemHeader::new(2000, 0, worker);
                buf.put_item_begin(&mut item).unwrap();
                buf.put_i32(worker * 100);
                buf.put_item_end(&mut item).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut input = reader(sink.contents(), BufferConfig::new());
    let mut idents = Vec::new();
    while let Some(header) = input.find_block().unwrap() {
        input.read_block().unwrap();
        let item = input.get_item_begin(2000).unwrap();
        assert_eq!(input.get_i32().unwrap(), header.ident * 100);
        input.get_item_end(&item).unwrap();
        idents.push(header.ident);
    }
    idents.sort_unstable();
    assert_eq!(idents, [0, 1, 2, 3]);
}

fn file_round_trip(name: &str) {
    let path = std::env::temp_dir().join(format!("eventio-{}-{}", std::process::id(), name));
    {
        let mut buf = IoBuffer::with_capacity(1024).unwrap();
        buf.set_output(pipe::open_output(&path).unwrap());
        for ident in 0..10 {
            let mut item = ItemHeader::new(1201, 0, ident);
            buf.put_item_begin(&mut item).unwrap();
            buf.put_vector_of_f32(&[0.25; 50]);
            buf.put_item_end(&mut item).unwrap();
        }
        buf.close_output().unwrap();
    }

    let mut buf = IoBuffer::with_capacity(64).unwrap();
    buf.set_input(pipe::open_input(&path).unwrap());
    let mut listing = Vec::new();
    assert_eq!(buf.list_blocks(&mut listing, 0).unwrap(), 10);
    let text = String::from_utf8(listing).unwrap();
    assert!(text.contains("Type 1201, version 0, length 200 (id 9 = 0x9)"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn plain_file() { file_round_trip("plain.dat") }

#[test]
fn gzip_file() {
    if Command::new("gzip").arg("--version").output().is_err() {
        return;
    }
    file_round_trip("packed.dat.gz")
}
