use std::hint::black_box;

use bytepipe::Pipe;

fn main() {
    divan::main();
}

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

const ROUNDS: usize = 1_000;

#[divan::bench(args = [(64, 1), (64, 32), (1024, 1), (1024, 32)])]
fn push_pop_round_trip(bencher: divan::Bencher, (record_size, batch): (usize, usize)) {
    bencher
        .with_inputs(|| {
            let pipe = Pipe::new(record_size).unwrap();
            let producer = pipe.producer();
            let consumer = pipe.consumer();
            (producer, consumer, vec![0u8; record_size * batch])
        })
        .bench_values(|(producer, consumer, mut buf)| {
            for _ in 0..ROUNDS {
                producer.push(&buf).unwrap();
                black_box(consumer.try_pop(&mut buf).unwrap());
            }
        });
}

#[divan::bench(threads = [1, 2, 4], args = [64, 1024])]
fn contended_round_trip(bencher: divan::Bencher, record_size: usize) {
    let pipe = Pipe::new(record_size).unwrap();
    bencher
        .with_inputs(|| (pipe.producer(), pipe.consumer(), vec![0u8; record_size]))
        .bench_values(|(producer, consumer, mut record)| {
            for _ in 0..ROUNDS {
                producer.push(&record).unwrap();
                black_box(consumer.try_pop(&mut record).unwrap());
            }
        });
}

#[divan::bench(args = [16, 256])]
fn growth_and_shrink_cycle(bencher: divan::Bencher, record_size: usize) {
    bencher
        .with_inputs(|| {
            let pipe = Pipe::with_min_capacity(record_size, 2).unwrap();
            let producer = pipe.producer();
            let consumer = pipe.consumer();
            (
                producer,
                consumer,
                vec![0u8; record_size * 512],
            )
        })
        .bench_values(|(producer, consumer, mut buf)| {
            producer.push(&buf).unwrap();
            black_box(consumer.try_pop(&mut buf).unwrap());
        });
}
