use bytepipe::Pipe;
use clap::Parser;
use eyre::{ensure, Result};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[clap(name = "demo_pipeline")]
#[clap(about = "Drive one pipe with several producers and consumers", long_about = None)]
struct Args {
    #[clap(short, long, default_value_t = 4)]
    producers: usize,

    #[clap(short, long, default_value_t = 2)]
    consumers: usize,

    #[clap(short = 'n', long, default_value_t = 100_000)]
    records_per_producer: usize,

    #[clap(short, long, default_value_t = 64)]
    record_size: usize,

    #[clap(short, long, default_value_t = 32)]
    batch: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    ensure!(args.record_size >= 12, "record size must hold a 12 byte tag");
    ensure!(args.batch > 0, "batch must be non-zero");

    info!(
        producers = args.producers,
        consumers = args.consumers,
        records_per_producer = args.records_per_producer,
        record_size = args.record_size,
        "starting pipeline"
    );

    let pipe = Pipe::new(args.record_size)?;
    let start = Instant::now();

    let mut producer_handles = Vec::new();
    for id in 0..args.producers {
        let producer = pipe.producer();
        let (record_size, total, batch) = (args.record_size, args.records_per_producer, args.batch);

        producer_handles.push(thread::spawn(move || -> Result<()> {
            let mut buf = vec![0u8; record_size * batch];
            let mut seq = 0usize;

            while seq < total {
                let in_batch = batch.min(total - seq);
                for slot in 0..in_batch {
                    let record = &mut buf[slot * record_size..(slot + 1) * record_size];
                    record[..4].copy_from_slice(&(id as u32).to_le_bytes());
                    record[4..12].copy_from_slice(&(seq as u64).to_le_bytes());
                    seq += 1;
                }
                producer.push(&buf[..in_batch * record_size])?;
            }

            debug!(producer = id, records = total, "producer done");
            Ok(())
        }));
    }

    let mut consumer_handles = Vec::new();
    for cid in 0..args.consumers {
        let consumer = pipe.consumer();
        let (record_size, batch, producers) = (args.record_size, args.batch, args.producers);

        consumer_handles.push(thread::spawn(move || -> Result<Vec<u64>> {
            let mut buf = vec![0u8; record_size * batch];
            let mut counts = vec![0u64; producers];

            loop {
                let popped = consumer.pop(&mut buf)?;
                if popped == 0 {
                    break;
                }
                for record in buf[..popped * record_size].chunks(record_size) {
                    let id = u32::from_le_bytes(record[..4].try_into().unwrap()) as usize;
                    counts[id] += 1;
                }
            }

            debug!(consumer = cid, records = counts.iter().sum::<u64>(), "consumer done");
            Ok(counts)
        }));
    }

    // The bidirectional handle counts as a producer; release it so the
    // consumers can reach end-of-stream.
    drop(pipe);

    for handle in producer_handles {
        handle
            .join()
            .map_err(|_| eyre::eyre!("producer thread panicked"))??;
    }

    let mut totals = vec![0u64; args.producers];
    for handle in consumer_handles {
        let counts = handle
            .join()
            .map_err(|_| eyre::eyre!("consumer thread panicked"))??;
        for (total, count) in totals.iter_mut().zip(counts) {
            *total += count;
        }
    }

    let elapsed = start.elapsed();
    let expected = (args.producers * args.records_per_producer) as u64;
    let received: u64 = totals.iter().sum();
    ensure!(
        received == expected,
        "record count mismatch: received {received}, expected {expected}"
    );

    info!(
        total_records = received,
        elapsed_ms = elapsed.as_millis() as u64,
        rate = format!("{:.0}/s", received as f64 / elapsed.as_secs_f64()),
        "pipeline complete"
    );

    Ok(())
}
