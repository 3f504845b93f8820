use bytepipe::Pipe;
use clap::Parser;
use eyre::{Result, WrapErr};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[clap(name = "demo_hexdump")]
#[clap(about = "Stream a file through a pipe record by record and hexdump it", long_about = None)]
struct Args {
    /// File to read records from.
    input: PathBuf,

    #[clap(short, long, default_value_t = 256)]
    record_size: usize,

    #[clap(short, long, default_value_t = 10)]
    max_records: usize,
}

fn hexdump(prefix: &str, record: &[u8]) {
    for chunk in record.chunks(16) {
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{prefix}> {}", line.join(" "));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let pipe = Pipe::new(1)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();
    drop(pipe);

    let running = Arc::new(AtomicBool::new(true));
    let record_size = args.record_size;

    let worker = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut record = vec![0u8; record_size];
            let mut total = 0usize;
            let mut popped_last = true;

            // Poll eagerly while the parent is running, then keep draining
            // until a pop comes back empty.
            while running.load(Ordering::Acquire) || popped_last {
                let popped = consumer
                    .try_pop(&mut record)
                    .expect("record buffer is a whole number of elements");
                popped_last = popped > 0;

                if popped > 0 {
                    total += popped;
                    hexdump("C", &record[..popped]);
                } else {
                    debug!("pipe empty");
                    thread::sleep(Duration::from_millis(10));
                }
            }

            total
        })
    };

    let mut file = File::open(&args.input)
        .wrap_err_with(|| format!("failed to open {}", args.input.display()))?;

    let mut record = vec![0u8; record_size];
    let mut sent = 0usize;
    while sent < args.max_records {
        let read = file.read(&mut record)?;
        if read == 0 {
            break;
        }
        record[read..].fill(0);

        hexdump("P", &record);
        producer.push(&record)?;
        sent += 1;
    }
    info!(records = sent, record_size, "producer finished");

    // Drop the last producer before flipping the flag so the worker drains
    // to a definitive end-of-stream.
    drop(producer);
    running.store(false, Ordering::Release);

    let total = worker
        .join()
        .map_err(|_| eyre::eyre!("consumer thread panicked"))?;
    info!(bytes = total, "consumer drained");

    Ok(())
}
