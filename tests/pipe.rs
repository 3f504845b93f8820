use bytepipe::Pipe;
use eyre::Result;
use rstest::rstest;
use std::io::{Read, Seek, SeekFrom, Write};
use std::thread;
use std::time::Duration;

#[test]
fn blocked_consumer_wakes_when_the_last_producer_leaves() -> Result<()> {
    let pipe = Pipe::new(1)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();
    drop(pipe);

    let waiter = thread::spawn(move || {
        let mut buf = [0u8; 10];
        consumer.pop(&mut buf)
    });

    // Give the consumer time to block on the condition variable.
    thread::sleep(Duration::from_millis(50));
    drop(producer);

    let popped = waiter.join().expect("consumer thread panicked")?;
    assert_eq!(popped, 0);
    Ok(())
}

#[test]
fn blocked_consumer_wakes_when_enough_records_arrive() -> Result<()> {
    let pipe = Pipe::new(1)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();

    let waiter = thread::spawn(move || {
        let mut buf = [0u8; 6];
        let popped = consumer.pop(&mut buf)?;
        Ok::<_, bytepipe::PipeError>((popped, buf))
    });

    thread::sleep(Duration::from_millis(50));
    producer.push(b"abc")?;
    thread::sleep(Duration::from_millis(50));
    producer.push(b"def")?;

    let (popped, buf) = waiter.join().expect("consumer thread panicked")?;
    assert_eq!(popped, 6);
    assert_eq!(&buf, b"abcdef");
    Ok(())
}

#[test]
fn pushes_of_whole_records_never_interleave() -> Result<()> {
    const RECORD: usize = 256;
    let pipe = Pipe::new(1)?;
    let consumer = pipe.consumer();

    let mut handles = Vec::new();
    for id in 0..4u8 {
        let producer = pipe.producer();
        handles.push(thread::spawn(move || {
            let record = [id; RECORD];
            producer.push(&record)
        }));
    }
    drop(pipe);

    let mut buf = [0u8; RECORD];
    let mut seen = [false; 4];
    for _ in 0..4 {
        let popped = consumer.pop(&mut buf)?;
        assert_eq!(popped, RECORD);

        let id = buf[0] as usize;
        assert!(
            buf.iter().all(|&b| b == buf[0]),
            "bytes of two pushes interleaved"
        );
        assert!(!seen[id], "record delivered twice");
        seen[id] = true;
    }

    for handle in handles {
        handle.join().expect("producer thread panicked")?;
    }
    assert!(seen.iter().all(|&s| s));
    Ok(())
}

#[rstest]
#[case::single_pair(1, 1)]
#[case::fan_in(4, 1)]
#[case::fan_out(1, 4)]
#[case::crossbar(4, 4)]
fn every_record_is_delivered_exactly_once(
    #[case] producers: usize,
    #[case] consumers: usize,
) -> Result<()> {
    const RECORD: usize = 16;
    const PER_PRODUCER: usize = 2_000;
    const BATCH: usize = 8;

    let pipe = Pipe::new(RECORD)?;

    let mut producer_handles = Vec::new();
    for id in 0..producers {
        let producer = pipe.producer();
        producer_handles.push(thread::spawn(move || -> Result<()> {
            let mut record = [0u8; RECORD];
            for seq in 0..PER_PRODUCER as u64 {
                record[..4].copy_from_slice(&(id as u32).to_le_bytes());
                record[4..12].copy_from_slice(&seq.to_le_bytes());
                producer.push(&record)?;
            }
            Ok(())
        }));
    }

    let mut consumer_handles = Vec::new();
    for _ in 0..consumers {
        let consumer = pipe.consumer();
        consumer_handles.push(thread::spawn(move || -> Result<Vec<Vec<u64>>> {
            let mut buf = [0u8; RECORD * BATCH];
            let mut seen: Vec<Vec<u64>> = vec![Vec::new(); producers];
            loop {
                let popped = consumer.pop(&mut buf)?;
                if popped == 0 {
                    break;
                }
                for record in buf[..popped * RECORD].chunks(RECORD) {
                    let id = u32::from_le_bytes(record[..4].try_into().unwrap()) as usize;
                    let seq = u64::from_le_bytes(record[4..12].try_into().unwrap());
                    seen[id].push(seq);
                }
            }
            Ok(seen)
        }));
    }
    drop(pipe);

    for handle in producer_handles {
        handle.join().expect("producer thread panicked")?;
    }

    let mut all: Vec<Vec<u64>> = vec![Vec::new(); producers];
    for handle in consumer_handles {
        let seen = handle.join().expect("consumer thread panicked")?;
        for (id, seqs) in seen.into_iter().enumerate() {
            // Each pop removes a contiguous prefix, so one consumer sees a
            // producer's sequence numbers in increasing order.
            assert!(
                seqs.windows(2).all(|pair| pair[0] < pair[1]),
                "ordering violated between producer {id} and a consumer"
            );
            all[id].extend(seqs);
        }
    }

    for (id, seqs) in all.iter_mut().enumerate() {
        seqs.sort_unstable();
        assert_eq!(seqs.len(), PER_PRODUCER, "producer {id} lost records");
        for (expected, &seq) in seqs.iter().enumerate() {
            assert_eq!(seq, expected as u64, "producer {id} record duplicated");
        }
    }
    Ok(())
}

#[test]
fn eager_pop_never_blocks() -> Result<()> {
    let pipe = Pipe::new(1)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();

    let mut buf = [0u8; 8];
    assert_eq!(consumer.try_pop(&mut buf)?, 0);

    producer.push(b"abc")?;
    assert_eq!(consumer.try_pop(&mut buf)?, 3);
    assert_eq!(&buf[..3], b"abc");
    assert_eq!(consumer.try_pop(&mut buf)?, 0);
    Ok(())
}

#[test]
fn a_file_streams_through_the_pipe_intact() -> Result<()> {
    const RECORD: usize = 64;
    const RECORDS: usize = 100;

    let payload: Vec<u8> = (0..RECORD * RECORDS).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::tempfile()?;
    file.write_all(&payload)?;
    file.seek(SeekFrom::Start(0))?;

    let pipe = Pipe::new(1)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();
    drop(pipe);

    let reader = thread::spawn(move || -> Result<()> {
        let mut record = [0u8; RECORD];
        loop {
            let read = file.read(&mut record)?;
            if read == 0 {
                break;
            }
            producer.push(&record[..read])?;
        }
        Ok(())
    });

    let mut received = Vec::new();
    let mut record = [0u8; RECORD];
    loop {
        let popped = consumer.pop(&mut record)?;
        if popped == 0 {
            break;
        }
        received.extend_from_slice(&record[..popped]);
    }

    reader.join().expect("reader thread panicked")?;
    assert_eq!(received, payload);
    Ok(())
}

#[test]
fn capacity_breathes_under_a_bursty_load() -> Result<()> {
    let pipe = Pipe::with_min_capacity(1, 2)?;
    let producer = pipe.producer();
    let consumer = pipe.consumer();

    let records: Vec<u8> = (0..=99).collect();
    producer.push(&records)?;
    assert_eq!(pipe.capacity(), 128);

    let mut buf = [0u8; 98];
    assert_eq!(consumer.try_pop(&mut buf)?, 98);
    assert_eq!(buf[..], records[..98]);
    assert_eq!(pipe.capacity(), 64);
    assert_eq!(pipe.len(), 2);

    let mut rest = [0u8; 2];
    assert_eq!(consumer.try_pop(&mut rest)?, 2);
    assert_eq!(rest[..], records[98..]);
    assert!(pipe.capacity() >= 2);
    Ok(())
}
