//! End-to-end record and replay scenarios against real directories.

use pcapstore_core::{
    CoreError, Packet, StoreConfig, StoreReader, StoreWriter, Timestamp,
};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// Ten packets per second, deterministic payload per ordinal.
fn packet(i: u32) -> Packet {
    let ts = Timestamp::new(1_000 + i / 10, (i % 10) * 100_000_000);
    let len = 40 + (i as usize % 100);
    let payload: Vec<u8> = (0..len).map(|b| (b as u32 ^ i) as u8).collect();
    Packet::new(ts, payload)
}

fn write_store(count: u32, config: &StoreConfig) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let mut writer = StoreWriter::create(dir.path(), "capture", config.clone()).unwrap();
    for i in 0..count {
        writer.write_packet(&packet(i)).unwrap();
    }
    writer.close().unwrap();
    let base = dir.path().to_owned();
    (dir, base)
}

fn test_config() -> StoreConfig {
    StoreConfig::new().sync_on_flush(false)
}

#[test]
fn replay_returns_every_packet_in_order() {
    let config = test_config().max_packets_per_segment(7);
    let (_dir, base) = write_store(50, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert_eq!(reader.segment_count(), 8);

    for i in 0..50 {
        let read = reader.next_packet().unwrap().expect("stream ended early");
        let expected = packet(i);
        assert_eq!(read.packet.timestamp(), expected.timestamp());
        assert_eq!(read.packet.payload(), expected.payload());
        assert!(read.checksum_ok);
    }
    assert!(reader.next_packet().unwrap().is_none());
    assert!(reader.skipped_segments().is_empty());
}

#[test]
fn thousand_packets_across_full_segments() {
    let config = test_config().max_packets_per_segment(500);
    let dir = tempdir().unwrap();
    let mut writer = StoreWriter::create(dir.path(), "capture", config.clone()).unwrap();
    for i in 0..1_000 {
        writer.write_packet(&packet(i)).unwrap();
    }
    writer.close().unwrap();

    // 1,000 packets at ten per second span 100 seconds; the one-second
    // sampling cadence must have produced an entry per elapsed second.
    assert_eq!(writer.segment_count(), 2);
    assert!(writer.index_len() >= 100, "index_len = {}", writer.index_len());
    let packet_bytes: u64 = (0..1_000u32).map(|i| 16 + packet(i).payload().len() as u64).sum();
    assert_eq!(writer.bytes_written(), packet_bytes);

    let base = dir.path().to_owned();
    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert_eq!(reader.segment_count(), 2);
    assert_eq!(reader.packet_count().unwrap(), 1_000);

    // Packet 750 sits in the second segment; its bytes must come back
    // untouched.
    assert!(reader.seek_to_packet(750).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    let expected = packet(750);
    assert_eq!(read.packet.timestamp(), expected.timestamp());
    assert_eq!(read.packet.payload(), expected.payload());
    assert_eq!(read.packet.checksum(), expected.checksum());

    // The remainder of the stream follows in order.
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(751).payload());
}

#[test]
fn thousand_random_sized_packets_time_seek() {
    // Payload sizes drawn from [1 KiB, 1 MiB) by a fixed-seed xorshift,
    // so the scenario covers multi-hundred-KiB packets and stays
    // reproducible.
    fn next_len(state: &mut u64) -> usize {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        1024 + (*state % (1_048_576 - 1024)) as usize
    }
    fn large_packet(i: u32, len: usize) -> Packet {
        let ts = Timestamp::new(2_000 + i / 10, (i % 10) * 100_000_000);
        Packet::new(ts, vec![(i % 251) as u8; len])
    }

    let config = test_config().max_packets_per_segment(500);
    let dir = tempdir().unwrap();
    let mut writer = StoreWriter::create(dir.path(), "capture", config.clone()).unwrap();

    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let mut lens = Vec::with_capacity(1_000);
    for i in 0..1_000u32 {
        let len = next_len(&mut state);
        lens.push(len);
        writer.write_packet(&large_packet(i, len)).unwrap();
    }
    writer.close().unwrap();
    assert_eq!(writer.segment_count(), 2);

    // Seeking to packet #750's exact timestamp returns that packet,
    // byte-identical, from the second segment.
    let mut reader = StoreReader::open(dir.path(), "capture", config).unwrap();
    let expected = large_packet(750, lens[750]);
    assert!(reader.seek_to_time(expected.timestamp()).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.timestamp(), expected.timestamp());
    assert_eq!(read.packet.payload(), expected.payload());
    assert_eq!(read.packet.checksum(), expected.checksum());
    assert!(read.checksum_ok);

    // The stream continues in order from there.
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.timestamp(), large_packet(751, lens[751]).timestamp());
}

#[test]
fn read_many_stops_at_end_of_stream() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(25, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    let first = reader.read_many(10).unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[9].packet.payload(), packet(9).payload());

    // Asking for more than remains returns what is left.
    let rest = reader.read_many(100).unwrap();
    assert_eq!(rest.len(), 15);
    assert!(reader.read_many(5).unwrap().is_empty());
}

#[test]
fn seek_to_packet_past_end_returns_false() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(25, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert!(reader.seek_to_packet(24).unwrap());
    assert!(!reader.seek_to_packet(25).unwrap());
    assert!(!reader.seek_to_packet(1_000).unwrap());
}

#[test]
fn seek_to_time_lands_on_first_packet_at_or_after_target() {
    let config = test_config().max_packets_per_segment(20);
    let (_dir, base) = write_store(100, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert!(reader.has_index());

    // Exact timestamp of packet 37.
    let target = packet(37).timestamp();
    assert!(reader.seek_to_time(target).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(37).payload());

    // Between packet 54 and 55 resolves to 55.
    let between = packet(54).timestamp() + Duration::from_millis(50);
    assert!(reader.seek_to_time(between).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(55).payload());
}

#[test]
fn seek_to_time_boundaries() {
    let config = test_config().max_packets_per_segment(20);
    let (_dir, base) = write_store(100, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();

    // Before the first packet.
    assert!(!reader.seek_to_time(Timestamp::new(999, 0)).unwrap());
    // At the first packet.
    assert!(reader.seek_to_time(packet(0).timestamp()).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(0).payload());
    // Past the last packet: positioned at end of stream.
    assert!(reader.seek_to_time(Timestamp::new(50_000, 0)).unwrap());
    assert!(reader.next_packet().unwrap().is_none());
}

#[test]
fn seek_to_time_works_across_segment_boundary() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    // Packet 10 opens the second segment.
    assert!(reader.seek_to_time(packet(10).timestamp()).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(10).payload());
}

#[test]
fn missing_index_degrades_to_linear_scan() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    fs::remove_file(base.join("capture.pcap")).unwrap();

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert!(!reader.has_index());

    // Sequential reads are unaffected.
    assert_eq!(reader.packet_count().unwrap(), 30);

    // Seeks still work, linearly.
    assert!(reader.seek_to_time(packet(17).timestamp()).unwrap());
    let read = reader.next_packet().unwrap().unwrap();
    assert_eq!(read.packet.payload(), packet(17).payload());
    assert!(!reader.seek_to_time(Timestamp::new(999, 0)).unwrap());
}

#[test]
fn corrupt_index_degrades_to_linear_scan() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    fs::write(base.join("capture.pcap"), b"not an index").unwrap();

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    assert!(!reader.has_index());
    assert_eq!(reader.packet_count().unwrap(), 30);
}

#[test]
fn truncated_tail_reported_once_then_end_of_stream() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(25, &config);

    // Tear the last segment in the middle of its final packet.
    let segments = {
        let reader = StoreReader::open(&base, "capture", config.clone()).unwrap();
        reader.layout().list_segments().unwrap()
    };
    let last = segments.last().unwrap();
    let bytes = fs::read(last).unwrap();
    fs::write(last, &bytes[..bytes.len() - 10]).unwrap();

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    let mut delivered = 0;
    let err = loop {
        match reader.next_packet() {
            Ok(Some(_)) => delivered += 1,
            Ok(None) => panic!("truncation never reported"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, CoreError::Truncated { .. }));
    assert_eq!(delivered, 24);

    // The stream finishes cleanly after the one error.
    assert!(reader.next_packet().unwrap().is_none());
    assert!(reader.next_packet().unwrap().is_none());
}

#[test]
fn unreadable_segment_skipped_and_recorded() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    let segments = {
        let reader = StoreReader::open(&base, "capture", config.clone()).unwrap();
        reader.layout().list_segments().unwrap()
    };
    // Stomp the second segment's header.
    fs::write(&segments[1], vec![0xFFu8; 64]).unwrap();

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    let mut payloads = Vec::new();
    while let Some(read) = reader.next_packet().unwrap() {
        payloads.push(read.packet.into_payload());
    }

    // Segments one and three survive.
    assert_eq!(payloads.len(), 20);
    assert_eq!(payloads[0], packet(0).payload());
    assert_eq!(payloads[10], packet(20).payload());
    assert_eq!(reader.skipped_segments(), &segments[1..2]);
}

#[test]
fn corrupted_payload_flagged_without_ending_the_stream() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(10, &config);

    let segments = {
        let reader = StoreReader::open(&base, "capture", config.clone()).unwrap();
        reader.layout().list_segments().unwrap()
    };
    // Flip one byte inside the first packet's payload. The file header
    // is 16 bytes and the packet header another 16, so byte 40 sits in
    // the payload.
    let path = &segments[0];
    let mut bytes = fs::read(path).unwrap();
    bytes[40] ^= 0x01;
    fs::write(path, &bytes).unwrap();

    let mut reader = StoreReader::open(&base, "capture", config).unwrap();
    let mut flagged = 0;
    let mut total = 0;
    while let Some(read) = reader.next_packet().unwrap() {
        total += 1;
        if !read.checksum_ok {
            flagged += 1;
        }
    }
    assert_eq!(total, 10);
    assert_eq!(flagged, 1);
}

#[test]
fn time_range_spans_first_and_last_packet() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    let reader = StoreReader::open(&base, "capture", config).unwrap();
    let (first, last) = reader.time_range().unwrap().unwrap();
    assert_eq!(first, packet(0).timestamp());
    assert_eq!(last, packet(29).timestamp());
    assert_eq!(reader.first_timestamp().unwrap(), Some(first));
    assert_eq!(reader.last_timestamp().unwrap(), Some(last));
}

#[test]
fn size_report_matches_written_bytes() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(30, &config);

    let reader = StoreReader::open(&base, "capture", config).unwrap();
    assert_eq!(reader.segment_paths().len(), 3);

    // Three file headers plus every packet's header and payload.
    let payload_bytes: u64 = (0..30).map(|i| packet(i).payload().len() as u64).sum();
    let expected = 3 * 16 + 30 * 16 + payload_bytes;
    assert_eq!(reader.total_size().unwrap(), expected);
}

#[test]
fn empty_store_replays_nothing() {
    let dir = tempdir().unwrap();
    let config = test_config();
    let mut writer = StoreWriter::create(dir.path(), "capture", config.clone()).unwrap();
    writer.close().unwrap();

    let mut reader = StoreReader::open(dir.path(), "capture", config).unwrap();
    assert_eq!(reader.segment_count(), 0);
    assert!(reader.next_packet().unwrap().is_none());
    assert!(!reader.seek_to_time(Timestamp::new(1_000, 0)).unwrap());
    assert!(!reader.seek_to_packet(0).unwrap());
}

#[test]
fn open_path_accepts_index_file_and_segment_dir() {
    let config = test_config().max_packets_per_segment(10);
    let (_dir, base) = write_store(5, &config);

    let mut by_index = StoreReader::open_path(&base.join("capture.pcap"), config.clone()).unwrap();
    assert_eq!(by_index.packet_count().unwrap(), 5);
    assert!(by_index.next_packet().unwrap().is_some());

    let mut by_dir = StoreReader::open_path(&base.join("capture"), config).unwrap();
    assert_eq!(by_dir.packet_count().unwrap(), 5);
    assert!(by_dir.next_packet().unwrap().is_some());
}

#[cfg(feature = "tokio")]
mod nonblocking {
    use super::*;
    use pcapstore_core::{AsyncStoreReader, AsyncStoreWriter};

    #[tokio::test]
    async fn async_round_trip_with_seek() {
        let dir = tempdir().unwrap();
        let config = test_config().max_packets_per_segment(10);

        let writer = AsyncStoreWriter::create(dir.path(), "capture", config.clone())
            .await
            .unwrap();
        for i in 0..30 {
            writer.write_packet(packet(i)).await.unwrap();
        }
        writer.close().await.unwrap();
        assert_eq!(writer.packet_count().await, 30);

        let reader = AsyncStoreReader::open(dir.path(), "capture", config)
            .await
            .unwrap();
        assert_eq!(reader.packet_count().await.unwrap(), 30);

        assert!(reader.seek_to_time(packet(15).timestamp()).await.unwrap());
        let read = reader.next_packet().await.unwrap().unwrap();
        assert_eq!(read.packet.payload(), packet(15).payload());

        reader.reset().await;
        let read = reader.next_packet().await.unwrap().unwrap();
        assert_eq!(read.packet.payload(), packet(0).payload());
    }
}
