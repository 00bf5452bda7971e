/// Session-level integration tests: one-shot round-trips across
/// strategies and levels, context lifecycle (validation, reset modes,
/// dictionary load), the file/network carryover drivers, dictionary
/// training effectiveness, and window-limit enforcement.
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crush_core::{
    compress, compress_stream, decompress, decompress_stream, frame_decompressed_size,
    CodecError, CompressConfig, CompressionContext, DecompressionContext, Dictionary,
    FlushPolicy, FrameReader, FrameWriter, MetricsSink, ResetMode, SessionState, Strategy,
};

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// Generate `len` highly compressible bytes (repeating pattern).
fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

/// A small JSON-ish record from the distribution the dictionary tests
/// train on.
fn json_record(id: usize) -> Vec<u8> {
    format!(
        r#"{{"id":{},"name":"user-{}","role":"engineer","active":true,"score":{},"region":"eu-west-1"}}"#,
        id,
        id,
        (id * 7) % 100
    )
    .into_bytes()
}

fn fresh_decompressor() -> DecompressionContext {
    DecompressionContext::new(None).unwrap()
}

// ── one-shot round-trips ───────────────────────────────────────────────────

#[test]
fn test_roundtrip_every_strategy() {
    let data = compressible_bytes(200 * 1024);
    for strategy in [
        Strategy::Fast,
        Strategy::Balanced,
        Strategy::Binary,
        Strategy::StructuredData,
        Strategy::Text,
        Strategy::Maximum,
    ] {
        let config = CompressConfig {
            strategy: Some(strategy),
            ..Default::default()
        };
        let mut ctx = CompressionContext::new(config).unwrap();
        assert_eq!(ctx.level(), strategy.default_level());

        let frame = ctx.compress(&data).unwrap();
        assert_eq!(ctx.state(), SessionState::Idle, "session must return to Idle");

        let restored = fresh_decompressor().decompress(&frame).unwrap();
        assert_eq!(restored, data, "strategy {} must round-trip", strategy.name());
    }
}

#[test]
fn test_roundtrip_module_level_oneshot() {
    let data = compressible_bytes(64 * 1024);
    for level in [1, 3, 12, 19] {
        let frame = compress(&data, level).unwrap();
        assert!(frame.len() < data.len());
        assert_eq!(decompress(&frame).unwrap(), data);
    }
}

#[test]
fn test_roundtrip_empty_input() {
    let frame = compress(&[], 3).unwrap();
    assert!(!frame.is_empty(), "even an empty frame has a header");
    assert_eq!(decompress(&frame).unwrap(), Vec::<u8>::new());

    let mut ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let frame = ctx.compress(&[]).unwrap();
    assert_eq!(fresh_decompressor().decompress(&frame).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_roundtrip_incompressible_data() {
    let data = pseudo_random_bytes(256 * 1024, 0xDEAD_BEEF);
    let frame = compress(&data, 3).unwrap();
    // High-entropy input does not shrink, but must still round-trip.
    assert_eq!(decompress(&frame).unwrap(), data);
}

#[test]
fn test_session_reuse_across_frames() {
    let mut ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let a = compressible_bytes(10_000);
    let b = pseudo_random_bytes(10_000, 7);

    let frame_a = ctx.compress(&a).unwrap();
    let frame_b = ctx.compress(&b).unwrap();

    let mut dctx = fresh_decompressor();
    assert_eq!(dctx.decompress(&frame_a).unwrap(), a);
    assert_eq!(dctx.decompress(&frame_b).unwrap(), b);
}

// ── config validation ──────────────────────────────────────────────────────

#[test]
fn test_invalid_compression_level_rejected() {
    for level in [0, -1, 23, 100] {
        let config = CompressConfig {
            level: Some(level),
            ..Default::default()
        };
        match CompressionContext::new(config) {
            Err(CodecError::InvalidCompressionLevel { level: l, min, max }) => {
                assert_eq!(l, level);
                assert_eq!((min, max), (1, 22));
            }
            other => panic!("level {} should be rejected, got {:?}", level, other.err()),
        }
    }
    assert!(matches!(
        compress(b"x", 0),
        Err(CodecError::InvalidCompressionLevel { .. })
    ));
}

#[test]
fn test_explicit_level_overrides_strategy_default() {
    let config = CompressConfig {
        level: Some(7),
        strategy: Some(Strategy::Maximum),
        ..Default::default()
    };
    assert_eq!(config.effective_level(), 7);
    assert_eq!(CompressConfig::default().effective_level(), 3);

    let ctx = CompressionContext::new(config).unwrap();
    assert_eq!(ctx.level(), 7);
    assert_eq!(ctx.strategy(), Some(Strategy::Maximum));
}

#[test]
fn test_window_log_bounds() {
    for w in [9, 32, 0] {
        assert!(matches!(
            DecompressionContext::new(Some(w)),
            Err(CodecError::InvalidInput(_))
        ));
    }
    assert!(DecompressionContext::new(Some(10)).is_ok());
    assert!(DecompressionContext::new(Some(31)).is_ok());
    assert!(DecompressionContext::new(None).is_ok());

    let config = CompressConfig {
        window_log: Some(9),
        ..Default::default()
    };
    assert!(matches!(
        CompressionContext::new(config),
        Err(CodecError::InvalidInput(_))
    ));
}

#[test]
fn test_window_limit_enforced_on_decode() {
    // Content below the 1 KB window decodes fine under the smallest cap.
    let small = compressible_bytes(512);
    let small_frame = compress(&small, 3).unwrap();
    let mut tight = DecompressionContext::new(Some(10)).unwrap();
    assert_eq!(tight.decompress(&small_frame).unwrap(), small);

    // A megabyte needs a much larger window; the capped context must
    // fail cleanly rather than decode.
    let big = compressible_bytes(1024 * 1024);
    let big_frame = compress(&big, 3).unwrap();
    let mut tight = DecompressionContext::new(Some(10)).unwrap();
    match tight.decompress(&big_frame) {
        Err(CodecError::StreamDecompressionFailed(_)) => {}
        other => panic!("window-capped decode should fail, got {:?}", other.map(|v| v.len())),
    }
}

// ── frame header ───────────────────────────────────────────────────────────

#[test]
fn test_frame_header_size_query() {
    let data = compressible_bytes(4096);

    // One-shot frames record the decompressed size.
    let frame = compress(&data, 3).unwrap();
    assert_eq!(frame_decompressed_size(&frame).unwrap(), Some(4096));

    // Streaming frames cannot know it up front: header says unknown,
    // and decompression must tolerate that.
    let ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let (_, streamed, _) = {
        let mut w = FrameWriter::new(ctx, Vec::new(), FlushPolicy::Coalesce);
        w.write(&data).unwrap();
        w.finish().unwrap()
    };
    assert_eq!(frame_decompressed_size(&streamed).unwrap(), None);
    assert_eq!(decompress(&streamed).unwrap(), data);

    // Garbage is not a frame header.
    assert!(matches!(
        frame_decompressed_size(&[0xAB; 32]),
        Err(CodecError::InvalidInput(_))
    ));
}

#[test]
fn test_checksum_flag_detects_corruption() {
    let data = compressible_bytes(64 * 1024);
    let config = CompressConfig {
        checksum: true,
        ..Default::default()
    };
    let mut ctx = CompressionContext::new(config).unwrap();
    let mut frame = ctx.compress(&data).unwrap();

    assert_eq!(fresh_decompressor().decompress(&frame).unwrap(), data);

    // Flip one payload byte; the checksum footer must catch it even if
    // the entropy decode happens to survive.
    let mid = frame.len() / 2;
    frame[mid] ^= 0x40;
    assert!(fresh_decompressor().decompress(&frame).is_err());
}

// ── carryover drivers ──────────────────────────────────────────────────────

#[test]
fn test_writer_reader_roundtrip_coalesced() {
    let mut data = compressible_bytes(700_000);
    data.extend(pseudo_random_bytes(300_000, 42));

    let ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let mut writer = FrameWriter::new(ctx, Vec::new(), FlushPolicy::Coalesce);
    // Push in awkward chunk sizes to exercise the buffering discipline.
    for chunk in data.chunks(10_007) {
        writer.write(chunk).unwrap();
    }
    let (ctx, frame, summary) = writer.finish().unwrap();
    assert_eq!(ctx.state(), SessionState::Idle);
    assert_eq!(summary.bytes_in, data.len() as u64);
    assert_eq!(summary.bytes_out, frame.len() as u64);
    assert!(summary.ratio() > 1.0, "mixed data should still shrink overall");

    // Read it back through the carryover path with a tiny chunk size
    // so frame boundaries never align with reads.
    let dctx = fresh_decompressor();
    let mut reader = FrameReader::with_chunk_size(dctx, Cursor::new(&frame), 1024);
    let mut restored = Vec::new();
    let summary = reader.decompress_to(&mut restored).unwrap();
    assert_eq!(restored, data);
    assert_eq!(summary.bytes_in, frame.len() as u64);
    assert_eq!(summary.bytes_out, data.len() as u64);
    assert_eq!(reader.into_context().state(), SessionState::Idle);
}

#[test]
fn test_writer_reader_roundtrip_per_chunk_flush() {
    let data = compressible_bytes(256 * 1024);
    let ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let mut writer = FrameWriter::new(ctx, Vec::new(), FlushPolicy::PerChunk);
    for chunk in data.chunks(4096) {
        writer.write(chunk).unwrap();
    }
    let (_, frame, _) = writer.finish().unwrap();

    let mut restored = Vec::new();
    let (ctx, _) = decompress_stream(fresh_decompressor(), Cursor::new(&frame), &mut restored).unwrap();
    assert_eq!(restored, data);
    assert_eq!(ctx.state(), SessionState::Idle);
}

#[test]
fn test_stream_pumps_roundtrip() {
    let data = pseudo_random_bytes(512 * 1024, 0x5EED);
    let ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let (_, frame, summary) = compress_stream(
        ctx,
        &mut Cursor::new(&data),
        Vec::new(),
        FlushPolicy::Coalesce,
    )
    .unwrap();
    assert_eq!(summary.bytes_in, data.len() as u64);

    let mut restored = Vec::new();
    decompress_stream(fresh_decompressor(), Cursor::new(&frame), &mut restored).unwrap();
    assert_eq!(restored, data);
}

#[test]
fn test_concatenated_frames_decode_back_to_back() {
    let a = compressible_bytes(50_000);
    let b = pseudo_random_bytes(50_000, 9);
    let mut wire = compress(&a, 3).unwrap();
    wire.extend(compress(&b, 5).unwrap());

    let mut expected = a;
    expected.extend(b);

    // The carryover reader crosses the frame boundary transparently.
    let mut restored = Vec::new();
    decompress_stream(fresh_decompressor(), Cursor::new(&wire), &mut restored).unwrap();
    assert_eq!(restored, expected);

    // So does the in-memory session one-shot.
    assert_eq!(fresh_decompressor().decompress(&wire).unwrap(), expected);
}

#[test]
fn test_truncated_source_stalls_cleanly() {
    let data = pseudo_random_bytes(100_000, 0xBAD);
    let frame = compress(&data, 3).unwrap();
    let truncated = &frame[..frame.len() * 3 / 5];

    let dctx = fresh_decompressor();
    let mut reader = FrameReader::with_chunk_size(dctx, Cursor::new(truncated), 1024);
    let mut out = Vec::new();
    match reader.decompress_to(&mut out) {
        Err(CodecError::DecompressionStalled(_)) => {}
        other => panic!("truncated source must stall, got {:?}", other),
    }

    // Same contract on the in-memory path.
    match fresh_decompressor().decompress(truncated) {
        Err(CodecError::DecompressionStalled(_)) => {}
        other => panic!("truncated buffer must stall, got {:?}", other.map(|v| v.len())),
    }
}

// ── dictionary ─────────────────────────────────────────────────────────────

#[test]
fn test_train_rejects_empty_sample_set() {
    let samples: Vec<Vec<u8>> = Vec::new();
    assert!(matches!(
        Dictionary::train(&samples, 1024),
        Err(CodecError::InvalidInput(_))
    ));
}

#[test]
fn test_dictionary_shrinks_similar_records() {
    let samples: Vec<Vec<u8>> = (0..1200).map(json_record).collect();
    let dict = Dictionary::train(&samples, 2048).unwrap();
    assert!(dict.len() >= 1024, "corpus is rich enough for a full dictionary");
    assert!(dict.len() <= 2048);

    let record = json_record(987_654);

    let mut plain = CompressionContext::new(CompressConfig::default()).unwrap();
    let without = plain.compress(&record).unwrap();

    let mut trained = CompressionContext::new(CompressConfig::default()).unwrap();
    trained.load_dictionary(&dict).unwrap();
    assert_eq!(trained.dictionary().map(|d| d.len()), Some(dict.len()));
    let with = trained.compress(&record).unwrap();

    assert!(
        with.len() <= without.len(),
        "dictionary must not hurt in-distribution records: {} > {}",
        with.len(),
        without.len()
    );

    // Round-trips only with the same dictionary loaded.
    let mut dctx = fresh_decompressor();
    dctx.load_dictionary(&dict).unwrap();
    assert_eq!(dctx.decompress(&with).unwrap(), record);
    assert!(fresh_decompressor().decompress(&with).is_err());
}

#[test]
fn test_dictionary_is_shared_not_copied() {
    let samples: Vec<Vec<u8>> = (0..500).map(json_record).collect();
    let dict = Dictionary::train(&samples, 1024).unwrap();
    let clone = dict.clone();
    // Arc-backed blob: clones alias the same bytes.
    assert_eq!(dict.as_bytes().as_ptr(), clone.as_bytes().as_ptr());
}

// ── reset semantics ────────────────────────────────────────────────────────

#[test]
fn test_full_reset_matches_fresh_context() {
    let data = compressible_bytes(100_000);
    let config = CompressConfig {
        level: Some(5),
        ..Default::default()
    };

    let mut ctx = CompressionContext::new(config.clone()).unwrap();
    let first = ctx.compress(&data).unwrap();
    ctx.reset(ResetMode::SessionAndParameters).unwrap();
    let second = ctx.compress(&data).unwrap();
    assert_eq!(first, second, "full reset must reproduce a fresh context");

    let mut fresh = CompressionContext::new(config).unwrap();
    assert_eq!(fresh.compress(&data).unwrap(), first);
}

#[test]
fn test_full_reset_drops_dictionary() {
    let samples: Vec<Vec<u8>> = (0..500).map(json_record).collect();
    let dict = Dictionary::train(&samples, 1024).unwrap();
    let record = json_record(31_337);

    let mut plain = CompressionContext::new(CompressConfig::default()).unwrap();
    let baseline = plain.compress(&record).unwrap();

    let mut ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    ctx.load_dictionary(&dict).unwrap();
    ctx.reset(ResetMode::SessionAndParameters).unwrap();
    assert!(ctx.dictionary().is_none());
    assert_eq!(ctx.compress(&record).unwrap(), baseline);
}

#[test]
fn test_session_only_reset_keeps_dictionary() {
    let samples: Vec<Vec<u8>> = (0..500).map(json_record).collect();
    let dict = Dictionary::train(&samples, 1024).unwrap();
    let record = json_record(5150);

    let mut ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    ctx.load_dictionary(&dict).unwrap();
    let before = ctx.compress(&record).unwrap();
    ctx.reset(ResetMode::SessionOnly).unwrap();
    assert!(ctx.dictionary().is_some());
    assert_eq!(ctx.compress(&record).unwrap(), before);
}

#[test]
fn test_mid_frame_usage_errors() {
    let mut ctx = CompressionContext::new(CompressConfig::default()).unwrap();
    let samples: Vec<Vec<u8>> = (0..500).map(json_record).collect();
    let dict = Dictionary::train(&samples, 1024).unwrap();

    ctx.step(b"an open frame", crush_core::EndDirective::Continue)
        .unwrap();
    assert_eq!(ctx.state(), SessionState::MidFrame);

    // Starting an independent stream or swapping dictionaries mid-frame
    // is a usage error until the session is reset.
    assert!(matches!(ctx.compress(b"x"), Err(CodecError::InvalidInput(_))));
    assert!(matches!(
        ctx.load_dictionary(&dict),
        Err(CodecError::InvalidInput(_))
    ));

    ctx.reset(ResetMode::SessionOnly).unwrap();
    assert_eq!(ctx.state(), SessionState::Idle);
    assert!(ctx.compress(b"x").is_ok());
}

// ── metrics ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    bytes_out: AtomicUsize,
}

impl MetricsSink for CountingSink {
    fn record(&self, _op: &'static str, _bytes_in: usize, bytes_out: usize, _elapsed: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out, Ordering::Relaxed);
    }
}

#[test]
fn test_injected_metrics_sink_sees_engine_calls() {
    let sink = Arc::new(CountingSink::default());
    let data = compressible_bytes(64 * 1024);

    let mut ctx =
        CompressionContext::with_metrics(CompressConfig::default(), sink.clone()).unwrap();
    let frame = ctx.compress(&data).unwrap();

    assert!(sink.calls.load(Ordering::Relaxed) > 0);
    assert_eq!(sink.bytes_out.load(Ordering::Relaxed), frame.len());
}
