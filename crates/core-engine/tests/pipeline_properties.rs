//! End-to-end behaviour of the RX pipeline as seen by output observers.

mod common;

use common::Recorder;
use core_engine::RxEngine;
use core_text::{MarkerKind, Rgb};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn engine_with_recorder() -> (RxEngine, Recorder) {
    let mut engine = RxEngine::new();
    let recorder = Recorder::default();
    engine.add_observer(recorder.clone());
    (engine, recorder)
}

#[test]
fn escape_sequence_split_across_calls() {
    let (mut split, split_rec) = engine_with_recorder();
    split.ingest(b"\x1b[");
    split.ingest(b"31mhello");
    let (mut whole, whole_rec) = engine_with_recorder();
    whole.ingest(b"\x1b[31mhello");

    let split_out = split_rec.outputs();
    assert!(split_out[0].is_empty());
    assert_eq!(split_out[1].text(), "hello");
    assert_eq!(
        split_out[1].colors().collect::<Vec<_>>(),
        vec![(0, Rgb::new(170, 0, 0))]
    );
    assert_eq!(split_out[1].markers(), whole_rec.outputs()[0].markers());
}

#[test]
fn unsupported_code_yields_text_only() {
    let (mut engine, rec) = engine_with_recorder();
    engine.ingest(b"\x1b[99mhello");
    let out = &rec.outputs()[0];
    assert_eq!(out.text(), "hello");
    assert_eq!(out.colors().count(), 0);
    assert_eq!(engine.unsupported_sequences(), 1);
}

#[test]
fn new_line_marker_position_independent_of_split() {
    let (mut whole, whole_rec) = engine_with_recorder();
    whole.ingest(b"abc\ndef");
    assert_eq!(whole_rec.outputs()[0].new_line_positions(), vec![3]);

    let (mut split, split_rec) = engine_with_recorder();
    split.ingest(b"abc\n");
    split.ingest(b"def");
    let outs = split_rec.outputs();
    assert_eq!(outs[0].new_line_positions(), vec![3]);
    assert!(outs[1].new_line_positions().is_empty());
    assert_eq!(split_rec.output_text(), "abc\ndef");
}

#[test]
fn filter_releases_only_matching_lines() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_filter_pattern("ERR").unwrap();
    rec.clear();
    for line in ["ok line\n", "ERR bad\n", "ok again\n"] {
        engine.ingest(line.as_bytes());
    }
    assert_eq!(rec.output_text(), "ERR bad\n");
    for text in rec.output_texts() {
        assert!(!text.contains("ok"), "filtered line leaked: {text:?}");
    }
}

#[test]
fn filter_match_completed_in_later_chunk() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_filter_pattern("X").unwrap();
    rec.clear();
    engine.ingest(b"prefix");
    assert_eq!(rec.output_text(), "");
    engine.ingest(b"X-suffix\n");
    assert_eq!(rec.output_texts(), vec!["", "prefixX-suffix\n"]);
}

#[test]
fn raw_listeners_get_decoded_chunks() {
    let (mut engine, rec) = engine_with_recorder();
    engine.ingest(b"\x1b[32mhi");
    engine.ingest(b"!");
    assert_eq!(rec.raw(), vec!["\x1b[32mhi".to_string(), "!".to_string()]);
}

#[test]
fn control_characters_follow_decoding_mode() {
    let (mut engine, rec) = engine_with_recorder();
    engine.ingest(b"a\tb\r\n");
    engine.set_decoding_mode(core_parse::DecodingMode::AsciiWithControlChars);
    engine.ingest(b"a\tb\r\n");
    assert_eq!(rec.output_texts(), vec!["ab\n", "a\u{2409}b\u{240d}\n"]);
}

#[test]
fn colors_survive_filtering() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_filter_pattern("keep").unwrap();
    rec.clear();
    engine.ingest(b"\x1b[34mdrop\nkeep\n");
    let out = &rec.outputs()[0];
    assert_eq!(out.text(), "keep\n");
    assert_eq!(out.colors().collect::<Vec<_>>(), vec![(0, Rgb::new(0, 0, 170))]);
}

#[test]
fn timestamps_annotate_line_starts() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_timestamps(true);
    engine.ingest(b"a\nb");
    let out = &rec.outputs()[0];
    let stamps: Vec<usize> = out
        .markers()
        .iter()
        .filter(|m| matches!(m.kind, MarkerKind::Timestamp(_)))
        .map(|m| m.char_pos)
        .collect();
    assert_eq!(stamps, vec![0, 2]);
}

#[test]
fn snapshots_are_independent_of_later_processing() {
    let (mut engine, rec) = engine_with_recorder();
    let first = engine.ingest(b"one\n");
    engine.ingest(b"two\n");
    assert_eq!(first.text(), "one\n");
    assert_eq!(rec.outputs()[0].text(), "one\n");
}

#[test]
fn stray_carriage_return_is_not_a_line_break() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_line_break_token("\r\n").unwrap();
    engine.set_control_char_substitution(true);
    engine.ingest(b"50%\r100%\r\n");
    assert_eq!(rec.output_text(), "50%\u{240d}100%\r\n");

    let (mut engine, rec) = engine_with_recorder();
    engine.set_line_break_token("\r\n").unwrap();
    engine.ingest(b"a\rb\nc\r\n");
    assert_eq!(rec.output_text(), "abc\r\n");
}

#[test]
fn line_break_change_rescans_withheld_partial_token() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_line_break_token("END").unwrap();
    engine.ingest(b"abcEN");
    engine.set_line_break_token("\n").unwrap();
    engine.ingest(b"x\n");
    let outs = rec.outputs();
    assert_eq!(rec.output_texts(), vec!["abc", "ENx\n"]);
    assert_eq!(outs[1].new_line_positions(), vec![3]);
}

#[test]
fn switching_from_crlf_releases_withheld_carriage_return() {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_line_break_token("\r\n").unwrap();
    engine.ingest(b"ab\r");
    engine.set_line_break_token("\n").unwrap();
    engine.ingest(b"c\n");
    assert_eq!(rec.output_texts(), vec!["ab", "c\n"]);
    assert_eq!(rec.outputs()[1].new_line_positions(), vec![1]);

    let (mut engine, rec) = engine_with_recorder();
    engine.set_control_char_substitution(true);
    engine.set_line_break_token("\r\n").unwrap();
    engine.ingest(b"ab\r");
    engine.set_line_break_token("\n").unwrap();
    engine.ingest(b"c\n");
    assert_eq!(rec.output_text(), "ab\u{240d}c\n");
}

fn stream_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z ]{1,6}",
            Just("\n".to_string()),
            Just("\r\n".to_string()),
            Just("\r".to_string()),
            Just("END".to_string()),
            Just("ERR".to_string()),
            Just("\x1b[31m".to_string()),
            Just("\x1b[35;1m".to_string()),
            Just("\x1b[42m".to_string()),
            Just("\t".to_string()),
        ],
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

/// Same pieces without escape codes, so the expected output can be computed
/// line by line.
fn plain_stream_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z ]{1,6}",
            Just("\n".to_string()),
            Just("\r\n".to_string()),
            Just("\r".to_string()),
            Just("END".to_string()),
            Just("ERR".to_string()),
            Just("\t".to_string()),
            Just("\x07".to_string()),
        ],
        0..16,
    )
    .prop_map(|parts| parts.concat())
}

fn line_break_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n"), Just("END")]
}

fn run_chunks(chunks: &[&[u8]], line_break: &str, pattern: &str) -> String {
    let (mut engine, rec) = engine_with_recorder();
    engine.set_line_break_token(line_break).unwrap();
    engine.set_filter_pattern(pattern).unwrap();
    rec.clear();
    for chunk in chunks {
        engine.ingest(chunk);
    }
    rec.output_text()
}

fn drop_controls(text: &str) -> String {
    text.chars()
        .filter(|c| *c >= ' ' && *c != '\u{7f}')
        .collect()
}

/// Released output for plain ASCII input in the default decoding mode: lines
/// containing `pattern` (every line when it is empty), control characters
/// dropped outside the line-break token, and a trailing partial token held back.
fn expected_output(input: &str, line_break: &str, pattern: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(idx) = rest.find(line_break) {
        let (line, tail) = rest.split_at(idx + line_break.len());
        if line.contains(pattern) {
            out.push_str(&drop_controls(&line[..idx]));
            out.push_str(line_break);
        }
        rest = tail;
    }
    let held = (1..line_break.len())
        .rev()
        .find(|n| rest.ends_with(&line_break[..*n]))
        .unwrap_or(0);
    let tail = &rest[..rest.len() - held];
    if tail.contains(pattern) {
        out.push_str(&drop_controls(tail));
    }
    out
}

#[test]
fn line_model_examples() {
    assert_eq!(expected_output("ok\nERR\r1\nE", "\n", "ERR"), "ERR1\n");
    assert_eq!(expected_output("aEN", "END", ""), "a");
    assert_eq!(run_chunks(&[b"ok\nERR\r1\nE"], "\n", "ERR"), "ERR1\n");
    assert_eq!(run_chunks(&[b"a\x07END", b"bEN"], "END", ""), "aENDb");
}

proptest! {
    #[test]
    fn fragmentation_does_not_change_output(
        input in stream_strategy(),
        cut in 0usize..128,
        line_break in line_break_strategy(),
        filtered in any::<bool>(),
    ) {
        let bytes = input.as_bytes();
        let cut = cut.min(bytes.len());
        let pattern = if filtered { "ERR" } else { "" };
        let whole = run_chunks(&[bytes], line_break, pattern);
        let split = run_chunks(&[&bytes[..cut], &bytes[cut..]], line_break, pattern);
        prop_assert_eq!(split, whole);
    }

    #[test]
    fn output_matches_line_model(
        input in plain_stream_strategy(),
        cut in 0usize..128,
        line_break in line_break_strategy(),
        filtered in any::<bool>(),
    ) {
        let bytes = input.as_bytes();
        let cut = cut.min(bytes.len());
        let pattern = if filtered { "ERR" } else { "" };
        let expected = expected_output(&input, line_break, pattern);
        prop_assert_eq!(run_chunks(&[bytes], line_break, pattern), expected.clone());
        prop_assert_eq!(
            run_chunks(&[&bytes[..cut], &bytes[cut..]], line_break, pattern),
            expected
        );
    }

    #[test]
    fn markers_stay_within_output_bounds(input in stream_strategy(), cut in 0usize..128) {
        let (mut engine, rec) = engine_with_recorder();
        engine.set_timestamps(true);
        engine.set_history_size(16);
        let bytes = input.as_bytes();
        let cut = cut.min(bytes.len());
        engine.ingest(&bytes[..cut]);
        engine.ingest(&bytes[cut..]);
        for out in rec.outputs() {
            prop_assert!(out.invariants_hold());
        }
        prop_assert!(engine.replay_history().invariants_hold());
    }
}
