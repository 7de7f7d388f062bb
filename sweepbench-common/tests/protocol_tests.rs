// SPDX-License-Identifier: MIT

//! Unit tests for the command grammar, range parsing and record encoding.

use sweepbench_common::protocol::{parse_line, Command, ErrorKind, SweepRange};
use sweepbench_common::record::Record;

#[test]
fn test_parse_simple_test() {
    assert_eq!(
        parse_line("TEST42"),
        Ok(Command::SimpleTest { test_id: 42 })
    );
}

#[test]
fn test_parse_simple_test_keeps_invalid_ids_for_dispatch() {
    // Validation happens downstream; the parser stays permissive.
    assert_eq!(parse_line("TEST0"), Ok(Command::SimpleTest { test_id: 0 }));
    assert_eq!(parse_line("TEST-3"), Ok(Command::SimpleTest { test_id: -3 }));
    // Unparseable suffixes collapse to id 0, like the original toInt().
    assert_eq!(parse_line("TESTabc"), Ok(Command::SimpleTest { test_id: 0 }));
    assert_eq!(parse_line("TEST"), Ok(Command::SimpleTest { test_id: 0 }));
}

#[test]
fn test_parse_mode_toggles() {
    assert_eq!(
        parse_line("TEST_MODE_ON"),
        Ok(Command::ModeToggle { enabled: true })
    );
    assert_eq!(
        parse_line("TEST_MODE_OFF"),
        Ok(Command::ModeToggle { enabled: false })
    );
}

#[test]
fn test_parse_cancel() {
    assert_eq!(parse_line("CANCEL_TEST"), Ok(Command::CancelTest));
}

#[test]
fn test_parse_sweep_request() {
    let line = r#"RUN_TEST {"id":1,"snrRange":"0:5:10","batchSize":2}"#;
    let Ok(Command::SweepTest(request)) = parse_line(line) else {
        panic!("expected sweep command");
    };
    assert_eq!(request.id, 1);
    assert_eq!(request.snr_range, "0:5:10");
    assert_eq!(request.batch_size, 2);
}

#[test]
fn test_parse_sweep_request_malformed_payload() {
    assert_eq!(
        parse_line("RUN_TEST {not json"),
        Err(ErrorKind::MalformedPayload)
    );
    assert_eq!(parse_line("RUN_TEST"), Err(ErrorKind::MalformedPayload));
    // Missing field
    assert_eq!(
        parse_line(r#"RUN_TEST {"id":1,"batchSize":2}"#),
        Err(ErrorKind::MalformedPayload)
    );
}

#[test]
fn test_parse_unrecognized() {
    assert_eq!(
        parse_line("HELLO"),
        Ok(Command::Unrecognized { raw: "HELLO" })
    );
    // A mode keyword with trailing junk is not a toggle.
    assert_eq!(
        parse_line("RUN"),
        Ok(Command::Unrecognized { raw: "RUN" })
    );
}

#[test]
fn test_sweep_range_parse() {
    assert_eq!(
        SweepRange::parse("0:5:10"),
        Ok(SweepRange {
            start: 0,
            step: 5,
            stop: 10
        })
    );
    assert_eq!(
        SweepRange::parse(" -4 : 2 : 8 "),
        Ok(SweepRange {
            start: -4,
            step: 2,
            stop: 8
        })
    );
}

#[test]
fn test_sweep_range_parse_rejects_malformed_triples() {
    assert_eq!(SweepRange::parse("0:5"), Err(ErrorKind::MalformedPayload));
    assert_eq!(
        SweepRange::parse("0:5:10:2"),
        Err(ErrorKind::MalformedPayload)
    );
    assert_eq!(SweepRange::parse("a:b:c"), Err(ErrorKind::MalformedPayload));
    assert_eq!(SweepRange::parse(""), Err(ErrorKind::MalformedPayload));
}

#[test]
fn test_sweep_range_validate_rejects_non_positive_step() {
    let zero = SweepRange {
        start: 0,
        step: 0,
        stop: 10,
    };
    assert_eq!(zero.validate(), Err(ErrorKind::InvalidRange));

    let negative = SweepRange {
        start: 10,
        step: -5,
        stop: 0,
    };
    assert_eq!(negative.validate(), Err(ErrorKind::InvalidRange));
}

#[test]
fn test_sweep_range_counts() {
    let range = SweepRange {
        start: 0,
        step: 5,
        stop: 10,
    };
    assert_eq!(range.point_count(), 3);
    assert_eq!(range.sample_count(2), 6);

    // Step that does not land exactly on stop
    let uneven = SweepRange {
        start: 0,
        step: 3,
        stop: 10,
    };
    assert_eq!(uneven.point_count(), 4); // 0, 3, 6, 9

    // Empty sweep
    let empty = SweepRange {
        start: 10,
        step: 1,
        stop: 0,
    };
    assert_eq!(empty.point_count(), 0);
    assert_eq!(empty.sample_count(5), 0);

    // Single point
    let single = SweepRange {
        start: 7,
        step: 1,
        stop: 7,
    };
    assert_eq!(single.point_count(), 1);
}

#[test]
fn test_sweep_range_counts_do_not_wrap_for_extreme_bounds() {
    // Span wider than i32 can hold.
    let full = SweepRange {
        start: i32::MIN,
        step: 2,
        stop: i32::MAX,
    };
    assert_eq!(full.point_count(), 2_147_483_648);
    assert_eq!(full.sample_count(4), 8_589_934_592);

    let top = SweepRange {
        start: i32::MAX - 1,
        step: 5,
        stop: i32::MAX,
    };
    assert_eq!(top.point_count(), 1);
}

#[test]
fn test_diagnostics_match_wire_text() {
    assert_eq!(
        ErrorKind::MalformedPayload.diagnostic(),
        "Failed to parse test parameters"
    );
    assert_eq!(ErrorKind::InvalidTestId.diagnostic(), "Invalid test ID");
    assert_eq!(
        ErrorKind::UnknownCommand.diagnostic(),
        "Unknown command. Use 'TEST<id>' to run a test."
    );
}

#[test]
fn test_record_encoding_lifecycle() {
    let started = Record::Started { test_id: 5 }.to_json().unwrap();
    assert_eq!(started.as_str(), r#"{"status":"started","testId":5}"#);

    let completed = Record::Completed { test_id: 5 }.to_json().unwrap();
    assert_eq!(completed.as_str(), r#"{"status":"completed","testId":5}"#);

    let cancelled = Record::Cancelled { test_id: 9 }.to_json().unwrap();
    assert_eq!(cancelled.as_str(), r#"{"status":"cancelled","testId":9}"#);
}

#[test]
fn test_record_encoding_count() {
    let count = Record::Count {
        test_id: 3,
        count: 7,
    }
    .to_json()
    .unwrap();
    assert_eq!(count.as_str(), r#"{"testId":3,"count":7}"#);
}

#[test]
fn test_record_encoding_sample_field_order() {
    let sample = Record::Sample {
        test_id: 1,
        snr: 5,
        ber: 0.05,
        fer: 0.1,
    }
    .to_json()
    .unwrap();
    // Field order is pinned; float formatting is the encoder's business.
    assert!(sample.as_str().starts_with(r#"{"testId":1,"snr":5,"ber":"#));
    assert!(sample.as_str().contains(r#","fer":"#));
}

#[test]
fn test_record_encoding_roundtrips_through_serde_json() {
    let sample = Record::Sample {
        test_id: 2,
        snr: -3,
        ber: 0.042,
        fer: 0.123,
    }
    .to_json()
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(sample.as_str()).unwrap();
    assert_eq!(value["testId"], 2);
    assert_eq!(value["snr"], -3);
    assert_eq!(value["ber"].as_f64().unwrap(), 0.042);
    assert_eq!(value["fer"].as_f64().unwrap(), 0.123);
}
