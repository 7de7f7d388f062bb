// SPDX-License-Identifier: MIT

//! Command implementations for the harness.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use sweepbench_common::protocol::{SweepRange, SweepRequest};

use crate::transport::{SerialEvent, Transport};

/// Sweep samples arrive every 100 ms, countdown steps every second; this
/// bounds the gap between any two records.
const RECORD_TIMEOUT: Duration = Duration::from_secs(5);

/// One decoded record line from the firmware.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireRecord {
    Lifecycle {
        status: String,
        #[serde(rename = "testId")]
        test_id: i32,
    },
    Sample {
        #[serde(rename = "testId")]
        test_id: i32,
        snr: i32,
        ber: f64,
        fer: f64,
    },
    Count {
        #[serde(rename = "testId")]
        test_id: i32,
        count: u32,
    },
}

fn parse_record(line: &str) -> Option<WireRecord> {
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Plain-text lines that mean the firmware rejected the command.
fn is_failure_diagnostic(line: &str) -> bool {
    line.starts_with("Invalid test ID")
        || line.starts_with("Failed to parse test parameters")
        || line.starts_with("Invalid SNR range")
        || line.starts_with("Unknown command")
        || line.starts_with("Test already running")
        || line.starts_with("Command line too long")
}

fn next_line(transport: &mut Transport, timeout: Duration) -> Result<String> {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let remaining = deadline
            .checked_duration_since(std::time::Instant::now())
            .unwrap_or_default();
        match transport.read_event(remaining)? {
            Some(SerialEvent::Line(line)) => return Ok(line),
            Some(SerialEvent::Heartbeat) => continue,
            None => bail!("Timed out waiting for firmware output"),
        }
    }
}

/// Switch the firmware between simulated and deterministic metrics.
pub fn mode(transport: &mut Transport, enabled: bool) -> Result<()> {
    let command = if enabled { "TEST_MODE_ON" } else { "TEST_MODE_OFF" };
    transport.send_line(command)?;

    loop {
        let line = next_line(transport, RECORD_TIMEOUT)?;
        if line.starts_with("Received command:") {
            continue;
        }
        println!("{line}");
        return Ok(());
    }
}

/// Run the simple countdown test and print each sample.
pub fn simple(transport: &mut Transport, id: i32) -> Result<()> {
    transport.send_line(&format!("TEST{id}"))?;

    loop {
        let line = next_line(transport, RECORD_TIMEOUT)?;
        if is_failure_diagnostic(&line) {
            bail!("Firmware rejected the test: {line}");
        }
        match parse_record(&line) {
            Some(WireRecord::Lifecycle { status, test_id }) => {
                println!("Test {test_id}: {status}");
                if status == "completed" || status == "cancelled" {
                    return Ok(());
                }
            }
            Some(WireRecord::Count { test_id, count }) => {
                println!("Test {test_id}: count {count}");
            }
            Some(WireRecord::Sample { .. }) | None => {}
        }
    }
}

/// Run an SNR/batch sweep, rendering progress and a per-SNR summary.
pub fn sweep(transport: &mut Transport, id: i32, range: &str, batch: u32) -> Result<()> {
    // Validate locally so a typo fails before touching the device.
    let parsed = SweepRange::parse(range).context("Invalid --range")?;
    parsed.validate().context("Invalid --range")?;
    let expected = parsed.sample_count(batch);

    let request = SweepRequest {
        id,
        snr_range: range,
        batch_size: batch,
    };
    let payload = serde_json::to_string(&request).context("Failed to encode request")?;
    transport.send_line(&format!("RUN_TEST {payload}"))?;

    println!(
        "Sweep {}: snr {}..={} step {}, {} samples per point",
        id, parsed.start, parsed.stop, parsed.step, batch
    );

    let pb = ProgressBar::new(expected);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut by_snr: BTreeMap<i32, Vec<(f64, f64)>> = BTreeMap::new();
    loop {
        let line = next_line(transport, RECORD_TIMEOUT)?;
        if is_failure_diagnostic(&line) {
            pb.abandon();
            bail!("Firmware rejected the sweep: {line}");
        }
        match parse_record(&line) {
            Some(WireRecord::Sample { snr, ber, fer, .. }) => {
                by_snr.entry(snr).or_default().push((ber, fer));
                pb.inc(1);
            }
            Some(WireRecord::Lifecycle { status, .. }) if status == "completed" => {
                pb.finish_with_message("Sweep complete");
                break;
            }
            Some(WireRecord::Lifecycle { status, .. }) if status == "cancelled" => {
                pb.abandon();
                bail!("Sweep was cancelled");
            }
            _ => {}
        }
    }

    println!();
    println!("{:>6}  {:>10}  {:>10}  {:>7}", "SNR", "mean BER", "mean FER", "samples");
    for (snr, samples) in &by_snr {
        let count = samples.len() as f64;
        let ber: f64 = samples.iter().map(|&(b, _)| b).sum::<f64>() / count;
        let fer: f64 = samples.iter().map(|&(_, f)| f).sum::<f64>() / count;
        println!("{snr:>6}  {ber:>10.6}  {fer:>10.6}  {:>7}", samples.len());
    }

    Ok(())
}

/// Abort the active test, if any.
pub fn cancel(transport: &mut Transport) -> Result<()> {
    transport.send_line("CANCEL_TEST")?;

    loop {
        let line = next_line(transport, RECORD_TIMEOUT)?;
        if line.starts_with("Received command:") {
            continue;
        }
        if line.starts_with("No test is running") {
            println!("{line}");
            return Ok(());
        }
        if let Some(WireRecord::Lifecycle { status, test_id }) = parse_record(&line) {
            println!("Test {test_id}: {status}");
            return Ok(());
        }
    }
}

/// Stream firmware output to stdout.
pub fn listen(transport: &mut Transport, seconds: Option<u64>) -> Result<()> {
    use std::io::Write;

    let deadline = seconds.map(|s| std::time::Instant::now() + Duration::from_secs(s));
    println!("Listening on {} (Ctrl-C to stop)...", transport.port_name());

    loop {
        if let Some(deadline) = deadline {
            if std::time::Instant::now() >= deadline {
                return Ok(());
            }
        }
        match transport.read_event(Duration::from_millis(200))? {
            Some(SerialEvent::Heartbeat) => {
                print!(".");
                std::io::stdout().flush()?;
            }
            Some(SerialEvent::Line(line)) => println!("{line}"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_lifecycle() {
        let record = parse_record(r#"{"status":"started","testId":5}"#);
        assert!(matches!(
            record,
            Some(WireRecord::Lifecycle { ref status, test_id: 5 }) if status == "started"
        ));
    }

    #[test]
    fn test_parse_record_sample() {
        let record = parse_record(r#"{"testId":1,"snr":5,"ber":0.05,"fer":0.1}"#);
        let Some(WireRecord::Sample { test_id, snr, ber, fer }) = record else {
            panic!("expected sample record");
        };
        assert_eq!((test_id, snr), (1, 5));
        assert_eq!(ber, 0.05);
        assert_eq!(fer, 0.1);
    }

    #[test]
    fn test_parse_record_count() {
        let record = parse_record(r#"{"testId":7,"count":3}"#);
        assert!(matches!(record, Some(WireRecord::Count { test_id: 7, count: 3 })));
    }

    #[test]
    fn test_parse_record_rejects_plain_text() {
        assert!(parse_record("Invalid test ID").is_none());
        assert!(parse_record("Received command: TEST5").is_none());
    }

    #[test]
    fn test_failure_diagnostics() {
        assert!(is_failure_diagnostic("Invalid test ID"));
        assert!(is_failure_diagnostic("Test already running"));
        assert!(is_failure_diagnostic(
            "Unknown command. Use 'TEST<id>' to run a test."
        ));
        assert!(!is_failure_diagnostic("Test mode enabled"));
        assert!(!is_failure_diagnostic(r#"{"status":"started","testId":1}"#));
    }
}
