// tests/usage_log_concurrent.rs
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use market_digest::ai_adapter::MockProvider;
use market_digest::analyze::Analyzer;
use market_digest::usage_log::{CsvUsageLog, InputType, UsageEntry, UsageRecorder, CSV_HEADER};

fn assert_well_formed(content: &str, expected_rows: usize) {
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));
    let rows: Vec<_> = lines.collect();
    assert_eq!(rows.len(), expected_rows);
    for r in rows {
        let cols: Vec<_> = r.split(',').collect();
        assert_eq!(cols.len(), 5, "corrupted row: {r:?}");
        assert!(cols[0].ends_with('Z'));
        assert!(matches!(cols[1], "fetched" | "manual"));
        cols[2].parse::<usize>().expect("input_chars");
        cols[3].parse::<bool>().expect("success");
        cols[4].parse::<usize>().expect("summary_chars");
    }
}

#[test]
fn concurrent_threads_append_whole_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.csv");
    let log = Arc::new(CsvUsageLog::open(&path).unwrap());

    const THREADS: usize = 16;
    const PER_THREAD: usize = 50;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let log = log.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    log.record(&UsageEntry {
                        ts: Utc::now(),
                        input_type: if t % 2 == 0 {
                            InputType::Fetched
                        } else {
                            InputType::Manual
                        },
                        input_chars: t * 1000 + i,
                        success: i % 3 != 0,
                        summary_chars: i,
                    });
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    assert_well_formed(&content, THREADS * PER_THREAD);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_summaries_append_one_row_each() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.csv");
    let log = Arc::new(CsvUsageLog::open(&path).unwrap());
    let mock = Arc::new(MockProvider::new("## Trends\n- ok"));
    let analyzer = Arc::new(Analyzer::new(mock.clone(), log));

    const N: usize = 40;
    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let a = analyzer.clone();
            tokio::spawn(async move {
                a.summarize(&format!("headline {i}"), &[], InputType::Manual)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(mock.calls(), N);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_well_formed(&content, N);
}
