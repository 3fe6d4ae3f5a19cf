use brian2wasm::bridge::progress::{format_duration, TextReporter};
use brian2wasm::bridge::{bridge, MessageEvent};
use std::thread;

#[test]
fn test_messages_arrive_in_order_across_threads() {
    let (tx, rx) = bridge();
    let simulation = thread::spawn(move || {
        tx.report_progress(0.0, 0.0, 0.0, 1.0);
        for i in 0..100 {
            assert_eq!(tx.send_spike(i, i as f64 * 1e-3), 0.0);
        }
        tx.report_progress(2.0, 1.0, 0.0, 1.0);
    });
    simulation.join().unwrap();

    let events: Vec<MessageEvent> = rx.into_iter().collect();
    assert_eq!(events.len(), 102);
    assert!(events[0].is_run_start());
    assert!(events[101].is_run_complete());
    for (i, event) in events[1..101].iter().enumerate() {
        assert_eq!(*event, MessageEvent::spike(i as i64, i as f64 * 1e-3));
    }
}

#[test]
fn test_wire_format() {
    let spike = MessageEvent::from_json(r#"{"type": "spike", "index": 3, "time": 0.25}"#).unwrap();
    assert_eq!(spike, MessageEvent::spike(3, 0.25));
    let progress: serde_json::Value = serde_json::from_str(&MessageEvent::progress(1.5, 0.5, 0.0, 2.0).to_json()).unwrap();
    assert_eq!(progress["type"], "progress");
    assert_eq!(progress["completed"], 0.5);
    assert_eq!(progress["duration"], 2.0);
}

#[test]
fn test_text_reporter_renders_progress_only() {
    let (tx, rx) = bridge();
    tx.report_progress(0.0, 0.0, 0.0, 10.0);
    tx.send_spike(0, 0.1);
    tx.report_progress(5.0, 0.5, 0.0, 10.0);
    tx.report_progress(10.0, 1.0, 0.0, 10.0);
    drop(tx);

    let mut reporter = TextReporter::new(Vec::new());
    let mut written = 0;
    for event in rx {
        if reporter.handle(&event).unwrap() {
            written += 1;
        }
    }
    assert_eq!(written, 3);
    let text = String::from_utf8(reporter.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Starting simulation at t=0 s for duration 10 s");
    assert_eq!(lines[1], "5 s (50%) simulated in 5s (5s), estimated 5s remaining.");
    assert_eq!(lines[2], "10 s (100%) simulated in 10s (10s)");
}

#[test]
fn test_duration_decomposition() {
    assert_eq!(format_duration(0.2), "< 1s");
    assert_eq!(format_duration(59.0), "59s");
    assert_eq!(format_duration(3605.0), "1h 0m 5s");
    assert_eq!(format_duration(90061.0), "1d 1h 1m 1s");
}
