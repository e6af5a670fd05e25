//! File output goes through the global subscriber, so this binary installs
//! it exactly once.

use std::fs;

use qmesh_logging::{FileConfig, LogConfig, QmeshSubscriberBuilder, RotationStrategy};

#[test]
fn test_jsonl_events_land_in_log_file() {
    let dir = tempfile::tempdir().unwrap();

    let config = LogConfig {
        default_level: "info".to_string(),
        file: Some(FileConfig {
            directory: dir.path().to_path_buf(),
            prefix: "sim".to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        }),
        ..LogConfig::default()
    };

    let guard = QmeshSubscriberBuilder::new()
        .with_config(config)
        .with_console(false)
        .try_init()
        .unwrap()
        .expect("file output returns a guard");

    tracing::info!(peer = "A", hops = 3, "swap completed");
    drop(guard);

    let contents = fs::read_to_string(dir.path().join("sim.log")).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let event = events
        .iter()
        .find(|event| event["message"] == "swap completed")
        .expect("event written to file");
    assert_eq!(event["peer"], "A");
    assert_eq!(event["hops"], 3);
    assert_eq!(event["level"], "INFO");

    assert!(
        QmeshSubscriberBuilder::new()
            .with_console(false)
            .try_init()
            .is_err()
    );
}
