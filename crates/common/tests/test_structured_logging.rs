use common::{init_structured_logging, ExecutionContext, LoggingConfig, OperationTimer, StructuredLogEntry};
use serde_json::Value;
use std::collections::HashMap;
use tracing::Level;

#[test]
fn test_logging_config_builder() {
    let config = LoggingConfig::default().with_level(Level::DEBUG).json(true);
    assert_eq!(config.level, Level::DEBUG);
    assert!(config.json_output);
    assert!(config.include_context);
}

#[test]
fn test_log_entry_round_trip() {
    let mut fields = HashMap::new();
    fields.insert("artifact".to_string(), Value::String("artifacts/catalog.bin".to_string()));

    let entry = StructuredLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: "WARN".to_string(),
        target: "catalog::manager".to_string(),
        message: "Catalog reload failed; keeping the active snapshot".to_string(),
        fields,
        context: Some(ExecutionContext::default()),
        performance: None,
    };

    let json = serde_json::to_string(&entry).unwrap();
    let parsed: StructuredLogEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.level, "WARN");
    assert_eq!(parsed.fields["artifact"], "artifacts/catalog.bin");
    assert_eq!(parsed.context.unwrap().pid, std::process::id());
}

#[test]
fn test_init_twice_fails_and_timers_still_log() {
    init_structured_logging(LoggingConfig::default().json(true)).unwrap();
    assert!(init_structured_logging(LoggingConfig::default()).is_err());

    let mut timer = OperationTimer::new("catalog_reload");
    timer.add_field("entries", 3usize);
    assert!(timer.elapsed_ms() < 60_000);
    timer.finish_with_result(&Ok::<(), String>(()));
}
