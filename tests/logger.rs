use tasklane::config::LoggingConfig;
use tasklane::logger::Logger;

#[test]
fn test_buffer_logging() {
    let logger = Logger::new();
    assert!(!logger.is_enabled());

    logger.log("Test message".to_string());
    let logs = logger.get_logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].contains("Test message"));
}

#[test]
fn test_logs_are_newest_first_and_clearable() {
    let logger = Logger::new();
    logger.log("first".to_string());
    logger.log("second".to_string());

    let logs = logger.get_logs();
    assert!(logs[0].contains("second"));
    assert!(logs[1].contains("first"));

    logger.clear();
    assert!(logger.get_logs().is_empty());
}

#[test]
fn test_buffer_is_bounded() {
    let logger = Logger::new();
    for i in 0..(tasklane::constants::LOG_BUFFER_CAPACITY + 10) {
        logger.log(format!("line {i}"));
    }
    let logs = logger.get_logs();
    assert_eq!(logs.len(), tasklane::constants::LOG_BUFFER_CAPACITY);
    assert!(logs[0].ends_with(&format!("line {}", tasklane::constants::LOG_BUFFER_CAPACITY + 9)));
}

#[test]
fn test_init_captures_log_records() {
    let config = LoggingConfig {
        enabled: false,
        level: "info".to_string(),
    };
    let logger = Logger::init(&config).unwrap();
    assert!(Logger::global().is_some());

    log::info!("captured by the buffer");
    assert!(logger.get_logs().iter().any(|line| line.contains("captured by the buffer")));

    // A second init hands back the installed logger.
    let again = Logger::init(&config).unwrap();
    assert!(!again.is_enabled());
}

#[test]
fn test_log_file_path() {
    let path = Logger::get_log_file_path().unwrap();
    assert!(path.ends_with("tasklane/tasklane.log"));
}
