//! Integration test for the tracing bootstrap.
//!
//! The global subscriber can only be installed once per process, so the
//! install and double-install checks share one test in their own binary.

use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_subscriber_installs_once() {
    let config = LoggingConfig::default()
        .with_level("debug")
        .with_format(LogFormat::Compact);

    init_logging(&config).unwrap();

    // A second install must be rejected rather than silently replace the
    // subscriber chosen by the host.
    let err = init_logging(&config).unwrap_err();
    assert!(matches!(err, Error::Logging(_)));
}
