// Exit Code Contract Tests
//
// Orchestrators restart or alert on podinit's exit code, so each fatal
// failure class keeps its own stable, non-zero code.

use std::collections::HashSet;
use std::time::Duration;

use podinit_core::errors::AllocationError;
use podinit_core::{FailureClass, PodinitError};

/// Codes are stable
#[test]
fn exit_codes_are_stable() {
    assert_eq!(FailureClass::Configuration.exit_code(), 2);
    assert_eq!(FailureClass::PortDiscovery.exit_code(), 5);
    assert_eq!(FailureClass::Report.exit_code(), 6);
    assert_eq!(FailureClass::DependencyTimeout.exit_code(), 7);
    assert_eq!(FailureClass::CommandStart.exit_code(), 127);
    assert_eq!(FailureClass::Other.exit_code(), 1);
}

/// Every class has a distinct non-zero code
#[test]
fn exit_codes_are_distinct_and_non_zero() {
    let classes = [
        FailureClass::Configuration,
        FailureClass::PortDiscovery,
        FailureClass::Report,
        FailureClass::DependencyTimeout,
        FailureClass::CommandStart,
        FailureClass::Other,
    ];

    let codes: HashSet<i32> = classes.iter().map(|c| c.exit_code()).collect();
    assert_eq!(codes.len(), classes.len());
    assert!(!codes.contains(&0));
}

/// Errors map to the class of the stage that raised them
#[test]
fn errors_map_to_their_stage() {
    let cases = [
        (PodinitError::Configuration("x".into()), 2),
        (PodinitError::Scan("x".into()), 5),
        (PodinitError::Allocation(AllocationError::EmptyPool), 5),
        (PodinitError::ReportRejected { status: 404 }, 6),
        (PodinitError::ReportTransport("refused".into()), 6),
        (
            PodinitError::Timeout {
                timeout: Duration::from_secs(1),
                endpoints: vec!["tcp://db:5432".into()],
            },
            7,
        ),
        (PodinitError::Command("not found".into()), 127),
    ];

    for (err, code) in cases {
        assert_eq!(err.exit_code(), code, "{}", err);
    }
}
