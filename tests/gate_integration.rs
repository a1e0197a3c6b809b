//! CI gate integration tests: build verification plus the sentinel flow
//! a suite runner and aggregator would drive.

use dataproc_spark_connect::gate::{run_suite, BuildDescription, SentinelDir};
use dataproc_spark_connect::SparkConnectError;

#[test]
fn test_build_gate_aggregates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.json");
    std::fs::write(
        &path,
        r#"{
            "steps": [
                {"id": "lint", "status": "SUCCESS"},
                {"id": "unit-tests", "status": "FAILURE"},
                {"id": "canary", "status": "FAILURE", "allowFailure": true},
                {"id": "integration-tests", "status": "INTERNAL_ERROR"}
            ]
        }"#,
    )
    .unwrap();

    let build = BuildDescription::from_file(&path).unwrap();
    let err = build.verify().unwrap_err();

    // One aggregated message, failing ids in encounter order, skippable
    // steps excluded.
    assert_eq!(
        err.to_string(),
        "build steps did not succeed: unit-tests, integration-tests"
    );
}

#[test]
fn test_build_gate_passes_clean_build() {
    let build = BuildDescription::from_json(
        r#"{
            "steps": [
                {"id": "lint", "status": "SUCCESS"},
                {"id": "unit-tests", "status": "SUCCESS"},
                {"id": "canary", "status": "CANCELLED", "allowFailure": true}
            ]
        }"#,
    )
    .unwrap();

    assert!(build.verify().is_ok());
}

#[cfg(unix)]
#[test]
fn test_suite_runner_and_aggregator_flow() {
    let dir = tempfile::tempdir().unwrap();
    let sentinels = SentinelDir::new(dir.path());

    // Two suites pass, one fails; the failed suite leaves no sentinel.
    let unit = run_suite(&sentinels, "unit", &["true".to_string()]).unwrap();
    let integration = run_suite(
        &sentinels,
        "integration",
        &["sh".to_string(), "-c".to_string(), "exit 0".to_string()],
    )
    .unwrap();
    let e2e = run_suite(
        &sentinels,
        "e2e",
        &["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
    )
    .unwrap();

    assert_eq!(unit, 0);
    assert_eq!(integration, 0);
    // Exit codes propagate untouched.
    assert_eq!(e2e, 3);

    let err = sentinels
        .verify(["unit", "integration", "e2e"])
        .unwrap_err();
    match err {
        SparkConnectError::SuitesIncomplete(missing) => {
            assert_eq!(missing, vec!["e2e".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Re-running the failed suite to success completes the aggregate.
    run_suite(&sentinels, "e2e", &["true".to_string()]).unwrap();
    assert!(sentinels.verify(["unit", "integration", "e2e"]).is_ok());
}
