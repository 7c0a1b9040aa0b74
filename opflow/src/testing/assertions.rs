//! Test assertions for tags, op outputs and run results.

use crate::core::{OpOutput, OpStatus, Tags};
use crate::pipeline::PipelineRunResult;

/// Asserts that `actual` holds exactly the `expected` key/value pairs.
pub fn assert_tags_eq<const N: usize>(actual: &Tags, expected: [(&str, &str); N]) {
    let expected = Tags::from(expected);
    assert_eq!(
        actual.to_hash_map(),
        expected.to_hash_map(),
        "Tag mismatch: expected {expected:?}, got {actual:?}"
    );
}

/// Asserts that the output has the expected status.
pub fn assert_output_status(output: &OpOutput, expected: OpStatus) {
    assert_eq!(
        output.status, expected,
        "Expected status {:?}, got {:?} (error: {:?})",
        expected, output.status, output.error
    );
}

/// Asserts that the run succeeded.
pub fn assert_run_succeeded(result: &PipelineRunResult) {
    assert!(
        result.success,
        "Expected run of '{}' to succeed, got error: {:?}",
        result.pipeline_name, result.error
    );
}

/// Asserts that the run failed.
pub fn assert_run_failed(result: &PipelineRunResult) {
    assert!(
        !result.success,
        "Expected run of '{}' to fail, but it succeeded",
        result.pipeline_name
    );
}

/// Asserts that an invocation ended with the expected status.
pub fn assert_invocation_status(result: &PipelineRunResult, identity: &str, expected: OpStatus) {
    let output = result
        .output(identity)
        .unwrap_or_else(|| panic!("No output recorded for invocation '{identity}'"));
    assert_output_status(output, expected);
}
