//! Custom assertions for leak traces

use leakgraph_core::features::analysis::{AnalysisResult, AnalysisSuccess, LeakTrace};

/// Unwrap a successful result, printing the failure otherwise
pub fn assert_success(result: &AnalysisResult) -> &AnalysisSuccess {
    match result {
        AnalysisResult::Success(success) => success,
        AnalysisResult::Failure(failure) => {
            panic!("Expected success, got failure: {}", failure.exception_description)
        }
    }
}

/// Reference names along the trace, e.g. `["static Holder.cache", "Cache.entry"]`
pub fn reference_names(trace: &LeakTrace) -> Vec<String> {
    trace.references().map(|r| r.to_string()).collect()
}

/// Assert the trace's element object ids, root first
pub fn assert_trace_objects(trace: &LeakTrace, expected: &[u64]) {
    let actual: Vec<u64> = trace.elements.iter().map(|e| e.object_id).collect();
    assert_eq!(
        actual, expected,
        "Unexpected trace objects. References: {:?}",
        reference_names(trace)
    );
}
