use smc_core::errors::{codes, ErrorInfo, SmcError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("index", "3")
        .with_context("reason", "example")
}

#[test]
fn configuration_error_surface() {
    let err = SmcError::Configuration(sample_info(codes::INVALID_PRIOR_SPEC, "missing prior"));
    assert_eq!(err.info().code, "invalid-prior-spec");
    assert!(err.info().context.contains_key("index"));
    assert!(err.has_code(codes::INVALID_PRIOR_SPEC));
}

#[test]
fn numerical_error_surface() {
    let err = SmcError::numerical(codes::DEGENERATE_WEIGHTS, "weights collapsed");
    assert_eq!(err.info().code, "degenerate-weights");
    assert!(matches!(err, SmcError::Numerical(_)));
}

#[test]
fn kernel_error_surface() {
    let err = SmcError::kernel("chain diverged");
    assert!(err.has_code(codes::KERNEL_FAILURE));
    assert!(err.to_string().starts_with("kernel failure"));
}

#[test]
fn storage_error_surface() {
    let err = SmcError::Storage(sample_info("checkpoint-read", "no such file"));
    assert_eq!(err.info().code, "checkpoint-read");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn storage_shorthand_keeps_family_when_context_is_added() {
    let err = SmcError::storage("checkpoint-gap", "missing position")
        .with_context("missing", "2")
        .with_context("path", "run.ckpt");
    assert!(matches!(err, SmcError::Storage(_)));
    assert!(err.has_code("checkpoint-gap"));
    assert_eq!(err.info().context["missing"], "2");
    assert_eq!(err.info().context["path"], "run.ckpt");

    let err = SmcError::kernel("diverged").with_context("particle", "4");
    assert!(matches!(err, SmcError::Kernel(_)));
    assert_eq!(err.info().context["particle"], "4");
}

#[test]
fn display_includes_context_and_hint() {
    let err = SmcError::Configuration(
        ErrorInfo::new(codes::NON_POSITIVE_SCALE, "scale must be positive")
            .with_context("parameter", "a")
            .with_hint("use a strictly positive scale"),
    );
    let text = err.to_string();
    assert!(text.contains("parameter=a"));
    assert!(text.contains("hint: use a strictly positive scale"));
}

#[test]
fn errors_round_trip_json() {
    let err = SmcError::Numerical(sample_info(codes::COVARIANCE_SINGULAR, "not psd"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Numerical\""));
    let decoded: SmcError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
