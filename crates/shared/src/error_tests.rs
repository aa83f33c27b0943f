use super::*;

#[test]
fn test_app_error_kinds() {
    assert_eq!(AppError::Validation("test".into()).kind(), ErrorKind::Validation);
    assert_eq!(AppError::NotFound("test".into()).kind(), ErrorKind::NotFound);
    assert_eq!(
        AppError::StateConflict("test".into()).kind(),
        ErrorKind::StateConflict
    );
    assert_eq!(
        AppError::Concurrency("test".into()).kind(),
        ErrorKind::Concurrency
    );
    assert_eq!(
        AppError::ExternalService("test".into()).kind(),
        ErrorKind::External
    );
    assert_eq!(AppError::Database("test".into()).kind(), ErrorKind::Internal);
    assert_eq!(AppError::Internal("test".into()).kind(), ErrorKind::Internal);
}

#[test]
fn test_app_error_error_codes() {
    assert_eq!(
        AppError::Validation("test".into()).error_code(),
        "VALIDATION_ERROR"
    );
    assert_eq!(AppError::NotFound("test".into()).error_code(), "NOT_FOUND");
    assert_eq!(
        AppError::StateConflict("test".into()).error_code(),
        "STATE_CONFLICT"
    );
    assert_eq!(
        AppError::Concurrency("test".into()).error_code(),
        "CONCURRENCY_ERROR"
    );
    assert_eq!(
        AppError::ExternalService("test".into()).error_code(),
        "EXTERNAL_SERVICE_ERROR"
    );
    assert_eq!(
        AppError::Database("test".into()).error_code(),
        "DATABASE_ERROR"
    );
}

#[test]
fn test_from_kind_round_trips() {
    for kind in [
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::StateConflict,
        ErrorKind::Concurrency,
        ErrorKind::External,
        ErrorKind::Internal,
    ] {
        assert_eq!(AppError::from_kind(kind, "msg").kind(), kind);
    }
}

#[test]
fn test_retryable_kinds() {
    assert!(ErrorKind::Concurrency.is_retryable());
    assert!(ErrorKind::External.is_retryable());
    assert!(!ErrorKind::Validation.is_retryable());
    assert!(!ErrorKind::StateConflict.is_retryable());
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        AppError::StateConflict("msg".into()).to_string(),
        "State conflict: msg"
    );
    assert_eq!(
        AppError::Concurrency("msg".into()).to_string(),
        "Concurrency error: msg"
    );
    assert_eq!(
        AppError::ExternalService("msg".into()).to_string(),
        "External service error: msg"
    );
}
