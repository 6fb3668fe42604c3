use super::{parse_reply, ErrorEnvelope, Reply};
use crate::error::ApiError;
use serde_json::json;

#[test]
fn test_success_envelope_returns_data() {
    let body = r#"{"success":true,"message":"ok","data":{"total":3}}"#;
    let reply = parse_reply(200, body).unwrap();
    assert_eq!(reply, Reply::Success(json!({"total": 3})));
}

#[test]
fn test_error_envelope_keeps_code_and_message() {
    let body = r#"{"success":false,"error_code":401,"message":"Token expired"}"#;
    let reply = parse_reply(401, body).unwrap();

    match reply {
        Reply::Failure(envelope) => {
            assert_eq!(envelope.error_code, Some(401));
            assert_eq!(envelope.message, "Token expired");
            assert!(envelope.is_expired_credential());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_success_flag_wins_over_status() {
    // success:false on a 200 is still a failure
    let body = r#"{"success":false,"message":"Insufficient balance"}"#;
    let reply = parse_reply(200, body).unwrap();
    assert!(matches!(reply, Reply::Failure(ref e) if e.error_code == Some(200)));
}

#[test]
fn test_missing_success_flag_uses_status() {
    let reply = parse_reply(404, r#"{"message":"Not found"}"#).unwrap();
    assert_eq!(
        reply,
        Reply::Failure(ErrorEnvelope::new(Some(404), "Not found"))
    );

    let reply = parse_reply(201, r#"{"data":[1,2]}"#).unwrap();
    assert_eq!(reply, Reply::Success(json!([1, 2])));
}

#[test]
fn test_empty_body() {
    assert_eq!(parse_reply(204, "").unwrap(), Reply::Success(json!(null)));
    assert!(matches!(
        parse_reply(502, "  "),
        Err(ApiError::InvalidResponse(_))
    ));
}

#[test]
fn test_non_json_body_is_invalid_response() {
    let result = parse_reply(502, "<html>Bad Gateway</html>");
    assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
}

#[test]
fn test_only_exact_messages_are_expired_credentials() {
    assert!(ErrorEnvelope::new(Some(401), "Token expired").is_expired_credential());
    assert!(ErrorEnvelope::new(Some(401), "jwt malformed").is_expired_credential());

    for message in ["token expired", "Token expired.", "Unauthorized", "jwt expired", ""] {
        assert!(
            !ErrorEnvelope::new(Some(401), message).is_expired_credential(),
            "{message:?} should not trigger a refresh"
        );
    }
}

#[test]
fn test_validation_errors_are_extracted() {
    let body = json!({
        "success": false,
        "error_code": 422,
        "message": "Validation error!",
        "data": {
            "errors": [
                {"type": "field", "msg": "PIN is invalid", "path": "pin", "location": "body"},
                {"type": "field", "msg": "Email already used", "path": "email", "location": "body"}
            ]
        }
    });

    let Reply::Failure(envelope) = parse_reply(422, &body.to_string()).unwrap() else {
        panic!("expected failure");
    };

    let errors = envelope.validation_errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].path.as_deref(), Some("pin"));
    assert_eq!(envelope.display_message(), "PIN is invalid");
}

#[test]
fn test_display_message_fallbacks() {
    let validation = ErrorEnvelope::new(Some(422), "Validation error!");
    assert_eq!(validation.display_message(), "Validation error");

    let blank = ErrorEnvelope::new(Some(500), "");
    assert_eq!(blank.display_message(), "Some error occurred");

    let plain = ErrorEnvelope::new(Some(400), "User is blocked");
    assert!(plain.validation_errors().is_empty());
    assert_eq!(plain.display_message(), "User is blocked");
}
