//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Error conversions work correctly
//! - Error matching allows clients to handle specific cases

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fieldsets::prelude::*;

fn unknown(parameter: &str, names: &[&str]) -> SelectionError {
    SelectionError::UnknownFields {
        parameter: parameter.to_string(),
        names: names.iter().map(|n| n.to_string()).collect(),
    }
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_unknown_fields_returns_400() {
        let err = FieldsetError::Selection(unknown("fields", &["a"]));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_malformed_query_returns_400() {
        let err = FieldsetError::Selection(SelectionError::MalformedQuery {
            message: "bad".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_a_string_returns_500() {
        let err = FieldsetError::Selection(SelectionError::NotAString {
            found: "number".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_schema_errors_return_500() {
        let err = FieldsetError::Schema(SchemaError::TooDeep {
            fieldset: "post".to_string(),
            depth: 33,
            max: 32,
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_marshal_errors_return_500() {
        let err = FieldsetError::Marshal(MarshalError::Format {
            field: "tid".to_string(),
            message: "not an integer".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_returns_500() {
        let err = FieldsetError::Internal("boom".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases: Vec<(FieldsetError, &str)> = vec![
            (unknown("fields", &["a"]).into(), "UNKNOWN_FIELDS"),
            (
                SelectionError::NotAString {
                    found: "array".to_string(),
                }
                .into(),
                "INVALID_SELECTOR",
            ),
            (
                SchemaError::Cyclic {
                    chain: vec!["a".to_string(), "a".to_string()],
                }
                .into(),
                "CYCLIC_FIELDSET",
            ),
            (
                SchemaError::InvalidFieldName {
                    fieldset: "f".to_string(),
                    name: "a b".to_string(),
                }
                .into(),
                "INVALID_FIELD_NAME",
            ),
            (
                MarshalError::MissingAttribute {
                    field: "body".to_string(),
                }
                .into(),
                "MISSING_ATTRIBUTE",
            ),
            (
                MarshalError::Body {
                    message: "expected value".to_string(),
                }
                .into(),
                "INVALID_BODY",
            ),
            (FieldsetError::Internal("x".to_string()), "INTERNAL_ERROR"),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "wrong code for {}", err);
        }
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_unknown_fields_body_is_message_only() {
        let err: FieldsetError = unknown("embedd", &["x", "y"]).into();
        let body = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(body, json!({ "message": "Unknown fields: x, y" }));
    }

    #[test]
    fn test_marshal_error_body_names_field() {
        let err: FieldsetError = MarshalError::Format {
            field: "author.id".to_string(),
            message: "not an integer".to_string(),
        }
        .into();
        let body = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "Cannot format field 'author.id': not an integer",
                "details": { "field": "author.id" }
            })
        );
    }

    #[tokio::test]
    async fn test_into_response_status_and_body() {
        let err: FieldsetError = unknown("fields", &["b", "a"]).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Unknown fields: b, a");
    }
}

// =============================================================================
// Error Matching Tests
// =============================================================================

mod error_matching_tests {
    use super::*;

    #[test]
    fn test_selection_errors_carry_parameter() {
        let fieldset = FieldsetDef::new("topic")
            .field("tid", LeafField::integer())
            .build()
            .unwrap();

        match fieldset.parse_selection(None, Some("tid")) {
            Err(SelectionError::UnknownFields { parameter, names }) => {
                assert_eq!(parameter, "embedd");
                assert_eq!(names, vec!["tid".to_string()]);
            }
            other => panic!("expected unknown embed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_value_rejects_non_strings() {
        let parser = SelectionParser::new(["a"]);
        let err = parser.parse_value(&json!(["a"])).unwrap_err();
        assert!(matches!(err, SelectionError::NotAString { ref found } if found == "array"));

        let err: FieldsetError = err.into();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_shape_errors_are_marshal_errors() {
        let fieldset = FieldsetDef::new("topic")
            .field("tid", LeafField::integer())
            .build()
            .unwrap();
        let err = fieldset
            .shape(&json!({ "tid": "first" }), &Selection::defaults())
            .unwrap_err();
        assert!(matches!(err, MarshalError::Format { ref field, .. } if field == "tid"));
    }

    #[test]
    fn test_strict_object_requires_attribute() {
        let body = FieldsetDef::new("body")
            .field("text", LeafField::string())
            .build()
            .unwrap();
        let message = FieldsetDef::new("message")
            .field("body", LeafField::nested(&body))
            .field("preview", LeafField::lazy(&body))
            .build()
            .unwrap();

        let err = message
            .shape(&json!({ "preview": { "text": "hi" } }), &Selection::defaults())
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::MissingAttribute {
                field: "body".to_string()
            }
        );

        let out = message
            .shape(&json!({ "body": { "text": 1 } }), &Selection::defaults())
            .unwrap();
        assert_eq!(out, json!({ "body": { "text": "1" }, "preview": null }));
    }
}
