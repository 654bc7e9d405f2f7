//! Tests for decode resilience: no text input shape should abort a message.
//!
//! Lenient mode is the contract boundary for schema evolution and interop:
//! a message is always fully constructible from arbitrary, even malformed,
//! input, one degraded field at a time. Strict mode is the validating
//! counterpart.

use std::sync::Arc;

use serde_json::json;

use wirebuf::codec::{text, CodecError, DecodeMode};
use wirebuf::{
    EnumDescriptor, FieldDescriptor, FieldKind, MapKeyKind, MessageDescriptor, ScalarKind, Value,
};

// Test Helpers

fn status_enum() -> Arc<EnumDescriptor> {
    EnumDescriptor::new("Status", vec![(0, "Enable"), (1, "Disabled")]).unwrap()
}

fn mixed_message() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "Mixed",
        vec![
            FieldDescriptor::required("count", 0, FieldKind::Scalar(ScalarKind::Int32)),
            FieldDescriptor::nullable("label", 1, FieldKind::Scalar(ScalarKind::String)),
            FieldDescriptor::required("flag", 2, FieldKind::Scalar(ScalarKind::Bool)),
            FieldDescriptor::required("status", 3, FieldKind::Enum(status_enum())),
            FieldDescriptor::nullable("ratio", 4, FieldKind::Scalar(ScalarKind::Float64)),
        ],
    )
    .unwrap()
}

// Absence handling

#[test]
fn test_empty_object_decodes_to_full_defaults() {
    let desc = mixed_message();
    for mode in [DecodeMode::Lenient, DecodeMode::Strict] {
        let msg = text::decode_message(&desc, &json!({}), mode).unwrap();
        assert_eq!(msg.get("count"), Some(&Value::Int32(0)));
        assert_eq!(msg.get("label"), Some(&Value::Null));
        assert_eq!(msg.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(msg.get("status"), Some(&Value::Enum(0)));
        assert_eq!(msg.get("ratio"), Some(&Value::Null));
    }
}

#[test]
fn test_explicit_null_equals_absence() {
    let desc = mixed_message();
    let json = json!({"count": null, "label": null});
    let msg = text::decode_message(&desc, &json, DecodeMode::Strict).unwrap();
    assert_eq!(msg.get("count"), Some(&Value::Int32(0)));
    assert_eq!(msg.get("label"), Some(&Value::Null));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let desc = mixed_message();
    let json = json!({"count": 3, "bogus": {"deep": [1, 2]}});
    let msg = text::decode_message(&desc, &json, DecodeMode::Strict).unwrap();
    assert_eq!(msg.get("count"), Some(&Value::Int32(3)));
}

#[test]
fn test_non_object_top_level_decodes_to_defaults_leniently() {
    let desc = mixed_message();
    for input in [json!(42), json!("nope"), json!([1, 2, 3]), json!(true)] {
        let msg = text::decode_message(&desc, &input, DecodeMode::Lenient).unwrap();
        assert_eq!(msg.get("count"), Some(&Value::Int32(0)));
    }
}

// Per-field degradation

#[test]
fn test_one_bad_field_never_aborts_the_rest() {
    let desc = mixed_message();
    let json = json!({
        "count": {"not": "a number"},
        "label": "kept",
        "flag": true,
        "status": 1,
    });
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("count"), Some(&Value::Int32(0)));
    assert_eq!(msg.get("label"), Some(&Value::string("kept")));
    assert_eq!(msg.get("flag"), Some(&Value::Bool(true)));
    assert_eq!(msg.get("status"), Some(&Value::Enum(1)));
}

#[test]
fn test_nullable_slot_degrades_to_null_not_default() {
    let desc = mixed_message();
    let json = json!({"label": [], "ratio": "not a float"});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("label"), Some(&Value::Null));
    assert_eq!(msg.get("ratio"), Some(&Value::Null));
}

#[test]
fn test_out_of_range_narrow_integer_degrades() {
    let desc = MessageDescriptor::new(
        "M",
        vec![FieldDescriptor::required(
            "tiny",
            0,
            FieldKind::Scalar(ScalarKind::Int8),
        )],
    )
    .unwrap();
    let msg = text::decode_message(&desc, &json!({"tiny": 4096}), DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("tiny"), Some(&Value::Int8(0)));
    assert!(text::decode_message(&desc, &json!({"tiny": 4096}), DecodeMode::Strict).is_err());
}

// Coercions

#[test]
fn test_numeric_string_coercions() {
    let desc = mixed_message();
    let json = json!({"count": " 12 ", "ratio": "2.5"});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("count"), Some(&Value::Int32(12)));
    assert_eq!(msg.get("ratio"), Some(&Value::Float64(2.5)));
}

#[test]
fn test_fractional_input_truncates_toward_zero() {
    let desc = mixed_message();
    let msg = text::decode_message(&desc, &json!({"count": -3.9}), DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("count"), Some(&Value::Int32(-3)));
}

#[test]
fn test_bool_coercions() {
    let desc = mixed_message();
    let cases = [
        (json!(true), true),
        (json!("true"), true),
        (json!("false"), false),
        (json!(1), true),
        (json!(0), false),
    ];
    for (input, expected) in cases {
        let msg =
            text::decode_message(&desc, &json!({ "flag": input }), DecodeMode::Lenient).unwrap();
        assert_eq!(msg.get("flag"), Some(&Value::Bool(expected)), "input {expected}");
    }
    // Arbitrary strings are not truthy; they degrade.
    let msg = text::decode_message(&desc, &json!({"flag": "yes"}), DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("flag"), Some(&Value::Bool(false)));
}

#[test]
fn test_number_coerces_to_string_field() {
    let desc = mixed_message();
    let msg = text::decode_message(&desc, &json!({"label": 17}), DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("label"), Some(&Value::string("17")));
}

// Enum handling

#[test]
fn test_unknown_enum_value_lenient_default_strict_error() {
    let desc = mixed_message();
    let json = json!({"status": 42});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("status"), Some(&Value::Enum(0)));

    let err = text::decode_message(&desc, &json, DecodeMode::Strict).unwrap_err();
    assert!(matches!(err, CodecError::Lookup { .. }));
}

#[test]
fn test_enum_accepts_numeric_string() {
    let desc = mixed_message();
    let msg = text::decode_message(&desc, &json!({"status": "1"}), DecodeMode::Lenient).unwrap();
    assert_eq!(msg.get("status"), Some(&Value::Enum(1)));
}

// Containers

#[test]
fn test_nested_message_wrong_shape_treated_as_absent() {
    let inner = MessageDescriptor::new(
        "Inner",
        vec![FieldDescriptor::required(
            "x",
            0,
            FieldKind::Scalar(ScalarKind::Int32),
        )],
    )
    .unwrap();
    let desc = MessageDescriptor::new(
        "Outer",
        vec![
            FieldDescriptor::required("req", 0, FieldKind::Message(inner.clone())),
            FieldDescriptor::nullable("opt", 1, FieldKind::Message(inner)),
        ],
    )
    .unwrap();
    let json = json!({"req": "not an object", "opt": 5});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    // Required slot gets a fresh default-constructed instance.
    let req = msg.get("req").and_then(Value::as_message).unwrap();
    assert_eq!(req.get("x"), Some(&Value::Int32(0)));
    assert_eq!(msg.get("opt"), Some(&Value::Null));
}

#[test]
fn test_nested_field_error_reports_dotted_path() {
    let inner = MessageDescriptor::new(
        "Inner",
        vec![FieldDescriptor::required(
            "x",
            0,
            FieldKind::Scalar(ScalarKind::Int32),
        )],
    )
    .unwrap();
    let desc = MessageDescriptor::new(
        "Outer",
        vec![FieldDescriptor::required("inner", 0, FieldKind::Message(inner))],
    )
    .unwrap();
    let json = json!({"inner": {"x": "garbage"}});
    let err = text::decode_message(&desc, &json, DecodeMode::Strict).unwrap_err();
    match err {
        CodecError::Field { path, .. } => assert_eq!(path, "inner.x"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_list_element_failure_degrades_that_element_only() {
    let desc = MessageDescriptor::new(
        "M",
        vec![FieldDescriptor::required(
            "xs",
            0,
            FieldKind::list(FieldKind::Scalar(ScalarKind::Int32)),
        )],
    )
    .unwrap();
    let json = json!({"xs": [1, "bad", 3]});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(
        msg.get("xs"),
        Some(&Value::List(vec![
            Value::Int32(1),
            Value::Int32(0),
            Value::Int32(3)
        ]))
    );
}

#[test]
fn test_list_length_preserved_across_null_elements() {
    let desc = MessageDescriptor::new(
        "M",
        vec![FieldDescriptor::required(
            "xs",
            0,
            FieldKind::list_nullable(FieldKind::Scalar(ScalarKind::String)),
        )],
    )
    .unwrap();
    let json = json!({"xs": [null, "a", null]});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    let list = msg.get("xs").and_then(Value::as_list).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0], Value::Null);
    assert_eq!(list[2], Value::Null);
}

#[test]
fn test_map_wrong_shape_treated_as_empty_or_null() {
    let desc = MessageDescriptor::new(
        "M",
        vec![
            FieldDescriptor::required(
                "req",
                0,
                FieldKind::map(MapKeyKind::String, FieldKind::Scalar(ScalarKind::Int32)),
            ),
            FieldDescriptor::nullable(
                "opt",
                1,
                FieldKind::map(MapKeyKind::String, FieldKind::Scalar(ScalarKind::Int32)),
            ),
        ],
    )
    .unwrap();
    let json = json!({"req": [1, 2], "opt": "nope"});
    let msg = text::decode_message(&desc, &json, DecodeMode::Lenient).unwrap();
    assert_eq!(
        msg.get("req").and_then(Value::as_map).map(std::collections::BTreeMap::len),
        Some(0)
    );
    assert_eq!(msg.get("opt"), Some(&Value::Null));
}

#[test]
fn test_strict_map_key_parse_failure_errors() {
    let desc = MessageDescriptor::new(
        "M",
        vec![FieldDescriptor::required(
            "counts",
            0,
            FieldKind::map(MapKeyKind::Uint, FieldKind::Scalar(ScalarKind::Int32)),
        )],
    )
    .unwrap();
    let json = json!({"counts": {"-1": 5}});
    assert!(text::decode_message(&desc, &json, DecodeMode::Lenient).is_ok());
    assert!(text::decode_message(&desc, &json, DecodeMode::Strict).is_err());
}
