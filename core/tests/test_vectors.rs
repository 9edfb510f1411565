//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! `requests.json` pins the method, route and body of every operation;
//! `responses.json` pins how simulated responses map to records or to an
//! error kind. Bodies are compared as parsed JSON, not raw strings, so field
//! order does not matter.

use odb_core::{
    Guild, HttpMethod, HttpRequest, HttpResponse, JoinMessage, OdbApi, OdbError, ServiceConfig,
};
use serde_json::Value;

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn u64_arg(args: &Value, key: &str) -> u64 {
    args[key].as_u64().unwrap()
}

fn build(api: &OdbApi, operation: &str, args: &Value) -> HttpRequest {
    let guild_id = u64_arg(args, "guild_id");
    let service = args["service"].as_str().unwrap_or_default();
    let config = args["config"].as_object();
    match operation {
        "create_guild" => api.build_create_guild(guild_id).unwrap(),
        "get_guild" => api.build_get_guild(guild_id),
        "delete_guild" => api.build_delete_guild(guild_id),
        "update_guild" => api
            .build_update_guild(guild_id, args["banned"].as_bool().unwrap())
            .unwrap(),
        "create_service_config" => api
            .build_create_service_config(guild_id, service, config.unwrap())
            .unwrap(),
        "get_service_config" => api.build_get_service_config(guild_id, service),
        "delete_service_config" => api.build_delete_service_config(guild_id, service),
        "update_service_config" => api
            .build_update_service_config(guild_id, service, config.unwrap())
            .unwrap(),
        "create_join_message" => api
            .build_create_join_message(
                guild_id,
                u64_arg(args, "member_id"),
                u64_arg(args, "channel_id"),
                u64_arg(args, "message_id"),
            )
            .unwrap(),
        "get_join_message" => api.build_get_join_message(guild_id, u64_arg(args, "member_id")),
        "delete_join_message" => {
            api.build_delete_join_message(guild_id, u64_arg(args, "member_id"))
        }
        other => panic!("unknown operation: {other}"),
    }
}

/// Parse a response as the given record and re-serialize the result, so every
/// record kind compares against `expected_result` the same way.
fn parse(api: &OdbApi, record: &str, response: HttpResponse) -> Result<Value, OdbError> {
    match record {
        "guild" => api
            .parse_guild(response)
            .map(|g: Guild| serde_json::to_value(g).unwrap()),
        "service_config" => api
            .parse_service_config(response)
            .map(|c: ServiceConfig| serde_json::to_value(c).unwrap()),
        "join_message" => api
            .parse_join_message(response)
            .map(|m: JoinMessage| serde_json::to_value(m).unwrap()),
        "deleted" => api.parse_deleted(response).map(|()| Value::Null),
        other => panic!("unknown record: {other}"),
    }
}

fn error_kind(err: &OdbError) -> &'static str {
    match err {
        OdbError::Http { .. } => "http",
        OdbError::Decode(_) => "decode",
        OdbError::UnexpectedShape { .. } => "shape",
        OdbError::Validation { .. } => "validation",
        OdbError::Transport(_) => "transport",
        OdbError::Serialization(_) => "serialization",
        OdbError::InvalidHeader { .. } => "invalid_header",
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();
    let token = vectors["token"].as_str().unwrap();
    let api = OdbApi::new(token, Some(base_url));

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];
        let req = build(&api, case["operation"].as_str().unwrap(), &case["args"]);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.path, format!("{base_url}{}", expected["path"].as_str().unwrap()), "{name}: path");
        assert_eq!(req.header("authorization"), Some(token), "{name}: authorization");

        match req.body.as_deref() {
            Some(body) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content-type");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be present"),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let api = OdbApi::new("vector-token", None);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let result = parse(&api, case["record"].as_str().unwrap(), response);

        match case.get("expected_error").and_then(Value::as_str) {
            Some(kind) => {
                let err = result.expect_err(name);
                assert_eq!(error_kind(&err), kind, "{name}: error kind ({err})");
            }
            None => {
                let value = result.unwrap_or_else(|e| panic!("{name}: {e}"));
                assert_eq!(value, case["expected_result"], "{name}: parsed result");
            }
        }
    }
}
