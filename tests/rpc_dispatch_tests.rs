//! End-to-end RPC tests: stub -> transport -> router -> handler and back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use wirebuf::codec::binary;
use wirebuf::{
    CallContext, FieldDescriptor, FieldKind, Framing, MessageDescriptor, MessageValue,
    MethodDescriptor, MethodId, Payload, Router, RouterBuilder, RpcError, ScalarKind,
    ServiceClient, ServiceDescriptor, Transport, Value,
};

// Test Helpers

fn user_service() -> Arc<ServiceDescriptor> {
    let get_req = MessageDescriptor::new(
        "GetInfoReq",
        vec![FieldDescriptor::nullable(
            "user_id",
            0,
            FieldKind::Scalar(ScalarKind::Int64),
        )],
    )
    .unwrap();
    let get_resp = MessageDescriptor::new(
        "GetInfoResp",
        vec![
            FieldDescriptor::required("name", 0, FieldKind::Scalar(ScalarKind::String)),
            FieldDescriptor::required("age", 1, FieldKind::Scalar(ScalarKind::Int32)),
        ],
    )
    .unwrap();
    let set_req = MessageDescriptor::new(
        "SetInfoReq",
        vec![
            FieldDescriptor::nullable("user_id", 0, FieldKind::Scalar(ScalarKind::Int64)),
            FieldDescriptor::nullable("name", 1, FieldKind::Scalar(ScalarKind::String)),
        ],
    )
    .unwrap();
    let set_resp = MessageDescriptor::new("SetInfoResp", vec![]).unwrap();
    ServiceDescriptor::new(
        "user_server",
        3,
        vec![
            MethodDescriptor::new("get_info", 0, get_req, get_resp),
            MethodDescriptor::new("set_info", 1, set_req, set_resp),
        ],
    )
    .unwrap()
}

fn user_router(svc: &Arc<ServiceDescriptor>) -> Router {
    let get_resp = svc.method("get_info").unwrap().response().clone();
    let set_resp = svc.method("set_info").unwrap().response().clone();
    RouterBuilder::new()
        .register(svc, "get_info", move |req, _ctx| {
            let get_resp = get_resp.clone();
            async move {
                let user_id = req.get("user_id").and_then(Value::as_i64).unwrap_or(0);
                let mut resp = MessageValue::new(get_resp);
                resp.set("name", Value::string(format!("user-{user_id}")));
                resp.set("age", Value::Int32(30));
                Ok(resp)
            }
        })
        .unwrap()
        .register(svc, "set_info", move |_req, ctx| {
            let set_resp = set_resp.clone();
            async move {
                if ctx.get("tenant").is_none() {
                    return Err(RpcError::Handler {
                        message: "missing tenant".to_string(),
                    });
                }
                Ok(MessageValue::new(set_resp))
            }
        })
        .unwrap()
        .build()
}

/// In-process transport closing the loop through a router, so the client
/// stub exercises the same path a networked deployment would.
struct LoopbackTransport {
    router: Arc<Router>,
    framing: Framing,
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn framing(&self) -> Framing {
        self.framing
    }

    async fn invoke(
        &self,
        path: &str,
        _id: MethodId,
        request: Payload,
        ctx: &CallContext,
    ) -> Result<Payload, RpcError> {
        self.router.dispatch(path, request, ctx.clone()).await
    }
}

/// Transport that always fails, for pass-through checks.
struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn invoke(
        &self,
        _path: &str,
        _id: MethodId,
        _request: Payload,
        _ctx: &CallContext,
    ) -> Result<Payload, RpcError> {
        Err(RpcError::Transport {
            message: "connection reset by peer".to_string(),
        })
    }
}

// Router behavior

#[tokio::test]
async fn test_unknown_path_yields_route_not_found() {
    let svc = user_service();
    let router = user_router(&svc);
    let err = router
        .dispatch(
            "user_server/delete_info",
            Payload::Text(json!({})),
            CallContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RpcError::RouteNotFound {
            path: "user_server/delete_info".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_payload_still_reaches_handler_with_defaults() {
    let svc = user_service();
    let router = user_router(&svc);
    // user_id is garbage; lenient decode hands the handler a defaulted
    // request instead of failing the call.
    let payload = Payload::Text(json!({"user_id": {"bad": true}}));
    let response = router
        .dispatch("user_server/get_info", payload, CallContext::new())
        .await
        .unwrap();
    match response {
        Payload::Text(body) => assert_eq!(body["name"], json!("user-0")),
        Payload::Binary(_) => panic!("expected text response"),
    }
}

#[tokio::test]
async fn test_response_framing_follows_request_framing() {
    let svc = user_service();
    let router = user_router(&svc);

    let text_response = router
        .dispatch(
            "user_server/get_info",
            Payload::Text(json!({"user_id": "7"})),
            CallContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(text_response.framing(), Framing::Text);

    let request_desc = svc.method("get_info").unwrap().request().clone();
    let mut req = MessageValue::new(request_desc);
    req.set("user_id", Value::Int64(7));
    let binary_response = router
        .dispatch(
            "user_server/get_info",
            Payload::Binary(binary::encode_message(&req)),
            CallContext::new(),
        )
        .await
        .unwrap();
    assert_eq!(binary_response.framing(), Framing::Binary);

    // Same method, same request, both framings: same decoded response.
    let response_desc = svc.method("get_info").unwrap().response().clone();
    let from_text = match text_response {
        Payload::Text(body) => wirebuf::codec::text::decode_message(
            &response_desc,
            &body,
            wirebuf::DecodeMode::Strict,
        )
        .unwrap(),
        Payload::Binary(_) => unreachable!(),
    };
    let from_binary = match binary_response {
        Payload::Binary(bytes) => binary::decode_message(&response_desc, &bytes).unwrap(),
        Payload::Text(_) => unreachable!(),
    };
    assert_eq!(from_text, from_binary);
}

#[tokio::test]
async fn test_handler_error_surfaces_to_caller() {
    let svc = user_service();
    let router = user_router(&svc);
    let err = router
        .dispatch(
            "user_server/set_info",
            Payload::Text(json!({})),
            CallContext::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Handler { .. }));
}

#[tokio::test]
async fn test_context_metadata_reaches_handler() {
    let svc = user_service();
    let router = user_router(&svc);
    let ctx = CallContext::new().with_metadata("tenant", "acme");
    let result = router
        .dispatch("user_server/set_info", Payload::Text(json!({})), ctx)
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_dispatch_by_method_id() {
    let svc = user_service();
    let router = user_router(&svc);
    let id = MethodId::compose(3, 0);
    let response = router
        .dispatch_id(id, Payload::Text(json!({"user_id": "1"})), CallContext::new())
        .await
        .unwrap();
    match response {
        Payload::Text(body) => assert_eq!(body["name"], json!("user-1")),
        Payload::Binary(_) => panic!("expected text response"),
    }

    let err = router
        .dispatch_id(
            MethodId::compose(3, 99),
            Payload::Text(json!({})),
            CallContext::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::RouteNotFound { .. }));
}

// Client stub through a loopback transport

#[tokio::test]
async fn test_client_roundtrip_both_framings() {
    let svc = user_service();
    let router = Arc::new(user_router(&svc));
    for framing in [Framing::Text, Framing::Binary] {
        let client = ServiceClient::new(
            Arc::new(LoopbackTransport {
                router: router.clone(),
                framing,
            }),
            svc.clone(),
        );
        let mut req = MessageValue::new(svc.method("get_info").unwrap().request().clone());
        req.set("user_id", Value::Int64(42));
        let resp = client.call("get_info", req, &CallContext::new()).await.unwrap();
        assert_eq!(resp.get("name"), Some(&Value::string("user-42")));
        assert_eq!(resp.get("age"), Some(&Value::Int32(30)));
    }
}

#[tokio::test]
async fn test_transport_error_passes_through_unchanged() {
    let svc = user_service();
    let client = ServiceClient::new(Arc::new(FailingTransport), svc.clone());
    let req = MessageValue::new(svc.method("get_info").unwrap().request().clone());
    let err = client.call("get_info", req, &CallContext::new()).await.unwrap_err();
    assert_eq!(
        err,
        RpcError::Transport {
            message: "connection reset by peer".to_string()
        }
    );
}

#[tokio::test]
async fn test_client_metadata_travels_to_handler() {
    let svc = user_service();
    let router = Arc::new(user_router(&svc));
    let client = ServiceClient::new(
        Arc::new(LoopbackTransport {
            router,
            framing: Framing::Binary,
        }),
        svc.clone(),
    );
    let req = MessageValue::new(svc.method("set_info").unwrap().request().clone());
    let ctx = CallContext::new().with_metadata("tenant", "acme");
    assert!(client.call("set_info", req.clone(), &ctx).await.is_ok());
    assert!(client.call("set_info", req, &CallContext::new()).await.is_err());
}

// Method identifiers

#[test]
fn test_method_id_composition_spec_case() {
    let id = MethodId::compose(3, 5);
    assert_eq!(id.0, (3u64 << 32) | 5);
    assert_eq!(id.service_id(), 3);
    assert_eq!(id.local_id(), 5);
}

#[test]
fn test_service_exposes_path_and_id_for_same_method() {
    let svc = user_service();
    let method = svc.method("set_info").unwrap();
    assert_eq!(svc.path_of(method), "user_server/set_info");
    assert_eq!(svc.method_id(method), MethodId::compose(3, 1));
}

#[tokio::test]
async fn test_concurrent_dispatch_shares_router_without_locking() {
    let svc = user_service();
    let router = Arc::new(user_router(&svc));
    let mut handles = Vec::new();
    for i in 0..16 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let payload = Payload::Text(json!({ "user_id": i.to_string() }));
            router
                .dispatch("user_server/get_info", payload, CallContext::new())
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
