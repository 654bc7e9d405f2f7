//! Server-side request router.
//!
//! An immutable mapping from wire method path to
//! `{decode request, invoke handler, encode response}`, built once per
//! service implementation with [`RouterBuilder`] and frozen before the
//! server accepts its first call. Adding a method means adding one table
//! entry; there is no base class and no virtual dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::codec::binary::{self, BinaryLimits};
use crate::codec::{text, DecodeMode};
use crate::schema::{MessageDescriptor, MethodId, SchemaError, ServiceDescriptor};
use crate::value::MessageValue;

use super::{CallContext, Framing, Payload, RpcError};

type HandlerFn =
    Arc<dyn Fn(MessageValue, CallContext) -> BoxFuture<'static, Result<MessageValue, RpcError>> + Send + Sync>;

struct Route {
    request: Arc<MessageDescriptor>,
    response: Arc<MessageDescriptor>,
    handler: HandlerFn,
}

/// Accumulates routes before the freeze.
pub struct RouterBuilder {
    routes: HashMap<String, Route>,
    paths_by_id: HashMap<MethodId, String>,
    mode: DecodeMode,
    limits: BinaryLimits,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            paths_by_id: HashMap::new(),
            mode: DecodeMode::Lenient,
            limits: BinaryLimits::default(),
        }
    }

    /// Request decode mode for every route (lenient by default, so a
    /// malformed-but-decodable payload still reaches the handler with
    /// defaulted fields).
    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Binary decode guard rails.
    pub fn binary_limits(mut self, limits: BinaryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Bind a handler to one method of a service. The route is keyed by
    /// `"<service>/<method>"` and by the composite method id.
    pub fn register<F, Fut>(
        mut self,
        service: &Arc<ServiceDescriptor>,
        method: &str,
        handler: F,
    ) -> Result<Self, SchemaError>
    where
        F: Fn(MessageValue, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MessageValue, RpcError>> + Send + 'static,
    {
        let descriptor = service
            .method(method)
            .ok_or_else(|| SchemaError::UnknownMethod {
                service: service.name().to_string(),
                method: method.to_string(),
            })?;
        let path = service.path_of(descriptor);
        if self.routes.contains_key(&path) {
            return Err(SchemaError::DuplicateRoute { path });
        }
        let id = service.method_id(descriptor);
        let handler: HandlerFn = Arc::new(move |request, ctx| Box::pin(handler(request, ctx)));
        self.routes.insert(
            path.clone(),
            Route {
                request: descriptor.request().clone(),
                response: descriptor.response().clone(),
                handler,
            },
        );
        self.paths_by_id.insert(id, path);
        Ok(self)
    }

    /// Freeze into an immutable router.
    pub fn build(self) -> Router {
        debug!(routes = self.routes.len(), "router frozen");
        Router {
            routes: self.routes,
            paths_by_id: self.paths_by_id,
            mode: self.mode,
            limits: self.limits,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable routing table. Read-only after [`RouterBuilder::build`];
/// concurrent dispatch shares it without locking.
pub struct Router {
    routes: HashMap<String, Route>,
    paths_by_id: HashMap<MethodId, String>,
    mode: DecodeMode,
    limits: BinaryLimits,
}

impl Router {
    /// Dispatch one inbound call by wire path. The response payload uses
    /// the same framing family as the request.
    pub async fn dispatch(
        &self,
        path: &str,
        payload: Payload,
        ctx: CallContext,
    ) -> Result<Payload, RpcError> {
        let Some(route) = self.routes.get(path) else {
            warn!(%path, "route not found");
            return Err(RpcError::RouteNotFound {
                path: path.to_string(),
            });
        };
        let framing = payload.framing();
        let request = match &payload {
            Payload::Text(json) => text::decode_message(&route.request, json, self.mode)?,
            Payload::Binary(bytes) => {
                binary::decode_message_with(&route.request, bytes, &self.limits)?
            }
        };
        let response = (route.handler)(request, ctx).await?;
        Ok(match framing {
            Framing::Text => Payload::Text(text::encode_message(&response)),
            Framing::Binary => Payload::Binary(binary::encode_message(&response)),
        })
    }

    /// Dispatch by composite method id; resolves to the same route as the
    /// path form.
    pub async fn dispatch_id(
        &self,
        id: MethodId,
        payload: Payload,
        ctx: CallContext,
    ) -> Result<Payload, RpcError> {
        let Some(path) = self.paths_by_id.get(&id) else {
            warn!(%id, "method id not found");
            return Err(RpcError::RouteNotFound {
                path: id.to_string(),
            });
        };
        self.dispatch(path, payload, ctx).await
    }

    /// Whether a path has a registered route.
    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
