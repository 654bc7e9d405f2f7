//! Client-side service stub.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::codec::{binary, text, DecodeMode};
use crate::schema::{MethodId, ServiceDescriptor};
use crate::value::MessageValue;

use super::{CallContext, Framing, Payload, RpcError};

/// The transport invoke contract this layer consumes but does not
/// implement: send a method path + composite id + request payload, get an
/// eventual response payload back.
///
/// The transport picks the request framing via [`framing`](Self::framing)
/// and may answer in either family; the stub decodes whichever comes back.
/// Cancellation and deadlines live in the transport, carried through the
/// opaque [`CallContext`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Preferred framing for outbound requests.
    fn framing(&self) -> Framing {
        Framing::Binary
    }

    /// Perform one call. Errors are returned as-is to the caller; the stub
    /// adds nothing and retries nothing.
    async fn invoke(
        &self,
        path: &str,
        id: MethodId,
        request: Payload,
        ctx: &CallContext,
    ) -> Result<Payload, RpcError>;
}

/// Thin generated-stub equivalent: resolves a method, builds its path and
/// composite id, delegates to the transport, and decodes the response.
///
/// Performs no retries and no interpretation of transport errors.
pub struct ServiceClient {
    transport: Arc<dyn Transport>,
    descriptor: Arc<ServiceDescriptor>,
    mode: DecodeMode,
}

impl ServiceClient {
    pub fn new(transport: Arc<dyn Transport>, descriptor: Arc<ServiceDescriptor>) -> Self {
        Self {
            transport,
            descriptor,
            mode: DecodeMode::Lenient,
        }
    }

    /// Override the response decode mode (lenient by default).
    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// The service this stub speaks for.
    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.descriptor
    }

    /// Invoke a method by name with a request message.
    pub async fn call(
        &self,
        method: &str,
        request: MessageValue,
        ctx: &CallContext,
    ) -> Result<MessageValue, RpcError> {
        let descriptor = self
            .descriptor
            .method(method)
            .ok_or_else(|| RpcError::MethodNotFound {
                service: self.descriptor.name().to_string(),
                method: method.to_string(),
            })?;
        let path = self.descriptor.path_of(descriptor);
        let id = self.descriptor.method_id(descriptor);

        let payload = match self.transport.framing() {
            Framing::Text => Payload::Text(text::encode_message(&request)),
            Framing::Binary => Payload::Binary(binary::encode_message(&request)),
        };
        debug!(%path, %id, framing = ?payload.framing(), "invoking");

        let response = self.transport.invoke(&path, id, payload, ctx).await?;
        match response {
            Payload::Text(json) => {
                text::decode_message(descriptor.response(), &json, self.mode).map_err(Into::into)
            }
            Payload::Binary(bytes) => {
                binary::decode_message(descriptor.response(), &bytes).map_err(Into::into)
            }
        }
    }
}
