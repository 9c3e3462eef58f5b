//! # Actor Interactor
//!
//! The single entry point for everything that reaches the sidecar: method
//! invocation (raw or remoted), state access, reminders and timers.
//!
//! ## Failure semantics
//!
//! * Any non-success status becomes `ActorError::Transport` carrying the
//!   status and the sidecar's error body. The one exception is a successful
//!   state read with an empty body, which means the key has no value.
//! * Nothing is retried here.
//! * Every operation takes a `CancellationToken`. A token cancelled before the
//!   call starts prevents the request from being sent; cancelling while the
//!   request is in flight stops waiting, but the sidecar may still apply it.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::ActorAddress;
use crate::codec::{RequestEnvelope, ResponseEnvelope};
use crate::config::SidecarConfig;
use crate::error::{ActorError, ActorResult, MalformedMessageError, RemotingError, SidecarErrorBody};
use crate::reminder::{validate_name, ReminderConfig, ReminderRegistration, TimerRegistration};
use crate::serializer::{SerializerRegistry, Slot};
use crate::state::{StateEntry, StateOperation, StateTransaction};
use crate::transport::{
    HttpMethod, HttpTransport, Transport, TransportFuture, TransportRequest, TransportResponse,
};

/// Header marking a request body as a remoting envelope
pub const REMOTING_HEADER: &str = "X-DaprRemoting";

const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT: &str = "application/json";
const ENVELOPE_CONTENT: &str = "application/octet-stream";

/// A remoted call: target method by numeric ids, arguments in declared order
#[derive(Debug, Clone, PartialEq)]
pub struct RemotingRequest {
    pub interface_id: i32,
    pub method_id: i32,
    pub arguments: Vec<Value>,
}

impl RemotingRequest {
    pub fn new(interface_id: i32, method_id: i32, arguments: Vec<Value>) -> Self {
        Self {
            interface_id,
            method_id,
            arguments,
        }
    }
}

/// Result of a remoted call; `None` for methods that return nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotingResponse {
    pub value: Option<Value>,
}

/// Body of a method invocation
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationPayload {
    /// Caller-encoded bytes sent verbatim to the named method
    Opaque { method_name: String, body: Bytes },
    /// Structured call resolved through a `SerializerRegistry`
    Remoting(RemotingRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocationRequest {
    pub address: ActorAddress,
    pub payload: InvocationPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodInvocationResponse {
    /// Raw response bytes; empty for void methods
    Opaque(Bytes),
    Remoting(RemotingResponse),
}

struct InteractorInner {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
    reminders: ReminderConfig,
}

/// Client for actor operations on the sidecar.
///
/// Cheap to clone; clones share the transport. Holds no per-call state, so
/// any number of tasks may use it concurrently.
#[derive(Clone)]
pub struct ActorInteractor {
    inner: Arc<InteractorInner>,
}

/// Non-owning handle to an `ActorInteractor`
#[derive(Clone)]
pub struct WeakInteractor {
    inner: Weak<InteractorInner>,
}

impl WeakInteractor {
    pub fn upgrade(&self) -> Option<ActorInteractor> {
        self.inner.upgrade().map(|inner| ActorInteractor { inner })
    }
}

impl fmt::Debug for WeakInteractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInteractor")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for ActorInteractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInteractor")
            .field("timeout", &self.inner.timeout)
            .field("reminders", &self.inner.reminders)
            .finish()
    }
}

impl ActorInteractor {
    /// Create an interactor over an explicitly provided transport
    pub fn new(transport: Arc<dyn Transport>, config: &SidecarConfig) -> Self {
        Self {
            inner: Arc::new(InteractorInner {
                transport,
                timeout: Some(config.timeout).filter(|timeout| !timeout.is_zero()),
                reminders: config.reminders,
            }),
        }
    }

    /// Create an interactor that talks HTTP to the configured sidecar
    pub fn from_config(config: &SidecarConfig) -> ActorResult<Self> {
        let transport = HttpTransport::new(config)?;
        info!("Using sidecar at {}", transport.endpoint());
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn downgrade(&self) -> WeakInteractor {
        WeakInteractor {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke a method, dispatching on the payload kind
    pub async fn invoke(
        &self,
        registry: &SerializerRegistry,
        request: MethodInvocationRequest,
        cancel: &CancellationToken,
    ) -> ActorResult<MethodInvocationResponse> {
        match request.payload {
            InvocationPayload::Opaque { method_name, body } => self
                .invoke_without_remoting(&request.address, &method_name, body, cancel)
                .await
                .map(MethodInvocationResponse::Opaque),
            InvocationPayload::Remoting(remoting) => self
                .invoke_with_remoting(registry, &request.address, &remoting, cancel)
                .await
                .map(MethodInvocationResponse::Remoting),
        }
    }

    /// Invoke a method with a caller-encoded payload. Returns the raw
    /// response, empty when the method returns nothing.
    pub async fn invoke_without_remoting(
        &self,
        address: &ActorAddress,
        method_name: &str,
        payload: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> ActorResult<Bytes> {
        let request = TransportRequest::new(HttpMethod::Put, address.method_path(method_name))
            .with_header(CONTENT_TYPE, JSON_CONTENT)
            .with_body(payload);

        self.exchange(request, cancel).await
    }

    /// Invoke a method through the remoting envelope.
    ///
    /// Everything that can be checked locally (method lookup, argument count,
    /// serializers for each slot) is checked before the request is sent.
    pub async fn invoke_with_remoting(
        &self,
        registry: &SerializerRegistry,
        address: &ActorAddress,
        request: &RemotingRequest,
        cancel: &CancellationToken,
    ) -> ActorResult<RemotingResponse> {
        let RemotingRequest {
            interface_id,
            method_id,
            arguments,
        } = request;
        let method = registry.resolve(*interface_id, *method_id)?;

        if arguments.len() != method.arity() {
            return Err(RemotingError::ArgumentCount {
                method: method.name().to_string(),
                expected: method.arity(),
                actual: arguments.len(),
            }
            .into());
        }

        let mut serialized = Vec::with_capacity(arguments.len());
        for (position, argument) in arguments.iter().enumerate() {
            let serializer =
                registry.serializer(*interface_id, *method_id, Slot::Argument(position as u32))?;
            serialized.push(serializer.serialize(argument)?);
        }

        let return_serializer = if method.returns_value() {
            Some(registry.serializer(*interface_id, *method_id, Slot::Return)?)
        } else {
            None
        };

        let envelope = RequestEnvelope {
            interface_id: *interface_id,
            method_id: *method_id,
            arguments: serialized,
        };

        debug!(
            "Invoking {} on {} via remoting ({} arguments)",
            method.name(),
            address,
            arguments.len()
        );

        let request = TransportRequest::new(HttpMethod::Put, address.method_path(method.name()))
            .with_header(REMOTING_HEADER, "true")
            .with_header(CONTENT_TYPE, ENVELOPE_CONTENT)
            .with_body(envelope.encode());

        let body = self.exchange(request, cancel).await?;
        let response = ResponseEnvelope::decode(body)?;

        match (response.value, return_serializer) {
            (None, _) => Ok(RemotingResponse { value: None }),
            (Some(bytes), Some(serializer)) => Ok(RemotingResponse {
                value: Some(serializer.deserialize(&bytes)?),
            }),
            (Some(_), None) => Err(MalformedMessageError::UnexpectedValue {
                method: method.name().to_string(),
            }
            .into()),
        }
    }

    /// Read a state value. `None` when the sidecar has nothing for the key.
    pub async fn get_state(
        &self,
        address: &ActorAddress,
        key: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<Option<Bytes>> {
        let request = TransportRequest::new(HttpMethod::Get, address.state_key_path(key));
        let body = self.exchange(request, cancel).await?;

        if body.is_empty() {
            debug!("No value for state key '{}' on {}", key, address);
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    /// Write a state value. `None` writes an explicit null, clearing the key.
    ///
    /// `value` must be one JSON document. It is embedded in the batch body
    /// as written, except for whitespace before or after it, so a later
    /// `get_state` returns the same document without that padding.
    pub async fn save_state(
        &self,
        address: &ActorAddress,
        key: &str,
        value: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let transaction = StateTransaction::new().upsert(key, value);
        self.save_state_transactionally(address, &transaction, cancel)
            .await
    }

    pub async fn remove_state(
        &self,
        address: &ActorAddress,
        key: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let transaction = StateTransaction::new().delete(key);
        self.save_state_transactionally(address, &transaction, cancel)
            .await
    }

    /// Submit a batch of writes in one request. An empty batch is still sent.
    /// The sidecar applies all operations or none; on failure its error is
    /// returned as-is and nothing is rolled back here.
    pub async fn save_state_transactionally(
        &self,
        address: &ActorAddress,
        transaction: &StateTransaction,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let body = transaction.to_json()?;
        debug!(
            "Saving {} state operations on {}",
            transaction.len(),
            address
        );

        let request = TransportRequest::new(HttpMethod::Put, address.state_path())
            .with_header(CONTENT_TYPE, JSON_CONTENT)
            .with_body(body);

        self.exchange(request, cancel).await?;
        Ok(())
    }

    /// Run one state operation. Only `Get` yields a value.
    pub async fn apply_state_operation(
        &self,
        address: &ActorAddress,
        operation: StateOperation,
        cancel: &CancellationToken,
    ) -> ActorResult<Option<Bytes>> {
        match operation {
            StateOperation::Get { key } => self.get_state(address, &key, cancel).await,
            StateOperation::Save { key, value } => {
                self.save_state(address, &key, value, cancel).await?;
                Ok(None)
            }
            StateOperation::Remove { key } => {
                self.remove_state(address, &key, cancel).await?;
                Ok(None)
            }
        }
    }

    /// Read a JSON state value into an entry that can be edited and saved back
    pub async fn get_state_entry<T: DeserializeOwned>(
        &self,
        address: &ActorAddress,
        key: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<StateEntry<T>> {
        let bytes = self.get_state(address, key, cancel).await?;
        StateEntry::decode(address.clone(), key.to_string(), bytes, self.downgrade())
    }

    /// Serialize a value as JSON and save it; `None` clears the key
    pub async fn save_state_json<T: Serialize>(
        &self,
        address: &ActorAddress,
        key: &str,
        value: Option<&T>,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let bytes = match value {
            Some(value) => Some(Bytes::from(serde_json::to_vec(value)?)),
            None => None,
        };
        self.save_state(address, key, bytes, cancel).await
    }

    /// Register or replace a reminder
    pub async fn register_reminder(
        &self,
        address: &ActorAddress,
        reminder: &ReminderRegistration,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let body = reminder.to_json(&self.inner.reminders)?;
        let request = TransportRequest::new(HttpMethod::Put, address.reminder_path(&reminder.name))
            .with_header(CONTENT_TYPE, JSON_CONTENT)
            .with_body(body);

        self.exchange(request, cancel).await?;
        info!("Registered reminder '{}' on {}", reminder.name, address);
        Ok(())
    }

    /// Unregister a reminder. Unknown names are not an error.
    pub async fn unregister_reminder(
        &self,
        address: &ActorAddress,
        name: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        validate_name(name)?;
        let request = TransportRequest::new(HttpMethod::Delete, address.reminder_path(name));
        self.unregister(request, cancel).await?;
        info!("Unregistered reminder '{}' on {}", name, address);
        Ok(())
    }

    /// Register or replace a timer
    pub async fn register_timer(
        &self,
        address: &ActorAddress,
        timer: &TimerRegistration,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let body = timer.to_json(&self.inner.reminders)?;
        let request = TransportRequest::new(HttpMethod::Put, address.timer_path(&timer.name))
            .with_header(CONTENT_TYPE, JSON_CONTENT)
            .with_body(body);

        self.exchange(request, cancel).await?;
        info!("Registered timer '{}' on {}", timer.name, address);
        Ok(())
    }

    /// Unregister a timer. Unknown names are not an error.
    pub async fn unregister_timer(
        &self,
        address: &ActorAddress,
        name: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        validate_name(name)?;
        let request = TransportRequest::new(HttpMethod::Delete, address.timer_path(name));
        self.unregister(request, cancel).await?;
        info!("Unregistered timer '{}' on {}", name, address);
        Ok(())
    }

    /// A 404 without an error body means the name was never registered, which
    /// is what the caller wanted. A 404 that explains itself is surfaced.
    async fn unregister(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        let path = request.path_string();
        let response = self.dispatch(request, cancel).await?;

        if response.is_success() {
            return Ok(());
        }
        if response.status == 404 && SidecarErrorBody::from_bytes(&response.body).is_none() {
            debug!("{} was not registered", path);
            return Ok(());
        }

        warn!("DELETE {} failed with status {}", path, response.status);
        Err(ActorError::transport(response.status, &response.body))
    }

    /// Send a request and classify the status
    async fn exchange(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> ActorResult<Bytes> {
        let method = request.method;
        let path = request.path_string();
        let response = self.dispatch(request, cancel).await?;

        if response.is_success() {
            Ok(response.body)
        } else {
            warn!("{} {} failed with status {}", method, path, response.status);
            Err(ActorError::transport(response.status, &response.body))
        }
    }

    /// Send a request, honouring cancellation and the configured timeout
    async fn dispatch(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> ActorResult<TransportResponse> {
        if let Some(segment) = request.dot_segment() {
            return Err(ActorError::InvalidPathSegment {
                segment: segment.to_string(),
                path: request.path_string(),
            });
        }

        if cancel.is_cancelled() {
            debug!(
                "Not sending {} {}: operation already cancelled",
                request.method,
                request.path_string()
            );
            return Err(ActorError::Cancelled);
        }

        debug!("{} {}", request.method, request.path_string());
        let exchange = self.inner.transport.send(request);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Operation cancelled while waiting for the sidecar");
                Err(ActorError::Cancelled)
            }
            result = self.await_response(exchange) => result,
        }
    }

    async fn await_response(&self, exchange: TransportFuture) -> ActorResult<TransportResponse> {
        match self.inner.timeout {
            Some(limit) => timeout(limit, exchange)
                .await
                .map_err(|_| ActorError::Timeout { timeout: limit })?
                .map_err(ActorError::from),
            None => exchange.await.map_err(ActorError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ConnectionError, MockTransport};
    use std::future::pending;

    fn address() -> ActorAddress {
        ActorAddress::new("DemoActor", "abc").unwrap()
    }

    fn interactor(mock: MockTransport) -> ActorInteractor {
        ActorInteractor::new(Arc::new(mock), &SidecarConfig::default())
    }

    fn respond(status: u16, body: &'static [u8]) -> TransportFuture {
        Box::pin(async move { Ok(TransportResponse::new(status, body)) })
    }

    fn never() -> TransportFuture {
        Box::pin(pending::<Result<TransportResponse, ConnectionError>>())
    }

    #[tokio::test]
    async fn test_cancelled_before_send_sends_nothing() {
        let mut mock = MockTransport::new();
        mock.expect_send().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = interactor(mock).get_state(&address(), "k", &cancel).await;
        assert!(matches!(result, Err(ActorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| never());

        let cancel = CancellationToken::new();
        let interactor = interactor(mock);
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = interactor
            .invoke_without_remoting(&address(), "Slow", Bytes::new(), &cancel)
            .await;
        assert!(matches!(result, Err(ActorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut mock = MockTransport::new();
        mock.expect_send().returning(|_| never());

        let config = SidecarConfig {
            timeout: Duration::from_millis(20),
            ..SidecarConfig::default()
        };
        let interactor = ActorInteractor::new(Arc::new(mock), &config);

        let result = interactor
            .get_state(&address(), "k", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ActorError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_transport_error() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .returning(|_| Box::pin(async { Err(ConnectionError::Closed) }));

        let error = interactor(mock)
            .remove_state(&address(), "k", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ActorError::Connection(ConnectionError::Closed)));
        assert_eq!(error.status(), None);
    }

    #[tokio::test]
    async fn test_invoke_without_remoting_request_shape() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .withf(|request| {
                request.method == HttpMethod::Put
                    && request.path_string() == "/v1.0/actors/DemoActor/abc/method/GetData"
                    && request.body == Bytes::from_static(b"{}")
                    && request.header(REMOTING_HEADER).is_none()
            })
            .times(1)
            .returning(|_| respond(200, b"{\"PropertyA\":\"x\"}"));

        let response = interactor(mock)
            .invoke_without_remoting(&address(), "GetData", "{}", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, Bytes::from_static(b"{\"PropertyA\":\"x\"}"));
    }

    #[tokio::test]
    async fn test_invoke_dispatches_on_payload() {
        let mut mock = MockTransport::new();
        mock.expect_send().times(1).returning(|_| respond(204, b""));

        let request = MethodInvocationRequest {
            address: address(),
            payload: InvocationPayload::Opaque {
                method_name: "RegisterTimer".to_string(),
                body: Bytes::new(),
            },
        };
        let response = interactor(mock)
            .invoke(&SerializerRegistry::new(), request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, MethodInvocationResponse::Opaque(Bytes::new()));
    }

    #[tokio::test]
    async fn test_unknown_remoting_interface_is_local_failure() {
        let mut mock = MockTransport::new();
        mock.expect_send().times(0);

        let request = MethodInvocationRequest {
            address: address(),
            payload: InvocationPayload::Remoting(RemotingRequest::new(5, 1, vec![])),
        };
        let error = interactor(mock)
            .invoke(&SerializerRegistry::new(), request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ActorError::Remoting(RemotingError::InterfaceNotFound { interface_id: 5 })
        ));
    }

    #[tokio::test]
    async fn test_unregister_tolerates_plain_not_found() {
        let mut mock = MockTransport::new();
        mock.expect_send()
            .withf(|request| request.method == HttpMethod::Delete)
            .times(1)
            .returning(|_| respond(404, b""));

        interactor(mock)
            .unregister_reminder(&address(), "never-registered", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unregister_surfaces_explained_not_found() {
        let mut mock = MockTransport::new();
        mock.expect_send().returning(|_| {
            respond(
                404,
                br#"{"errorCode":"ERR_ACTOR_TIMER_DELETE","message":"actor type not registered"}"#,
            )
        });

        let error = interactor(mock)
            .unregister_timer(&address(), "t", &CancellationToken::new())
            .await
            .unwrap_err();
        match error {
            ActorError::Transport { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(
                    body.unwrap().error_code.as_deref(),
                    Some("ERR_ACTOR_TIMER_DELETE")
                );
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregister_empty_name_is_local() {
        let mut mock = MockTransport::new();
        mock.expect_send().times(0);

        let result = interactor(mock)
            .unregister_timer(&address(), "", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ActorError::InvalidRegistration { .. })));
    }

    #[test]
    fn test_weak_handle_does_not_keep_interactor_alive() {
        let interactor = interactor(MockTransport::new());
        let weak = interactor.downgrade();
        assert!(weak.upgrade().is_some());

        drop(interactor);
        assert!(weak.upgrade().is_none());
    }
}
