//! # Actor Proxy
//!
//! `ActorProxy` binds one actor address to an interactor so callers do not
//! have to thread the address through every call.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::address::ActorAddress;
use crate::error::ActorResult;
use crate::interactor::{ActorInteractor, RemotingRequest, RemotingResponse};
use crate::reminder::{ReminderRegistration, TimerRegistration};
use crate::serializer::SerializerRegistry;
use crate::state::{StateEntry, StateTransaction};

/// # ActorProxy
///
/// A handle to a single actor instance.
///
/// ## Purpose
///
/// ActorProxy pairs an `ActorAddress` with a shared `ActorInteractor` and,
/// optionally, the serializer registry used for remoted calls. Cloning is
/// cheap and clones talk to the same actor through the same transport.
#[derive(Clone, Debug)]
pub struct ActorProxy {
    address: ActorAddress,
    interactor: ActorInteractor,
    registry: Arc<SerializerRegistry>,
}

impl ActorProxy {
    pub fn new(interactor: ActorInteractor, address: ActorAddress) -> Self {
        Self {
            address,
            interactor,
            registry: Arc::new(SerializerRegistry::new()),
        }
    }

    /// Use `registry` to resolve remoted calls made through this proxy
    pub fn with_registry(mut self, registry: Arc<SerializerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    pub fn interactor(&self) -> &ActorInteractor {
        &self.interactor
    }

    /// Calls a method with a caller-encoded body and returns the raw response.
    pub async fn invoke_raw(
        &self,
        method_name: &str,
        payload: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> ActorResult<Bytes> {
        self.interactor
            .invoke_without_remoting(&self.address, method_name, payload, cancel)
            .await
    }

    /// Calls a method with a JSON request and decodes the JSON response.
    ///
    /// An empty response body decodes as JSON `null`, so void methods can be
    /// called with `R = ()` or `R = Option<_>`.
    pub async fn invoke_json<P, R>(
        &self,
        method_name: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> ActorResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(params)?;
        let response = self.invoke_raw(method_name, payload, cancel).await?;

        if response.is_empty() {
            Ok(serde_json::from_value(Value::Null)?)
        } else {
            Ok(serde_json::from_slice(&response)?)
        }
    }

    /// Calls a method through the remoting envelope
    pub async fn invoke_remote(
        &self,
        interface_id: i32,
        method_id: i32,
        arguments: Vec<Value>,
        cancel: &CancellationToken,
    ) -> ActorResult<RemotingResponse> {
        let request = RemotingRequest::new(interface_id, method_id, arguments);
        self.interactor
            .invoke_with_remoting(&self.registry, &self.address, &request, cancel)
            .await
    }

    pub async fn get_state(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<Option<Bytes>> {
        self.interactor.get_state(&self.address, key, cancel).await
    }

    pub async fn get_state_entry<T: DeserializeOwned>(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<StateEntry<T>> {
        self.interactor
            .get_state_entry(&self.address, key, cancel)
            .await
    }

    pub async fn save_state(
        &self,
        key: &str,
        value: Option<Bytes>,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .save_state(&self.address, key, value, cancel)
            .await
    }

    pub async fn save_state_json<T: Serialize>(
        &self,
        key: &str,
        value: Option<&T>,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .save_state_json(&self.address, key, value, cancel)
            .await
    }

    pub async fn remove_state(&self, key: &str, cancel: &CancellationToken) -> ActorResult<()> {
        self.interactor
            .remove_state(&self.address, key, cancel)
            .await
    }

    pub async fn save_state_transactionally(
        &self,
        transaction: &StateTransaction,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .save_state_transactionally(&self.address, transaction, cancel)
            .await
    }

    pub async fn register_reminder(
        &self,
        reminder: &ReminderRegistration,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .register_reminder(&self.address, reminder, cancel)
            .await
    }

    pub async fn unregister_reminder(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .unregister_reminder(&self.address, name, cancel)
            .await
    }

    pub async fn register_timer(
        &self,
        timer: &TimerRegistration,
        cancel: &CancellationToken,
    ) -> ActorResult<()> {
        self.interactor
            .register_timer(&self.address, timer, cancel)
            .await
    }

    pub async fn unregister_timer(&self, name: &str, cancel: &CancellationToken) -> ActorResult<()> {
        self.interactor
            .unregister_timer(&self.address, name, cancel)
            .await
    }
}
