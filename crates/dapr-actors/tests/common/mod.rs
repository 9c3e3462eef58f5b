#![allow(dead_code)]

use bytes::Bytes;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};

use dapr_actors::transport::{ConnectionError, TransportFuture};
use dapr_actors::{
    ActorAddress, ActorInteractor, SidecarConfig, Transport, TransportRequest, TransportResponse,
};

/// A request captured by `TestTransport`, waiting for the test to answer it
pub struct PendingRequest {
    pub request: TransportRequest,
    responder: oneshot::Sender<Result<TransportResponse, ConnectionError>>,
}

impl PendingRequest {
    pub fn path(&self) -> String {
        self.request.path_string()
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.request.body).unwrap()
    }

    pub fn respond(self, status: u16) {
        self.respond_with_body(status, Bytes::new());
    }

    pub fn respond_with_body(self, status: u16, body: impl Into<Bytes>) {
        let _ = self
            .responder
            .send(Ok(TransportResponse::new(status, body)));
    }

    pub fn respond_with_json(self, status: u16, body: &Value) {
        self.respond_with_body(status, serde_json::to_vec(body).unwrap());
    }

    pub fn fail(self) {
        let _ = self.responder.send(Err(ConnectionError::Closed));
    }
}

/// Transport that queues every request until the test answers it
#[derive(Clone, Default)]
pub struct TestTransport {
    pending: Arc<Mutex<VecDeque<PendingRequest>>>,
    arrived: Arc<Notify>,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next request the interactor sends
    pub async fn next_request(&self) -> PendingRequest {
        let wait = async {
            loop {
                let notified = self.arrived.notified();
                if let Some(request) = self.pending.lock().unwrap().pop_front() {
                    return request;
                }
                notified.await;
            }
        };

        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("No request reached the transport")
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl Transport for TestTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture {
        let (responder, response) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .push_back(PendingRequest { request, responder });
        self.arrived.notify_one();

        Box::pin(async move { response.await.unwrap_or(Err(ConnectionError::Closed)) })
    }
}

pub fn interactor() -> (ActorInteractor, TestTransport) {
    interactor_with_config(&SidecarConfig::default())
}

pub fn interactor_with_config(config: &SidecarConfig) -> (ActorInteractor, TestTransport) {
    let transport = TestTransport::new();
    let interactor = ActorInteractor::new(Arc::new(transport.clone()), config);
    (interactor, transport)
}

pub fn address() -> ActorAddress {
    ActorAddress::new("DemoActor", "abc").unwrap()
}
