//! # Dapr Actors
//!
//! Client runtime for virtual actors hosted behind a Dapr sidecar. Application
//! code talks to its sidecar over HTTP; the sidecar owns placement, activation,
//! persistence and scheduling.
//!
//! ## Core Features
//!
//! * **Method Invocation**: Raw payloads, or structured calls through the
//!   remoting envelope and a `SerializerRegistry`
//! * **Actor State**: Keyed reads and writes, plus ordered transactional batches
//! * **Reminders and Timers**: Register and unregister recurring invocations
//! * **Cancellation**: Every operation takes a `CancellationToken`
//!
//! ## Architecture
//!
//! * `ActorInteractor`: Stateless client issuing every sidecar request
//! * `Transport`: Pluggable request/response seam; `HttpTransport` by default
//! * `SerializerRegistry`: Maps remoting ids to methods and serializers
//! * `ActorProxy`: Binds one `ActorAddress` to an interactor
//!
//! Nothing is retried or cached. A non-success status from the sidecar
//! surfaces as `ActorError::Transport`.

pub mod address;
pub mod codec;
pub mod config;
pub mod error;
pub mod interactor;
pub mod logging;
pub mod proxy;
pub mod reminder;
pub mod serializer;
pub mod state;
pub mod transport;

pub use address::ActorAddress;
pub use config::SidecarConfig;
pub use error::{
    ActorError, ActorResult, MalformedMessageError, RemotingError, SidecarErrorBody,
};
pub use interactor::{
    ActorInteractor, InvocationPayload, MethodInvocationRequest, MethodInvocationResponse,
    RemotingRequest, RemotingResponse, WeakInteractor,
};
pub use proxy::ActorProxy;
pub use reminder::{
    DurationFormat, ReminderConfig, ReminderRegistration, TimerRegistration, ZeroPeriodPolicy,
};
pub use serializer::{
    InterfaceDescriptor, JsonSerializer, MethodDescriptor, SerializerRegistry, Slot,
    StringSerializer, ValueSerializer,
};
pub use state::{StateEntry, StateOperation, StateTransaction, TransactionOperation};
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};

// Re-exported so callers can name the token type without a direct dependency
pub use tokio_util::sync::CancellationToken;
