//! # Actor State
//!
//! Writes reach the sidecar as a batch of operations on the actor's state
//! endpoint. A single save or remove is a batch of one; a transaction is
//! applied by the sidecar as a whole, in the order given.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::address::ActorAddress;
use crate::error::ActorError;
use crate::interactor::WeakInteractor;

/// A single state access. `Save` with `None` clears the key by writing null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOperation {
    Get { key: String },
    Save { key: String, value: Option<Bytes> },
    Remove { key: String },
}

/// An operation that may be part of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOperation {
    Upsert { key: String, value: Option<Bytes> },
    Delete { key: String },
}

impl TransactionOperation {
    pub fn key(&self) -> &str {
        match self {
            TransactionOperation::Upsert { key, .. } | TransactionOperation::Delete { key } => key,
        }
    }
}

impl TryFrom<StateOperation> for TransactionOperation {
    /// Reads cannot be batched; the operation is handed back
    type Error = StateOperation;

    fn try_from(operation: StateOperation) -> Result<Self, Self::Error> {
        match operation {
            StateOperation::Save { key, value } => Ok(TransactionOperation::Upsert { key, value }),
            StateOperation::Remove { key } => Ok(TransactionOperation::Delete { key }),
            get @ StateOperation::Get { .. } => Err(get),
        }
    }
}

/// Ordered batch of state writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTransaction {
    operations: Vec<TransactionOperation>,
}

impl StateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(mut self, key: impl Into<String>, value: Option<Bytes>) -> Self {
        self.operations.push(TransactionOperation::Upsert {
            key: key.into(),
            value,
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.operations
            .push(TransactionOperation::Delete { key: key.into() });
        self
    }

    pub fn push(&mut self, operation: TransactionOperation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[TransactionOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Encode as the sidecar's batch body. Values must already be JSON; they
    /// are embedded as-is.
    pub fn to_json(&self) -> Result<Bytes, ActorError> {
        let entries = self
            .operations
            .iter()
            .map(BatchEntry::from_operation)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Bytes::from(serde_json::to_vec(&entries)?))
    }
}

impl FromIterator<TransactionOperation> for StateTransaction {
    fn from_iter<I: IntoIterator<Item = TransactionOperation>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    operation: &'static str,
    request: BatchRequest<'a>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    key: &'a str,
    /// `Some(None)` serializes as an explicit null
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Option<Box<RawValue>>>,
}

impl<'a> BatchEntry<'a> {
    fn from_operation(operation: &'a TransactionOperation) -> Result<Self, ActorError> {
        match operation {
            TransactionOperation::Upsert { key, value } => {
                let value = match value {
                    Some(bytes) => Some(raw_json(bytes).map_err(|source| {
                        ActorError::InvalidPayload {
                            key: key.clone(),
                            source,
                        }
                    })?),
                    None => None,
                };
                Ok(Self {
                    operation: "upsert",
                    request: BatchRequest {
                        key,
                        value: Some(value),
                    },
                })
            }
            TransactionOperation::Delete { key } => Ok(Self {
                operation: "delete",
                request: BatchRequest { key, value: None },
            }),
        }
    }
}

/// Check that `bytes` hold one JSON value and wrap them for embedding.
/// The document is kept byte for byte; whitespace around it is dropped.
pub(crate) fn raw_json(bytes: &[u8]) -> Result<Box<RawValue>, serde_json::Error> {
    let text =
        std::str::from_utf8(bytes).map_err(<serde_json::Error as serde::de::Error>::custom)?;
    RawValue::from_string(text.trim().to_string())
}

/// A state value fetched from an actor, editable locally and saved back later.
///
/// The entry only holds a weak reference to the interactor that produced it.
/// Saving after that interactor has been dropped fails with
/// `ActorError::InteractorDropped`.
pub struct StateEntry<T> {
    key: String,
    value: Option<T>,
    address: ActorAddress,
    interactor: WeakInteractor,
}

impl<T> StateEntry<T> {
    pub(crate) fn new(
        address: ActorAddress,
        key: String,
        value: Option<T>,
        interactor: WeakInteractor,
    ) -> Self {
        Self {
            key,
            value,
            address,
            interactor,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// The locally held value; no network access
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    /// Replace the local value. Nothing is sent until `save`.
    pub fn set(&mut self, value: Option<T>) {
        self.value = value;
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Remove the key from the actor's state and clear the local value
    pub async fn delete(&mut self, cancel: &CancellationToken) -> Result<(), ActorError> {
        let interactor = self
            .interactor
            .upgrade()
            .ok_or(ActorError::InteractorDropped)?;
        interactor
            .remove_state(&self.address, &self.key, cancel)
            .await?;
        self.value = None;
        Ok(())
    }
}

impl<T: Serialize> StateEntry<T> {
    /// Persist the current local value under this entry's key
    pub async fn save(&self, cancel: &CancellationToken) -> Result<(), ActorError> {
        let interactor = self
            .interactor
            .upgrade()
            .ok_or(ActorError::InteractorDropped)?;
        interactor
            .save_state_json(&self.address, &self.key, self.value.as_ref(), cancel)
            .await
    }
}

impl<T: DeserializeOwned> StateEntry<T> {
    pub(crate) fn decode(
        address: ActorAddress,
        key: String,
        bytes: Option<Bytes>,
        interactor: WeakInteractor,
    ) -> Result<Self, ActorError> {
        // A stored null decodes to no value, like a missing key
        let value = match bytes {
            Some(bytes) => serde_json::from_slice::<Option<T>>(&bytes)?,
            None => None,
        };
        Ok(Self::new(address, key, value, interactor))
    }
}

impl<T: fmt::Debug> fmt::Debug for StateEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("address", &self.address)
            .finish()
    }
}
