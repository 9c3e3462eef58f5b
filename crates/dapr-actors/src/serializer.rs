//! # Serializer Registry
//!
//! Remoted calls address a method by `(interface_id, method_id)` instead of by
//! name. The registry maps those ids to the method's wire name and arity, and
//! holds one serializer per argument position and one for the return value.
//! Values crossing this boundary are `serde_json::Value`s; each serializer
//! decides how its declared type is turned into bytes.

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::RemotingError;

/// Position of a value in a method signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Argument(u32),
    Return,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Argument(position) => write!(f, "argument {}", position),
            Slot::Return => write!(f, "return value"),
        }
    }
}

/// Converts values of one declared type to and from bytes
pub trait ValueSerializer: Send + Sync {
    /// Name of the type this serializer handles
    fn type_tag(&self) -> &str;

    fn serialize(&self, value: &Value) -> Result<Bytes, RemotingError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, RemotingError>;
}

/// Serializes any value as JSON text
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    type_tag: String,
}

impl JsonSerializer {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
        }
    }

    fn failure(&self, error: serde_json::Error) -> RemotingError {
        RemotingError::Serializer {
            type_tag: self.type_tag.clone(),
            reason: error.to_string(),
        }
    }
}

impl ValueSerializer for JsonSerializer {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, RemotingError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| self.failure(e))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, RemotingError> {
        serde_json::from_slice(bytes).map_err(|e| self.failure(e))
    }
}

/// Writes strings as raw UTF-8 without JSON quoting
#[derive(Debug, Clone, Default)]
pub struct StringSerializer;

impl ValueSerializer for StringSerializer {
    fn type_tag(&self) -> &str {
        "string"
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, RemotingError> {
        match value {
            Value::String(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            other => Err(RemotingError::Serializer {
                type_tag: self.type_tag().to_string(),
                reason: format!("expected a string, got {}", other),
            }),
        }
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, RemotingError> {
        std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(|e| RemotingError::Serializer {
                type_tag: self.type_tag().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Signature of one remotable method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    id: i32,
    name: String,
    arity: usize,
    returns_value: bool,
}

impl MethodDescriptor {
    pub fn new(id: i32, name: impl Into<String>, arity: usize, returns_value: bool) -> Self {
        Self {
            id,
            name: name.into(),
            arity,
            returns_value,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Name used in the invocation path
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn returns_value(&self) -> bool {
        self.returns_value
    }
}

/// An actor interface: an id plus its method table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    id: i32,
    name: String,
    methods: HashMap<i32, MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    /// Add a method, replacing any earlier one with the same id
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.insert(method.id, method);
        self
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, method_id: i32) -> Option<&MethodDescriptor> {
        self.methods.get(&method_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SerializerKey {
    interface_id: i32,
    method_id: i32,
    slot: Slot,
}

/// Lookup table used by `ActorInteractor::invoke_with_remoting`
#[derive(Default, Clone)]
pub struct SerializerRegistry {
    interfaces: HashMap<i32, InterfaceDescriptor>,
    serializers: HashMap<SerializerKey, Arc<dyn ValueSerializer>>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_interface(&mut self, interface: InterfaceDescriptor) {
        debug!(
            "Registering interface '{}' ({}) with {} methods",
            interface.name,
            interface.id,
            interface.methods.len()
        );
        self.interfaces.insert(interface.id, interface);
    }

    pub fn register_serializer(
        &mut self,
        interface_id: i32,
        method_id: i32,
        slot: Slot,
        serializer: Arc<dyn ValueSerializer>,
    ) {
        self.serializers.insert(
            SerializerKey {
                interface_id,
                method_id,
                slot,
            },
            serializer,
        );
    }

    /// Register serializers for every argument position and, if given, the
    /// return value of a method.
    pub fn register_method_serializers(
        &mut self,
        interface_id: i32,
        method_id: i32,
        arguments: Vec<Arc<dyn ValueSerializer>>,
        returns: Option<Arc<dyn ValueSerializer>>,
    ) {
        for (position, serializer) in arguments.into_iter().enumerate() {
            self.register_serializer(
                interface_id,
                method_id,
                Slot::Argument(position as u32),
                serializer,
            );
        }
        if let Some(serializer) = returns {
            self.register_serializer(interface_id, method_id, Slot::Return, serializer);
        }
    }

    pub fn interface(&self, interface_id: i32) -> Option<&InterfaceDescriptor> {
        self.interfaces.get(&interface_id)
    }

    /// Find the method addressed by a pair of ids
    pub fn resolve(
        &self,
        interface_id: i32,
        method_id: i32,
    ) -> Result<&MethodDescriptor, RemotingError> {
        let interface = self
            .interfaces
            .get(&interface_id)
            .ok_or(RemotingError::InterfaceNotFound { interface_id })?;

        interface
            .method(method_id)
            .ok_or(RemotingError::MethodNotFound {
                interface_id,
                method_id,
            })
    }

    pub fn serializer(
        &self,
        interface_id: i32,
        method_id: i32,
        slot: Slot,
    ) -> Result<Arc<dyn ValueSerializer>, RemotingError> {
        self.serializers
            .get(&SerializerKey {
                interface_id,
                method_id,
                slot,
            })
            .cloned()
            .ok_or(RemotingError::MissingSerializer {
                interface_id,
                method_id,
                slot,
            })
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("interfaces", &self.interfaces)
            .field("serializers", &self.serializers.len())
            .finish()
    }
}
