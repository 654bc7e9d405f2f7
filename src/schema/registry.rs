//! Schema registry: the process-wide table of descriptors.
//!
//! Built once at startup with [`SchemaRegistryBuilder`], then frozen into an
//! immutable [`SchemaRegistry`] before the first codec or dispatch call
//! (construct-then-freeze). The frozen registry resolves enums, messages,
//! and services by name, and service methods by wire path or composite
//! [`MethodId`] - both forms resolve to the same method.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::{
    EnumDescriptor, MessageDescriptor, MethodDescriptor, MethodId, SchemaError, ServiceDescriptor,
};

/// Accumulates descriptors before the freeze.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    enums: HashMap<String, Arc<EnumDescriptor>>,
    messages: HashMap<String, Arc<MessageDescriptor>>,
    services: HashMap<String, Arc<ServiceDescriptor>>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enum descriptor under its own name.
    pub fn register_enum(mut self, desc: Arc<EnumDescriptor>) -> Result<Self, SchemaError> {
        let name = desc.name().to_string();
        if self.enums.insert(name.clone(), desc).is_some() {
            return Err(SchemaError::DuplicateRegistration { name });
        }
        Ok(self)
    }

    /// Register a message descriptor under its own name.
    pub fn register_message(mut self, desc: Arc<MessageDescriptor>) -> Result<Self, SchemaError> {
        let name = desc.name().to_string();
        if self.messages.insert(name.clone(), desc).is_some() {
            return Err(SchemaError::DuplicateRegistration { name });
        }
        Ok(self)
    }

    /// Register a service descriptor under its own name.
    pub fn register_service(mut self, desc: Arc<ServiceDescriptor>) -> Result<Self, SchemaError> {
        let name = desc.name().to_string();
        if self.services.insert(name.clone(), desc).is_some() {
            return Err(SchemaError::DuplicateRegistration { name });
        }
        Ok(self)
    }

    /// Freeze into an immutable registry, building the method path and id
    /// lookup tables. Fails if two services collide on a method path or a
    /// composite id.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut methods_by_path = HashMap::new();
        let mut methods_by_id = HashMap::new();
        for service in self.services.values() {
            for (position, method) in service.methods().iter().enumerate() {
                let path = service.path_of(method);
                let id = service.method_id(method);
                if methods_by_path
                    .insert(path.clone(), (service.clone(), position))
                    .is_some()
                {
                    return Err(SchemaError::DuplicateRoute { path });
                }
                if methods_by_id.insert(id, (service.clone(), position)).is_some() {
                    return Err(SchemaError::DuplicateRoute { path });
                }
            }
        }
        info!(
            enums = self.enums.len(),
            messages = self.messages.len(),
            services = self.services.len(),
            methods = methods_by_path.len(),
            "schema registry frozen"
        );
        Ok(SchemaRegistry {
            enums: self.enums,
            messages: self.messages,
            services: self.services,
            methods_by_path,
            methods_by_id,
        })
    }
}

/// Immutable descriptor tables. Read-only after [`SchemaRegistryBuilder::build`];
/// concurrent readers need no locking.
#[derive(Debug)]
pub struct SchemaRegistry {
    enums: HashMap<String, Arc<EnumDescriptor>>,
    messages: HashMap<String, Arc<MessageDescriptor>>,
    services: HashMap<String, Arc<ServiceDescriptor>>,
    methods_by_path: HashMap<String, (Arc<ServiceDescriptor>, usize)>,
    methods_by_id: HashMap<MethodId, (Arc<ServiceDescriptor>, usize)>,
}

impl SchemaRegistry {
    pub fn enum_by_name(&self, name: &str) -> Option<&Arc<EnumDescriptor>> {
        self.enums.get(name)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.messages.get(name)
    }

    pub fn service_by_name(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.services.get(name)
    }

    /// Resolve a method by wire path `"<service>/<method>"`.
    pub fn method_by_path(&self, path: &str) -> Option<(&Arc<ServiceDescriptor>, &MethodDescriptor)> {
        self.methods_by_path
            .get(path)
            .map(|(service, position)| (service, &service.methods()[*position]))
    }

    /// Resolve a method by composite identifier. Resolves to the same method
    /// as the path form.
    pub fn method_by_id(&self, id: MethodId) -> Option<(&Arc<ServiceDescriptor>, &MethodDescriptor)> {
        self.methods_by_id
            .get(&id)
            .map(|(service, position)| (service, &service.methods()[*position]))
    }

    pub fn enum_count(&self) -> usize {
        self.enums.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind, ScalarKind};

    fn sample_registry() -> SchemaRegistry {
        let req = MessageDescriptor::new(
            "InfoReq",
            vec![FieldDescriptor::nullable(
                "user_id",
                0,
                FieldKind::Scalar(ScalarKind::Int64),
            )],
        )
        .unwrap();
        let resp = MessageDescriptor::new(
            "InfoResp",
            vec![FieldDescriptor::required(
                "name",
                0,
                FieldKind::Scalar(ScalarKind::String),
            )],
        )
        .unwrap();
        let svc = ServiceDescriptor::new(
            "user_server",
            1,
            vec![MethodDescriptor::new(
                "get_info",
                0,
                req.clone(),
                resp.clone(),
            )],
        )
        .unwrap();
        SchemaRegistryBuilder::new()
            .register_message(req)
            .unwrap()
            .register_message(resp)
            .unwrap()
            .register_service(svc)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_and_id_resolve_same_method() {
        let registry = sample_registry();
        let (_, by_path) = registry.method_by_path("user_server/get_info").unwrap();
        let (_, by_id) = registry.method_by_id(MethodId::compose(1, 0)).unwrap();
        assert_eq!(by_path.name(), by_id.name());
        assert_eq!(by_path.local_id(), by_id.local_id());
    }

    #[test]
    fn test_unknown_lookups_return_none() {
        let registry = sample_registry();
        assert!(registry.method_by_path("user_server/missing").is_none());
        assert!(registry.method_by_id(MethodId::compose(9, 9)).is_none());
        assert!(registry.message_by_name("Nope").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let msg = MessageDescriptor::new("M", vec![]).unwrap();
        let result = SchemaRegistryBuilder::new()
            .register_message(msg.clone())
            .unwrap()
            .register_message(msg);
        assert!(matches!(
            result,
            Err(SchemaError::DuplicateRegistration { .. })
        ));
    }
}
