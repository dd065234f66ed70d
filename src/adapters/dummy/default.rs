use crate::domain::ports::DummyValueResolver;
use crate::domain::value::{Value, ValueKind};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

pub type DummyFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Creates a fake of the named type, or `None` when it can not be faked.
pub type FakeFactory = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Dummy resolver with registered factories by type name
/// Primitives get their zero value, strings and lists an empty one, and
/// fakeable kinds a fresh fake when a fake factory is installed.
#[derive(Default)]
pub struct DefaultDummyResolver {
    factories: RwLock<HashMap<String, DummyFactory>>,
    fake_factory: RwLock<Option<FakeFactory>>,
}

impl DefaultDummyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_name: impl Into<String>, factory: DummyFactory) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.into(), factory);
    }

    pub fn set_fake_factory(&self, factory: FakeFactory) {
        *self
            .fake_factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(factory);
    }

    fn registered(&self, type_name: &str) -> Option<DummyFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()
    }
}

impl DummyValueResolver for DefaultDummyResolver {
    fn try_create_dummy(&self, kind: &ValueKind) -> Option<Value> {
        match kind {
            ValueKind::Unit | ValueKind::Any => None,
            ValueKind::Bool | ValueKind::Int | ValueKind::Float => Some(kind.default_value()),
            ValueKind::Str => Some(Value::Str(String::new())),
            ValueKind::List => Some(Value::List(Vec::new())),
            ValueKind::Opaque(name) => self.registered(name).map(|f| f()),
            ValueKind::Fake(name) => {
                if let Some(factory) = self.registered(name) {
                    return Some(factory());
                }
                // Cloned out so the factory may re-enter this resolver.
                let fake_factory = self
                    .fake_factory
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                fake_factory.and_then(|f| f(name))
            }
        }
    }
}
