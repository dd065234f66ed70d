//! Fake creation: options, constructor resolution and the type registry that
//! lets dummy values be fakes themselves.

use crate::adapters::call_writer::text::TextCallWriter;
use crate::adapters::dummy::default::DefaultDummyResolver;
use crate::adapters::proxy::table::TableProxyGenerator;
use crate::app::fake::Fake;
use crate::app::settings::FakerSettings;
use crate::domain::error::{FakeError, FakeResult};
use crate::domain::fake::{FakeObject, Faked};
use crate::domain::manager::{FakeManager, ManagerSettings};
use crate::domain::ports::{
    BaseImplementation, CallWriter, DummyValueResolver, ProxyGenerator, ProxyRequest,
};
use crate::domain::types::{ConstructorInfo, TypeInfo};
use crate::domain::value::{Value, ValueKind};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::debug;

pub type FakeConfigurer = Arc<dyn Fn(&FakeObject) + Send + Sync>;

/// Per-fake creation options.
#[derive(Clone, Default)]
pub struct FakeOptions {
    strict: Option<bool>,
    base: Option<Arc<dyn BaseImplementation>>,
    calls_base_by_default: bool,
    constructor_arguments: Option<Vec<Value>>,
    additional_interfaces: Vec<Arc<TypeInfo>>,
    configurers: Vec<FakeConfigurer>,
}

impl FakeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unconfigured call fails.
    pub fn strict(mut self) -> Self {
        self.strict = Some(true);
        self
    }

    /// Forward unconfigured calls to `wrapped`.
    pub fn wrapping(mut self, wrapped: impl BaseImplementation + 'static) -> Self {
        self.base = Some(Arc::new(wrapped));
        self.calls_base_by_default = true;
        self
    }

    /// The class's own implementation, reached through `calls_base_method`.
    pub fn with_base(mut self, base: impl BaseImplementation + 'static) -> Self {
        self.base = Some(Arc::new(base));
        self
    }

    /// Forward unconfigured calls to the base implementation.
    pub fn calls_base_methods(mut self) -> Self {
        self.calls_base_by_default = true;
        self
    }

    pub fn with_constructor_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.constructor_arguments = Some(arguments);
        self
    }

    pub fn implements(mut self, interface: &Arc<TypeInfo>) -> Self {
        self.additional_interfaces.push(Arc::clone(interface));
        self
    }

    /// Run `configure` against the new fake before it is handed out.
    pub fn configure(mut self, configure: impl Fn(&FakeObject) + Send + Sync + 'static) -> Self {
        self.configurers.push(Arc::new(configure));
        self
    }
}

struct FakerInner {
    settings: FakerSettings,
    engine: Arc<dyn ProxyGenerator>,
    dummies: Arc<DefaultDummyResolver>,
    writer: Arc<dyn CallWriter>,
    types: RwLock<HashMap<String, Arc<TypeInfo>>>,
}

thread_local! {
    static RESOLVING: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Creates fakes. Clones share settings, registered types and dummy factories.
#[derive(Clone)]
pub struct Faker {
    inner: Arc<FakerInner>,
}

impl Default for Faker {
    fn default() -> Self {
        Self::new()
    }
}

impl Faker {
    pub fn new() -> Self {
        Self::with_settings(FakerSettings::default())
    }

    pub fn with_settings(settings: FakerSettings) -> Self {
        Self::with_engine(settings, Arc::new(TableProxyGenerator::new()))
    }

    pub fn with_engine(settings: FakerSettings, engine: Arc<dyn ProxyGenerator>) -> Self {
        let writer: Arc<dyn CallWriter> = Arc::new(TextCallWriter::new(
            settings.max_displayed_calls,
            settings.collapse_repeated_calls,
        ));
        let inner = Arc::new_cyclic(|weak: &Weak<FakerInner>| {
            let dummies = DefaultDummyResolver::new();
            let weak = weak.clone();
            dummies.set_fake_factory(Arc::new(move |type_name: &str| {
                let inner = weak.upgrade()?;
                Faker { inner }.dummy_fake(type_name)
            }));
            FakerInner {
                settings,
                engine,
                dummies: Arc::new(dummies),
                writer,
                types: RwLock::new(HashMap::new()),
            }
        });
        Self { inner }
    }

    pub fn settings(&self) -> &FakerSettings {
        &self.inner.settings
    }

    /// Make `type_info` (and the interfaces it implements) available by name,
    /// so fakeable return values and constructor arguments can be faked.
    pub fn register_type(&self, type_info: &Arc<TypeInfo>) {
        let mut types = self
            .inner
            .types
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut pending = vec![Arc::clone(type_info)];
        while let Some(t) = pending.pop() {
            pending.extend(t.interfaces().iter().cloned());
            types.entry(t.name.clone()).or_insert(t);
        }
    }

    pub fn type_named(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.inner
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Values of `type_name` used wherever a dummy is needed.
    pub fn register_dummy(
        &self,
        type_name: impl Into<String>,
        factory: impl Fn() -> Value + Send + Sync + 'static,
    ) {
        self.inner.dummies.register(type_name, Arc::new(factory));
    }

    pub fn dummy(&self, kind: &ValueKind) -> Option<Value> {
        self.inner.dummies.try_create_dummy(kind)
    }

    fn dummy_fake(&self, type_name: &str) -> Option<Value> {
        let type_info = self.type_named(type_name)?;
        let entered = RESOLVING.with(|r| r.borrow_mut().insert(type_name.to_string()));
        if !entered {
            return None;
        }
        let fake = self.fake(&type_info);
        RESOLVING.with(|r| r.borrow_mut().remove(type_name));
        fake.ok().map(Value::Fake)
    }

    pub fn fake(&self, type_info: &Arc<TypeInfo>) -> FakeResult<FakeObject> {
        self.fake_with(type_info, FakeOptions::default())
    }

    pub fn fake_with(&self, type_info: &Arc<TypeInfo>, options: FakeOptions) -> FakeResult<FakeObject> {
        self.register_type(type_info);
        let fake = self.create(type_info, &options)?;
        debug!(fake = fake.id(), type_name = %type_info.name, "created fake");
        for configure in &options.configurers {
            configure(&fake);
        }
        Ok(fake)
    }

    /// Create a fake and wrap it in its shim type.
    pub fn fake_shim<S>(&self, type_info: &Arc<TypeInfo>) -> FakeResult<Fake<S>>
    where
        S: Faked + From<FakeObject>,
    {
        self.fake(type_info).map(|f| Fake::new(S::from(f)))
    }

    pub fn fake_shim_with<S>(&self, type_info: &Arc<TypeInfo>, options: FakeOptions) -> FakeResult<Fake<S>>
    where
        S: Faked + From<FakeObject>,
    {
        self.fake_with(type_info, options).map(|f| Fake::new(S::from(f)))
    }

    fn request(
        &self,
        type_info: &Arc<TypeInfo>,
        options: &FakeOptions,
        constructor_arguments: Option<Vec<Value>>,
    ) -> ProxyRequest {
        let settings = ManagerSettings {
            strict: options
                .strict
                .unwrap_or(self.inner.settings.strict_by_default),
            calls_base_by_default: options.calls_base_by_default,
        };
        let dummies: Arc<dyn DummyValueResolver> = self.inner.dummies.clone();
        ProxyRequest {
            type_info: Arc::clone(type_info),
            additional_interfaces: options.additional_interfaces.clone(),
            constructor_arguments,
            manager: FakeManager::new(settings, dummies, Arc::clone(&self.inner.writer)),
            base: options.base.clone(),
        }
    }

    fn create(&self, type_info: &Arc<TypeInfo>, options: &FakeOptions) -> FakeResult<FakeObject> {
        let needs_constructor_search = type_info.is_class()
            && options.constructor_arguments.is_none()
            && !type_info.constructors().is_empty();
        if !needs_constructor_search {
            let request = self.request(type_info, options, options.constructor_arguments.clone());
            let result = self.inner.engine.generate_proxy(request);
            return result.instance.ok_or_else(|| {
                FakeError::Creation(format!(
                    "Failed to create fake of type {}:\n  {}",
                    type_info.name,
                    result
                        .failure_reason
                        .unwrap_or_else(|| "the proxy engine gave no reason".to_string())
                ))
            });
        }

        let mut failures: Vec<(String, String)> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        for constructor in constructor_order(type_info.constructors()) {
            let arguments: Vec<Option<Value>> = constructor
                .parameters
                .iter()
                .map(|p| self.dummy(&p.kind))
                .collect();
            if arguments.iter().any(Option::is_none) {
                unresolved.push(marked_signature(constructor, &arguments));
                continue;
            }
            let arguments: Vec<Value> = arguments.into_iter().flatten().collect();
            let request = self.request(type_info, options, Some(arguments));
            let result = self.inner.engine.generate_proxy(request);
            match result.instance {
                Some(fake) => return Ok(fake),
                None => failures.push((
                    constructor.signature(),
                    result.failure_reason.unwrap_or_default(),
                )),
            }
        }
        Err(FakeError::Creation(creation_message(
            &type_info.name,
            &failures,
            &unresolved,
        )))
    }
}

/// Parameterless first, then widest first.
fn constructor_order(constructors: &[ConstructorInfo]) -> Vec<&ConstructorInfo> {
    let mut ordered: Vec<&ConstructorInfo> = constructors.iter().collect();
    ordered.sort_by_key(|c| match c.parameters.len() {
        0 => (0, 0),
        n => (1, usize::MAX - n),
    });
    ordered
}

fn marked_signature(constructor: &ConstructorInfo, arguments: &[Option<Value>]) -> String {
    let parts: Vec<String> = constructor
        .parameters
        .iter()
        .zip(arguments)
        .map(|(p, a)| match a {
            Some(_) => p.kind.to_string(),
            None => format!("*{}", p.kind),
        })
        .collect();
    format!("({})", parts.join(", "))
}

fn creation_message(type_name: &str, failures: &[(String, String)], unresolved: &[String]) -> String {
    let mut out = format!("Failed to create fake of type {}:\n", type_name);
    if !failures.is_empty() {
        out.push_str("  Below is a list of reasons for failure per attempted constructor:\n");
        for (signature, reason) in failures {
            out.push_str(&format!(
                "    Constructor with signature {} failed:\n      {}\n",
                signature, reason
            ));
        }
    }
    if !unresolved.is_empty() {
        out.push_str("  The following constructors were not tried:\n");
        for signature in unresolved {
            out.push_str(&format!("    {}\n", signature));
        }
        out.push_str(
            "  Types marked with * could not be resolved. Please provide a dummy factory to enable these constructors.\n",
        );
    }
    out
}
