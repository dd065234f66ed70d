//! Type and method descriptors.
//!
//! These play the role reflection metadata plays elsewhere: the proxy engine
//! generates fakes from a [`TypeInfo`], intercepted calls name a [`MethodInfo`],
//! and matching resolves method identities against the runtime type.

use crate::domain::value::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a method: declaring type plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId {
    pub declaring_type: String,
    pub signature: String,
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.signature)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterDirection {
    In,
    Out,
    Ref,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub kind: ValueKind,
    pub direction: ParameterDirection,
    /// Variadic trailing parameter; its argument is a `Value::List`.
    pub is_param_array: bool,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            direction: ParameterDirection::In,
            is_param_array: false,
        }
    }

    pub fn out(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            direction: ParameterDirection::Out,
            ..Self::new(name, kind)
        }
    }

    pub fn by_ref(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            direction: ParameterDirection::Ref,
            ..Self::new(name, kind)
        }
    }

    /// A `params` array whose elements are of kind `element`.
    pub fn params(name: impl Into<String>, element: ValueKind) -> Self {
        Self {
            is_param_array: true,
            ..Self::new(name, element)
        }
    }

    pub fn is_out(&self) -> bool {
        self.direction == ParameterDirection::Out
    }

    pub fn is_ref(&self) -> bool {
        self.direction == ParameterDirection::Ref
    }

    pub fn is_by_ref(&self) -> bool {
        self.direction != ParameterDirection::In
    }

    /// Kind of the whole argument (a list for `params` arrays).
    pub fn argument_kind(&self) -> ValueKind {
        if self.is_param_array {
            ValueKind::List
        } else {
            self.kind.clone()
        }
    }

    fn signature_part(&self) -> String {
        let prefix = match (self.direction, self.is_param_array) {
            (ParameterDirection::Out, _) => "out ",
            (ParameterDirection::Ref, _) => "ref ",
            (_, true) => "params ",
            _ => "",
        };
        format!("{}{}", prefix, self.kind)
    }
}

/// The call shapes a fake can intercept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    PropertyGetter { property: String },
    PropertySetter { property: String },
    DelegateInvoke,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodModifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_sealed: bool,
    pub is_extension: bool,
    pub is_abstract: bool,
}

impl Default for MethodModifiers {
    fn default() -> Self {
        Self {
            is_static: false,
            is_virtual: true,
            is_sealed: false,
            is_extension: false,
            is_abstract: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: MethodId,
    pub name: String,
    pub member: MemberKind,
    pub parameters: Vec<ParameterInfo>,
    pub return_kind: ValueKind,
    pub generic_parameter_count: usize,
    /// Filled for an instantiated generic method.
    pub generic_arguments: Vec<ValueKind>,
    pub modifiers: MethodModifiers,
}

impl MethodInfo {
    /// A void method with no parameters. The declaring type is filled in when the
    /// method is added to a [`TypeBuilder`].
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: MethodId {
                declaring_type: String::new(),
                signature: String::new(),
            },
            name,
            member: MemberKind::Method,
            parameters: Vec::new(),
            return_kind: ValueKind::Unit,
            generic_parameter_count: 0,
            generic_arguments: Vec::new(),
            modifiers: MethodModifiers::default(),
        }
    }

    pub fn param(mut self, parameter: ParameterInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, kind: ValueKind) -> Self {
        self.return_kind = kind;
        self
    }

    pub fn generic(mut self, parameter_count: usize) -> Self {
        self.generic_parameter_count = parameter_count;
        self
    }

    pub fn non_virtual(mut self) -> Self {
        self.modifiers.is_virtual = false;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.modifiers.is_sealed = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.modifiers.is_static = true;
        self.modifiers.is_virtual = false;
        self
    }

    pub fn extension(mut self) -> Self {
        self.modifiers.is_extension = true;
        self.modifiers.is_static = true;
        self.modifiers.is_virtual = false;
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    /// Close a generic method over concrete type arguments. The identity is kept;
    /// matching compares the arguments separately.
    pub fn instantiate(&self, arguments: Vec<ValueKind>) -> Arc<MethodInfo> {
        let mut instance = self.clone();
        instance.generic_arguments = arguments;
        Arc::new(instance)
    }

    pub fn is_void(&self) -> bool {
        self.return_kind.is_void()
    }

    pub fn property_name(&self) -> Option<&str> {
        match &self.member {
            MemberKind::PropertyGetter { property } | MemberKind::PropertySetter { property } => {
                Some(property)
            }
            _ => None,
        }
    }

    /// Positions of `out` and `ref` parameters, in declaration order.
    pub fn by_ref_positions(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_by_ref())
            .map(|(i, _)| i)
            .collect()
    }

    fn compute_signature(&self) -> String {
        let generic = if self.generic_parameter_count > 0 {
            format!("`{}", self.generic_parameter_count)
        } else {
            String::new()
        };
        let params: Vec<String> = self.parameters.iter().map(|p| p.signature_part()).collect();
        format!("{}{}({})", self.name, generic, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Interface,
    Class { is_sealed: bool, is_abstract: bool },
    Delegate,
    ValueType,
}

#[derive(Debug, Clone)]
pub struct ConstructorInfo {
    pub parameters: Vec<ParameterInfo>,
}

impl ConstructorInfo {
    pub fn signature(&self) -> String {
        let kinds: Vec<String> = self.parameters.iter().map(|p| p.kind.to_string()).collect();
        format!("({})", kinds.join(", "))
    }
}

#[derive(Debug)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    methods: Vec<Arc<MethodInfo>>,
    interfaces: Vec<Arc<TypeInfo>>,
    constructors: Vec<ConstructorInfo>,
    /// Interface method -> implementing method on this type.
    implementations: HashMap<MethodId, MethodId>,
}

impl TypeInfo {
    pub fn interface(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Interface)
    }

    pub fn class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(
            name.into(),
            TypeKind::Class {
                is_sealed: false,
                is_abstract: false,
            },
        )
    }

    pub fn abstract_class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(
            name.into(),
            TypeKind::Class {
                is_sealed: false,
                is_abstract: true,
            },
        )
    }

    pub fn sealed_class(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(
            name.into(),
            TypeKind::Class {
                is_sealed: true,
                is_abstract: false,
            },
        )
    }

    pub fn value_type(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::ValueType)
    }

    /// A delegate type with a single `Invoke` member.
    pub fn delegate(
        name: impl Into<String>,
        parameters: Vec<ParameterInfo>,
        return_kind: ValueKind,
    ) -> Arc<TypeInfo> {
        let mut invoke = MethodInfo::new("Invoke").returns(return_kind);
        invoke.parameters = parameters;
        invoke.member = MemberKind::DelegateInvoke;
        TypeBuilder::new(name.into(), TypeKind::Delegate)
            .method(invoke)
            .build()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class { .. })
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn interfaces(&self) -> &[Arc<TypeInfo>] {
        &self.interfaces
    }

    /// Methods declared on this type only.
    pub fn declared_methods(&self) -> &[Arc<MethodInfo>] {
        &self.methods
    }

    /// Declared methods followed by inherited interface methods.
    pub fn all_methods(&self) -> Vec<Arc<MethodInfo>> {
        let mut out: Vec<Arc<MethodInfo>> = self.methods.clone();
        for iface in &self.interfaces {
            for m in iface.all_methods() {
                if !out.iter().any(|o| o.id == m.id) {
                    out.push(m);
                }
            }
        }
        out
    }

    /// First method with the given name and parameter count.
    pub fn find_method(&self, name: &str, arity: usize) -> Option<Arc<MethodInfo>> {
        self.all_methods()
            .into_iter()
            .find(|m| m.name == name && m.parameters.len() == arity)
    }

    pub fn method_by_id(&self, id: &MethodId) -> Option<Arc<MethodInfo>> {
        self.all_methods().into_iter().find(|m| &m.id == id)
    }

    pub fn getter(&self, property: &str) -> Option<Arc<MethodInfo>> {
        self.all_methods().into_iter().find(|m| {
            matches!(&m.member, MemberKind::PropertyGetter { property: p } if p == property)
        })
    }

    pub fn setter(&self, property: &str) -> Option<Arc<MethodInfo>> {
        self.all_methods().into_iter().find(|m| {
            matches!(&m.member, MemberKind::PropertySetter { property: p } if p == property)
        })
    }

    pub fn delegate_invoke(&self) -> Option<Arc<MethodInfo>> {
        self.methods
            .iter()
            .find(|m| m.member == MemberKind::DelegateInvoke)
            .cloned()
    }

    /// The identity `method` has when invoked on an instance of this type.
    pub fn resolve(&self, method: &MethodId) -> MethodId {
        if let Some(target) = self.implementations.get(method) {
            return target.clone();
        }
        for iface in &self.interfaces {
            let resolved = iface.resolve(method);
            if &resolved != method {
                return self.resolve(&resolved);
            }
        }
        method.clone()
    }

    /// True for this type's own name or any interface it implements.
    pub fn implements(&self, type_name: &str) -> bool {
        self.name == type_name || self.interfaces.iter().any(|i| i.implements(type_name))
    }
}

pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    methods: Vec<MethodInfo>,
    interfaces: Vec<Arc<TypeInfo>>,
    constructors: Vec<ConstructorInfo>,
    explicit: Vec<(MethodId, String)>,
}

impl TypeBuilder {
    fn new(name: String, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            methods: Vec::new(),
            interfaces: Vec::new(),
            constructors: Vec::new(),
            explicit: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// A read/write property: `get_Name` and `set_Name`.
    pub fn property(self, name: &str, kind: ValueKind) -> Self {
        self.read_only_property(name, kind.clone()).method(MethodInfo {
            member: MemberKind::PropertySetter {
                property: name.to_string(),
            },
            ..MethodInfo::new(format!("set_{}", name)).param(ParameterInfo::new("value", kind))
        })
    }

    pub fn read_only_property(self, name: &str, kind: ValueKind) -> Self {
        self.method(MethodInfo {
            member: MemberKind::PropertyGetter {
                property: name.to_string(),
            },
            ..MethodInfo::new(format!("get_{}", name)).returns(kind)
        })
    }

    /// An indexed property (`this[...]`) named `Item`.
    pub fn indexer(self, index: Vec<ParameterInfo>, kind: ValueKind) -> Self {
        let mut getter = MethodInfo::new("get_Item").returns(kind.clone());
        getter.parameters = index.clone();
        getter.member = MemberKind::PropertyGetter {
            property: "Item".to_string(),
        };
        let mut setter = MethodInfo::new("set_Item");
        setter.parameters = index;
        setter.parameters.push(ParameterInfo::new("value", kind));
        setter.member = MemberKind::PropertySetter {
            property: "Item".to_string(),
        };
        self.method(getter).method(setter)
    }

    pub fn implements(mut self, interface: &Arc<TypeInfo>) -> Self {
        self.interfaces.push(Arc::clone(interface));
        self
    }

    pub fn constructor(mut self, parameters: Vec<ParameterInfo>) -> Self {
        self.constructors.push(ConstructorInfo { parameters });
        self
    }

    /// Explicit interface implementation: `interface_method` is implemented by the
    /// declared method named `implementation`.
    pub fn implements_explicitly(mut self, interface_method: &MethodId, implementation: &str) -> Self {
        self.explicit
            .push((interface_method.clone(), implementation.to_string()));
        self
    }

    pub fn build(self) -> Arc<TypeInfo> {
        let methods: Vec<Arc<MethodInfo>> = self
            .methods
            .into_iter()
            .map(|mut m| {
                m.id = MethodId {
                    declaring_type: self.name.clone(),
                    signature: m.compute_signature(),
                };
                Arc::new(m)
            })
            .collect();

        let mut implementations = HashMap::new();
        // Implicit implementation: same signature on the implementing type.
        for iface in &self.interfaces {
            for im in iface.all_methods() {
                if let Some(own) = methods.iter().find(|m| m.id.signature == im.id.signature) {
                    implementations.insert(im.id.clone(), own.id.clone());
                }
            }
        }
        for (interface_method, implementation) in self.explicit {
            if let Some(own) = methods.iter().find(|m| m.name == implementation) {
                implementations.insert(interface_method, own.id.clone());
            }
        }

        Arc::new(TypeInfo {
            name: self.name,
            kind: self.kind,
            methods,
            interfaces: self.interfaces,
            constructors: self.constructors,
            implementations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo_interface() -> Arc<TypeInfo> {
        TypeInfo::interface("IFoo")
            .method(MethodInfo::new("Bar").returns(ValueKind::Int))
            .method(
                MethodInfo::new("Baz")
                    .param(ParameterInfo::new("a", ValueKind::Str))
                    .param(ParameterInfo::out("b", ValueKind::Str)),
            )
            .property("Name", ValueKind::Str)
            .build()
    }

    #[test]
    fn test_signatures_include_direction() {
        let foo = foo_interface();
        let baz = foo.find_method("Baz", 2).unwrap();
        assert_eq!(baz.id.signature, "Baz(string, out string)");
        assert_eq!(baz.id.to_string(), "IFoo.Baz(string, out string)");
        assert_eq!(baz.by_ref_positions(), vec![1]);
    }

    #[test]
    fn test_property_accessors() {
        let foo = foo_interface();
        let getter = foo.getter("Name").unwrap();
        let setter = foo.setter("Name").unwrap();
        assert_eq!(getter.property_name(), Some("Name"));
        assert_eq!(setter.parameters.len(), 1);
        assert_eq!(getter.return_kind, ValueKind::Str);
    }

    #[test]
    fn test_implicit_interface_mapping_resolves_to_class_method() {
        let foo = foo_interface();
        let class = TypeInfo::class("Foo")
            .implements(&foo)
            .method(MethodInfo::new("Bar").returns(ValueKind::Int))
            .build();
        let iface_bar = foo.find_method("Bar", 0).unwrap();
        let class_bar = class.declared_methods()[0].clone();
        assert_ne!(iface_bar.id, class_bar.id);
        assert_eq!(class.resolve(&iface_bar.id), class_bar.id);
        assert_eq!(class.resolve(&class_bar.id), class_bar.id);
    }

    #[test]
    fn test_explicit_interface_mapping() {
        let foo = foo_interface();
        let bar_id = foo.find_method("Bar", 0).unwrap().id.clone();
        let class = TypeInfo::class("Foo")
            .implements(&foo)
            .method(MethodInfo::new("IFoo_Bar").returns(ValueKind::Int))
            .implements_explicitly(&bar_id, "IFoo_Bar")
            .build();
        assert_eq!(class.resolve(&bar_id).signature, "IFoo_Bar()");
    }

    #[test]
    fn test_unmapped_interface_method_resolves_to_itself() {
        let foo = foo_interface();
        let class = TypeInfo::class("Foo").implements(&foo).build();
        let bar = foo.find_method("Bar", 0).unwrap();
        assert_eq!(class.resolve(&bar.id), bar.id);
        assert!(class.implements("IFoo"));
        assert!(class.find_method("Bar", 0).is_some());
    }

    #[test]
    fn test_delegate_has_invoke() {
        let d = TypeInfo::delegate(
            "Func<int, string>",
            vec![ParameterInfo::new("arg", ValueKind::Int)],
            ValueKind::Str,
        );
        let invoke = d.delegate_invoke().unwrap();
        assert_eq!(invoke.member, MemberKind::DelegateInvoke);
        assert_eq!(invoke.id.signature, "Invoke(int)");
    }
}
