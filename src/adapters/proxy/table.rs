use crate::domain::fake::{FakeObject, ProxyParts};
use crate::domain::ports::{ProxyGenerator, ProxyRequest, ProxyResult};
use crate::domain::types::{MethodInfo, TypeInfo, TypeKind};
use crate::domain::value::Value;
use std::collections::HashMap;

/// Proxy engine that routes calls through a per-type dispatch table.
/// Members that can not be overridden are marked in the table and skip the
/// fake manager at call time.
pub struct TableProxyGenerator;

impl Default for TableProxyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TableProxyGenerator {
    pub fn new() -> Self {
        Self
    }

    fn resolve_constructor_arguments(
        type_info: &TypeInfo,
        arguments: Option<Vec<Value>>,
    ) -> Result<Vec<Value>, String> {
        match &type_info.kind {
            TypeKind::Class { .. } => {
                let arguments = arguments.unwrap_or_default();
                if type_info.constructors().is_empty() && arguments.is_empty() {
                    return Ok(arguments);
                }
                let found = type_info.constructors().iter().any(|ctor| {
                    ctor.parameters.len() == arguments.len()
                        && ctor
                            .parameters
                            .iter()
                            .zip(&arguments)
                            .all(|(p, v)| p.kind.accepts(v))
                });
                if found {
                    Ok(arguments)
                } else {
                    Err(format!(
                        "No constructor of {} matches the passed arguments for constructor.",
                        type_info.name
                    ))
                }
            }
            _ => match arguments {
                Some(args) if !args.is_empty() => Err(format!(
                    "Arguments for constructor specified for {} which is not a class.",
                    type_info.name
                )),
                _ => Ok(Vec::new()),
            },
        }
    }
}

impl ProxyGenerator for TableProxyGenerator {
    fn generate_proxy(&self, request: ProxyRequest) -> ProxyResult {
        let type_info = &request.type_info;
        match &type_info.kind {
            TypeKind::ValueType => {
                return ProxyResult::failure(format!(
                    "The type {} is a value type and can not be proxied.",
                    type_info.name
                ));
            }
            TypeKind::Class { is_sealed: true, .. } => {
                return ProxyResult::failure(format!(
                    "The type {} is sealed and can not be proxied.",
                    type_info.name
                ));
            }
            _ => {}
        }
        if let Some(iface) = request
            .additional_interfaces
            .iter()
            .find(|i| !i.is_interface())
        {
            return ProxyResult::failure(format!(
                "{} is not an interface and can not be implemented by the proxy.",
                iface.name
            ));
        }

        let constructor_arguments =
            match Self::resolve_constructor_arguments(type_info, request.constructor_arguments) {
                Ok(args) => args,
                Err(reason) => return ProxyResult::failure(reason),
            };

        let mut non_interceptable = HashMap::new();
        for method in type_info.all_methods() {
            if let Err(reason) = self.can_intercept(type_info, &method) {
                non_interceptable.insert(method.id.clone(), reason);
            }
        }

        ProxyResult::success(FakeObject::from_parts(ProxyParts {
            type_info: request.type_info.clone(),
            additional_interfaces: request.additional_interfaces,
            manager: request.manager,
            base: request.base,
            non_interceptable,
            constructor_arguments,
        }))
    }

    fn can_intercept(&self, type_info: &TypeInfo, method: &MethodInfo) -> Result<(), String> {
        if method.modifiers.is_extension {
            return Err("Extension methods can not be intercepted since they're static.".to_string());
        }
        if method.modifiers.is_static {
            return Err("Static methods can not be intercepted.".to_string());
        }
        let declared_on_interface = type_info
            .interfaces()
            .iter()
            .any(|i| i.method_by_id(&method.id).is_some());
        if matches!(type_info.kind, TypeKind::Interface | TypeKind::Delegate) || declared_on_interface {
            return Ok(());
        }
        if !method.modifiers.is_virtual || method.modifiers.is_sealed {
            return Err("Non-virtual members can not be intercepted. Only interface members and \
                        virtual, overriding, and abstract members can be intercepted."
                .to_string());
        }
        Ok(())
    }
}
