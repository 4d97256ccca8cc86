//! Read-only method registry and the builder that produces it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::{DispatchConfig, DispatchOptions};
use crate::descriptor::{MethodDecl, MethodDescriptor, ParamDescriptor};
use crate::error::RegistryError;

/// Lookup from full method name to descriptor. Immutable once built.
#[derive(Debug, Default)]
pub struct Registry {
    methods: BTreeMap<String, Arc<MethodDescriptor>>,
}

impl Registry {
    /// Start an empty builder with default settings.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a method by full name.
    pub fn get(&self, full_name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.get(full_name)
    }

    /// Whether a method with this full name is registered.
    pub fn contains(&self, full_name: &str) -> bool {
        self.methods.contains_key(full_name)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Descriptors in full-name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.methods.values()
    }

    /// Full names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// Builder for [`Registry`].
///
/// # Example
///
/// ```rust
/// use rpc_dispatch::{sync_fn, Args, MethodDecl, ParamDecl, Registry};
/// use serde_json::json;
///
/// let registry = Registry::builder()
///     .method(
///         MethodDecl::new("math", "add", sync_fn(|args: Args| {
///             let nums: Vec<i64> = args.parse(0)?;
///             Ok(json!(nums.iter().sum::<i64>()))
///         }))
///         .param(ParamDecl::params().required(true)),
///     )
///     .build()
///     .unwrap();
///
/// assert!(registry.contains("math.add"));
/// ```
pub struct RegistryBuilder {
    separator: String,
    default_required: bool,
    decls: Vec<MethodDecl>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Builder with the default separator and `required = false`.
    pub fn new() -> Self {
        Self {
            separator: DispatchConfig::DEFAULT_SEPARATOR.to_string(),
            default_required: false,
            decls: Vec::new(),
        }
    }

    /// Take the separator and `required` default from dispatch options.
    pub fn from_options(options: &DispatchOptions) -> Self {
        Self::new()
            .separator(options.separator.clone())
            .default_required(options.default_required)
    }

    /// Separator between namespace and method name. Default: `.`
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// `required` for parameters that don't declare it. Default: `false`
    pub fn default_required(mut self, required: bool) -> Self {
        self.default_required = required;
        self
    }

    /// Register one method declaration.
    pub fn method(mut self, decl: MethodDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Register several method declarations.
    pub fn methods(mut self, decls: impl IntoIterator<Item = MethodDecl>) -> Self {
        self.decls.extend(decls);
        self
    }

    /// Build the registry, failing on the first invalid declaration.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut methods = BTreeMap::new();

        for decl in self.decls {
            let descriptor = Self::build_method(decl, &self.separator, self.default_required)?;
            if methods.contains_key(&descriptor.full_name) {
                return Err(RegistryError::DuplicateMethod {
                    full_name: descriptor.full_name,
                });
            }
            debug!(
                "Registered method {} ({} params)",
                descriptor.full_name,
                descriptor.params.len()
            );
            methods.insert(descriptor.full_name.clone(), Arc::new(descriptor));
        }

        Ok(Registry { methods })
    }

    fn build_method(
        decl: MethodDecl,
        separator: &str,
        default_required: bool,
    ) -> Result<MethodDescriptor, RegistryError> {
        if decl.name.is_empty() {
            return Err(RegistryError::EmptyMethodName {
                namespace: decl.namespace,
            });
        }

        let full_name = if decl.namespace.is_empty() {
            decl.name.clone()
        } else {
            format!("{}{}{}", decl.namespace, separator, decl.name)
        };

        let mut seen = HashSet::new();
        let mut params = Vec::with_capacity(decl.params.len());
        for (position, param) in decl.params.into_iter().enumerate() {
            let index = param.index.unwrap_or(position);
            if !seen.insert(index) {
                return Err(RegistryError::DuplicateParamIndex { full_name, index });
            }
            params.push(ParamDescriptor {
                index,
                source: param.source,
                target: param.target,
                required: param.required.unwrap_or(default_required),
                parse: param.parse,
                validate: param.validate,
                transform: param.transform,
            });
        }

        params.sort_by_key(|p| p.index);
        if let Some((expected, found)) = params
            .iter()
            .enumerate()
            .find(|(i, p)| p.index != *i)
            .map(|(i, p)| (i, p.index))
        {
            return Err(RegistryError::NonContiguousParams {
                full_name,
                expected,
                found,
            });
        }

        Ok(MethodDescriptor {
            full_name,
            namespace: decl.namespace,
            name: decl.name,
            params,
            handler: decl.handler,
            response_transform: decl.response_transform,
        })
    }
}
