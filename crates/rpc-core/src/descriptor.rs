//! Method and parameter descriptors.
//!
//! Declarations (`MethodDecl`, `ParamDecl`) are the raw registration input.
//! The registry turns them into immutable descriptors once, at startup.

use std::fmt;
use std::sync::Arc;

use crate::capability::{TransformOptions, ValidationOptions};
use crate::handler::Handler;
use crate::transform::ResponseTransform;

/// Where a parameter's value is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// The whole `params` value.
    Params,
    /// `params[name]`; needs object-shaped params.
    Named(String),
    /// The request id.
    RequestId,
    /// The method name as sent by the caller.
    MethodName,
}

/// Declared target type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    /// Untyped; passes through unless `parse` is requested.
    Any,
    Number,
    String,
    Boolean,
    Date,
    /// Structured data, optionally bound to a named shape.
    Object { shape: Option<String> },
}

impl TargetType {
    /// Structured target without a named shape.
    pub fn object() -> Self {
        TargetType::Object { shape: None }
    }

    /// Structured target of the named shape.
    pub fn shape(name: impl Into<String>) -> Self {
        TargetType::Object {
            shape: Some(name.into()),
        }
    }

    /// Shape name handed to the capabilities, if any.
    pub fn shape_name(&self) -> Option<&str> {
        match self {
            TargetType::Object { shape } => shape.as_deref(),
            _ => None,
        }
    }
}

/// Per-parameter validation toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidateMode {
    /// Follow the global setting.
    #[default]
    Inherit,
    Enabled(ValidationOptions),
    Disabled,
}

/// Parameter declaration as registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub index: Option<usize>,
    pub source: ParamSource,
    pub target: TargetType,
    pub required: Option<bool>,
    pub parse: bool,
    pub validate: ValidateMode,
    pub transform: Option<TransformOptions>,
}

impl ParamDecl {
    fn with_source(source: ParamSource) -> Self {
        Self {
            index: None,
            source,
            target: TargetType::Any,
            required: None,
            parse: false,
            validate: ValidateMode::Inherit,
            transform: None,
        }
    }

    /// The whole params bag.
    pub fn params() -> Self {
        Self::with_source(ParamSource::Params)
    }

    /// Parameter read from `params[name]`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_source(ParamSource::Named(name.into()))
    }

    /// Parameter bound to the request id.
    pub fn request_id() -> Self {
        Self::with_source(ParamSource::RequestId)
    }

    /// Parameter bound to the called method's name.
    pub fn method_name() -> Self {
        Self::with_source(ParamSource::MethodName)
    }

    /// Position in the handler's argument list.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Type the raw value is coerced into.
    pub fn target(mut self, target: TargetType) -> Self {
        self.target = target;
        self
    }

    /// Whether a missing or empty value is rejected.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Parse string values as JSON even without an object target.
    pub fn parse(mut self, parse: bool) -> Self {
        self.parse = parse;
        self
    }

    /// Override the global validation toggle.
    pub fn validate(mut self, mode: ValidateMode) -> Self {
        self.validate = mode;
        self
    }

    /// Transform options for this parameter only.
    pub fn transform(mut self, options: TransformOptions) -> Self {
        self.transform = Some(options);
        self
    }
}

/// Immutable parameter descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub index: usize,
    pub source: ParamSource,
    pub target: TargetType,
    pub required: bool,
    pub parse: bool,
    pub validate: ValidateMode,
    /// `None` falls back to `DispatchOptions::transform_options`.
    pub transform: Option<TransformOptions>,
}

impl ParamDescriptor {
    /// Name used in error messages and `error.data.param`.
    pub fn name(&self) -> &str {
        match &self.source {
            ParamSource::Params => "params",
            ParamSource::Named(name) => name,
            ParamSource::RequestId => "id",
            ParamSource::MethodName => "method",
        }
    }

    /// Kind label used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self.source {
            ParamSource::Params => "params",
            ParamSource::Named(_) => "param",
            ParamSource::RequestId => "request-id",
            ParamSource::MethodName => "method",
        }
    }

    /// Whether this parameter takes the whole params value.
    pub fn is_params_bag(&self) -> bool {
        self.source == ParamSource::Params
    }
}

/// Method declaration as registered.
pub struct MethodDecl {
    pub namespace: String,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub handler: Arc<dyn Handler>,
    pub response_transform: Option<ResponseTransform>,
}

impl MethodDecl {
    /// Declare `namespace<sep>name` served by `handler`.
    pub fn new<H>(namespace: impl Into<String>, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            params: Vec::new(),
            handler: Arc::new(handler),
            response_transform: None,
        }
    }

    /// Append a parameter declaration.
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Override the global response transform for this method.
    pub fn response_transform(mut self, transform: ResponseTransform) -> Self {
        self.response_transform = Some(transform);
        self
    }
}

/// Immutable method descriptor owned by the registry.
pub struct MethodDescriptor {
    pub full_name: String,
    pub namespace: String,
    pub name: String,
    /// Sorted by index; indices are `0..params.len()`.
    pub params: Vec<ParamDescriptor>,
    pub handler: Arc<dyn Handler>,
    pub response_transform: Option<ResponseTransform>,
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("full_name", &self.full_name)
            .field("params", &self.params)
            .field("response_transform", &self.response_transform)
            .finish_non_exhaustive()
    }
}
