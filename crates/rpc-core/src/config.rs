//! Centralized configuration for the dispatch engine.
//!
//! `DispatchConfig` holds fixed protocol constants; `DispatchOptions` is the
//! runtime configuration handed to the registry builder and dispatcher.

use serde::Deserialize;

use crate::capability::{TransformOptions, ValidationOptions};
use crate::transform::ResponseTransform;

/// Protocol and engine constants.
pub struct DispatchConfig;

impl DispatchConfig {
    pub const PROTOCOL_VERSION: &'static str = "2.0";
    pub const DEFAULT_SEPARATOR: &'static str = ".";
    pub const DEFAULT_MAX_UNWRAP_DEPTH: usize = 64;
    /// Environment variable that selects production mode when set to `production`.
    pub const ENV_VAR: &'static str = "RPC_ENV";
    pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
}

/// Runtime options for building the registry and dispatching requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchOptions {
    /// Joins namespace and method name into the full method name.
    pub separator: String,
    /// `required` value for parameters that don't declare one.
    pub default_required: bool,
    /// Attach kind names and error chains to `error.data`.
    pub development: bool,
    /// Run the validator on every shaped parameter unless it opts out.
    pub enable_validation: bool,
    /// Options for parameters that inherit validation.
    pub validation_options: ValidationOptions,
    /// Run the transform capability on shaped parameters.
    pub use_transformer: bool,
    /// Options for parameters that don't declare their own transform options.
    pub transform_options: TransformOptions,
    /// Reject `[]` and `{}` params before resolving parameters.
    pub reject_empty_params: bool,
    /// Maximum number of deferred results awaited for one call.
    pub max_unwrap_depth: usize,
    /// Global response transform; methods may override it.
    pub response_transform: ResponseTransform,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            separator: DispatchConfig::DEFAULT_SEPARATOR.to_string(),
            default_required: false,
            development: development_from_env(),
            enable_validation: true,
            validation_options: ValidationOptions::default(),
            use_transformer: true,
            transform_options: TransformOptions::default(),
            reject_empty_params: true,
            max_unwrap_depth: DispatchConfig::DEFAULT_MAX_UNWRAP_DEPTH,
            response_transform: ResponseTransform::default(),
        }
    }
}

impl DispatchOptions {
    /// Same as `default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Separator between namespace and method name.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// `required` for parameters that don't declare it.
    pub fn default_required(mut self, required: bool) -> Self {
        self.default_required = required;
        self
    }

    /// Attach kind names and stacks to error data.
    pub fn development(mut self, enable: bool) -> Self {
        self.development = enable;
        self
    }

    /// Validate shaped parameters that don't opt out.
    pub fn enable_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Set the validation options inherited by parameters without their own.
    pub fn validation_options(mut self, options: ValidationOptions) -> Self {
        self.validation_options = options;
        self
    }

    /// Run the transform capability on shaped parameters.
    pub fn use_transformer(mut self, enable: bool) -> Self {
        self.use_transformer = enable;
        self
    }

    /// Set the transform options used by parameters without their own.
    pub fn transform_options(mut self, options: TransformOptions) -> Self {
        self.transform_options = options;
        self
    }

    /// Reject `[]` and `{}` params up front.
    pub fn reject_empty_params(mut self, enable: bool) -> Self {
        self.reject_empty_params = enable;
        self
    }

    /// Bound on deferred results awaited per call.
    pub fn max_unwrap_depth(mut self, depth: usize) -> Self {
        self.max_unwrap_depth = depth;
        self
    }

    /// Transform applied to every JSON result without its own.
    pub fn response_transform(mut self, transform: ResponseTransform) -> Self {
        self.response_transform = transform;
        self
    }
}

/// Development mode is on unless `RPC_ENV=production`.
fn development_from_env() -> bool {
    std::env::var(DispatchConfig::ENV_VAR)
        .map(|v| v != "production")
        .unwrap_or(true)
}
