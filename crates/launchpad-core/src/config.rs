//! Launcher configuration contract.
//!
//! Every launcher declares exactly one configuration type. The type is a
//! plain serde struct implementing [`LauncherConfig`], usually through
//! `#[derive(LauncherConfig)]`:
//!
//! ```rust,ignore
//! use launchpad_core::LauncherConfig;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, LauncherConfig)]
//! pub struct EchoConfig {
//!     /// Port the server listens on.
//!     #[serde(default)]
//!     pub port: u16,
//!
//!     /// Extra arguments, rarely changed.
//!     #[serde(default)]
//!     #[launcher(skip_prompt)]
//!     pub args: Vec<String>,
//! }
//! ```
//!
//! A configuration is *default-constructible* when it deserializes from an
//! empty JSON object, i.e. when every field carries `#[serde(default)]`.
//!
//! At runtime, configurations travel type-erased as [`ErasedConfig`] and the
//! registered type is described by a [`ConfigType`]. Type identity is always
//! checked through [`TypeId`]; a value is never coerced into another type.

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{LaunchError, LaunchResult};

// =============================================================================
// Field metadata
// =============================================================================

/// Description of one configuration field, used by interactive tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigField {
    /// Field name as it appears in the serialized configuration.
    pub name: &'static str,
    /// Human-readable description, taken from the field's doc comment.
    pub description: Option<&'static str>,
    /// Whether tooling should skip prompting for this field.
    pub skip_prompt: bool,
    /// Rust type of the field, as written in the source.
    pub type_name: &'static str,
}

impl ConfigField {
    /// Returns `true` if the field holds text, optionally wrapped in `Option`.
    ///
    /// Command-line values for text fields are taken verbatim instead of
    /// being parsed as JSON.
    pub fn is_text(&self) -> bool {
        let ty = unwrap_option(self.type_name);
        matches!(
            ty.rsplit("::").next(),
            Some("String" | "PathBuf" | "OsString")
        )
    }
}

fn unwrap_option(ty: &str) -> &str {
    if let Some((head, rest)) = ty.split_once('<') {
        if head.rsplit("::").next() == Some("Option") {
            if let Some(inner) = rest.strip_suffix('>') {
                return inner;
            }
        }
    }
    ty
}

// =============================================================================
// LauncherConfig
// =============================================================================

/// Trait implemented by launcher configuration types.
pub trait LauncherConfig:
    Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static
{
    /// Field metadata. Empty unless generated by `#[derive(LauncherConfig)]`.
    fn fields() -> Vec<ConfigField> {
        Vec::new()
    }

    /// Default-constructs the configuration, if every field has a default.
    fn try_default() -> Option<Self> {
        serde_json::from_value(Value::Object(Map::new())).ok()
    }
}

// =============================================================================
// ErasedConfig
// =============================================================================

/// Object-safe view of a [`LauncherConfig`] value.
///
/// Implemented for every `LauncherConfig`; the concrete type is recovered
/// with [`downcast_ref`](dyn ErasedConfig::downcast_ref).
pub trait ErasedConfig: Any + Debug + Send + Sync {
    /// Returns `self` as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete configuration type.
    fn type_name(&self) -> &'static str;

    /// Serializes the configuration to a JSON value.
    fn to_value(&self) -> serde_json::Result<Value>;
}

impl<C: LauncherConfig> ErasedConfig for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl dyn ErasedConfig {
    /// Returns `true` if the concrete type is `C`.
    pub fn is<C: LauncherConfig>(&self) -> bool {
        self.as_any().type_id() == TypeId::of::<C>()
    }

    /// Downcasts to the concrete configuration type.
    pub fn downcast_ref<C: LauncherConfig>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    /// Downcasts to `C`, reporting a [`LaunchError::TypeMismatch`] on failure.
    pub fn expect_type<C: LauncherConfig>(&self) -> LaunchResult<&C> {
        self.downcast_ref::<C>().ok_or(LaunchError::TypeMismatch {
            expected: std::any::type_name::<C>(),
            found: self.type_name(),
        })
    }
}

/// Shared, type-erased configuration value.
pub type SharedConfig = Arc<dyn ErasedConfig>;

// =============================================================================
// ConfigType
// =============================================================================

/// Runtime description of a registered configuration type.
///
/// Built by [`ConfigType::of`] in constant context so it can live inside a
/// static [`LauncherDescriptor`](crate::LauncherDescriptor).
#[derive(Clone, Copy)]
pub struct ConfigType {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    fields: fn() -> Vec<ConfigField>,
    default: fn() -> Option<SharedConfig>,
    deserialize: fn(Value) -> serde_json::Result<SharedConfig>,
}

impl ConfigType {
    /// Describes the configuration type `C`.
    pub const fn of<C: LauncherConfig>() -> Self {
        Self {
            type_id: TypeId::of::<C>,
            type_name: std::any::type_name::<C>,
            fields: C::fields,
            default: default_erased::<C>,
            deserialize: deserialize_erased::<C>,
        }
    }

    /// The [`TypeId`] of the configuration type.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// The name of the configuration type.
    pub fn name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Field metadata of the configuration type.
    pub fn fields(&self) -> Vec<ConfigField> {
        (self.fields)()
    }

    /// Default-constructs a configuration, if the type allows it.
    pub fn default_config(&self) -> Option<SharedConfig> {
        (self.default)()
    }

    /// Deserializes raw data into a typed configuration.
    pub fn deserialize(&self, value: Value) -> serde_json::Result<SharedConfig> {
        (self.deserialize)(value)
    }

    /// Returns `true` if `config` is an instance of this type.
    pub fn matches(&self, config: &dyn ErasedConfig) -> bool {
        config.as_any().type_id() == self.type_id()
    }

    /// Fails with [`LaunchError::TypeMismatch`] unless `config` is of this type.
    pub fn check(&self, config: &dyn ErasedConfig) -> LaunchResult<()> {
        if self.matches(config) {
            Ok(())
        } else {
            Err(LaunchError::TypeMismatch {
                expected: self.name(),
                found: config.type_name(),
            })
        }
    }
}

impl PartialEq for ConfigType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for ConfigType {}

impl Debug for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConfigType").field(&self.name()).finish()
    }
}

fn default_erased<C: LauncherConfig>() -> Option<SharedConfig> {
    C::try_default().map(|c| Arc::new(c) as SharedConfig)
}

fn deserialize_erased<C: LauncherConfig>(value: Value) -> serde_json::Result<SharedConfig> {
    serde_json::from_value::<C>(value).map(|c| Arc::new(c) as SharedConfig)
}
