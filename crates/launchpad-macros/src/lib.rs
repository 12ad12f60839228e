//! Procedural macros for the Launchpad product launcher.
//!
//! This crate provides:
//!
//! - `#[register_launcher(...)]` - Registers a launcher type for a product / launch mode
//! - `#[derive(LauncherConfig)]` - Generates configuration field metadata
//!
//! Both expand to paths under `::launchpad_core`; use them through
//! `launchpad_core` or the `launchpad` facade rather than directly.

mod config;
mod register;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Registers a launcher type in the link-time plugin registry.
///
/// # Attributes
///
/// - `product = "..."` - Product name (required)
/// - `mode = "..."` - Launch mode name
/// - `fallback` - Register under the reserved fallback mode instead of `mode`
///
/// Exactly one of `mode` and `fallback` must be given. The attribute may be
/// applied several times to register one type under several modes.
///
/// # Example
///
/// ```rust,ignore
/// use launchpad_core::register_launcher;
///
/// #[register_launcher(product = "echo", mode = "direct")]
/// #[register_launcher(product = "echo", fallback)]
/// pub struct EchoLauncher {
///     config: EchoConfig,
///     process: Option<DirectProcess>,
/// }
/// ```
#[proc_macro_attribute]
pub fn register_launcher(attr: TokenStream, item: TokenStream) -> TokenStream {
    register::register_launcher(attr, item)
}

/// Derives `LauncherConfig`, collecting field metadata.
///
/// Each named field contributes a `ConfigField` whose description is the
/// field's doc comment. Mark fields that interactive tooling should not ask
/// for with `#[launcher(skip_prompt)]`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, LauncherConfig)]
/// pub struct EchoConfig {
///     /// Port of the HTTP server.
///     #[serde(default)]
///     pub port: u16,
///
///     /// Extra server arguments.
///     #[serde(default)]
///     #[launcher(skip_prompt)]
///     pub args: Vec<String>,
/// }
/// ```
#[proc_macro_derive(LauncherConfig, attributes(launcher))]
pub fn derive_launcher_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    config::derive_launcher_config(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
