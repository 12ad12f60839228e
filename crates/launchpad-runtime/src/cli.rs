//! Command-line interface for managing product configurations.
//!
//! ```text
//! launchpad configure <product> <mode> [--<field>=<value> ...] [--overwrite-default]
//! launchpad configure <product> <mode> --help
//! launchpad list-plugins
//! launchpad show-config
//! launchpad show-config-path
//! ```
//!
//! Values of text fields are taken verbatim; other values are parsed as JSON,
//! falling back to plain strings. The value `default` leaves the field at its
//! default. When standard input is a terminal, `configure` prompts for every
//! field that was not given, except those marked `skip_prompt`.

use std::ffi::OsString;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use launchpad_core::{ConfigField, ConfigType, LaunchError, PluginRegistry};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::load_settings;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging::init_from_config;
use crate::store::ConfigStore;

const DEFAULT_VALUE: &str = "default";
const OVERWRITE_FLAGS: &[&str] = &["--overwrite-default", "--overwrite_default"];
const HELP_FLAGS: &[&str] = &["--help", "-h"];

/// Manage launcher configurations.
#[derive(Debug, Parser)]
#[command(name = "launchpad")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the options for a product and launch mode.
    ///
    /// Fields that are not given are prompted for when standard input is a
    /// terminal. `configure <product> <mode> --help` lists the fields.
    #[command(disable_help_flag = true)]
    Configure {
        /// Product name.
        #[arg(required_unless_present = "help")]
        product: Option<String>,
        /// Launch mode.
        #[arg(required_unless_present = "help")]
        mode: Option<String>,
        /// Make this launch mode the product's default.
        #[arg(long, alias = "overwrite_default")]
        overwrite_default: bool,
        /// Print help, with the launch modes of a product or the fields of a launch mode.
        #[arg(short, long)]
        help: bool,
        /// Configuration fields, as `--<field>=<value>` or `--<field> <value>`.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        fields: Vec<String>,
    },
    /// List the available product and launch mode combinations.
    ListPlugins,
    /// Show the current configuration.
    ShowConfig,
    /// Show the path of the configuration file.
    ShowConfigPath,
}

/// Entry point of the `launchpad` binary.
///
/// Loads the settings, initializes logging, discovers the linked plugins and
/// runs the command given on the process command line.
pub fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    match run_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_main(cli: Cli) -> RuntimeResult<()> {
    let settings = load_settings()?;
    init_from_config(&settings.logging);
    let registry = Arc::new(PluginRegistry::discover()?);
    let store = ConfigStore::from_settings(registry, &settings)?;

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    if stdin.is_terminal() {
        run_interactive(cli, &store, &mut stdin.lock(), &mut out)
    } else {
        run(cli, &store, &mut out)
    }
}

/// Parses `args` (including the program name) and runs the command.
pub fn run_from<I, T>(args: I, store: &ConfigStore, out: &mut dyn Write) -> RuntimeResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|err| RuntimeError::cli(err.to_string()))?;
    run(cli, store, out)
}

/// Runs a parsed command against `store`, writing its output to `out`.
///
/// `configure` uses only the fields given on the command line.
pub fn run(cli: Cli, store: &ConfigStore, out: &mut dyn Write) -> RuntimeResult<()> {
    execute(cli, store, None, out)
}

/// Like [`run`], but `configure` reads the fields that were not given from
/// `input`, prompting on `out`.
pub fn run_interactive(
    cli: Cli,
    store: &ConfigStore,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> RuntimeResult<()> {
    execute(cli, store, Some(input), out)
}

fn execute(
    cli: Cli,
    store: &ConfigStore,
    input: Option<&mut dyn BufRead>,
    out: &mut dyn Write,
) -> RuntimeResult<()> {
    match cli.command {
        Command::Configure {
            product,
            mode,
            overwrite_default,
            help,
            fields,
        } => {
            let args = parse_field_args(&fields)?;
            match (product, mode) {
                (Some(product), Some(mode)) if !help && !args.help => {
                    let overwrite_default = overwrite_default || args.overwrite_default;
                    configure(store, &product, &mode, overwrite_default, args.values, input, out)
                }
                (product, mode) => configure_help(store, product.as_deref(), mode.as_deref(), out),
            }
        }
        Command::ListPlugins => list_plugins(store, out),
        Command::ShowConfig => show_config(store, out),
        Command::ShowConfigPath => {
            let path = store
                .path()
                .ok_or_else(|| RuntimeError::cli("the configuration store has no backing file"))?;
            writeln!(out, "{}", path.display())?;
            Ok(())
        }
    }
}

fn configure(
    store: &ConfigStore,
    product: &str,
    mode: &str,
    overwrite_default: bool,
    values: Vec<(String, String)>,
    input: Option<&mut dyn BufRead>,
    out: &mut dyn Write,
) -> RuntimeResult<()> {
    let config_type = store.registry().resolve_config_type(product, mode)?;

    let value = build_config_value(&config_type, values, input, out)?;
    debug!(product, mode, config = %value, "Configuration from command line");
    let config = config_type
        .deserialize(value)
        .map_err(|source| LaunchError::InvalidConfig {
            product: product.to_string(),
            mode: mode.to_string(),
            source,
        })?;

    store.set_config(product, mode, config, overwrite_default)?;
    store.save()?;
    if let Some(path) = store.path() {
        writeln!(out, "Updated {}", path.display())?;
    }
    Ok(())
}

/// Field arguments of `configure`.
#[derive(Debug, Default, PartialEq)]
struct FieldArgs {
    values: Vec<(String, String)>,
    overwrite_default: bool,
    help: bool,
}

/// Splits `--name=value` / `--name value` pairs. Also picks up the
/// overwrite-default and help flags given after the first field.
fn parse_field_args(args: &[String]) -> RuntimeResult<FieldArgs> {
    let mut parsed = FieldArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if OVERWRITE_FLAGS.contains(&arg.as_str()) {
            parsed.overwrite_default = true;
            continue;
        }
        if HELP_FLAGS.contains(&arg.as_str()) {
            parsed.help = true;
            continue;
        }
        let Some(field) = arg.strip_prefix("--") else {
            return Err(RuntimeError::cli(format!(
                "unexpected argument '{arg}', expected '--<field>=<value>'"
            )));
        };
        let (name, value) = match field.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => {
                let value = iter
                    .next()
                    .ok_or_else(|| RuntimeError::cli(format!("missing value for '--{field}'")))?;
                (field.to_string(), value.clone())
            }
        };
        parsed.values.push((name, value));
    }
    Ok(parsed)
}

/// Overlays the command-line fields on the type's default configuration,
/// then asks `input` for the remaining promptable fields.
fn build_config_value(
    config_type: &ConfigType,
    values: Vec<(String, String)>,
    input: Option<&mut dyn BufRead>,
    out: &mut dyn Write,
) -> RuntimeResult<Value> {
    let known = config_type.fields();
    let mut object = default_object(config_type);
    let mut given = Vec::with_capacity(values.len());

    for (name, raw) in values {
        let name = name.replace('-', "_");
        let field = known.iter().find(|field| field.name == name);
        if field.is_none() && !known.is_empty() {
            return Err(RuntimeError::cli(format!(
                "unknown field '{name}' for {}",
                config_type.name()
            )));
        }
        set_field(&mut object, field, name.clone(), raw);
        given.push(name);
    }

    if let Some(input) = input {
        let missing = known
            .iter()
            .filter(|field| !field.skip_prompt && !given.iter().any(|name| name == field.name));
        for field in missing {
            if !prompt_field(field, &mut object, input, out)? {
                break;
            }
        }
    }
    Ok(Value::Object(object))
}

/// Prompts until `field` has a value. Returns `false` once `input` is exhausted.
fn prompt_field(
    field: &ConfigField,
    object: &mut Map<String, Value>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> RuntimeResult<bool> {
    loop {
        writeln!(out)?;
        writeln!(out, "{}:", field.name)?;
        if let Some(description) = field.description {
            writeln!(out, "    {description}")?;
        }
        match object.get(field.name) {
            Some(default) => write!(out, "[{}]: ", display_value(default))?,
            None => write!(out, ": ")?,
        }
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(false);
        }
        let answer = line.trim();
        if !answer.is_empty() {
            set_field(object, Some(field), field.name.to_string(), answer.to_string());
            return Ok(true);
        }
        if object.contains_key(field.name) {
            return Ok(true);
        }
    }
}

fn set_field(
    object: &mut Map<String, Value>,
    field: Option<&ConfigField>,
    name: String,
    raw: String,
) {
    if raw == DEFAULT_VALUE {
        object.remove(&name);
        return;
    }
    let value = match field {
        Some(field) if field.is_text() => Value::String(raw),
        _ => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
    };
    object.insert(name, value);
}

/// Serialized default configuration, or an empty object.
fn default_object(config_type: &ConfigType) -> Map<String, Value> {
    match config_type.default_config().map(|default| default.to_value()) {
        Some(Ok(Value::Object(object))) => object,
        _ => Map::new(),
    }
}

fn configure_help(
    store: &ConfigStore,
    product: Option<&str>,
    mode: Option<&str>,
    out: &mut dyn Write,
) -> RuntimeResult<()> {
    let mut command = Cli::command();
    if let Some(configure) = command.find_subcommand_mut("configure") {
        writeln!(out, "{}", configure.render_long_help())?;
    }

    let Some(product) = product else {
        return Ok(());
    };
    let Some(mode) = mode else {
        let plugins = store.registry().list_all();
        let modes = plugins
            .get(product)
            .ok_or_else(|| RuntimeError::cli(format!("unknown product '{product}'")))?;
        writeln!(out)?;
        writeln!(out, "Launch modes of {product}:")?;
        for mode in modes.keys() {
            writeln!(out, "  {mode}")?;
        }
        return Ok(());
    };

    let config_type = store.registry().resolve_config_type(product, mode)?;
    let fields = config_type.fields();
    writeln!(out)?;
    if fields.is_empty() {
        writeln!(out, "No documented fields for {product} {mode}.")?;
        return Ok(());
    }

    let defaults = default_object(&config_type);
    let width = fields.iter().map(|field| field.name.len()).max().unwrap_or(0) + 2;
    writeln!(out, "Fields of {product} {mode}:")?;
    for field in &fields {
        let mut line = format!("  --{:<width$}", field.name);
        if let Some(description) = field.description {
            line.push_str(description);
            line.push(' ');
        }
        match defaults.get(field.name) {
            Some(default) => line.push_str(&format!("[default: {}]", display_value(default))),
            None => line.push_str("[required]"),
        }
        if field.skip_prompt {
            line.push_str(" [not prompted]");
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn list_plugins(store: &ConfigStore, out: &mut dyn Write) -> RuntimeResult<()> {
    let plugins = store.registry().list_all();
    if plugins.is_empty() {
        writeln!(out, "No plugins are configured.")?;
        return Ok(());
    }
    for (product, modes) in &plugins {
        writeln!(out, "{product}")?;
        for mode in modes.keys() {
            writeln!(out, "    {mode}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn show_config(store: &ConfigStore, out: &mut dyn Write) -> RuntimeResult<()> {
    for (product, modes) in &store.registry().list_all() {
        writeln!(out, "{product}")?;
        let default_mode = match store.get_default_mode(product, None) {
            Ok(mode) => mode,
            Err(RuntimeError::Launch(err)) if err.is_not_found() => {
                writeln!(out, "    No configuration is set.")?;
                writeln!(out)?;
                continue;
            }
            Err(err) => return Err(err),
        };

        for mode in modes.keys().map(String::as_str) {
            if mode == default_mode {
                writeln!(out, "    {mode} (default)")?;
            } else {
                writeln!(out, "    {mode}")?;
            }

            if !store.is_configured(product, Some(mode))? {
                match store.get_config(product, Some(mode)) {
                    Ok(_) => writeln!(out, "        No configuration is set (uses defaults).")?,
                    Err(RuntimeError::Launch(err)) if err.is_not_found() => {
                        writeln!(out, "        No configuration is set (no defaults available).")?;
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }
            let config = store.get_config(product, Some(mode))?;
            let value = config.to_value().map_err(|source| {
                crate::config::ConfigError::Serialize {
                    product: product.clone(),
                    mode: mode.to_string(),
                    source,
                }
            })?;
            if let Value::Object(fields) = value {
                for (name, value) in fields {
                    writeln!(out, "        {name}: {}", display_value(&value))?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use launchpad_core::{FALLBACK_LAUNCH_MODE, LauncherConfig};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::testing::{PathConfig, PortConfig, registry};

    fn run_args(store: &ConfigStore, args: &[&str]) -> RuntimeResult<String> {
        let mut out = Vec::new();
        let argv = std::iter::once("launchpad").chain(args.iter().copied());
        run_from(argv, store, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(registry(), dir.path().join("config.json"));
        (dir, store)
    }

    #[test]
    fn test_configure_saves_and_reports_path() {
        let (_dir, store) = temp_store();
        let output = run_args(&store, &["configure", "echo", "direct", "--port=8080"]).unwrap();
        assert!(output.starts_with("Updated "));

        let reloaded = ConfigStore::new(registry(), store.path().unwrap());
        let config: PortConfig = reloaded.get_config_typed("echo", None).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_configure_overwrite_default() {
        let (_dir, store) = temp_store();
        run_args(&store, &["configure", "echo", "direct", "--port", "1"]).unwrap();
        run_args(&store, &["configure", "echo", "docker", "--port=2"]).unwrap();
        assert_eq!(store.get_default_mode("echo", None).unwrap(), "direct");

        run_args(&store, &["configure", "echo", "docker", "--port=3", "--overwrite-default"])
            .unwrap();
        assert_eq!(store.get_default_mode("echo", None).unwrap(), "docker");
    }

    #[test]
    fn test_configure_string_and_default_values() {
        let (_dir, store) = temp_store();
        run_args(&store, &["configure", "solver", "grpc", "--binary=/opt/solver"]).unwrap();
        let config: PathConfig = store.get_config_typed("solver", None).unwrap();
        assert_eq!(config.binary, "/opt/solver");

        run_args(&store, &["configure", "echo", "direct", "--port=default"]).unwrap();
        let config: PortConfig = store.get_config_typed("echo", Some("direct")).unwrap();
        assert_eq!(config.port, 0);
    }

    #[test]
    fn test_configure_rejects_bad_input() {
        let (_dir, store) = temp_store();
        let err = run_args(&store, &["configure", "echo", "direct", "--colour=red"]).unwrap_err();
        assert!(matches!(err, RuntimeError::Cli(_)));

        let err = run_args(&store, &["configure", "echo", "direct", "--port=high"]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::InvalidConfig { .. })
        ));

        let err = run_args(&store, &["configure", "solver", "grpc"]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::InvalidConfig { .. })
        ));

        let err = run_args(&store, &["configure", "nope", "direct"]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Launch(LaunchError::PluginNotFound { .. })
        ));
        assert!(!store.path().unwrap().exists());
    }

    #[test]
    fn test_list_plugins_hides_fallback() {
        let store = ConfigStore::in_memory(registry());
        let output = run_args(&store, &["list-plugins"]).unwrap();
        assert_eq!(output, "echo\n    direct\n    docker\n\nsolver\n    grpc\n\n");
    }

    #[test]
    fn test_show_config() {
        let store = ConfigStore::in_memory(registry());
        store
            .set_config_typed("echo", "docker", PortConfig { port: 5 }, false)
            .unwrap();
        let output = run_args(&store, &["show-config"]).unwrap();
        let expected = "\
echo
    direct
        No configuration is set (uses defaults).
        port: 0
    docker (default)
        port: 5

solver
    No configuration is set.

";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_show_config_without_defaults() {
        let store = ConfigStore::in_memory(registry());
        store
            .set_config_typed("solver", "grpc", PathConfig { binary: "b".into() }, false)
            .unwrap();
        let output = run_args(&store, &["show-config"]).unwrap();
        assert!(output.contains("solver\n    grpc (default)\n        binary: b\n"));
    }

    #[test]
    fn test_show_config_path() {
        let (_dir, store) = temp_store();
        let output = run_args(&store, &["show-config-path"]).unwrap();
        assert_eq!(output.trim_end(), store.path().unwrap().display().to_string());

        let store = ConfigStore::in_memory(registry());
        assert!(run_args(&store, &["show-config-path"]).is_err());
    }

    #[test]
    fn test_parse_field_args() {
        let args: Vec<String> = ["--a=1", "--b", "x", "--overwrite_default", "-h"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parsed = parse_field_args(&args).unwrap();
        assert!(parsed.overwrite_default);
        assert!(parsed.help);
        assert_eq!(
            parsed.values,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x".to_string())]
        );
        assert!(parse_field_args(&["--a".to_string()]).is_err());
        assert!(parse_field_args(&["a=1".to_string()]).is_err());
    }

    #[test]
    fn test_configure_text_field_is_not_parsed() {
        let (_dir, store) = temp_store();
        for raw in ["242", "true", "null", "1.0"] {
            let arg = format!("--binary={raw}");
            run_args(&store, &["configure", "solver", "grpc", &arg]).unwrap();
            let config: PathConfig = store.get_config_typed("solver", None).unwrap();
            assert_eq!(config.binary, raw);
        }
    }

    #[test]
    fn test_configure_help_lists_fields() {
        let store = ConfigStore::in_memory(registry());
        let output = run_args(&store, &["configure", "echo", "direct", "--help"]).unwrap();
        assert!(output.contains("Fields of echo direct:"));
        assert!(output.contains("--port"));
        assert!(output.contains("Port to listen on. [default: 0]"));

        let output = run_args(&store, &["configure", "solver", "grpc", "-h"]).unwrap();
        assert!(output.contains("Path to the product binary. [required]"));
    }

    #[test]
    fn test_configure_help_lists_modes() {
        let store = ConfigStore::in_memory(registry());
        let output = run_args(&store, &["configure", "echo", "--help"]).unwrap();
        assert!(output.contains("Launch modes of echo:\n  direct\n  docker\n"));
        assert!(!output.contains(FALLBACK_LAUNCH_MODE));

        let output = run_args(&store, &["configure", "--help"]).unwrap();
        assert!(output.contains("Configure the options for a product and launch mode"));
        assert!(run_args(&store, &["configure", "nope", "--help"]).is_err());
    }

    fn run_with_input(store: &ConfigStore, args: &[&str], input: &str) -> String {
        let argv = std::iter::once("launchpad").chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run_interactive(cli, store, &mut io::Cursor::new(input.as_bytes()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_configure_prompts_for_missing_fields() {
        let (_dir, store) = temp_store();
        let output = run_with_input(&store, &["configure", "solver", "grpc"], "\n/opt/solver\n");
        assert_eq!(output.matches("binary:\n    Path to the product binary.\n: ").count(), 2);
        let config: PathConfig = store.get_config_typed("solver", None).unwrap();
        assert_eq!(config.binary, "/opt/solver");

        let output = run_with_input(&store, &["configure", "echo", "direct"], "\n");
        assert!(output.contains("port:\n    Port to listen on.\n[0]: "));
        let config: PortConfig = store.get_config_typed("echo", Some("direct")).unwrap();
        assert_eq!(config.port, 0);
    }

    #[test]
    fn test_configure_does_not_prompt_for_given_fields() {
        let (_dir, store) = temp_store();
        let output = run_with_input(&store, &["configure", "echo", "direct", "--port=5"], "");
        assert!(output.starts_with("Updated "));
        let config: PortConfig = store.get_config_typed("echo", Some("direct")).unwrap();
        assert_eq!(config.port, 5);
    }

    #[derive(Debug, Clone, Serialize, Deserialize, LauncherConfig)]
    struct TuningConfig {
        /// Number of workers.
        #[serde(default)]
        workers: u32,
        #[serde(default)]
        #[launcher(skip_prompt)]
        flags: Vec<String>,
    }

    #[test]
    fn test_skip_prompt_fields_keep_defaults() {
        let config_type = ConfigType::of::<TuningConfig>();
        let mut out = Vec::new();
        let value = build_config_value(
            &config_type,
            Vec::new(),
            Some(&mut io::Cursor::new(b"4\n".as_slice())),
            &mut out,
        )
        .unwrap();
        assert_eq!(value, serde_json::json!({ "workers": 4, "flags": [] }));

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("workers:"));
        assert!(!output.contains("flags:"));
    }
}
