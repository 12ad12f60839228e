//! Locating a vendor product installation by release.
//!
//! Installations announce themselves through environment variables named
//! `<PREFIX><release>`, where the release is three digits `1`-`9`
//! (e.g. `AWP_ROOT242`). Without such a variable, platform-standard
//! candidate directories are probed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Errors returned when no installation can be located.
#[derive(Debug, Error)]
pub enum InstallRootError {
    /// No release was requested and no `<PREFIX><release>` variable is set.
    #[error(
        "no '{prefix}*' environment variable defined; \
         the release needs to be specified explicitly"
    )]
    NoReleaseVariable {
        /// Variable prefix that was searched.
        prefix: String,
    },

    /// The directory named by the release variable does not exist.
    #[error("installation directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    /// None of the candidate directories exists.
    #[error("no installation found for release '{release}', tried: {tried:?}")]
    NotFound {
        /// Requested release.
        release: String,
        /// Candidate directories that were probed.
        tried: Vec<PathBuf>,
    },
}

/// Layout of a vendor installation.
#[derive(Debug, Clone, Copy)]
pub struct InstallRoot<'a> {
    /// Environment variable prefix, e.g. `AWP_ROOT`.
    pub var_prefix: &'a str,
    /// Unix base directories; the release directory `v<release>` is appended.
    pub unix_dirs: &'a [&'a str],
    /// Vendor directory under `%PROGRAMFILES%` on Windows.
    pub windows_dir: &'a str,
}

impl InstallRoot<'_> {
    /// Ansys-style layout.
    pub const ANSYS: InstallRoot<'static> = InstallRoot {
        var_prefix: "AWP_ROOT",
        unix_dirs: &["/usr/ansys_inc", "/ansys_inc"],
        windows_dir: "ANSYS Inc",
    };

    /// Resolves the installation root of `release`, or of the latest release
    /// announced in the environment when `release` is `None`.
    pub fn find(&self, release: Option<&str>) -> Result<PathBuf, InstallRootError> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        self.find_in(&vars, release)
    }

    fn find_in(
        &self,
        vars: &BTreeMap<String, String>,
        release: Option<&str>,
    ) -> Result<PathBuf, InstallRootError> {
        let release = match release {
            Some(release) => release.to_string(),
            None => self.latest_release(vars)?,
        };
        let var_name = format!("{}{release}", self.var_prefix);

        if let Some(root) = vars.get(&var_name) {
            let root = PathBuf::from(root);
            debug!(variable = %var_name, root = %root.display(), "Installation root from environment");
            // Windows requires the announced root to exist; Unix trusts it.
            if cfg!(windows) && !root.exists() {
                return Err(InstallRootError::MissingDirectory(root));
            }
            return Ok(root);
        }

        let tried = self.candidates(vars, &release);
        tried
            .iter()
            .find(|dir| dir.exists())
            .cloned()
            .ok_or(InstallRootError::NotFound { release, tried })
    }

    fn latest_release(&self, vars: &BTreeMap<String, String>) -> Result<String, InstallRootError> {
        vars.keys()
            .filter_map(|key| key.strip_prefix(self.var_prefix))
            .filter(|suffix| suffix.len() == 3 && suffix.chars().all(|c| ('1'..='9').contains(&c)))
            .max()
            .map(str::to_string)
            .ok_or_else(|| InstallRootError::NoReleaseVariable {
                prefix: self.var_prefix.to_string(),
            })
    }

    fn candidates(&self, vars: &BTreeMap<String, String>, release: &str) -> Vec<PathBuf> {
        let version_dir = format!("v{release}");
        if cfg!(windows) {
            let program_files = vars
                .get("PROGRAMFILES")
                .cloned()
                .unwrap_or_else(|| "C:\\Program Files".to_string());
            vec![PathBuf::from(program_files).join(self.windows_dir).join(version_dir)]
        } else {
            self.unix_dirs
                .iter()
                .map(|base| PathBuf::from(base).join(&version_dir))
                .collect()
        }
    }
}

/// Resolves an installation root using the Ansys-style directory layout and
/// the given environment variable prefix.
pub fn find_install_root(var_prefix: &str, release: Option<&str>) -> Result<PathBuf, InstallRootError> {
    InstallRoot {
        var_prefix,
        ..InstallRoot::ANSYS
    }
    .find(release)
}
