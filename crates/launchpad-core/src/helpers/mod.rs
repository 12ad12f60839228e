//! Building blocks for launcher implementations.
//!
//! None of these are required by the lifecycle manager; they cover the
//! chores most launchers share.

mod health;
mod install_root;
mod ports;
mod process;

pub use health::{DEFAULT_CHECK_TIMEOUT, check_tcp};
pub use install_root::{InstallRoot, InstallRootError, find_install_root};
pub use ports::find_free_ports;
pub use process::{DirectProcess, ProcessError};
