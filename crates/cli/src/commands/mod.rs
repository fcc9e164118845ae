pub mod apps;
pub mod context;
pub mod init;
pub mod intercept;
pub mod lifecycle;
pub mod shim;
pub mod tooling;
pub mod watch;

pub use apps::{apps_command, select_command};
pub use context::{context_command, docs_command};
pub use init::init_command;
pub use intercept::{intercept_disable_command, intercept_enable_command, intercept_status_command};
pub use lifecycle::{lifecycle_command, power_off_command};
pub use shim::shim_install_command;
pub use tooling::{run_tooling_command, ssh_command};
pub use watch::watch_command;

use tracing::debug;

/// Turn a core error into the short message shown to the user
pub(crate) fn user_error(error: lando_dock_core::Error) -> anyhow::Error {
    debug!("{:?}", error);
    anyhow::anyhow!(error.user_message())
}
