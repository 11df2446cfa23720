use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

/// Addressing for the two-member group-messaging link. Loaded from
/// `<base_directory>/group.toml`, the one piece of colod's configuration with no
/// sensible CLI-flag or compiled-in default -- a cluster's two peer addresses have to
/// come from somewhere external, the same way the original daemon left corosync's own
/// membership addressing to `corosync.conf` rather than its own argv.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Address this instance listens on. Only meaningful for the primary, which
    /// accepts the secondary's connection.
    pub listen: SocketAddr,
    /// Address of the peer's listening socket. Only meaningful for the secondary.
    pub peer: SocketAddr,
}

impl GroupConfig {
    pub fn from_path(path: &Path) -> eyre::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
