//! Local VM connector
//!
//! Produces [`Computer`] handles for VMs that are directly addressable on
//! the network instead of provisioned through the API. A handle from here
//! carries the local origin flag, so runs against it stream over a direct
//! WebSocket to the VM's tool server.

use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::transport::{DEFAULT_HANDSHAKE_TIMEOUT, connect_and_configure, ws_endpoint};
use teleflow_core::domain::{Computer, ComputerConfig, ComputerOrigin, ComputerStatus};

/// Connects to locally reachable VMs running a tool server
#[derive(Debug, Clone)]
pub struct LocalConnector {
    connect_timeout: Duration,
}

impl Default for LocalConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl LocalConnector {
    /// Creates a connector with the default handshake timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector with a custom handshake timeout
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Connect to a VM's tool server and return a handle for it
    ///
    /// Probes the tool server by completing a full configure handshake
    /// within the timeout; the probe connection is then closed. No remote
    /// provisioning happens and nothing here talks to the API, so deleting
    /// the returned handle is the caller tearing down the VM itself.
    ///
    /// # Arguments
    /// * `host` - Hostname or address of the VM
    /// * `port` - Tool server port
    /// * `config` - Screen and OS configuration the VM should apply
    ///
    /// # Returns
    /// A running [`Computer`] with local origin
    pub async fn connect(&self, host: &str, port: u16, config: ComputerConfig) -> Result<Computer> {
        let tool_server_url = format!("http://{host}:{port}");
        let ws_url = ws_endpoint(&tool_server_url);

        let socket = connect_and_configure(&ws_url, &config, self.connect_timeout).await?;
        drop(socket);
        info!(%tool_server_url, "local VM handshake succeeded");

        Ok(Computer {
            computer_id: Uuid::new_v4().to_string(),
            config,
            tool_server_url,
            vnc_url: None,
            status: ComputerStatus::Running,
            origin: ComputerOrigin::Local,
        })
    }
}
