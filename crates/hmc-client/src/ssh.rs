//! SSH remote shell
//!
//! One russh connection per host, opened by the first command and kept until
//! [`RemoteShell::close`]. Authentication is by password and the server key
//! must already be recorded in `~/.ssh/known_hosts`. Files are pushed with the
//! scp sink protocol over an exec channel, which the restricted `padmin`
//! shell allows.

use crate::error::HmcError;
use crate::hmc_trait::RemoteShell;
use crate::parser;
use cli_runner::CommandOutput;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const SSH_PORT: u16 = 22;

/// Bound on one remote command, connecting included
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Bound on one upload; the discovery image is around 1 GiB
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Where and as whom to connect
#[derive(Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Accepts only server keys present in the user's `known_hosts`
struct KnownHosts {
    host: String,
    port: u16,
}

#[async_trait::async_trait]
impl client::Handler for KnownHosts {
    type Error = HmcError;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) => Err(HmcError::HostKey {
                host: self.host.clone(),
                reason: "not present in known_hosts".to_string(),
            }),
            Err(e) => Err(HmcError::HostKey {
                host: self.host.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Long-lived SSH session to one host
pub struct SshSession {
    target: SshTarget,
    config: Arc<client::Config>,
    connection: Mutex<Option<Handle<KnownHosts>>>,
}

impl std::fmt::Debug for SshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSession")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl SshSession {
    /// Prepare a session; the connection itself is opened by the first command
    pub fn new(target: SshTarget) -> Self {
        Self {
            target,
            config: Arc::new(client::Config::default()),
            connection: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Handle<KnownHosts>, HmcError> {
        let checker = KnownHosts {
            host: self.target.host.clone(),
            port: self.target.port,
        };
        let mut handle = client::connect(
            Arc::clone(&self.config),
            (self.target.host.as_str(), self.target.port),
            checker,
        )
        .await?;

        let accepted = handle
            .authenticate_password(self.target.username.as_str(), self.target.password.as_str())
            .await?;
        if !accepted {
            return Err(HmcError::Authentication {
                host: self.target.host.clone(),
                username: self.target.username.clone(),
            });
        }
        info!(host = %self.target.host, user = %self.target.username, "SSH session established");
        Ok(handle)
    }

    /// New session channel, reconnecting if the previous connection dropped
    async fn open_channel(&self) -> Result<Channel<Msg>, HmcError> {
        let mut connection = self.connection.lock().await;
        let handle = match connection.take() {
            Some(handle) if !handle.is_closed() => handle,
            _ => self.connect().await?,
        };
        let channel = handle.channel_open_session().await;
        *connection = Some(handle);
        Ok(channel?)
    }

    async fn bounded<T, F>(&self, operation: &str, timeout: Duration, work: F) -> Result<T, HmcError>
    where
        F: Future<Output = Result<T, HmcError>>,
    {
        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_elapsed| HmcError::Timeout {
                host: self.target.host.clone(),
                operation: operation.to_string(),
                timeout,
            })?
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, HmcError> {
        let mut channel = self.open_channel().await?;
        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut status = None;
        while let Some(message) = channel.wait().await {
            match message {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => status = i32::try_from(exit_status).ok(),
                _ => {}
            }
        }
        Ok(CommandOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn push(&self, local: &Path, remote_path: &str) -> Result<(), HmcError> {
        let (directory, file_name) = remote_path
            .rsplit_once('/')
            .filter(|(_, name)| !name.is_empty())
            .ok_or_else(|| HmcError::InvalidPath(remote_path.to_string()))?;
        let directory = if directory.is_empty() { "/" } else { directory };
        let file = tokio::fs::File::open(local).await?;
        let size = file.metadata().await?.len();

        let mut channel = self.open_channel().await?;
        channel.exec(true, format!("scp -qt {directory}")).await?;
        read_ack(&mut channel, remote_path).await?;
        channel
            .data(format!("C0644 {size} {file_name}\n").as_bytes())
            .await?;
        read_ack(&mut channel, remote_path).await?;
        channel.data(file).await?;
        channel.data(&[0u8][..]).await?;
        read_ack(&mut channel, remote_path).await?;
        channel.eof().await?;
        Ok(())
    }
}

/// Wait for the scp sink's next acknowledgement
async fn read_ack(channel: &mut Channel<Msg>, remote_path: &str) -> Result<(), HmcError> {
    let transfer_error = |message: String| HmcError::Transfer {
        remote_path: remote_path.to_string(),
        message,
    };
    while let Some(message) = channel.wait().await {
        match message {
            ChannelMsg::Data { ref data } => return parser::parse_scp_ack(data, remote_path),
            ChannelMsg::ExtendedData { ref data, .. } => {
                return Err(transfer_error(String::from_utf8_lossy(data).trim().to_string()));
            }
            ChannelMsg::ExitStatus { exit_status } => {
                return Err(transfer_error(format!("scp exited with status {exit_status}")));
            }
            _ => {}
        }
    }
    Err(transfer_error("channel closed before acknowledgement".to_string()))
}

#[async_trait::async_trait]
impl RemoteShell for SshSession {
    fn host(&self) -> &str {
        &self.target.host
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput, HmcError> {
        debug!(host = %self.target.host, "ssh: {}", command);
        let output = self.bounded(command, COMMAND_TIMEOUT, self.run(command)).await?;
        if !output.success() {
            return Err(HmcError::CommandFailed {
                host: self.target.host.clone(),
                command: command.to_string(),
                status: output.status_text(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), HmcError> {
        debug!(host = %self.target.host, "scp {} -> {}", local.display(), remote_path);
        let operation = format!("copy to {remote_path}");
        self.bounded(&operation, UPLOAD_TIMEOUT, self.push(local, remote_path))
            .await
    }

    async fn close(&self) -> Result<(), HmcError> {
        let Some(handle) = self.connection.lock().await.take() else {
            return Ok(());
        };
        debug!(host = %self.target.host, "closing SSH session");
        handle.disconnect(Disconnect::ByApplication, "", "en").await?;
        Ok(())
    }
}
