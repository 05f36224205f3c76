//! CSV feed upload to Petfinder's FTP import server.
//!
//! `suppaftp`'s blocking client runs on the blocking pool. The caller bounds
//! the session with a timeout, and the control socket carries the same
//! timeout so an abandoned session cannot outlive it.

use async_trait::async_trait;
use chrono::Utc;
use std::io::Cursor;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use super::{Batch, Delivery, TransportError, UploadTransport};
use crate::models::results::UploadMethod;

const METHOD: UploadMethod = UploadMethod::Ftp;

pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Remote directory to change into after login.
    pub directory: Option<String>,
}

impl std::fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("directory", &self.directory)
            .finish()
    }
}

impl FtpConfig {
    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect, log in and enter the configured directory. Every socket
    /// operation, the greeting included, fails after `io_timeout`.
    fn open(&self, io_timeout: Duration) -> Result<FtpStream, FtpError> {
        let addr = self
            .addr()
            .to_socket_addrs()
            .map_err(FtpError::ConnectionError)?
            .next()
            .ok_or_else(|| {
                FtpError::ConnectionError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} did not resolve", self.host),
                ))
            })?;

        let stream = TcpStream::connect_timeout(&addr, io_timeout).map_err(FtpError::ConnectionError)?;
        stream
            .set_read_timeout(Some(io_timeout))
            .and_then(|_| stream.set_write_timeout(Some(io_timeout)))
            .map_err(FtpError::ConnectionError)?;

        let mut ftp = FtpStream::connect_with_stream(stream)?;
        ftp.login(&self.user, &self.password)?;
        if let Some(dir) = self.directory.as_deref().filter(|d| !d.is_empty()) {
            ftp.cwd(dir)?;
        }
        Ok(ftp)
    }
}

pub struct FtpTransport {
    config: FtpConfig,
    prefix: String,
    io_timeout: Duration,
}

impl FtpTransport {
    pub fn new(config: FtpConfig, prefix: impl Into<String>) -> Self {
        Self {
            config,
            prefix: prefix.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, FtpError>
    where
        T: Send + 'static,
        F: FnOnce(FtpStream) -> Result<T, FtpError> + Send + 'static,
    {
        let config = self.config.clone();
        let io_timeout = self.io_timeout;
        tokio::task::spawn_blocking(move || op(config.open(io_timeout)?))
            .await
            .map_err(|e| FtpError::ConnectionError(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl UploadTransport for FtpTransport {
    fn method(&self) -> UploadMethod {
        METHOD
    }

    async fn probe(&self) -> Result<(), TransportError> {
        self.blocking(|mut ftp| {
            ftp.pwd()?;
            ftp.quit()
        })
        .await
        .map_err(|e| TransportError::connect(METHOD, e))?;

        tracing::debug!(host = %self.config.host, "FTP probe succeeded");
        Ok(())
    }

    async fn upload(&self, batch: Batch<'_>) -> Result<Delivery, TransportError> {
        let now = Utc::now();
        let name = batch.file_name(&self.prefix, now);
        let body = batch.csv(now).into_bytes();

        let remote = name.clone();
        let written = self
            .blocking(move |mut ftp| {
                ftp.transfer_type(FileType::Binary)?;
                let written = ftp.put_file(&remote, &mut Cursor::new(body))?;
                ftp.quit()?;
                Ok(written)
            })
            .await
            .map_err(|e| TransportError::transfer(METHOD, e))?;

        tracing::info!(
            host = %self.config.host,
            file = %name,
            bytes = written,
            records = batch.records.len(),
            "Uploaded feed via FTP"
        );

        let reference = match self.config.directory.as_deref().filter(|d| !d.is_empty()) {
            Some(dir) => format!("{}/{}", dir.trim_end_matches('/'), name),
            None => name,
        };
        Ok(Delivery {
            remote_id: None,
            reference,
        })
    }
}
