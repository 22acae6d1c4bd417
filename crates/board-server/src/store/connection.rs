//! A single RESP connection to the store.

use std::time::Duration;

use board_protocol::{decode_frame, Command, RespValue};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::StoreError;

pub struct RespConnection {
    stream: TcpStream,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    io_timeout: Duration,
}

impl RespConnection {
    pub async fn connect(addr: &str, io_timeout: Duration) -> Result<Self, StoreError> {
        let stream = timeout(io_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| StoreError::Timeout(io_timeout))??;
        stream.set_nodelay(true)?;

        debug!(addr, "connected to store");

        Ok(RespConnection {
            stream,
            read_buffer: BytesMut::with_capacity(16 * 1024),
            write_buffer: BytesMut::with_capacity(1024),
            io_timeout,
        })
    }

    /// Write one command.
    pub async fn send(&mut self, cmd: &Command) -> Result<(), StoreError> {
        self.write_buffer.clear();
        cmd.encode(&mut self.write_buffer);

        let io_timeout = self.io_timeout;
        let write = async {
            self.stream.write_all(&self.write_buffer).await?;
            self.stream.flush().await
        };
        timeout(io_timeout, write)
            .await
            .map_err(|_| StoreError::Timeout(io_timeout))??;
        Ok(())
    }

    /// Read the next complete frame, waiting as long as it takes.
    pub async fn read_frame(&mut self) -> Result<RespValue, StoreError> {
        loop {
            if let Some(frame) = decode_frame(&mut self.read_buffer)? {
                return Ok(frame);
            }

            self.read_buffer.reserve(4096);
            let n = self.stream.read_buf(&mut self.read_buffer).await?;
            if n == 0 {
                return Err(StoreError::Closed);
            }
        }
    }

    /// Send a command and wait (bounded) for its reply.
    ///
    /// An error reply becomes [`StoreError::Rejected`].
    pub async fn request(&mut self, cmd: &Command) -> Result<RespValue, StoreError> {
        self.send(cmd).await?;

        let io_timeout = self.io_timeout;
        let reply = timeout(io_timeout, self.read_frame())
            .await
            .map_err(|_| StoreError::Timeout(io_timeout))??;

        match reply {
            RespValue::Error(msg) => Err(StoreError::Rejected(msg)),
            other => Ok(other),
        }
    }
}
