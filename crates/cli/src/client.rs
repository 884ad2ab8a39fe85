// SPDX-License-Identifier: MIT

//! Thin synchronous client over `rdt_daemon`'s IPC protocol: one line out,
//! one line back, over the Unix socket the daemon already owns.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use rdt_daemon::{env, Request, Response, StateDir};

use crate::error::ClientError;

pub struct DaemonClient {
    stream: UnixStream,
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn connect(state_dir: Option<PathBuf>) -> Result<Self, ClientError> {
        let dir = StateDir::new(state_dir.unwrap_or_else(env::state_dir));
        let socket_path = dir.socket_path();
        let stream = UnixStream::connect(&socket_path)
            .map_err(|_| ClientError::NotRunning(socket_path.clone()))?;
        Ok(Self { stream, socket_path })
    }

    pub fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;

        let mut reader = BufReader::new(&self.stream);
        let mut response_line = String::new();
        let n = reader.read_line(&mut response_line)?;
        if n == 0 {
            return Err(ClientError::NotRunning(self.socket_path.clone()));
        }
        Ok(serde_json::from_str(response_line.trim_end())?)
    }
}
