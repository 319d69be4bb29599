//! Startup configuration.

use anyhow::Context;
use clap::Parser;
use mcpfs_filesystem::Root;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Sandboxed file-access JSON-RPC server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcpfs", version, about)]
pub struct Config {
    /// Directory all file operations are confined to.
    /// Defaults to the current working directory.
    #[arg(long, env = "MCP_SERVER_ROOT_DIR")]
    pub root: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "MCP_SERVER_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "MCP_SERVER_PORT", default_value_t = 8000)]
    pub port: u16,
}

impl Config {
    /// Canonicalize the configured root directory.
    pub fn root(&self) -> anyhow::Result<Root> {
        let dir = match &self.root {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("failed to read current directory")?,
        };
        Root::new(&dir).with_context(|| format!("invalid root directory {}", dir.display()))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
