//! CLI argument definitions for the emberstore binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// emberstore in-memory data server
#[derive(Parser, Debug)]
#[command(name = "emberstore")]
#[command(about = "emberstore: in-memory data server with access control")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the emberstore server
    Serve(ServeArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 7878, env = "EMBERSTORE_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "EMBERSTORE_HOST")]
    pub host: String,

    /// Require AUTH before commands are accepted
    #[arg(long, env = "EMBERSTORE_REQUIRE_PASS")]
    pub require_pass: bool,

    /// Password for the default user when authentication is required
    #[arg(long, default_value = "", env = "EMBERSTORE_PASSWORD")]
    pub password: String,

    /// Path to the persisted user file (.json, .yaml, or .yml)
    #[arg(short = 'a', long, env = "EMBERSTORE_ACL_FILE")]
    pub acl_file: Option<PathBuf>,
}
