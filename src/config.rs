// Command-line and environment configuration

use crate::api::Demo;
use crate::password::PasswordHasher;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "recordstore")]
#[command(about = "Small CRUD REST services over in-memory and SQLite-backed collections")]
#[command(version)]
pub struct Cli {
    /// Path to the store directory (default: current directory)
    #[arg(short, long, env = "RECORDSTORE_PATH", default_value = ".")]
    pub store_path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve one of the demo APIs over HTTP
    Serve {
        /// Which demo to serve
        #[arg(short, long, value_enum, default_value_t = Demo::Bookshelf)]
        demo: Demo,

        /// Address to listen on
        #[arg(short, long, env = "RECORDSTORE_BIND", default_value = "127.0.0.1:5000")]
        bind: String,

        /// PBKDF2 iterations for signup password hashes
        #[arg(long, env = "RECORDSTORE_HASH_ITERATIONS", default_value_t = PasswordHasher::DEFAULT_ITERATIONS)]
        hash_iterations: u32,
    },

    /// Create or upgrade the SQLite schema
    Migrate,
}
