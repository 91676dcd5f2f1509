//! CLI arguments and server configuration defaults.

use clap::Parser;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_AUTH_USER: &str = "admin@example.com";
pub const DEFAULT_AUTH_PASS: &str = "admin";
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;
pub const UPLOADS_ROUTE_PREFIX: &str = "/uploads/";

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "uploadbook", version, about = "Upload and record keeping server")]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        env = "UPLOADBOOK_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        short = 'd',
        long,
        env = "UPLOADBOOK_DATA_FILE",
        default_value = DEFAULT_DATA_FILE,
        help = "JSON file holding the record list"
    )]
    pub data_file: String,
    #[arg(
        short = 'u',
        long,
        env = "UPLOADBOOK_UPLOAD_DIR",
        default_value = DEFAULT_UPLOAD_DIR,
        help = "Directory for uploaded files"
    )]
    pub upload_dir: String,
    #[arg(
        long,
        env = "UPLOADBOOK_REQUIRE_AUTH",
        default_value_t = false,
        help = "Require a bearer token on upload and update"
    )]
    pub require_auth: bool,
    #[arg(
        long,
        env = "UPLOADBOOK_AUTH_USER",
        default_value = DEFAULT_AUTH_USER,
        help = "Login email"
    )]
    pub auth_user: String,
    #[arg(
        long,
        env = "UPLOADBOOK_AUTH_PASS",
        default_value = DEFAULT_AUTH_PASS,
        help = "Login password"
    )]
    pub auth_pass: String,
    #[arg(
        long,
        env = "UPLOADBOOK_AUTH_SECRET",
        help = "Token signing secret (random per process when unset)"
    )]
    pub auth_secret: Option<String>,
    #[arg(
        long,
        env = "UPLOADBOOK_TOKEN_TTL_SECS",
        default_value_t = DEFAULT_TOKEN_TTL_SECS,
        help = "Token lifetime in seconds"
    )]
    pub token_ttl_secs: u64,
    #[arg(
        long,
        env = "UPLOADBOOK_MAX_BODY_SIZE",
        default_value_t = DEFAULT_MAX_BODY_SIZE,
        help = "Max request body size in bytes (0 to disable)"
    )]
    pub max_body_size: usize,
}
