use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub avatar_root: PathBuf,
    pub public_url: String,
    pub cookie_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://flowroute.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let avatar_root = env::var("AVATAR_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/avatars"));

        // Reset links in mails point back at the frontend.
        let public_url =
            env::var("APP_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-super-secret-flowroute-cookie".to_string());

        Ok(Self {
            database_url,
            listen_addr,
            avatar_root,
            public_url,
            cookie_secret,
        })
    }
}
