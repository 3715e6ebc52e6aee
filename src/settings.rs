use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::core::converter::DEFAULT_DEADLINE;

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub env: String, // file / server
    pub host: String,
    pub port: u16,
    pub prefix: Option<String>,
    /// Converter binary, default "cwebp"
    pub converter_bin: Option<String>,
    /// Bound on one converter invocation, default 4000
    pub convert_timeout_ms: Option<u64>,
    /// Directory for staged sources and converter outputs, default system temp
    pub temp_dir: Option<String>,
    /// Directory the DirAssetStore persists variants into
    pub asset_dir: Option<String>,
}

impl Config {
    pub fn converter_bin(&self) -> String {
        self.converter_bin
            .clone()
            .unwrap_or_else(|| "cwebp".to_string())
    }

    pub fn convert_deadline(&self) -> Duration {
        self.convert_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEADLINE)
    }

    pub fn asset_dir(&self) -> PathBuf {
        PathBuf::from(self.asset_dir.clone().unwrap_or_else(|| "./assets".to_string()))
    }
}

pub fn get_config() -> Config {
    let env_var = env::var("env").unwrap_or("file".to_string());
    if env_var == "file" {
        info!("using .env file as environtment variable");
        let _ = dotenvy::dotenv();
    } else {
        info!("using server environtment as environtment variable");
    }
    envy::from_env::<Config>().unwrap()
}
