use std::path::Path;

use serde::Deserialize;

use crate::core::Result;
use crate::transfer::SimulatorConfig;

/// 库配置。没有全局单例，加载后由调用方自己持有
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Config {
    /// 从 TOML 文件加载
    pub async fn load(path: impl AsRef<Path>) -> Result<Config> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&data)?)
    }
}
