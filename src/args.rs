// 该文件是 Xunshi （巡视） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use clap::Args;

use crate::config::{Config, ConfigError};

/// 两种运行模式共用的参数，命令行优先于配置文件
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
  /// TOML 配置文件路径
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub model: Option<PathBuf>,

  /// 标签文件路径（每行一个类别）
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub threshold: Option<f32>,

  /// MQTT 代理地址
  #[arg(long, value_name = "HOST")]
  pub broker: Option<String>,

  /// MQTT 代理端口
  #[arg(long, value_name = "PORT")]
  pub port: Option<u16>,

  /// MQTT 基础主题
  #[arg(long, value_name = "TOPIC")]
  pub topic: Option<String>,

  /// 标签文字使用的 TTF 字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

impl CommonArgs {
  /// 读取配置文件（若有）并叠加命令行参数
  pub fn load_config(&self) -> Result<Config, ConfigError> {
    let mut config = Config::load(self.config.as_deref())?;
    self.apply(&mut config);
    Ok(config)
  }

  pub fn apply(&self, config: &mut Config) {
    if let Some(model) = &self.model {
      config.model.path = model.clone();
    }
    if let Some(labels) = &self.labels {
      config.model.labels = labels.clone();
    }
    if let Some(threshold) = self.threshold {
      config.model.threshold = threshold;
    }
    if let Some(broker) = &self.broker {
      config.mqtt.broker = broker.clone();
    }
    if let Some(port) = self.port {
      config.mqtt.port = port;
    }
    if let Some(topic) = &self.topic {
      config.mqtt.topic = topic.clone();
    }
    if let Some(font) = &self.font {
      config.output.font_path = Some(font.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_defaults() {
    let args = CommonArgs {
      threshold: Some(0.25),
      broker: Some("mqtt.local".to_string()),
      ..Default::default()
    };
    let config = args.load_config().unwrap();
    assert_eq!(config.model.threshold, 0.25);
    assert_eq!(config.mqtt.broker, "mqtt.local");
    assert_eq!(config.mqtt.port, 1883);
  }
}
