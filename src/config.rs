// 该文件是 Xunshi （巡视） 项目的一部分。
// src/config.rs - 运行配置
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

const DEFAULT_MQTT_BROKER: &str = "localhost";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTT_CLIENT_ID: &str = "xunshi";
const DEFAULT_MQTT_KEEP_ALIVE_SECS: u64 = 30;
const DEFAULT_BASE_TOPIC: &str = "object_detection/state";
const DEFAULT_CAMERA_URL: &str = "http://localhost:1984/api/frame.jpeg?src=webrtc_camera_achter";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MODEL_PATH: &str = "models/efficientdet_lite0/efficientdet_lite0_320.rknn";
const DEFAULT_LABELS_PATH: &str = "models/efficientdet_lite0/coco_labels.txt";
const DEFAULT_INPUT_SIZE: u32 = 320;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
const DEFAULT_OUTPUT_IMAGE_PATH: &str = "output_with_bboxes.jpg";
const DEFAULT_SNAPSHOT_DIR: &str = "/tmp";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("无法读取配置文件 {0}: {1}")]
  Read(PathBuf, std::io::Error),
  #[error("配置文件格式错误: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("配置项 {0} 不能为空")]
  EmptyPath(&'static str),
  #[error("置信度阈值必须在 0.0 - 1.0 之间, 实际为 {0}")]
  Threshold(f32),
  #[error("模型输入尺寸无效: {0}x{1}")]
  InputSize(u32, u32),
  #[error("摄像头地址无效 {0}: {1}")]
  CameraUrl(String, url::ParseError),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
  pub broker: String,
  pub port: u16,
  pub client_id: String,
  pub keep_alive_secs: u64,
  /// 基础主题，结果与触发主题均由此派生
  pub topic: String,
}

impl Default for MqttConfig {
  fn default() -> Self {
    Self {
      broker: DEFAULT_MQTT_BROKER.to_string(),
      port: DEFAULT_MQTT_PORT,
      client_id: DEFAULT_MQTT_CLIENT_ID.to_string(),
      keep_alive_secs: DEFAULT_MQTT_KEEP_ALIVE_SECS,
      topic: DEFAULT_BASE_TOPIC.to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
  pub path: PathBuf,
  pub labels: PathBuf,
  pub threshold: f32,
  pub input_width: u32,
  pub input_height: u32,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      path: PathBuf::from(DEFAULT_MODEL_PATH),
      labels: PathBuf::from(DEFAULT_LABELS_PATH),
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      input_width: DEFAULT_INPUT_SIZE,
      input_height: DEFAULT_INPUT_SIZE,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
  pub url: String,
  pub timeout_secs: u64,
  /// 服务模式下的快照目录
  pub snapshot_dir: PathBuf,
}

impl Default for CameraConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_CAMERA_URL.to_string(),
      timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
      snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
  /// 单次模式的标注图像路径
  pub image_path: PathBuf,
  /// 服务模式的标注图像目录
  pub directory: PathBuf,
  pub font_path: Option<PathBuf>,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      image_path: PathBuf::from(DEFAULT_OUTPUT_IMAGE_PATH),
      directory: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
      font_path: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  pub mqtt: MqttConfig,
  pub model: ModelConfig,
  pub camera: CameraConfig,
  pub output: OutputConfig,
}

impl Config {
  pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    info!("加载配置文件: {}", path.display());
    let text =
      std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    Self::from_toml_str(&text)
  }

  /// 有配置文件则读取，否则使用默认值
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::from_file(path),
      None => Ok(Self::default()),
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.model.path.as_os_str().is_empty() {
      return Err(ConfigError::EmptyPath("model.path"));
    }
    if self.model.labels.as_os_str().is_empty() {
      return Err(ConfigError::EmptyPath("model.labels"));
    }
    if self.mqtt.broker.is_empty() {
      return Err(ConfigError::EmptyPath("mqtt.broker"));
    }
    if self.mqtt.topic.is_empty() {
      return Err(ConfigError::EmptyPath("mqtt.topic"));
    }
    if !(0.0..=1.0).contains(&self.model.threshold) {
      return Err(ConfigError::Threshold(self.model.threshold));
    }
    if self.model.input_width == 0 || self.model.input_height == 0 {
      return Err(ConfigError::InputSize(
        self.model.input_width,
        self.model.input_height,
      ));
    }
    self.camera_url()?;
    Ok(())
  }

  pub fn camera_url(&self) -> Result<Url, ConfigError> {
    Url::parse(&self.camera.url).map_err(|e| ConfigError::CameraUrl(self.camera.url.clone(), e))
  }

  pub fn input_size(&self) -> (u32, u32) {
    (self.model.input_width, self.model.input_height)
  }
}
