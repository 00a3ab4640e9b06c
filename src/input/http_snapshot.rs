// 该文件是 Xunshi （巡视） 项目的一部分。
// src/input/http_snapshot.rs - HTTP 摄像头快照输入
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

use std::time::Duration;

use reqwest::{StatusCode, blocking::Client};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, frame::Frame, input::Capture};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("HTTP 请求失败: {0}")]
  Request(#[from] reqwest::Error),
  #[error("获取图像失败，状态码: {0}")]
  Status(u16),
  #[error("图像解码失败: {0}")]
  Decode(#[from] image::ImageError),
}

pub struct HttpSnapshotInput {
  url: Url,
  client: Client,
}

impl FromUrl for HttpSnapshotInput {
  type Error = FetchError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Self::new(url.clone(), DEFAULT_TIMEOUT)
  }
}

impl HttpSnapshotInput {
  pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
    if !matches!(url.scheme(), "http" | "https") {
      error!("URI 方案不匹配: 期望 'http' 或 'https', 实际 '{}'", url.scheme());
      return Err(FetchError::SchemeMismatch(url.scheme().to_string()));
    }
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { url, client })
  }
}

impl Capture for HttpSnapshotInput {
  type Error = FetchError;

  fn capture(&self, size: (u32, u32)) -> Result<Frame, Self::Error> {
    info!("获取摄像头帧: {}", self.url);
    let now = std::time::Instant::now();
    let response = self.client.get(self.url.clone()).send()?;

    let status = response.status();
    if status != StatusCode::OK {
      error!("获取图像失败，状态码: {}", status.as_u16());
      return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.bytes()?;
    debug!("响应大小: {} 字节", body.len());
    let image = image::load_from_memory(&body)?.to_rgb8();
    let frame = Frame::new(image, size);
    info!(
      "帧获取完成 {}x{} -> {}x{}，耗时: {:.2?}",
      frame.original.width(),
      frame.original.height(),
      size.0,
      size.1,
      now.elapsed()
    );
    Ok(frame)
  }
}
