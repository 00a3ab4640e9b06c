// 该文件是 Xunshi （巡视） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

mod http_snapshot;
mod snapshot_file;

pub use self::http_snapshot::{FetchError, HttpSnapshotInput};
pub use self::snapshot_file::{LoadError, SnapshotFileInput, snapshot_path};

/// 帧来源：每次调用采集一帧并缩放到给定尺寸
pub trait Capture {
  type Error;
  fn capture(&self, size: (u32, u32)) -> Result<Frame, Self::Error>;
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("远程获取错误: {0}")]
  Fetch(#[from] FetchError),
  #[error("本地快照错误: {0}")]
  Load(#[from] LoadError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  Http(HttpSnapshotInput),
  SnapshotFile(SnapshotFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "http" | "https" => Ok(InputWrapper::Http(HttpSnapshotInput::from_url(url)?)),
      SnapshotFileInput::SCHEME => Ok(InputWrapper::SnapshotFile(SnapshotFileInput::from_url(
        url,
      )?)),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl InputWrapper {
  /// 与 `from_url` 相同，但 HTTP 来源使用给定的请求超时
  pub fn with_timeout(url: &url::Url, timeout: Duration) -> Result<Self, InputError> {
    match url.scheme() {
      "http" | "https" => Ok(InputWrapper::Http(HttpSnapshotInput::new(
        url.clone(),
        timeout,
      )?)),
      _ => Self::from_url(url),
    }
  }
}

impl Capture for InputWrapper {
  type Error = InputError;

  fn capture(&self, size: (u32, u32)) -> Result<Frame, Self::Error> {
    match self {
      InputWrapper::Http(input) => Ok(input.capture(size)?),
      InputWrapper::SnapshotFile(input) => Ok(input.capture(size)?),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn dispatch_by_scheme() {
    let http = Url::parse("http://localhost:1984/api/frame.jpeg?src=cam").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&http),
      Ok(InputWrapper::Http(_))
    ));

    let file = Url::parse("file:///tmp/snapshot_front.jpg").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&file),
      Ok(InputWrapper::SnapshotFile(_))
    ));

    let rtsp = Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&rtsp),
      Err(InputError::SchemeMismatch(s)) if s == "rtsp"
    ));
  }
}
