// 该文件是 Xunshi （巡视） 项目的一部分。
// src/input/snapshot_file.rs - 本地快照文件输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame, input::Capture};

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("快照文件不存在: {0}")]
  Missing(PathBuf),
  #[error("读取快照 {0} 失败: {1}")]
  Io(PathBuf, std::io::Error),
  #[error("快照 {0} 解码失败: {1}")]
  Decode(PathBuf, image::ImageError),
}

/// 外部程序按摄像头写入的快照路径: `{dir}/snapshot_{camera_id}.jpg`
pub fn snapshot_path(dir: &Path, camera_id: &str) -> PathBuf {
  dir.join(format!("snapshot_{}.jpg", camera_id))
}

pub struct SnapshotFileInput {
  path: PathBuf,
}

impl FromUrlWithScheme for SnapshotFileInput {
  const SCHEME: &'static str = "file";
}

impl FromUrl for SnapshotFileInput {
  type Error = LoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LoadError::SchemeMismatch);
    }
    Ok(Self::new(url.path()))
  }
}

impl SnapshotFileInput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn for_camera(dir: &Path, camera_id: &str) -> Self {
    Self::new(snapshot_path(dir, camera_id))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Capture for SnapshotFileInput {
  type Error = LoadError;

  fn capture(&self, size: (u32, u32)) -> Result<Frame, Self::Error> {
    if !self.path.is_file() {
      return Err(LoadError::Missing(self.path.clone()));
    }

    info!("读取快照: {}", self.path.display());
    let image = ImageReader::open(&self.path)
      .and_then(|reader| reader.with_guessed_format())
      .map_err(|e| LoadError::Io(self.path.clone(), e))?
      .decode()
      .map_err(|e| LoadError::Decode(self.path.clone(), e))?;

    Ok(Frame::new(image.to_rgb8(), size))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn path_follows_camera_convention() {
    assert_eq!(
      snapshot_path(Path::new("/tmp"), "front"),
      PathBuf::from("/tmp/snapshot_front.jpg")
    );
  }

  #[test]
  fn reads_and_resizes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(64, 48, Rgb([200, 0, 0]))
      .save(snapshot_path(dir.path(), "door"))
      .unwrap();

    let frame = SnapshotFileInput::for_camera(dir.path(), "door")
      .capture((32, 32))
      .unwrap();
    assert_eq!(frame.original.dimensions(), (64, 48));
    assert_eq!(frame.resized.dimensions(), (32, 32));
  }

  #[test]
  fn missing_snapshot_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SnapshotFileInput::for_camera(dir.path(), "garden")
      .capture((32, 32))
      .unwrap_err();
    assert!(matches!(err, LoadError::Missing(_)));
  }

  #[test]
  fn garbage_snapshot_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = snapshot_path(dir.path(), "garage");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();
    let err = SnapshotFileInput::new(&path).capture((32, 32)).unwrap_err();
    assert!(matches!(err, LoadError::Decode(..)));
  }
}
