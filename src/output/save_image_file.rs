// 该文件是 Xunshi （巡视） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::RgbImage;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
}

/// 服务模式下的标注图像路径: `{dir}/output_with_bboxes_{camera_id}.jpg`
pub fn annotated_image_path(dir: &Path, camera_id: &str) -> PathBuf {
  dir.join(format!("output_with_bboxes_{}.jpg", camera_id))
}

#[derive(Debug, Clone)]
pub struct SaveImageFileOutput {
  path: PathBuf,
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn for_camera(dir: &Path, camera_id: &str) -> Self {
    Self::new(annotated_image_path(dir, camera_id))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn save(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("标注图像已保存: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn camera_output_path() {
    assert_eq!(
      annotated_image_path(Path::new("/tmp"), "front"),
      PathBuf::from("/tmp/output_with_bboxes_front.jpg")
    );
  }

  #[test]
  fn creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let output = SaveImageFileOutput::new(dir.path().join("a/b/out.jpg"));
    output.save(&RgbImage::new(8, 8)).unwrap();
    assert!(output.path().is_file());
  }
}
