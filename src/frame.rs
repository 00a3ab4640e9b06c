// 该文件是 Xunshi （巡视） 项目的一部分。
// src/frame.rs - 帧定义
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

use image::{RgbImage, imageops::FilterType};

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

impl AsNhwcFrame for RgbImage {
  fn as_nhwc(&self) -> &[u8] {
    self.as_raw()
  }
}

/// 一次采集得到的帧：原始分辨率图像与缩放到模型输入尺寸的图像
#[derive(Debug, Clone)]
pub struct Frame {
  pub original: RgbImage,
  pub resized: RgbImage,
}

impl Frame {
  pub fn new(original: RgbImage, (width, height): (u32, u32)) -> Self {
    let resized = if original.dimensions() == (width, height) {
      original.clone()
    } else {
      image::imageops::resize(&original, width, height, FilterType::Triangle)
    };
    Self { original, resized }
  }

  /// 将模型坐标系（缩放后图像）映射回原始图像的比例
  pub fn scale(&self) -> (f32, f32) {
    (
      self.original.width() as f32 / self.resized.width() as f32,
      self.original.height() as f32 / self.resized.height() as f32,
    )
  }
}

impl AsNhwcFrame for Frame {
  fn as_nhwc(&self) -> &[u8] {
    self.resized.as_nhwc()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn resized_copy_has_model_size() {
    let original = RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]));
    let frame = Frame::new(original, (320, 320));
    assert_eq!(frame.original.dimensions(), (640, 480));
    assert_eq!(frame.resized.dimensions(), (320, 320));
    assert_eq!(frame.as_nhwc().len(), 3 * 320 * 320);
    assert_eq!(frame.scale(), (2.0, 1.5));
  }

  #[test]
  fn nhwc_layout_is_interleaved_rgb() {
    let original = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
    let frame = Frame::new(original, (2, 2));
    assert_eq!(&frame.as_nhwc()[..6], &[1, 2, 3, 1, 2, 3]);
  }
}
