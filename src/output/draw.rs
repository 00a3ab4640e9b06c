// 该文件是 Xunshi （巡视） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  labels::LabelMap,
  model::{BBox, DetectResult},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const TEXT_COLOR: [u8; 3] = [0, 0, 0];
const BOX_THICKNESS: i32 = 2;

static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件 {0}: {1}")]
  Io(PathBuf, std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
}

pub fn label_text(label: &str, score: f32) -> String {
  format!("{} ({:.2})", label, score)
}

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: FontArc,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    let font = FontArc::try_from_slice(EMBEDDED_FONT).expect("无法加载嵌入的字体文件");
    Self::with_font(font)
  }
}

impl Draw {
  fn with_font(font: FontArc) -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }

  pub fn with_font_file(path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path).map_err(|e| DrawError::Io(path.to_path_buf(), e))?;
    let font =
      FontArc::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.to_path_buf()))?;
    info!("已加载标签字体: {}", path.display());
    Ok(Self::with_font(font))
  }

  /// 未配置字体时使用内置字体
  pub fn from_font_path(path: Option<&Path>) -> Result<Self, DrawError> {
    match path {
      Some(path) => Self::with_font_file(path),
      None => {
        info!("使用内置标签字体");
        Ok(Self::default())
      }
    }
  }

  /// 在原图上原地绘制检测框与标签，`scale` 为模型坐标到原图坐标的比例，返回绘制耗时
  pub fn annotate(
    &self,
    image: &mut RgbImage,
    result: &DetectResult,
    labels: &LabelMap,
    scale: (f32, f32),
  ) -> Duration {
    let now = std::time::Instant::now();
    for item in result.iter() {
      let text = label_text(labels.name(item.class_id), item.score);
      self.draw_bbox_with_label(image, &item.bbox, scale, &text);
    }
    let elapsed = now.elapsed();
    debug!("绘制 {} 个检测框，耗时: {:.2?}", result.len(), elapsed);
    elapsed
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &BBox, scale: (f32, f32), label: &str) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }
    let (sx, sy) = scale;

    let x_min = ((bbox.xmin as f32 * sx).floor() as i32).clamp(0, w - 1);
    let y_min = ((bbox.ymin as f32 * sy).floor() as i32).clamp(0, h - 1);
    let x_max = ((bbox.xmax as f32 * sx).ceil() as i32).clamp(0, w - 1);
    let y_max = ((bbox.ymax as f32 * sy).ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.box_color);

    // 边框加粗，向内收缩
    for thickness in 0..BOX_THICKNESS {
      let x_min_t = (x_min + thickness).min(x_max);
      let y_min_t = (y_min + thickness).min(y_max);
      let x_max_t = (x_max - thickness).max(x_min);
      let y_max_t = (y_max - thickness).max(y_min);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, color);
        image.put_pixel(x as u32, y_max_t as u32, color);
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, color);
        image.put_pixel(x_max_t as u32, y as u32, color);
      }
    }

    // 估算文本大小（粗略估计）
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签放在边框上方，空间不足时贴住图像顶部
    let label_x = x_min;
    let label_y = (y_min - text_height).max(0);
    let label_width = text_width.min(w - label_x).max(0) as u32;
    let label_height = text_height.min(h - label_y).max(0) as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb(self.text_color),
        label_x,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        &self.font,
        label,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;

  fn one_box(bbox: BBox) -> DetectResult {
    vec![DetectItem {
      class_id: 0,
      score: 0.9,
      bbox,
    }]
    .into()
  }

  #[test]
  fn label_text_has_two_decimals() {
    assert_eq!(label_text("person", 0.9), "person (0.90)");
    assert_eq!(label_text("Unknown", 0.456), "Unknown (0.46)");
  }

  #[test]
  fn box_edges_are_drawn_in_place() {
    let mut image = RgbImage::new(64, 64);
    let labels: LabelMap = [(0, "person")].into_iter().collect();
    Draw::default().annotate(
      &mut image,
      &one_box(BBox::new(10, 30, 50, 50)),
      &labels,
      (1.0, 1.0),
    );

    assert_eq!(*image.get_pixel(10, 30), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(30, 31), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(50, 40), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(30, 40), Rgb([0, 0, 0]));
  }

  #[test]
  fn label_is_drawn_above_the_box() {
    let mut image = RgbImage::new(100, 100);
    let labels: LabelMap = [(0, "person")].into_iter().collect();
    Draw::from_font_path(None).unwrap().annotate(
      &mut image,
      &one_box(BBox::new(10, 40, 60, 90)),
      &labels,
      (1.0, 1.0),
    );

    // 标签背景占据 y ∈ [20, 40)，文字颜色与背景不同
    let label_area: Vec<Rgb<u8>> = (20..40)
      .flat_map(|y| (10..100).map(move |x| (x, y)))
      .map(|(x, y)| *image.get_pixel(x, y))
      .collect();
    assert!(label_area.iter().any(|p| *p == Rgb(BOX_COLOR)));
    assert!(label_area.iter().any(|p| *p != Rgb(BOX_COLOR)));
    // 标签左侧与上方保持原样
    assert_eq!(*image.get_pixel(5, 30), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(30, 10), Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_are_scaled_onto_the_original() {
    let mut image = RgbImage::new(128, 128);
    Draw::default().annotate(
      &mut image,
      &one_box(BBox::new(10, 15, 50, 50)),
      &LabelMap::default(),
      (2.0, 2.0),
    );
    assert_eq!(*image.get_pixel(20, 30), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(100, 60), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(60, 60), Rgb([0, 0, 0]));
    assert_eq!(*image.get_pixel(10, 60), Rgb([0, 0, 0]));
  }

  #[test]
  fn out_of_frame_boxes_are_clamped() {
    let mut image = RgbImage::new(32, 32);
    Draw::default().annotate(
      &mut image,
      &one_box(BBox::new(-5, -5, 100, 100)),
      &LabelMap::default(),
      (1.0, 1.0),
    );
    assert_eq!(*image.get_pixel(0, 25), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(31, 25), Rgb(BOX_COLOR));
    assert_eq!(*image.get_pixel(15, 31), Rgb(BOX_COLOR));
  }

  #[test]
  fn invalid_font_is_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"not a font").unwrap();
    assert!(matches!(
      Draw::with_font_file(file.path()),
      Err(DrawError::InvalidFont(_))
    ));
  }
}
