// 该文件是 Xunshi （巡视） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;
use tracing::{debug, info};

use crate::{config::ModelConfig, frame::Frame};

/// 推理后端。`infer` 返回后端给出的全部候选框，阈值过滤由 [`run_inference`] 负责
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型要求的输入尺寸 (宽, 高)
  fn input_size(&self) -> (u32, u32);
  fn infer(&self, frame: &Frame) -> Result<DetectResult, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn input_size(&self) -> (u32, u32) {
    (**self).input_size()
  }

  fn infer(&self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    (**self).infer(frame)
  }
}

/// 缩放后图像中的像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
  pub xmin: i32,
  pub ymin: i32,
  pub xmax: i32,
  pub ymax: i32,
}

impl BBox {
  pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
    Self {
      xmin,
      ymin,
      xmax,
      ymax,
    }
  }

  pub fn to_array(self) -> [i32; 4] {
    [self.xmin, self.ymin, self.xmax, self.ymax]
  }
}

impl From<[i32; 4]> for BBox {
  fn from([xmin, ymin, xmax, ymax]: [i32; 4]) -> Self {
    Self::new(xmin, ymin, xmax, ymax)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: BBox,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("推理失败: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型加载错误 {0}: {1}")]
  Io(PathBuf, std::io::Error),
  #[error("模型无效: {0}")]
  Invalid(String),
  #[error("未启用推理加速后端，请使用 `--features rknpu` 编译")]
  BackendDisabled,
}

/// 运行一次前向推理，保留得分不低于 `threshold` 的目标，顺序与后端输出一致
pub fn run_inference<M: Model>(
  model: &M,
  frame: &Frame,
  threshold: f32,
) -> Result<DetectResult, InferenceError> {
  info!("开始推理，置信度阈值: {}", threshold);
  let now = std::time::Instant::now();
  let raw = model
    .infer(frame)
    .map_err(|e| InferenceError::Backend(Box::new(e)))?;
  let candidates = raw.len();
  let items: Vec<DetectItem> = raw
    .items
    .into_vec()
    .into_iter()
    .filter(|item| item.score >= threshold)
    .collect();
  info!(
    "推理完成，耗时: {:.2?}，候选 {} 个，保留 {} 个",
    now.elapsed(),
    candidates,
    items.len()
  );
  debug!("检测结果: {:?}", items);
  Ok(items.into())
}

/// 解析 SSD 风格的后处理输出：
/// 归一化框 `[ymin, xmin, ymax, xmax]`、类别、得分以及有效数量
pub fn decode_ssd_outputs(
  boxes: &[f32],
  classes: &[f32],
  scores: &[f32],
  count: usize,
  (width, height): (u32, u32),
) -> DetectResult {
  let count = count
    .min(boxes.len() / 4)
    .min(classes.len())
    .min(scores.len());
  let (sx, sy) = (width as f32, height as f32);

  (0..count)
    .map(|i| {
      let [ymin, xmin, ymax, xmax] = [
        boxes[4 * i],
        boxes[4 * i + 1],
        boxes[4 * i + 2],
        boxes[4 * i + 3],
      ];
      DetectItem {
        class_id: classes[i].max(0.0) as u32,
        score: scores[i],
        bbox: BBox::new(
          (xmin * sx) as i32,
          (ymin * sy) as i32,
          (xmax * sx) as i32,
          (ymax * sy) as i32,
        ),
      }
    })
    .collect::<Vec<_>>()
    .into()
}

#[cfg(not(feature = "rknpu"))]
mod disabled;
#[cfg(feature = "rknpu")]
mod rknn;

#[cfg(not(feature = "rknpu"))]
pub use self::disabled::Disabled as Accelerator;
#[cfg(feature = "rknpu")]
pub use self::rknn::{RknnDetector as Accelerator, RknnDetectorBuilder, RknnError};

/// 启动时加载模型，失败即终止
pub fn load_model(config: &ModelConfig) -> Result<Accelerator, ModelLoadError> {
  info!("加载模型: {}", config.path.display());
  let now = std::time::Instant::now();
  let model = build_accelerator(config)?;
  let (width, height) = model.input_size();
  info!(
    "模型加载完成，耗时: {:.2?}，输入尺寸: {}x{}",
    now.elapsed(),
    width,
    height
  );
  Ok(model)
}

#[cfg(feature = "rknpu")]
fn build_accelerator(config: &ModelConfig) -> Result<Accelerator, ModelLoadError> {
  RknnDetectorBuilder::new(&config.path)
    .input_size(config.input_width, config.input_height)
    .build()
}

#[cfg(not(feature = "rknpu"))]
fn build_accelerator(_config: &ModelConfig) -> Result<Accelerator, ModelLoadError> {
  Err(ModelLoadError::BackendDisabled)
}
