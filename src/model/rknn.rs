// 该文件是 Xunshi （巡视） 项目的一部分。
// src/model/rknn.rs - RKNN NPU 检测模型
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::{AsNhwcFrame, Frame},
  model::{DetectResult, Model, ModelLoadError, decode_ssd_outputs},
};

const SSD_NUM_INPUTS: u32 = 1;
// boxes, classes, scores, count
const SSD_NUM_OUTPUTS: u32 = 4;

#[derive(Error, Debug)]
pub enum RknnError {
  #[error("RKNN 错误: {0}")]
  Rknn(rknpu::Error),
  #[error("输入大小不匹配: 期望 {0} 字节, 实际 {1} 字节")]
  InputSize(usize, usize),
}

impl From<rknpu::Error> for RknnError {
  fn from(err: rknpu::Error) -> Self {
    RknnError::Rknn(err)
  }
}

fn invalid(msg: &str, e: rknpu::Error) -> ModelLoadError {
  ModelLoadError::Invalid(format!("{}: {}", msg, e))
}

pub struct RknnDetector {
  context: Context,
  input_size: (u32, u32),
}

pub struct RknnDetectorBuilder {
  model_path: PathBuf,
  input_size: (u32, u32),
}

impl RknnDetectorBuilder {
  pub fn new(model_path: &Path) -> Self {
    Self {
      model_path: model_path.to_path_buf(),
      input_size: (320, 320),
    }
  }

  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = (width, height);
    self
  }

  pub fn build(self) -> Result<RknnDetector, ModelLoadError> {
    let model_data = std::fs::read(&self.model_path)
      .map_err(|e| ModelLoadError::Io(self.model_path.clone(), e))?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context =
      Context::new(&model_data, InitFlags::default()).map_err(|e| invalid("无法创建推理上下文", e))?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| invalid("无法获取输出数量", e))?;

    if num_inputs != SSD_NUM_INPUTS || num_outputs != SSD_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        SSD_NUM_INPUTS, SSD_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(ModelLoadError::Invalid(msg));
    }

    let detector = RknnDetector {
      context,
      input_size: self.input_size,
    };
    detector.check_input_size()?;
    Ok(detector)
  }
}

fn nhwc_len((width, height): (u32, u32)) -> usize {
  3 * width as usize * height as usize
}

impl RknnDetector {
  /// 以全零输入试运行一次，输入尺寸与模型不符时在加载阶段失败
  fn check_input_size(&self) -> Result<(), ModelLoadError> {
    let (width, height) = self.input_size;
    let blank = vec![0u8; nhwc_len(self.input_size)];
    self
      .context
      .set_input(0, &blank, TensorFormat::NHWC, TensorType::UInt8)
      .map_err(|e| invalid(&format!("模型不接受 {}x{} 的输入", width, height), e))?;
    self.context.run().map_err(|e| invalid("试运行失败", e))?;

    let output = self
      .context
      .get_outputs()
      .map_err(|e| invalid("无法获取模型输出", e))?;
    let boxes = output
      .get_f32(0)
      .map_err(|e| invalid("无法读取边框输出", e))?;
    if boxes.is_empty() || boxes.len() % 4 != 0 {
      let msg = format!("边框输出长度 {} 不是 4 的倍数", boxes.len());
      error!("{}", msg);
      return Err(ModelLoadError::Invalid(msg));
    }
    debug!("输入尺寸 {}x{} 校验通过", width, height);
    Ok(())
  }
}

impl Model for RknnDetector {
  type Error = RknnError;

  fn input_size(&self) -> (u32, u32) {
    self.input_size
  }

  fn infer(&self, frame: &Frame) -> Result<DetectResult, Self::Error> {
    let expected = nhwc_len(self.input_size);
    let input = frame.as_nhwc();
    if input.len() != expected {
      return Err(RknnError::InputSize(expected, input.len()));
    }

    debug!("设置模型输入");
    self
      .context
      .set_input(0, input, TensorFormat::NHWC, TensorType::UInt8)?;

    debug!("执行模型推理");
    self.context.run()?;

    debug!("获取模型输出");
    let output = self.context.get_outputs()?;
    let boxes = output.get_f32(0)?;
    let classes = output.get_f32(1)?;
    let scores = output.get_f32(2)?;
    let count = output.get_f32(3)?.first().copied().unwrap_or(0.0).max(0.0) as usize;

    Ok(decode_ssd_outputs(
      boxes,
      classes,
      scores,
      count,
      self.input_size,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_model_file_is_an_io_error() {
    let result = RknnDetectorBuilder::new(Path::new("/nonexistent/model.rknn")).build();
    assert!(matches!(result, Err(ModelLoadError::Io(_, _))));
  }

  // 需要 NPU 与真实模型，通过 XUNSHI_RKNN_MODEL 指定
  #[test]
  fn mismatched_input_size_fails_at_load() {
    let Some(path) = std::env::var_os("XUNSHI_RKNN_MODEL") else {
      return;
    };
    let result = RknnDetectorBuilder::new(Path::new(&path))
      .input_size(17, 13)
      .build();
    assert!(matches!(result, Err(ModelLoadError::Invalid(_))));
  }
}
