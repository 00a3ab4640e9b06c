// 该文件是 Xunshi （巡视） 项目的一部分。
// src/error.rs - 推理周期错误
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

use thiserror::Error;

use crate::{
  input::{FetchError, InputError, LoadError},
  model::InferenceError,
  output::SaveImageFileError,
  publish::MessageDecodeError,
};

/// 单个推理周期的失败原因，在周期边界统一记录，周期随之放弃
#[derive(Error, Debug)]
pub enum CycleError {
  #[error("获取帧失败: {0}")]
  Fetch(#[from] FetchError),
  #[error("读取快照失败: {0}")]
  Load(#[from] LoadError),
  #[error("输入源不支持: {0}")]
  UnsupportedInput(String),
  #[error("{0}")]
  Inference(#[from] InferenceError),
  #[error("触发消息无效: {0}")]
  MessageDecode(#[from] MessageDecodeError),
  #[error("保存标注图像失败: {0}")]
  Save(#[from] SaveImageFileError),
  #[error("结果序列化失败: {0}")]
  Encode(#[from] serde_json::Error),
  #[error("发布结果失败: {0}")]
  Publish(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<InputError> for CycleError {
  fn from(err: InputError) -> Self {
    match err {
      InputError::Fetch(e) => CycleError::Fetch(e),
      InputError::Load(e) => CycleError::Load(e),
      InputError::SchemeMismatch(scheme) => CycleError::UnsupportedInput(scheme),
    }
  }
}

impl CycleError {
  /// 触发消息本身有问题时只需忽略，不算周期失败
  pub fn is_ignorable(&self) -> bool {
    matches!(self, CycleError::MessageDecode(_))
  }
}
