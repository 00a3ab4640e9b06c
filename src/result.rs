// 该文件是 Xunshi （巡视） 项目的一部分。
// src/result.rs - 检测结果消息
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

use serde::{Deserialize, Serialize};

use crate::{labels::LabelMap, model::DetectResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
  pub label: String,
  pub score: f32,
  /// [xmin, ymin, xmax, ymax]
  pub bbox: [i32; 4],
}

/// 每个推理周期发布一次的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
  pub objects: Vec<ObjectRecord>,
  pub total_objects: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub camera_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_path: Option<String>,
}

impl DetectionResult {
  pub fn from_detections(result: &DetectResult, labels: &LabelMap) -> Self {
    let objects: Vec<ObjectRecord> = result
      .iter()
      .map(|item| ObjectRecord {
        label: labels.name(item.class_id).to_string(),
        score: item.score,
        bbox: item.bbox.to_array(),
      })
      .collect();
    Self {
      total_objects: objects.len(),
      objects,
      camera_id: None,
      image_path: None,
    }
  }

  pub fn with_camera_id(mut self, camera_id: Option<&str>) -> Self {
    self.camera_id = camera_id.map(str::to_string);
    self
  }

  pub fn with_image_path(mut self, image_path: Option<String>) -> Self {
    self.image_path = image_path;
    self
  }

  pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(self)
  }
}
