// 该文件是 Xunshi （巡视） 项目的一部分。
// src/task.rs - 推理任务
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

use tracing::{error, info, warn};

use crate::{
  error::CycleError,
  input::{Capture, SnapshotFileInput},
  labels::LabelMap,
  model::{Model, run_inference},
  output::{Draw, SaveImageFileOutput},
  publish::{Publish, parse_trigger},
  result::DetectionResult,
};

/// 进程内只构造一次的运行上下文，所有周期共享且只读
pub struct Pipeline<M, P> {
  model: M,
  labels: LabelMap,
  draw: Draw,
  threshold: f32,
  publisher: P,
}

/// 单个周期的去向：标注图像路径、结果主题与摄像头编号
pub struct CycleTarget<'a> {
  pub output: SaveImageFileOutput,
  pub topic: &'a str,
  /// 服务模式下设置，结果携带摄像头编号与标注图像路径
  pub camera_id: Option<&'a str>,
}

impl<M: Model, P: Publish> Pipeline<M, P> {
  pub fn new(model: M, labels: LabelMap, draw: Draw, threshold: f32, publisher: P) -> Self {
    Self {
      model,
      labels,
      draw,
      threshold,
      publisher,
    }
  }

  pub fn publisher(&self) -> &P {
    &self.publisher
  }

  /// 采集 → 推理 → 标注 → 发布。任一步失败则整个周期放弃，不发布部分结果
  pub fn run_cycle<C>(
    &self,
    source: &C,
    target: &CycleTarget<'_>,
  ) -> Result<DetectionResult, CycleError>
  where
    C: Capture,
    CycleError: From<C::Error>,
  {
    let now = std::time::Instant::now();
    let mut frame = source.capture(self.model.input_size())?;
    let detections = run_inference(&self.model, &frame, self.threshold)?;

    let image_path = if detections.is_empty() {
      info!("未检测到目标");
      None
    } else {
      let scale = frame.scale();
      let draw_time = self
        .draw
        .annotate(&mut frame.original, &detections, &self.labels, scale);
      info!("检测框绘制完成，耗时: {:.2?}", draw_time);
      target.output.save(&frame.original)?;
      Some(target.output.path().display().to_string())
    };

    let mut result = DetectionResult::from_detections(&detections, &self.labels);
    if let Some(camera_id) = target.camera_id {
      result = result
        .with_camera_id(Some(camera_id))
        .with_image_path(image_path);
    }

    let payload = result.to_json()?;
    self
      .publisher
      .publish(target.topic, payload)
      .map_err(|e| CycleError::Publish(Box::new(e)))?;
    info!(
      "已发布到 {}: {} 个目标，总耗时: {:.2?}",
      target.topic,
      result.total_objects,
      now.elapsed()
    );
    Ok(result)
  }
}

pub trait Task<I, M, P>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, pipeline: &Pipeline<M, P>) -> Result<Self::Output, Self::Error>;
}

/// 单次模式：采集一帧，推理并发布一次
pub struct OneShotTask<'a> {
  pub output: PathBuf,
  pub topic: &'a str,
}

impl<C, M, P> Task<C, M, P> for OneShotTask<'_>
where
  C: Capture,
  CycleError: From<C::Error>,
  M: Model,
  P: Publish,
{
  type Output = DetectionResult;
  type Error = CycleError;

  fn run_task(self, input: C, pipeline: &Pipeline<M, P>) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let target = CycleTarget {
      output: SaveImageFileOutput::new(self.output),
      topic: self.topic,
      camera_id: None,
    };
    pipeline.run_cycle(&input, &target).inspect_err(|e| {
      error!("推理周期失败: {}", e);
    })
  }
}

/// 服务模式各结果的计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
  pub published: usize,
  pub ignored: usize,
  pub failed: usize,
}

/// 服务模式：逐条处理触发消息，处理完一条再等待下一条
pub struct ServiceTask<'a> {
  pub snapshot_dir: PathBuf,
  pub output_dir: PathBuf,
  pub topic: &'a str,
}

impl ServiceTask<'_> {
  /// 处理一条触发消息：解析摄像头编号，读取快照并完成一个周期
  pub fn handle_trigger<M: Model, P: Publish>(
    &self,
    payload: &[u8],
    pipeline: &Pipeline<M, P>,
  ) -> Result<DetectionResult, CycleError> {
    let camera_id = parse_trigger(payload)?;
    info!("收到摄像头 {} 的触发消息", camera_id);

    let source = SnapshotFileInput::for_camera(&self.snapshot_dir, &camera_id);
    let target = CycleTarget {
      output: SaveImageFileOutput::for_camera(&self.output_dir, &camera_id),
      topic: self.topic,
      camera_id: Some(camera_id.as_str()),
    };
    pipeline.run_cycle(&source, &target)
  }
}

impl<I, M, P> Task<I, M, P> for ServiceTask<'_>
where
  I: Iterator<Item = Vec<u8>>,
  M: Model,
  P: Publish,
{
  type Output = ServiceStats;
  type Error = std::convert::Infallible;

  fn run_task(self, input: I, pipeline: &Pipeline<M, P>) -> Result<Self::Output, Self::Error> {
    info!("推理服务运行中，结果发布到 {}", self.topic);
    let mut stats = ServiceStats::default();

    for payload in input {
      match self.handle_trigger(&payload, pipeline) {
        Ok(_) => stats.published += 1,
        Err(e) if e.is_ignorable() => {
          warn!("忽略触发消息: {}", e);
          stats.ignored += 1;
        }
        Err(e) => {
          error!("推理周期失败: {}", e);
          stats.failed += 1;
        }
      }
    }

    info!(
      "任务完成，退出: 发布 {} 次，忽略 {} 条，失败 {} 次",
      stats.published, stats.ignored, stats.failed
    );
    Ok(stats)
  }
}
