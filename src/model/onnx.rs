// 该文件是 Tujian （图检） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 检测器
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

use std::path::Path;

use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::TensorRef;
use thiserror::Error;
use tracing::{debug, info};

use super::{ClassDetections, Detector};
use crate::config::ModelConfig;

#[derive(Error, Debug)]
pub enum OnnxDetectorError {
  #[error("推理引擎错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出无效: {0}")]
  BadOutput(String),
}

/// 基于 ONNX Runtime 的检测器。
///
/// 模型约定：输入为单张 NCHW 归一化图像，输出为与下标对齐的
/// 标签、框、得分三个张量，框坐标为输入尺度下的 `[x1, y1, x2, y2]`。
/// 检测结果缩放回原图尺度后按类别编号归组，组内保持引擎输出顺序。
pub struct OnnxDetector {
  session: Session,
  input_width: u32,
  input_height: u32,
  num_classes: usize,
  input_name: String,
  label_output: String,
  box_output: String,
  score_output: String,
}

impl OnnxDetector {
  /// 根据配置与本地权重文件构建检测器。
  pub fn from_config(config: &ModelConfig, weights: &Path) -> Result<Self, OnnxDetectorError> {
    let _ = ort::init().commit();

    info!("加载模型权重: {}", weights.display());
    #[allow(unused_mut)]
    let mut builder = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(ort::Error::from)?
      .with_intra_threads(config.runtime.intra_threads)
      .map_err(ort::Error::from)?;

    #[cfg(feature = "cuda")]
    {
      info!("启用 CUDA 执行后端, 设备 {}", config.runtime.device_id);
      builder = builder.with_execution_providers([
        ort::execution_providers::CUDAExecutionProvider::default()
          .with_device_id(config.runtime.device_id)
          .build()
          .error_on_failure(),
      ])?;
    }

    let session = builder.commit_from_file(weights)?;
    info!("模型加载完成: arch = {}", config.model.arch);
    debug!(
      "模型输入 {}x{}, 类别数 {}",
      config.model.input_width, config.model.input_height, config.model.num_classes
    );

    Ok(OnnxDetector {
      session,
      input_width: config.model.input_width,
      input_height: config.model.input_height,
      num_classes: config.model.num_classes,
      input_name: config.model.input_name.clone(),
      label_output: config.model.label_output.clone(),
      box_output: config.model.box_output.clone(),
      score_output: config.model.score_output.clone(),
    })
  }

  /// 缩放到模型输入尺寸并填充 NCHW 归一化张量。
  fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
      image,
      self.input_width,
      self.input_height,
      FilterType::Triangle,
    );

    let mut input = Array4::<f32>::zeros((
      1,
      3,
      self.input_height as usize,
      self.input_width as usize,
    ));
    for (x, y, pixel) in resized.enumerate_pixels() {
      for c in 0..3 {
        input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }
    input
  }
}

impl Detector for OnnxDetector {
  type Error = OnnxDetectorError;

  fn detect(&mut self, image: &RgbImage) -> Result<ClassDetections, Self::Error> {
    let (orig_width, orig_height) = image.dimensions();
    let input = self.preprocess(image).into_dyn();

    let input_name = self.input_name.as_str();
    let outputs = self.session.run(ort::inputs![
      input_name => TensorRef::from_array_view(input.view())?
    ])?;

    let labels = outputs[self.label_output.as_str()].try_extract_array::<i64>()?;
    let boxes = outputs[self.box_output.as_str()].try_extract_array::<f32>()?;
    let scores = outputs[self.score_output.as_str()].try_extract_array::<f32>()?;

    let labels = labels
      .as_slice()
      .ok_or_else(|| OnnxDetectorError::BadOutput("标签张量不连续".to_string()))?;
    let boxes = boxes
      .as_slice()
      .ok_or_else(|| OnnxDetectorError::BadOutput("框张量不连续".to_string()))?;
    let scores = scores
      .as_slice()
      .ok_or_else(|| OnnxDetectorError::BadOutput("得分张量不连续".to_string()))?;

    let scale_x = orig_width as f32 / self.input_width as f32;
    let scale_y = orig_height as f32 / self.input_height as f32;

    group_by_class(labels, boxes, scores, self.num_classes, scale_x, scale_y)
  }
}

/// 将引擎输出的平行张量按类别归组并缩放回原图尺度。
fn group_by_class(
  labels: &[i64],
  boxes: &[f32],
  scores: &[f32],
  num_classes: usize,
  scale_x: f32,
  scale_y: f32,
) -> Result<ClassDetections, OnnxDetectorError> {
  let count = scores.len();
  if labels.len() != count || boxes.len() != count * 4 {
    return Err(OnnxDetectorError::BadOutput(format!(
      "输出长度不对齐: labels = {}, boxes = {}, scores = {}",
      labels.len(),
      boxes.len(),
      scores.len()
    )));
  }

  let mut detections = ClassDetections::with_classes(num_classes);
  for i in 0..count {
    // 引擎标签从 0 起，类别编号 0 留给背景；负标签为无效槽位
    if labels[i] < 0 {
      return Err(OnnxDetectorError::BadOutput(format!(
        "类别编号为负: {}",
        labels[i]
      )));
    }
    let class_id = labels[i] as usize + 1;
    if class_id >= detections.boxes.len() {
      return Err(OnnxDetectorError::BadOutput(format!(
        "类别编号越界: {} (类别数 {})",
        labels[i], num_classes
      )));
    }
    let b = &boxes[i * 4..i * 4 + 4];
    detections.boxes[class_id].push([
      b[0] * scale_x,
      b[1] * scale_y,
      b[2] * scale_x,
      b[3] * scale_y,
      scores[i],
    ]);
  }

  Ok(detections)
}
