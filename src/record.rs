// 该文件是 Tujian （图检） 项目的一部分。
// src/record.rs - 检测记录与 JSON 输出
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

use serde::Serialize;
use thiserror::Error;

use crate::model::ClassDetections;

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("输出写入错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 类别标签：无名称表时输出编号，有名称表时输出名称。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClassLabel {
  Id(u32),
  Name(String),
}

/// 单张图像的检测记录。
///
/// `scores`、`bboxes`、`classes` 等长且按下标对齐，同一下标
/// 指向同一检测实例。
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
  pub img_name: String,
  pub scores: Vec<f32>,
  pub bboxes: Vec<[f32; 4]>,
  pub classes: Vec<ClassLabel>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub segms: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub keyps: Option<Vec<Vec<[f32; 3]>>>,
}

/// 按类别分组结构压平后的平行数组。
#[derive(Debug, Clone, Default)]
pub struct Flattened {
  pub boxes: Vec<[f32; 5]>,
  pub classes: Vec<u32>,
  pub segms: Option<Vec<String>>,
  pub keyps: Option<Vec<Vec<[f32; 3]>>>,
}

/// 压平按类别分组的检测结构。
///
/// 类别按编号升序拼接，组内保持引擎输出顺序。不重排、不过滤、
/// 不去重，原始结果原样透传。
pub fn flatten(detections: &ClassDetections) -> Flattened {
  let mut flat = Flattened::default();

  for (class_id, boxes) in detections.boxes.iter().enumerate() {
    for item in boxes {
      flat.boxes.push(*item);
      flat.classes.push(class_id as u32);
    }
  }

  if let Some(segms) = &detections.segms {
    let all: Vec<String> = segms.iter().flatten().cloned().collect();
    flat.segms = Some(all);
  }
  if let Some(keyps) = &detections.keyps {
    let all: Vec<Vec<[f32; 3]>> = keyps.iter().flatten().cloned().collect();
    flat.keyps = Some(all);
  }

  flat
}

/// 检测记录累积器。
///
/// 记录按追加顺序保存，整个运行结束时一次性写出 JSON 数组。
pub struct RecordWriter {
  records: Vec<ImageRecord>,
  class_names: Option<Vec<String>>,
}

impl RecordWriter {
  pub fn new(class_names: Option<Vec<String>>) -> Self {
    RecordWriter {
      records: Vec::new(),
      class_names,
    }
  }

  /// 压平一张图像的检测结构并追加为记录。
  pub fn append(&mut self, img_name: &str, detections: &ClassDetections) {
    let flat = flatten(detections);

    let mut scores = Vec::with_capacity(flat.boxes.len());
    let mut bboxes = Vec::with_capacity(flat.boxes.len());
    for item in &flat.boxes {
      bboxes.push([item[0], item[1], item[2], item[3]]);
      scores.push(item[4]);
    }

    let classes = flat.classes.iter().map(|&id| self.label(id)).collect();

    self.records.push(ImageRecord {
      img_name: img_name.to_string(),
      scores,
      bboxes,
      classes,
      segms: flat.segms,
      keyps: flat.keyps,
    });
  }

  // 类别编号 1 起，名称表下标 0 起；背景与表外编号保持编号输出
  fn label(&self, class_id: u32) -> ClassLabel {
    let name = match (&self.class_names, class_id) {
      (Some(names), 1..) => names.get(class_id as usize - 1),
      _ => None,
    };
    match name {
      Some(name) => ClassLabel::Name(name.clone()),
      None => ClassLabel::Id(class_id),
    }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// 将全部记录一次性写出为 JSON 数组。
  pub fn write_json(&self, path: &Path) -> Result<(), RecordError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(file, &self.records)?;
    Ok(())
  }
}
