// 该文件是 Tujian （图检） 项目的一部分。
// src/task.rs - 批量推理任务
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

use tracing::info;

use crate::model::Detector;
use crate::record::RecordWriter;
use crate::source::{self, SourceError};

pub trait Task<I, M>: Sized {
  type Error;

  fn run_task(self, input: I, model: M, writer: &mut RecordWriter) -> Result<usize, Self::Error>;
}

/// 单遍批量任务：逐张解码、推理、追加记录。
///
/// 严格串行，无重试、无断点续跑，任一阶段出错整个运行终止，
/// 已累积的记录随之丢弃。
pub struct BatchTask {
  json_name: String,
}

impl BatchTask {
  /// `json_name` 为目标 JSON 文件名，仅用于日志。
  pub fn new(json_name: impl Into<String>) -> Self {
    BatchTask {
      json_name: json_name.into(),
    }
  }
}

impl<ME, I, M> Task<I, M> for BatchTask
where
  ME: std::error::Error + Send + Sync + 'static,
  I: Iterator<Item = Result<PathBuf, SourceError>>,
  M: Detector<Error = ME>,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    mut model: M,
    writer: &mut RecordWriter,
  ) -> Result<usize, Self::Error> {
    let mut processed = 0usize;

    for (index, path) in input.enumerate() {
      let path = path?;
      let img_name = path.display().to_string();
      info!("处理第 {} 张: {} -> {}", index + 1, img_name, self.json_name);

      let image = source::decode(&path)?;
      let now = std::time::Instant::now();
      let result = model.detect(&image)?;
      info!(
        "推理完成，耗时: {:.2?}，检测 {} 个目标",
        now.elapsed(),
        result.total()
      );

      writer.append(&img_name, &result);
      processed += 1;
    }

    info!("任务完成，共处理 {} 张图像", processed);
    Ok(processed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ClassDetections;
  use image::RgbImage;
  use tempfile::tempdir;

  struct FixedDetector {
    per_image: usize,
  }

  impl Detector for FixedDetector {
    type Error = std::convert::Infallible;

    fn detect(&mut self, _image: &RgbImage) -> Result<ClassDetections, Self::Error> {
      let mut detections = ClassDetections::with_classes(3);
      for i in 0..self.per_image {
        detections.boxes[1].push([i as f32, 0.0, 10.0, 10.0, 0.5]);
      }
      Ok(detections)
    }
  }

  #[test]
  fn one_record_per_input_path() {
    let dir = tempdir().unwrap();
    let mut paths = Vec::new();
    for name in ["a.png", "b.png", "c.png"] {
      let path = dir.path().join(name);
      RgbImage::new(4, 4).save(&path).unwrap();
      paths.push(Ok(path));
    }

    let mut writer = RecordWriter::new(None);
    let processed = BatchTask::new("out.json")
      .run_task(
        paths.into_iter(),
        FixedDetector { per_image: 2 },
        &mut writer,
      )
      .unwrap();

    assert_eq!(processed, 3);
    assert_eq!(writer.len(), 3);
  }

  #[test]
  fn empty_input_completes_with_zero_records() {
    let mut writer = RecordWriter::new(None);
    let processed = BatchTask::new("out.json")
      .run_task(
        std::iter::empty(),
        FixedDetector { per_image: 1 },
        &mut writer,
      )
      .unwrap();

    assert_eq!(processed, 0);
    assert!(writer.is_empty());
  }

  #[test]
  fn undecodable_image_aborts_the_run() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.png");
    RgbImage::new(4, 4).save(&good).unwrap();
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not an image").unwrap();

    let mut writer = RecordWriter::new(None);
    let result = BatchTask::new("out.json").run_task(
      vec![Ok(good), Ok(bad)].into_iter(),
      FixedDetector { per_image: 1 },
      &mut writer,
    );

    assert!(result.is_err());
  }
}
