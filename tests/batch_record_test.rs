// 该文件是 Tujian （图检） 项目的一部分。
// tests/batch_record_test.rs - 批量流水线集成测试
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

use std::collections::HashSet;
use std::path::Path;

use image::RgbImage;
use tempfile::tempdir;

use tujian::model::{ClassDetections, Detector};
use tujian::record::RecordWriter;
use tujian::source::ImageSource;
use tujian::task::{BatchTask, Task};

/// 固定输出的检测器桩：每张图像在 1 号类别产出 `per_image` 个框。
struct StubDetector {
  per_image: usize,
}

impl Detector for StubDetector {
  type Error = std::convert::Infallible;

  fn detect(&mut self, _image: &RgbImage) -> Result<ClassDetections, Self::Error> {
    let mut detections = ClassDetections::with_classes(80);
    for i in 0..self.per_image {
      detections.boxes[1].push([i as f32 * 10.0, 0.0, i as f32 * 10.0 + 8.0, 8.0, 0.75]);
    }
    Ok(detections)
  }
}

fn save_image(path: &Path) {
  RgbImage::new(8, 8).save(path).unwrap();
}

fn run_batch(input: &Path, ext: &str, out_json: &Path, per_image: usize) -> serde_json::Value {
  let source = ImageSource::open(input, ext).unwrap();
  let mut writer = RecordWriter::new(None);
  BatchTask::new(out_json.display().to_string())
    .run_task(source, StubDetector { per_image }, &mut writer)
    .unwrap();
  writer.write_json(out_json).unwrap();

  let text = std::fs::read_to_string(out_json).unwrap();
  serde_json::from_str(&text).unwrap()
}

/// 目录输入：每个匹配扩展名的文件恰好一条记录
///
/// 覆盖:
/// - 记录数等于匹配文件数
/// - img_name 为完整路径
/// - 不匹配扩展名的文件被跳过
#[test]
fn test_directory_yields_one_record_per_matching_file() {
  let dir = tempdir().unwrap();
  let a = dir.path().join("a.jpg");
  let b = dir.path().join("b.jpg");
  save_image(&a);
  save_image(&b);
  save_image(&dir.path().join("c.png"));

  let out = dir.path().join("out.json");
  let parsed = run_batch(dir.path(), "jpg", &out, 1);

  let array = parsed.as_array().unwrap();
  assert_eq!(array.len(), 2, "two jpg files, two records");

  let names: HashSet<String> = array
    .iter()
    .map(|record| record["img_name"].as_str().unwrap().to_string())
    .collect();
  let expected: HashSet<String> = [a, b]
    .iter()
    .map(|path| path.display().to_string())
    .collect();
  assert_eq!(names, expected);
}

/// 单文件输入：输出数组恰好一条记录
#[test]
fn test_single_file_yields_one_record() {
  let dir = tempdir().unwrap();
  let file = dir.path().join("one.jpg");
  save_image(&file);

  let out = dir.path().join("out.json");
  let parsed = run_batch(&file, "jpg", &out, 3);

  let array = parsed.as_array().unwrap();
  assert_eq!(array.len(), 1);
  assert_eq!(array[0]["img_name"], file.display().to_string());
  assert_eq!(array[0]["scores"].as_array().unwrap().len(), 3);
}

/// 空目录：写出长度为 0 的 JSON 数组，任务正常完成
#[test]
fn test_empty_directory_yields_empty_array() {
  let dir = tempdir().unwrap();
  let input = dir.path().join("images");
  std::fs::create_dir(&input).unwrap();

  let out = dir.path().join("out.json");
  let parsed = run_batch(&input, "jpg", &out, 1);

  assert_eq!(parsed.as_array().unwrap().len(), 0);
}

/// 不变式：每条记录内 scores、bboxes、classes 等长，bbox 四个分量
#[test]
fn test_record_arrays_are_aligned() {
  let dir = tempdir().unwrap();
  save_image(&dir.path().join("a.jpg"));
  save_image(&dir.path().join("b.jpg"));

  let out = dir.path().join("out.json");
  let parsed = run_batch(dir.path(), "jpg", &out, 4);

  for record in parsed.as_array().unwrap() {
    let scores = record["scores"].as_array().unwrap();
    let bboxes = record["bboxes"].as_array().unwrap();
    let classes = record["classes"].as_array().unwrap();
    assert_eq!(scores.len(), 4);
    assert_eq!(bboxes.len(), scores.len());
    assert_eq!(classes.len(), scores.len());
    for bbox in bboxes {
      assert_eq!(bbox.as_array().unwrap().len(), 4);
    }
  }
}

/// 记录顺序与枚举顺序一致
#[test]
fn test_record_order_follows_enumeration_order() {
  let dir = tempdir().unwrap();
  for name in ["a.jpg", "b.jpg", "c.jpg"] {
    save_image(&dir.path().join(name));
  }

  let enumerated: Vec<String> = ImageSource::open(dir.path(), "jpg")
    .unwrap()
    .map(|path| path.unwrap().display().to_string())
    .collect();

  let out = dir.path().join("out.json");
  let parsed = run_batch(dir.path(), "jpg", &out, 1);
  let recorded: Vec<String> = parsed
    .as_array()
    .unwrap()
    .iter()
    .map(|record| record["img_name"].as_str().unwrap().to_string())
    .collect();

  assert_eq!(recorded, enumerated);
}
