// 该文件是 Tujian （图检） 项目的一部分。
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

use image::RgbImage;

/// 检测能力接口：一张图像进，按类别分组的检测结构出。
///
/// 具体推理引擎作为可替换实现挂在该接口之后。
pub trait Detector {
  type Error;

  fn detect(&mut self, image: &RgbImage) -> Result<ClassDetections, Self::Error>;
}

/// 按类别分组的原始检测结构。
///
/// 下标即类别编号，0 号为背景，恒为空。每个实例一行
/// `[x_min, y_min, x_max, y_max, score]`，组内顺序保持推理引擎
/// 的输出顺序。分割掩码与关键点按同样方式分组，且与框逐条对齐。
#[derive(Debug, Clone, Default)]
pub struct ClassDetections {
  pub boxes: Vec<Vec<[f32; 5]>>,
  pub segms: Option<Vec<Vec<String>>>,
  pub keyps: Option<Vec<Vec<Vec<[f32; 3]>>>>,
}

impl ClassDetections {
  /// 背景之外 `num_classes` 个前景类别的空结构。
  pub fn with_classes(num_classes: usize) -> Self {
    ClassDetections {
      boxes: vec![Vec::new(); num_classes + 1],
      segms: None,
      keyps: None,
    }
  }

  /// 全部类别的实例总数。
  pub fn total(&self) -> usize {
    self.boxes.iter().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.total() == 0
  }
}

mod labels;
pub use self::labels::COCO_CLASSES;

mod onnx;
pub use self::onnx::{OnnxDetector, OnnxDetectorError};
