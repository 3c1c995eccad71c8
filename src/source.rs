// 该文件是 Tujian （图检） 项目的一部分。
// src/source.rs - 图像来源枚举与解码
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

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误 {path}: {source}")]
  DecodeError {
    path: PathBuf,
    source: image::ImageError,
  },
}

/// 图像路径序列。
///
/// 目录输入产生其中按扩展名过滤的文件，不递归子目录，顺序为
/// 文件系统枚举顺序；文件输入产生单个元素。文件是否为有效图像
/// 在此不做检查，留到解码时。
pub enum ImageSource {
  Single(Option<PathBuf>),
  Directory(fs::ReadDir, String),
}

impl ImageSource {
  pub fn open(path: &Path, ext: &str) -> Result<Self, SourceError> {
    if path.is_dir() {
      Ok(ImageSource::Directory(
        fs::read_dir(path)?,
        ext.to_ascii_lowercase(),
      ))
    } else {
      Ok(ImageSource::Single(Some(path.to_path_buf())))
    }
  }
}

impl Iterator for ImageSource {
  type Item = Result<PathBuf, SourceError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      ImageSource::Single(slot) => slot.take().map(Ok),
      ImageSource::Directory(entries, ext) => loop {
        match entries.next()? {
          Ok(entry) => {
            let path = entry.path();
            let matched = path.is_file()
              && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(ext.as_str()))
                .unwrap_or(false);
            if matched {
              return Some(Ok(path));
            }
          }
          Err(err) => return Some(Err(err.into())),
        }
      },
    }
  }
}

/// 解码图像文件为 RGB 像素。
pub fn decode(path: &Path) -> Result<RgbImage, SourceError> {
  let image = ImageReader::open(path)?
    .decode()
    .map_err(|source| SourceError::DecodeError {
      path: path.to_path_buf(),
      source,
    })?;
  Ok(image.into_rgb8())
}
