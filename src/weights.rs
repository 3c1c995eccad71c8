// 该文件是 Tujian （图检） 项目的一部分。
// src/weights.rs - 权重解析与缓存
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

use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Error, Debug)]
pub enum WeightsError {
  #[error("权重文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("权重下载错误: {0}")]
  DownloadError(#[from] reqwest::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 解析权重参数为本地文件路径。
///
/// `http`/`https` URL 下载到缓存目录后返回缓存路径，已缓存的
/// 文件直接返回；其余参数视为本地路径，仅检查存在性。
pub fn resolve(weights: &str, cache_dir: &Path) -> Result<PathBuf, WeightsError> {
  match Url::parse(weights) {
    Ok(url) if matches!(url.scheme(), "http" | "https") => cache_url(&url, cache_dir),
    _ => {
      let path = PathBuf::from(weights);
      if path.is_file() {
        Ok(path)
      } else {
        Err(WeightsError::NotFound(path))
      }
    }
  }
}

/// URL 在缓存目录中对应的文件路径。
pub fn cache_path(url: &Url, cache_dir: &Path) -> PathBuf {
  cache_dir.join(urlencoding::encode(url.as_str()).into_owned())
}

// 追加后缀而非替换扩展名，每个缓存目标的临时路径互不相同
fn partial_path(target: &Path) -> PathBuf {
  let mut name = target.as_os_str().to_os_string();
  name.push(".part");
  PathBuf::from(name)
}

fn cache_url(url: &Url, cache_dir: &Path) -> Result<PathBuf, WeightsError> {
  let target = cache_path(url, cache_dir);
  if target.is_file() {
    info!("权重已缓存: {}", target.display());
    return Ok(target);
  }

  std::fs::create_dir_all(cache_dir)?;
  info!("下载权重: {}", url);
  let response = reqwest::blocking::get(url.clone())?.error_for_status()?;
  let bytes = response.bytes()?;

  // 先写入临时文件再改名，半截下载不会被当作缓存命中
  let partial = partial_path(&target);
  std::fs::write(&partial, &bytes)?;
  std::fs::rename(&partial, &target)?;
  info!(
    "权重缓存完成: {} ({:.2} MB)",
    target.display(),
    bytes.len() as f64 / (1024.0 * 1024.0)
  );

  Ok(target)
}
