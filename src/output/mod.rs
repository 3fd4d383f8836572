// 该文件是 Zhuiying （追影） 项目的一部分。
// src/output/mod.rs - 输出模块
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

mod directory_output;
#[cfg(feature = "video_file")]
mod video_output;
mod visualizer;

pub use directory_output::DirectoryOutput;
#[cfg(feature = "video_file")]
pub use video_output::VideoOutput;
pub use visualizer::Visualizer;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;

/// 视频输出的兜底帧率，输入源未报告帧率时使用
pub const FALLBACK_FPS: f64 = 20.0;

/// 输出写入器 trait
///
/// 接收已标注的帧；`finish` 在所有退出路径上都会被调用。
pub trait OutputWriter {
  /// 写入一帧
  fn write_frame(&mut self, image: &RgbImage) -> Result<()>;

  /// 完成写入并释放资源
  fn finish(&mut self) -> Result<()>;
}

/// 从路径创建输出写入器
///
/// 目录路径产出编号图片帧；其余视为视频文件，帧率取输入源的
/// 实际帧率，未知时退回 20 fps。
pub fn create_output_writer(
  output_path: &str,
  width: u32,
  height: u32,
  source_fps: Option<f64>,
) -> Result<Box<dyn OutputWriter>> {
  let path = Path::new(output_path);
  if path.is_dir() || path.extension().is_none() {
    return Ok(Box::new(DirectoryOutput::new(output_path)?));
  }

  #[cfg(feature = "video_file")]
  {
    Ok(Box::new(VideoOutput::new(
      output_path,
      width,
      height,
      effective_fps(source_fps),
    )?))
  }
  #[cfg(not(feature = "video_file"))]
  {
    let _ = (width, height, source_fps);
    anyhow::bail!("未启用 video_file 特性，无法写入视频文件: {}", output_path)
  }
}

/// 取有效的输出帧率
///
/// 输入源帧率缺失或非法（非正数、NaN）时退回兜底值。
pub fn effective_fps(source_fps: Option<f64>) -> f64 {
  source_fps
    .filter(|fps| fps.is_finite() && *fps > 0.0)
    .unwrap_or(FALLBACK_FPS)
}

/// 保存截图为 `screenshot_<帧号>.jpg`
pub fn save_snapshot(image: &RgbImage, directory: &Path, frame_count: u64) -> Result<PathBuf> {
  let path = directory.join(format!("screenshot_{}.jpg", frame_count));
  image
    .save(&path)
    .with_context(|| format!("无法保存截图: {}", path.display()))?;
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_source_fps_falls_back() {
    assert_eq!(effective_fps(None), FALLBACK_FPS);
    assert_eq!(effective_fps(Some(0.0)), FALLBACK_FPS);
    assert_eq!(effective_fps(Some(-25.0)), FALLBACK_FPS);
    assert_eq!(effective_fps(Some(f64::NAN)), FALLBACK_FPS);
  }

  #[test]
  fn valid_source_fps_is_passed_through() {
    assert_eq!(effective_fps(Some(29.97)), 29.97);
  }

  #[test]
  fn snapshot_is_named_after_frame_count() {
    let directory = std::env::temp_dir().join(format!("zhuiying-snap-{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();

    let image = RgbImage::new(32, 32);
    let path = save_snapshot(&image, &directory, 7).unwrap();

    assert_eq!(path.file_name().unwrap(), "screenshot_7.jpg");
    assert!(path.exists());

    std::fs::remove_dir_all(&directory).ok();
  }
}
