// 该文件是 Zhuiying （追影） 项目的一部分。
// src/output/directory_output.rs - 目录编号帧输出
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

use anyhow::{Context, Result};
use image::RgbImage;

use super::OutputWriter;

/// 目录输出
///
/// 将已标注的帧按编号保存为 PNG 文件（frame_000001.png ...）。
pub struct DirectoryOutput {
  /// 输出目录
  directory: PathBuf,
  /// 帧计数
  frame_index: u64,
}

impl DirectoryOutput {
  /// 创建目录输出，目录不存在时自动建立
  pub fn new(directory: &str) -> Result<Self> {
    let directory = PathBuf::from(directory);
    std::fs::create_dir_all(&directory)
      .with_context(|| format!("无法创建输出目录: {}", directory.display()))?;

    Ok(Self {
      directory,
      frame_index: 0,
    })
  }
}

impl OutputWriter for DirectoryOutput {
  fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
    let path = self
      .directory
      .join(format!("frame_{:06}.png", self.frame_index));
    image
      .save(&path)
      .with_context(|| format!("无法保存帧: {}", path.display()))?;

    self.frame_index += 1;
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_numbered_frames() {
    let directory = std::env::temp_dir().join(format!("zhuiying-dir-{}", std::process::id()));
    let mut writer = DirectoryOutput::new(directory.to_str().unwrap()).unwrap();

    let image = RgbImage::new(16, 16);
    writer.write_frame(&image).unwrap();
    writer.write_frame(&image).unwrap();
    writer.finish().unwrap();

    assert!(directory.join("frame_000000.png").exists());
    assert!(directory.join("frame_000001.png").exists());

    std::fs::remove_dir_all(&directory).ok();
  }
}
