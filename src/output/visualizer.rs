// 该文件是 Zhuiying （追影） 项目的一部分。
// src/output/visualizer.rs - 轨迹可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
  draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use tracing::warn;

use crate::detector::ClassNames;
use crate::tracker::Track;

/// 调色板大小
const PALETTE_SIZE: usize = 100;
/// 标签文本高度估计（像素）
const LABEL_TEXT_HEIGHT: i32 = 18;
/// 每字符平均宽度（粗略估计）
const LABEL_CHAR_WIDTH: f32 = 9.0;
/// 叠加信息文字颜色
const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// 常见系统字体位置
const FONT_CANDIDATES: [&str; 4] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// 轨迹可视化工具
///
/// 只绘制已确认的轨迹：边界框（裁剪到帧内）、
/// 轨迹标识与类别标签、中心点轨迹折线。
pub struct Visualizer {
  /// 标签字体，系统中找不到字体时跳过文字绘制
  font: Option<FontArc>,
  /// 字体大小
  font_scale: PxScale,
  /// 轨迹颜色调色板
  colors: Vec<Rgb<u8>>,
}

impl Default for Visualizer {
  fn default() -> Self {
    Self::new()
  }
}

impl Visualizer {
  /// 创建可视化工具
  pub fn new() -> Self {
    let font = load_system_font();
    if font.is_none() {
      warn!("找不到可用字体，标签文字将被跳过");
    }

    // 以 HSV 色相环生成确定性的调色板
    let colors: Vec<Rgb<u8>> = (0..PALETTE_SIZE)
      .map(|i| {
        let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self {
      font,
      font_scale: PxScale::from(16.0),
      colors,
    }
  }

  /// 同一 track_id 在一次运行中始终映射到同一颜色
  pub fn color_for(&self, track_id: u64) -> Rgb<u8> {
    self.colors[(track_id as usize) % self.colors.len()]
  }

  /// 在图像上绘制已确认轨迹
  pub fn draw_tracks(&self, image: &mut RgbImage, tracks: &[Track], names: &dyn ClassNames) {
    for track in tracks {
      if !track.is_confirmed() {
        continue;
      }

      let Some((x1, y1, x2, y2)) = clip_box(track.to_ltrb(), image.width(), image.height()) else {
        continue;
      };

      let color = self.color_for(track.track_id);

      let rect = Rect::at(x1, y1).of_size((x2 - x1) as u32, (y2 - y1) as u32);
      draw_hollow_rect_mut(image, rect, color);

      // 再画一圈内框增加可见度
      if x2 - x1 > 2 && y2 - y1 > 2 {
        let inner = Rect::at(x1 + 1, y1 + 1).of_size((x2 - x1 - 2) as u32, (y2 - y1 - 2) as u32);
        draw_hollow_rect_mut(image, inner, color);
      }

      let label = format_label(track.track_id, track.class_id, names);
      self.draw_label(image, &label, x1, y1, color);

      if track.trajectory.len() >= 2 {
        for pair in track.trajectory.windows(2) {
          draw_line_segment_mut(image, pair[0], pair[1], color);
        }
      }
    }
  }

  /// 绘制 FPS 与目标数量叠加信息
  pub fn draw_overlay(&self, image: &mut RgbImage, fps: Option<f32>, object_count: usize) {
    let Some(font) = &self.font else {
      return;
    };

    let scale = PxScale::from(24.0);
    if let Some(fps) = fps {
      let text = format!("FPS: {:.1}", fps);
      draw_text_mut(image, OVERLAY_COLOR, 10, 30, scale, font, &text);
    }

    let text = format!("Objects: {}", object_count);
    draw_text_mut(image, OVERLAY_COLOR, 10, 70, scale, font, &text);
  }

  /// 绘制标签背景与文字
  ///
  /// 默认位置在边界框上方 10 像素，越出画面顶端时翻转到框顶之下。
  fn draw_label(&self, image: &mut RgbImage, label: &str, x1: i32, y1: i32, color: Rgb<u8>) {
    let Some(font) = &self.font else {
      return;
    };

    let label_y = if y1 - 10 > LABEL_TEXT_HEIGHT {
      y1 - 10 - LABEL_TEXT_HEIGHT
    } else {
      y1 + 10
    };

    let text_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;
    let max_width = (image.width() as i32 - x1).max(0);
    let label_width = text_width.min(max_width) as u32;

    if label_width == 0 {
      return;
    }

    let rect = Rect::at(x1, label_y).of_size(label_width, LABEL_TEXT_HEIGHT as u32);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      Rgb([255, 255, 255]),
      x1 + 2,
      label_y + 1,
      self.font_scale,
      font,
      label,
    );
  }
}

/// 组合轨迹标识与类别名称的标签文本
///
/// 未知类别退回 `Class_<id>` 占位名，类别缺失时只保留轨迹标识，
/// 任何情况下都不会中断该帧的渲染。
pub fn format_label(track_id: u64, class_id: Option<usize>, names: &dyn ClassNames) -> String {
  match class_id {
    Some(class_id) => {
      let class_name = names
        .class_name(class_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Class_{}", class_id));
      format!("ID: {} | {}", track_id, class_name)
    }
    None => format!("ID: {}", track_id),
  }
}

/// 将角点坐标边界框裁剪到帧内
///
/// 裁剪后为空的框返回 None。
pub fn clip_box(bbox: [f32; 4], width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
  let x1 = (bbox[0].max(0.0) as i32).min(width as i32);
  let y1 = (bbox[1].max(0.0) as i32).min(height as i32);
  let x2 = (bbox[2] as i32).clamp(0, width as i32);
  let y2 = (bbox[3] as i32).clamp(0, height as i32);

  if x1 >= x2 || y1 >= y2 {
    return None;
  }

  Some((x1, y1, x2, y2))
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

fn load_system_font() -> Option<FontArc> {
  for path in FONT_CANDIDATES {
    if let Ok(data) = std::fs::read(path) {
      if let Ok(font) = FontArc::try_from_vec(data) {
        return Some(font);
      }
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::{COCO_CLASSES, ClassNames};
  use crate::tracker::{IouTracker, Tracker, TrackerConfig, TrackerDetection};

  struct CocoNames;

  impl ClassNames for CocoNames {
    fn class_name(&self, class_id: usize) -> Option<&str> {
      COCO_CLASSES.get(class_id).copied()
    }
  }

  #[test]
  fn clipping_keeps_coordinates_in_bounds() {
    let (x1, y1, x2, y2) = clip_box([-20.0, -5.0, 700.0, 500.0], 640, 480).unwrap();
    assert_eq!((x1, y1), (0, 0));
    assert_eq!((x2, y2), (640, 480));
  }

  #[test]
  fn fully_offscreen_box_is_dropped() {
    assert!(clip_box([-50.0, -50.0, -10.0, -10.0], 640, 480).is_none());
    assert!(clip_box([700.0, 500.0, 800.0, 600.0], 640, 480).is_none());
  }

  #[test]
  fn color_is_deterministic_modulo_palette() {
    let visualizer = Visualizer::new();
    assert_eq!(visualizer.color_for(3), visualizer.color_for(3));
    assert_eq!(
      visualizer.color_for(3),
      visualizer.color_for(3 + PALETTE_SIZE as u64)
    );
  }

  #[test]
  fn label_resolves_class_name_with_fallback() {
    let names = CocoNames;
    assert_eq!(format_label(7, Some(0), &names), "ID: 7 | person");
    assert_eq!(format_label(7, Some(93), &names), "ID: 7 | Class_93");
    assert_eq!(format_label(7, None, &names), "ID: 7");
  }

  #[test]
  fn only_confirmed_tracks_are_drawn() {
    let mut tracker = IouTracker::new(TrackerConfig {
      n_init: 3,
      ..TrackerConfig::default()
    });
    let image = RgbImage::new(128, 128);
    let detections = [TrackerDetection {
      bbox: [10.0, 10.0, 40.0, 40.0],
      confidence: 0.9,
      class_id: 0,
    }];

    // 暂定轨迹不产生任何绘制
    let tracks = tracker.update(&detections, &image).to_vec();
    let mut canvas = RgbImage::new(128, 128);
    let before = canvas.clone();
    Visualizer::new().draw_tracks(&mut canvas, &tracks, &CocoNames);
    assert_eq!(canvas, before);

    tracker.update(&detections, &image);
    let tracks = tracker.update(&detections, &image).to_vec();
    assert!(tracks[0].is_confirmed());
    Visualizer::new().draw_tracks(&mut canvas, &tracks, &CocoNames);
    assert_ne!(canvas, before);
  }
}
