// 该文件是 Zhuiying （追影） 项目的一部分。
// src/tracker/iou_tracker.rs - 基于 IoU 关联的跟踪器
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

use super::{Track, TrackState, Tracker, TrackerConfig, TrackerDetection};

/// 关联成立的最小 IoU
const MIN_ASSOCIATION_IOU: f32 = 0.3;

/// 基于 IoU 贪心关联的多目标跟踪器
///
/// 实现跟踪协议的轨迹生命周期（暂定 / 确认 / 删除，`n_init` 与
/// `max_age` 语义），关联仅用几何重叠，不建模外观；
/// `max_cosine_distance` 为外观类实现预留，此处不使用。
pub struct IouTracker {
  config: TrackerConfig,
  tracks: Vec<Track>,
  next_id: u64,
}

impl IouTracker {
  /// 创建跟踪器
  pub fn new(config: TrackerConfig) -> Self {
    Self {
      config,
      tracks: Vec::new(),
      next_id: 1,
    }
  }

  /// 使用默认配置创建跟踪器
  pub fn with_default_config() -> Self {
    Self::new(TrackerConfig::default())
  }

  /// 当前配置
  pub fn config(&self) -> &TrackerConfig {
    &self.config
  }

  fn allocate_id(&mut self) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// 按 `nms_max_overlap` 对输入检测做非极大值抑制
  fn suppress(&self, detections: &[TrackerDetection]) -> Vec<TrackerDetection> {
    if self.config.nms_max_overlap >= 1.0 {
      return detections.to_vec();
    }

    let mut candidates = detections.to_vec();
    candidates.sort_by(|a, b| {
      b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<TrackerDetection> = Vec::new();
    for candidate in candidates {
      let overlapped = kept
        .iter()
        .any(|k| iou_ltwh(&candidate.bbox, &k.bbox) > self.config.nms_max_overlap);
      if !overlapped {
        kept.push(candidate);
      }
    }

    kept
  }
}

impl Tracker for IouTracker {
  fn update(&mut self, detections: &[TrackerDetection], _frame: &RgbImage) -> &[Track] {
    // 上一帧标记删除的轨迹在本帧开始时移除
    self.tracks.retain(|t| t.state != TrackState::Deleted);

    let detections = self.suppress(detections);

    // 贪心 IoU 关联：按重叠从大到小逐对匹配
    let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
    for (t_idx, track) in self.tracks.iter().enumerate() {
      let track_bbox = ltrb_to_ltwh(&track.to_ltrb());
      for (d_idx, detection) in detections.iter().enumerate() {
        let overlap = iou_ltwh(&track_bbox, &detection.bbox);
        if overlap >= MIN_ASSOCIATION_IOU {
          pairs.push((t_idx, d_idx, overlap));
        }
      }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut matched_tracks = vec![false; self.tracks.len()];
    let mut matched_detections = vec![false; detections.len()];

    for (t_idx, d_idx, _) in pairs {
      if matched_tracks[t_idx] || matched_detections[d_idx] {
        continue;
      }
      matched_tracks[t_idx] = true;
      matched_detections[d_idx] = true;
      self.tracks[t_idx].mark_hit(&detections[d_idx], self.config.n_init);
    }

    for (t_idx, matched) in matched_tracks.iter().enumerate() {
      if !matched {
        self.tracks[t_idx].mark_missed(self.config.max_age);
      }
    }

    for (d_idx, matched) in matched_detections.iter().enumerate() {
      if !matched {
        let id = self.allocate_id();
        self
          .tracks
          .push(Track::new(id, &detections[d_idx], self.config.n_init));
      }
    }

    &self.tracks
  }
}

/// 计算两个 (x, y, w, h) 边界框的 IoU
fn iou_ltwh(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = (a[0] + a[2]).min(b[0] + b[2]);
  let y2 = (a[1] + a[3]).min(b[1] + b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a[2] * a[3] + b[2] * b[3] - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

fn ltrb_to_ltwh(bbox: &[f32; 4]) -> [f32; 4] {
  let [x1, y1, x2, y2] = *bbox;
  [x1, y1, x2 - x1, y2 - y1]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> TrackerDetection {
    TrackerDetection {
      bbox: [x, y, w, h],
      confidence,
      class_id: 0,
    }
  }

  fn frame() -> RgbImage {
    RgbImage::new(128, 128)
  }

  #[test]
  fn confirms_after_n_init_consecutive_hits() {
    let mut tracker = IouTracker::new(TrackerConfig {
      n_init: 3,
      ..TrackerConfig::default()
    });
    let image = frame();
    let detections = [det(10.0, 10.0, 40.0, 40.0, 0.9)];

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].state, TrackState::Tentative);

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks[0].state, TrackState::Tentative);

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks[0].state, TrackState::Confirmed);
  }

  #[test]
  fn keeps_track_id_across_frames() {
    let mut tracker = IouTracker::with_default_config();
    let image = frame();

    let id = tracker.update(&[det(10.0, 10.0, 40.0, 40.0, 0.9)], &image)[0].track_id;
    let tracks = tracker.update(&[det(14.0, 12.0, 40.0, 40.0, 0.9)], &image);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].track_id, id);
  }

  #[test]
  fn deletes_tentative_track_on_first_miss() {
    let mut tracker = IouTracker::with_default_config();
    let image = frame();

    tracker.update(&[det(10.0, 10.0, 40.0, 40.0, 0.9)], &image);
    let tracks = tracker.update(&[], &image);
    assert_eq!(tracks[0].state, TrackState::Deleted);

    let tracks = tracker.update(&[], &image);
    assert!(tracks.is_empty());
  }

  #[test]
  fn deletes_confirmed_track_after_max_age_misses() {
    let mut tracker = IouTracker::new(TrackerConfig {
      max_age: 2,
      n_init: 1,
      ..TrackerConfig::default()
    });
    let image = frame();
    let detections = [det(10.0, 10.0, 40.0, 40.0, 0.9)];

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks[0].state, TrackState::Confirmed);

    let tracks = tracker.update(&[], &image);
    assert_eq!(tracks[0].state, TrackState::Confirmed);
    let tracks = tracker.update(&[], &image);
    assert_eq!(tracks[0].state, TrackState::Confirmed);
    let tracks = tracker.update(&[], &image);
    assert_eq!(tracks[0].state, TrackState::Deleted);
  }

  #[test]
  fn distinct_objects_get_distinct_ids() {
    let mut tracker = IouTracker::with_default_config();
    let image = frame();
    let detections = [
      det(10.0, 10.0, 30.0, 30.0, 0.9),
      det(80.0, 80.0, 30.0, 30.0, 0.8),
    ];

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks.len(), 2);
    assert_ne!(tracks[0].track_id, tracks[1].track_id);
  }

  #[test]
  fn nms_max_overlap_suppresses_duplicates() {
    let mut tracker = IouTracker::new(TrackerConfig {
      nms_max_overlap: 0.5,
      ..TrackerConfig::default()
    });
    let image = frame();
    // 两个几乎重合的检测，低分者被抑制
    let detections = [
      det(10.0, 10.0, 40.0, 40.0, 0.9),
      det(11.0, 11.0, 40.0, 40.0, 0.6),
    ];

    let tracks = tracker.update(&detections, &image);
    assert_eq!(tracks.len(), 1);
  }

  #[test]
  fn trajectory_records_centroids() {
    let mut tracker = IouTracker::with_default_config();
    let image = frame();

    tracker.update(&[det(10.0, 10.0, 40.0, 40.0, 0.9)], &image);
    let tracks = tracker.update(&[det(20.0, 10.0, 40.0, 40.0, 0.9)], &image);
    assert_eq!(tracks[0].trajectory.len(), 2);
    assert_eq!(tracks[0].trajectory[0], (30.0, 30.0));
    assert_eq!(tracks[0].trajectory[1], (40.0, 30.0));
  }
}
