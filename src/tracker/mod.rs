// 该文件是 Zhuiying （追影） 项目的一部分。
// src/tracker/mod.rs - 多目标跟踪器接口
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

mod iou_tracker;

pub use iou_tracker::IouTracker;

use image::RgbImage;

/// 轨迹中心点历史长度上限
pub const TRAJECTORY_CAPACITY: usize = 32;

/// 跟踪器配置
#[derive(Clone, Debug)]
pub struct TrackerConfig {
  /// 无关联检测时保留轨迹的最大帧数
  pub max_age: u32,
  /// 确认轨迹所需的连续关联检测数
  pub n_init: u32,
  /// 输入检测的非极大值抑制重叠阈值 (0.0 - 1.0)
  pub nms_max_overlap: f32,
  /// 外观匹配的最大余弦距离 (0.0 - 1.0)
  pub max_cosine_distance: f32,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      max_age: 30,
      n_init: 3,
      nms_max_overlap: 1.0,
      max_cosine_distance: 0.4,
    }
  }
}

/// 轨迹状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
  /// 暂定：尚未积累足够的连续关联检测
  Tentative,
  /// 已确认：身份稳定，可用于展示
  Confirmed,
  /// 已删除：将在下一次更新时被移除
  Deleted,
}

/// 跟踪器期望的检测输入
///
/// 边界框为 `(x, y, w, h)`，左上原点像素坐标。
#[derive(Clone, Debug)]
pub struct TrackerDetection {
  /// 边界框 (x, y, w, h)
  pub bbox: [f32; 4],
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
}

/// 一条跨帧维持的目标轨迹
#[derive(Clone, Debug)]
pub struct Track {
  /// 轨迹标识，在存活轨迹中唯一，会话内不复用
  pub track_id: u64,
  /// 当前状态
  pub state: TrackState,
  /// 最近一次关联的边界框 (x1, y1, x2, y2)
  bbox: [f32; 4],
  /// 最近一次关联检测的类别
  pub class_id: Option<usize>,
  /// 累计关联检测数
  pub hits: u32,
  /// 距最近一次关联检测的帧数
  pub time_since_update: u32,
  /// 边界框中心点历史，用于绘制轨迹
  pub trajectory: Vec<(f32, f32)>,
}

impl Track {
  pub(crate) fn new(track_id: u64, detection: &TrackerDetection, n_init: u32) -> Self {
    let bbox = ltwh_to_ltrb(&detection.bbox);
    let state = if n_init <= 1 {
      TrackState::Confirmed
    } else {
      TrackState::Tentative
    };

    let mut track = Self {
      track_id,
      state,
      bbox,
      class_id: Some(detection.class_id),
      hits: 1,
      time_since_update: 0,
      trajectory: Vec::new(),
    };
    track.push_centroid();
    track
  }

  /// 最近一次关联的边界框，角点坐标 (x1, y1, x2, y2)
  pub fn to_ltrb(&self) -> [f32; 4] {
    self.bbox
  }

  /// 是否已确认
  pub fn is_confirmed(&self) -> bool {
    self.state == TrackState::Confirmed
  }

  pub(crate) fn mark_hit(&mut self, detection: &TrackerDetection, n_init: u32) {
    self.bbox = ltwh_to_ltrb(&detection.bbox);
    self.class_id = Some(detection.class_id);
    self.hits += 1;
    self.time_since_update = 0;
    self.push_centroid();

    if self.state == TrackState::Tentative && self.hits >= n_init {
      self.state = TrackState::Confirmed;
    }
  }

  pub(crate) fn mark_missed(&mut self, max_age: u32) {
    self.time_since_update += 1;

    // 暂定轨迹一旦漏检即删除，保证确认条件为“连续”关联
    if self.state == TrackState::Tentative || self.time_since_update > max_age {
      self.state = TrackState::Deleted;
    }
  }

  fn push_centroid(&mut self) {
    let [x1, y1, x2, y2] = self.bbox;
    if self.trajectory.len() >= TRAJECTORY_CAPACITY {
      self.trajectory.remove(0);
    }
    self.trajectory.push(((x1 + x2) / 2.0, (y1 + y2) / 2.0));
  }
}

fn ltwh_to_ltrb(bbox: &[f32; 4]) -> [f32; 4] {
  let [x, y, w, h] = *bbox;
  [x, y, x + w, y + h]
}

/// 多目标跟踪器 trait
///
/// 每帧恰好调用一次，传入该帧的完整检测集与原始帧
/// （外观建模类实现需要帧内容），返回全部当前轨迹（含各种状态），
/// 顺序不作保证。
pub trait Tracker {
  fn update(&mut self, detections: &[TrackerDetection], frame: &RgbImage) -> &[Track];
}
