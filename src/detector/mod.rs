// 该文件是 Zhuiying （追影） 项目的一部分。
// src/detector/mod.rs - 目标检测器接口
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

mod replay;
#[cfg(feature = "model_yolov8")]
mod yolov8;

pub use replay::ReplayDetector;
#[cfg(feature = "model_yolov8")]
pub use yolov8::Yolov8Detector;

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 单帧检测结果
///
/// 坐标为像素坐标系下的角点坐标（左上原点），每帧由检测器新生成，
/// 被跟踪器消费一次后即丢弃。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub x1: f32,
  /// 边界框左上角 y 坐标
  pub y1: f32,
  /// 边界框右下角 x 坐标
  pub x2: f32,
  /// 边界框右下角 y 坐标
  pub y2: f32,
  /// 置信度 (0.0 - 1.0)
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
}

/// 类别索引到类别名称的查询
pub trait ClassNames {
  /// 获取类别名称，未知类别返回 None
  fn class_name(&self, class_id: usize) -> Option<&str>;
}

/// 目标检测器 trait
///
/// 检测器被视为外部协作者（预训练模型），仅通过本接口消费；
/// 置信度阈值由检测器自身持有并应用。
pub trait Detector: ClassNames {
  /// 对一帧图像运行检测
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;
}
