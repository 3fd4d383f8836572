// 该文件是 Zhuiying （追影） 项目的一部分。
// src/detector/yolov8.rs - YOLOv8 ONNX 目标检测器
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

use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

use super::{COCO_CLASSES, ClassNames, Detection, Detector};

/// 模型输入边长
const INPUT_SIZE: u32 = 640;
/// 边界框属性数（4 坐标 + 80 类别分数）
const NUM_ATTRS: usize = 84;

/// YOLOv8 ONNX 目标检测器
///
/// 通过 onnxruntime 消费预训练的 YOLOv8 模型，输出张量布局为
/// `[1, 84, 8400]`（按行存储 cx, cy, w, h 与 80 个类别分数）。
pub struct Yolov8Detector {
  /// ONNX 推理会话
  session: Session,
  /// 置信度阈值
  confidence_threshold: f32,
  /// NMS IOU 阈值
  nms_threshold: f32,
}

impl Yolov8Detector {
  /// 加载 ONNX 模型文件并创建检测器
  pub fn new(model_path: &str, confidence_threshold: f32, nms_threshold: f32) -> Result<Self> {
    let session = Session::builder()
      .context("无法创建 onnxruntime 会话")?
      .commit_from_file(model_path)
      .with_context(|| format!("无法加载模型: {}", model_path))?;

    Ok(Self {
      session,
      confidence_threshold,
      nms_threshold,
    })
  }

  /// 预处理图像：缩放到模型输入尺寸并转为 NCHW 归一化张量
  fn preprocess(&self, image: &RgbImage) -> Vec<f32> {
    let resized = image::imageops::resize(
      image,
      INPUT_SIZE,
      INPUT_SIZE,
      image::imageops::FilterType::Triangle,
    );

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let raw = resized.as_raw();
    let mut tensor_data = vec![0f32; 3 * plane];

    for idx in 0..plane {
      tensor_data[idx] = raw[idx * 3] as f32 / 255.0;
      tensor_data[plane + idx] = raw[idx * 3 + 1] as f32 / 255.0;
      tensor_data[2 * plane + idx] = raw[idx * 3 + 2] as f32 / 255.0;
    }

    tensor_data
  }

  /// 解码输出张量为像素坐标系下的检测结果
  fn postprocess(&self, data: &[f32], original_width: f32, original_height: f32) -> Vec<Detection> {
    let num_proposals = data.len() / NUM_ATTRS;
    let num_classes = NUM_ATTRS - 4;

    let scale_x = original_width / INPUT_SIZE as f32;
    let scale_y = original_height / INPUT_SIZE as f32;

    let mut detections = Vec::new();

    for i in 0..num_proposals {
      // 张量按属性行优先存储，同一候选框的属性跨行读取
      let mut max_class_score = 0.0f32;
      let mut max_class_id = 0usize;
      for class_id in 0..num_classes {
        let score = data[(4 + class_id) * num_proposals + i];
        if score > max_class_score {
          max_class_score = score;
          max_class_id = class_id;
        }
      }

      if max_class_score < self.confidence_threshold {
        continue;
      }

      let cx = data[i];
      let cy = data[num_proposals + i];
      let w = data[2 * num_proposals + i];
      let h = data[3 * num_proposals + i];

      detections.push(Detection {
        x1: (cx - w / 2.0) * scale_x,
        y1: (cy - h / 2.0) * scale_y,
        x2: (cx + w / 2.0) * scale_x,
        y2: (cy + h / 2.0) * scale_y,
        confidence: max_class_score,
        class_id: max_class_id,
      });
    }

    self.nms(detections)
  }

  /// 同类别非极大值抑制
  fn nms(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
    detections.sort_by(|a, b| {
      b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result: Vec<Detection> = Vec::new();

    while !detections.is_empty() {
      let best = detections.remove(0);

      detections.retain(|det| {
        if det.class_id != best.class_id {
          return true;
        }
        iou(&best, det) < self.nms_threshold
      });

      result.push(best);
    }

    result
  }
}

/// 计算两个角点坐标边界框的 IoU
fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.x1.max(b.x1);
  let y1 = a.y1.max(b.y1);
  let x2 = a.x2.min(b.x2);
  let y2 = a.y2.min(b.y2);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
  let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

impl ClassNames for Yolov8Detector {
  fn class_name(&self, class_id: usize) -> Option<&str> {
    COCO_CLASSES.get(class_id).copied()
  }
}

impl Detector for Yolov8Detector {
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
    let original_width = image.width() as f32;
    let original_height = image.height() as f32;

    let tensor_data = self.preprocess(image);
    let shape = [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
    let input_tensor = Tensor::from_array((shape, tensor_data.into_boxed_slice()))
      .context("无法创建输入张量")?;

    let outputs = self
      .session
      .run(ort::inputs!["images" => input_tensor])
      .context("YOLOv8 推理失败")?;

    let (_shape, data) = outputs["output0"]
      .try_extract_tensor::<f32>()
      .context("无法提取输出张量")?;

    Ok(self.postprocess(data, original_width, original_height))
  }
}
