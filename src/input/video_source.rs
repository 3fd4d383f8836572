// 该文件是 Zhuiying （追影） 项目的一部分。
// src/input/video_source.rs - 视频文件输入源
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
use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{Pixel, input};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use image::RgbImage;

use super::{Frame, InputSource, InputSourceType};

/// 视频文件输入源
///
/// 通过 FFmpeg 解码视频流，逐帧转换为 RGB24。
pub struct VideoSource {
  input_context: ffmpeg::format::context::Input,
  video_stream_index: usize,
  decoder: ffmpeg::decoder::Video,
  /// 像素格式转换（解码格式 -> RGB24）
  scaler: ScalingContext,
  frame_index: u64,
  width: u32,
  height: u32,
  /// 容器报告的帧率，缺失或非法时为 None
  fps: Option<f64>,
  /// 流时间基准（秒）
  time_base: f64,
  finished: bool,
}

impl VideoSource {
  /// 打开视频文件并创建输入源
  pub fn new(path: &str) -> Result<Self> {
    ffmpeg::init().context("无法初始化 FFmpeg")?;

    let input_context = input(&path).with_context(|| format!("无法打开视频文件: {}", path))?;

    let video_stream = input_context
      .streams()
      .best(Type::Video)
      .context("找不到视频流")?;
    let video_stream_index = video_stream.index();

    let decoder_context =
      ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
    let decoder = decoder_context.decoder().video()?;

    let width = decoder.width();
    let height = decoder.height();

    // 部分容器报告 0/1 或 0/0 的帧率，此时交由输出侧兜底
    let rate = video_stream.avg_frame_rate();
    let fps = if rate.numerator() > 0 && rate.denominator() > 0 {
      Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
      None
    };

    let time_base = video_stream.time_base();
    let time_base = time_base.numerator() as f64 / time_base.denominator() as f64;

    let scaler = ScalingContext::get(
      decoder.format(),
      width,
      height,
      Pixel::RGB24,
      width,
      height,
      Flags::BILINEAR,
    )?;

    Ok(Self {
      input_context,
      video_stream_index,
      decoder,
      scaler,
      frame_index: 0,
      width,
      height,
      fps,
      time_base,
      finished: false,
    })
  }

  /// 解码下一帧，流结束时返回 None
  fn decode_next(&mut self) -> Result<Option<Video>> {
    let mut decoded = Video::empty();
    loop {
      if self.decoder.receive_frame(&mut decoded).is_ok() {
        return Ok(Some(decoded));
      }

      let mut packets = self.input_context.packets();
      loop {
        match packets.next() {
          Some((stream, packet)) => {
            if stream.index() == self.video_stream_index {
              self.decoder.send_packet(&packet)?;
              break;
            }
          }
          None => {
            self.decoder.send_eof()?;
            if self.decoder.receive_frame(&mut decoded).is_ok() {
              return Ok(Some(decoded));
            }
            return Ok(None);
          }
        }
      }
    }
  }

  /// 将解码帧（含行对齐）转换为紧凑的 RGB 图像
  fn to_rgb_image(&mut self, decoded: &Video) -> Result<RgbImage> {
    let mut rgb_frame = Video::empty();
    self.scaler.run(decoded, &mut rgb_frame)?;

    let data = rgb_frame.data(0);
    let stride = rgb_frame.stride(0);
    let width = self.width as usize;
    let height = self.height as usize;

    let mut image_data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
      let row_start = y * stride;
      image_data.extend_from_slice(&data[row_start..row_start + width * 3]);
    }

    RgbImage::from_raw(self.width, self.height, image_data).context("无法创建 RGB 图像")
  }
}

impl Iterator for VideoSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }

    match self.decode_next() {
      Ok(Some(decoded)) => {
        let image = match self.to_rgb_image(&decoded) {
          Ok(image) => image,
          Err(e) => return Some(Err(e)),
        };

        let timestamp_ms = decoded
          .timestamp()
          .map_or(0, |ts| (ts as f64 * self.time_base * 1000.0) as u64);

        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms,
        };
        self.frame_index += 1;
        Some(Ok(frame))
      }
      Ok(None) => {
        self.finished = true;
        None
      }
      Err(e) => {
        self.finished = true;
        Some(Err(e))
      }
    }
  }
}

impl InputSource for VideoSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Video
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    self.fps
  }
}
