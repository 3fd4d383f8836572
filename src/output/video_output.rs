// 该文件是 Zhuiying （追影） 项目的一部分。
// src/output/video_output.rs - 视频文件输出
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
use ffmpeg_next::format::{Pixel, output};
use ffmpeg_next::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::{Rational, codec};
use image::RgbImage;

use super::OutputWriter;

/// 视频文件输出
///
/// 将已标注的帧编码为 H.264（不可用时退回 MPEG4）视频文件。
pub struct VideoOutput {
  output_context: ffmpeg::format::context::Output,
  encoder: ffmpeg::encoder::Video,
  /// 像素格式转换（RGB24 -> YUV420P）
  scaler: ScalingContext,
  width: u32,
  height: u32,
  fps: f64,
  frame_index: u64,
  stream_index: usize,
  time_base: Rational,
  finished: bool,
}

impl VideoOutput {
  /// 创建视频输出
  pub fn new(output_path: &str, width: u32, height: u32, fps: f64) -> Result<Self> {
    ffmpeg::init().context("无法初始化 FFmpeg")?;

    let mut output_context =
      output(&output_path).with_context(|| format!("无法创建输出文件: {}", output_path))?;

    let codec = ffmpeg::encoder::find(codec::Id::H264)
      .or_else(|| ffmpeg::encoder::find(codec::Id::MPEG4))
      .context("找不到视频编码器")?;

    let mut stream = output_context.add_stream(codec)?;
    let stream_index = stream.index();

    let encoder_context = ffmpeg::codec::context::Context::new_with_codec(codec);
    let mut encoder = encoder_context.encoder().video()?;

    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_frame_rate(Some(Rational::new(fps as i32, 1)));
    encoder.set_time_base(Rational::new(1, fps as i32));

    let encoder = encoder.open()?;
    stream.set_parameters(&encoder);

    let time_base = stream.time_base();

    output_context.write_header()?;

    let scaler = ScalingContext::get(
      Pixel::RGB24,
      width,
      height,
      Pixel::YUV420P,
      width,
      height,
      Flags::BILINEAR,
    )?;

    Ok(Self {
      output_context,
      encoder,
      scaler,
      width,
      height,
      fps,
      frame_index: 0,
      stream_index,
      time_base,
      finished: false,
    })
  }

  /// 编码并写入帧，None 表示刷新编码器
  fn encode_frame(&mut self, frame: Option<&Video>) -> Result<()> {
    if let Some(f) = frame {
      self.encoder.send_frame(f)?;
    } else {
      self.encoder.send_eof()?;
    }

    let mut packet = ffmpeg::Packet::empty();
    while self.encoder.receive_packet(&mut packet).is_ok() {
      packet.set_stream(self.stream_index);
      packet.rescale_ts(Rational::new(1, self.fps as i32), self.time_base);
      packet.write_interleaved(&mut self.output_context)?;
    }

    Ok(())
  }
}

impl OutputWriter for VideoOutput {
  fn write_frame(&mut self, image: &RgbImage) -> Result<()> {
    let mut rgb_frame = Video::new(Pixel::RGB24, self.width, self.height);
    let data = image.as_raw();
    let stride = rgb_frame.stride(0);
    let width = self.width as usize;
    let height = self.height as usize;

    // 复制数据，处理行对齐
    let frame_data = rgb_frame.data_mut(0);
    for y in 0..height {
      let src_start = y * width * 3;
      let dst_start = y * stride;
      frame_data[dst_start..dst_start + width * 3]
        .copy_from_slice(&data[src_start..src_start + width * 3]);
    }

    let mut yuv_frame = Video::empty();
    self.scaler.run(&rgb_frame, &mut yuv_frame)?;

    yuv_frame.set_pts(Some(self.frame_index as i64));
    self.frame_index += 1;

    self.encode_frame(Some(&yuv_frame))
  }

  fn finish(&mut self) -> Result<()> {
    if self.finished {
      return Ok(());
    }
    self.finished = true;

    // 刷新编码器并写入文件尾
    self.encode_frame(None)?;
    self.output_context.write_trailer()?;

    Ok(())
  }
}
