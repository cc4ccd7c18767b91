use std::path::Path;

use ffmpeg_next::format::context::Input;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, SourceInfo, SourceSpec};

/// Capture backends probed, in order, when opening a camera.
#[cfg(target_os = "linux")]
const CAPTURE_FORMATS: &[&str] = &["v4l2", "video4linux2"];
#[cfg(target_os = "macos")]
const CAPTURE_FORMATS: &[&str] = &["avfoundation"];
#[cfg(target_os = "windows")]
const CAPTURE_FORMATS: &[&str] = &["dshow"];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_FORMATS: &[&str] = &[];

/// Reads frames from a capture device or a video file via ffmpeg-next.
///
/// Every decoded frame is converted to RGB24 and wrapped in a [`Frame`].
/// Decoder state lives in the reader so frames can be pulled one at a time
/// without borrowing the reader for the whole session.
pub struct FfmpegReader {
    session: Option<DecodeSession>,
}

struct DecodeSession {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegReader {
    fn open(&mut self, spec: &SourceSpec) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.close();

        let ictx = match spec {
            SourceSpec::File(path) => ffmpeg_next::format::input(path)?,
            SourceSpec::Camera(device) => open_camera(device)?,
        };

        let (session, info) = DecodeSession::start(ictx)?;
        log::info!(
            "Opened {spec}: {}x{} @ {:.1} fps ({})",
            info.width,
            info.height,
            info.fps,
            info.codec
        );
        self.session = Some(session);
        Ok(info)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        match self.session.as_mut() {
            Some(session) => session.next_frame(),
            None => Some(Err("FfmpegReader: not opened".into())),
        }
    }

    fn close(&mut self) {
        self.session = None;
    }
}

fn open_camera(device: &str) -> Result<Input, Box<dyn std::error::Error>> {
    ffmpeg_next::device::register_all();

    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name().split(',').any(|n| CAPTURE_FORMATS.contains(&n)))
        .ok_or("No camera capture backend available in this ffmpeg build")?;

    let ctx = ffmpeg_next::format::open_with(
        Path::new(device),
        &ffmpeg_next::format::Format::Input(format),
        ffmpeg_next::Dictionary::new(),
    )?;
    match ctx {
        ffmpeg_next::format::context::Context::Input(input) => Ok(input),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("{device} did not open as an input").into())
        }
    }
}

impl DecodeSession {
    fn start(ictx: Input) -> Result<(Self, SourceInfo), Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let info = SourceInfo {
            width,
            height,
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
        };

        Ok((
            Self {
                ictx,
                decoder,
                scaler,
                stream_index,
                width,
                height,
                frame_index: 0,
                flushing: false,
                done: false,
            },
            info,
        ))
    }

    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }

    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
