pub mod ffmpeg_reader;
pub mod png_frame_sink;
