//! Media tooling for the TrimIQ pipeline.
//!
//! All heavy lifting is delegated to external tools (ffmpeg, ffprobe and the
//! whisper CLI) driven as subprocesses.

pub mod assemble;
pub mod error;
pub mod probe;
pub mod transcribe;

pub use assemble::{concat_clips, extract_keyframe};
pub use error::{MediaError, MediaResult};
pub use probe::{duration_minutes, probe_media, MediaInfo};
pub use transcribe::{transcribe, TranscribeOptions};
