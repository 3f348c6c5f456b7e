pub mod processor;

pub use processor::{
    duration_ms, load_audio_file, resample, write_wav, ResampleQuality, Waveform,
};
