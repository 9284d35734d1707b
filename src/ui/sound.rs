/// Sound engine: procedural chiptune effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_step: Arc<Vec<u8>>,
        sfx_push: Arc<Vec<u8>>,
        sfx_door: Arc<Vec<u8>>,
        sfx_undo: Arc<Vec<u8>>,
        sfx_reset: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
        sfx_pack_complete: Arc<Vec<u8>>,
        sfx_select: Arc<Vec<u8>>,
        sfx_rejected: Arc<Vec<u8>>,
        sfx_dialog: Arc<Vec<u8>>,
        sfx_page: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            // ── Generate all sound buffers ──
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_step: Arc::new(make_wav(&gen_blip(660.0, 0.02, 0.12))),
                sfx_push: Arc::new(make_wav(&gen_push())),
                sfx_door: Arc::new(make_wav(&gen_notes(&[(880.0, 0.05), (1175.0, 0.05), (1760.0, 0.12)], 0.25))),
                sfx_undo: Arc::new(make_wav(&gen_sweep(700.0, 400.0, 0.06))),
                sfx_reset: Arc::new(make_wav(&gen_sweep(600.0, 200.0, 0.15))),
                sfx_complete: Arc::new(make_wav(&gen_notes(
                    &[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.25)],
                    0.3,
                ))),
                sfx_pack_complete: Arc::new(make_wav(&gen_notes(
                    &[(523.0, 0.12), (659.0, 0.12), (784.0, 0.12), (1047.0, 0.12), (784.0, 0.12), (1047.0, 0.4)],
                    0.3,
                ))),
                sfx_select: Arc::new(make_wav(&gen_blip(990.0, 0.03, 0.2))),
                sfx_rejected: Arc::new(make_wav(&gen_buzz())),
                sfx_dialog: Arc::new(make_wav(&gen_notes(&[(784.0, 0.06), (523.0, 0.1)], 0.25))),
                sfx_page: Arc::new(make_wav(&gen_blip(1320.0, 0.025, 0.15))),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_step(&self) { self.play(&self.sfx_step); }
        pub fn play_push(&self) { self.play(&self.sfx_push); }
        pub fn play_door(&self) { self.play(&self.sfx_door); }
        pub fn play_undo(&self) { self.play(&self.sfx_undo); }
        pub fn play_reset(&self) { self.play(&self.sfx_reset); }
        pub fn play_complete(&self) { self.play(&self.sfx_complete); }
        pub fn play_pack_complete(&self) { self.play(&self.sfx_pack_complete); }
        pub fn play_select(&self) { self.play(&self.sfx_select); }
        pub fn play_rejected(&self) { self.play(&self.sfx_rejected); }
        pub fn play_dialog(&self) { self.play(&self.sfx_dialog); }
        pub fn play_page(&self) { self.play(&self.sfx_page); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sample_count(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = sample_count(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Note sequence with a touch of 2nd and 3rd harmonic for a retro feel
    fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in notes {
            let n = sample_count(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * volume);
            }
        }
        // Fade the tail
        let fade_len = samples.len() / 5;
        let total = samples.len();
        for (k, s) in samples[total - fade_len..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade_len as f32;
        }
        samples
    }

    /// Linear pitch sweep
    fn gen_sweep(from: f32, to: f32, duration: f32) -> Vec<f32> {
        let n = sample_count(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * TAU).sin() * env * 0.25
            })
            .collect()
    }

    /// Push: low thud with a little noise
    fn gen_push() -> Vec<f32> {
        let n = sample_count(0.07);
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * (140.0 - t * 60.0) * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.7 + noise * 0.3) * (1.0 - t).powf(1.5) * 0.35
            })
            .collect()
    }

    /// Rejected input: short square buzz
    fn gen_buzz() -> Vec<f32> {
        let n = sample_count(0.05);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let square = if (t * 110.0 * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                square * (1.0 - i as f32 / n as f32) * 0.12
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_step(&self) {}
    pub fn play_push(&self) {}
    pub fn play_door(&self) {}
    pub fn play_undo(&self) {}
    pub fn play_reset(&self) {}
    pub fn play_complete(&self) {}
    pub fn play_pack_complete(&self) {}
    pub fn play_select(&self) {}
    pub fn play_rejected(&self) {}
    pub fn play_dialog(&self) {}
    pub fn play_page(&self) {}
}
