/// PCM sample helpers shared by the tap pipeline and input backends.
///
/// All operations work on interleaved `&[f32]` buffers with no platform
/// dependencies.

/// Convert one f32 sample `[-1.0, 1.0]` to 16-bit PCM. Out-of-range values are clamped.
pub fn to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

/// Convert f32 samples to 16-bit PCM.
pub fn convert_to_int16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| to_i16(s)).collect()
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Re-layout interleaved audio from `from` channels to `to` channels.
///
/// Mono is duplicated into every output channel; anything else is
/// downmixed to mono first.
pub fn adapt_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || to == 0 {
        return samples.to_vec();
    }
    let mono = downmix_to_mono(samples, from);
    if to == 1 {
        return mono;
    }
    let mut out = Vec::with_capacity(mono.len() * to);
    for sample in mono {
        out.extend(std::iter::repeat(sample).take(to));
    }
    out
}

/// Linear interpolation resampling of interleaved audio.
///
/// Returns input unchanged if rates match.
pub fn resample(samples: &[f32], channels: usize, source_rate: f64, target_rate: f64) -> Vec<f32> {
    if (source_rate - target_rate).abs() < 0.01 || samples.is_empty() || channels == 0 {
        return samples.to_vec();
    }

    let frame_count = samples.len() / channels;
    let ratio = target_rate / source_rate;
    let output_frames = (frame_count as f64 * ratio) as usize;
    if output_frames == 0 {
        return Vec::new();
    }

    let mut output = vec![0.0f32; output_frames * channels];
    for i in 0..output_frames {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        for ch in 0..channels {
            output[i * channels + ch] = if index + 1 < frame_count {
                samples[index * channels + ch] * (1.0 - fraction)
                    + samples[(index + 1) * channels + ch] * fraction
            } else if index < frame_count {
                samples[index * channels + ch]
            } else {
                0.0
            };
        }
    }
    output
}
