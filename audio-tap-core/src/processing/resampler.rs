/// Linear-interpolation resampler that keeps its read position across blocks.
///
/// Each block is interpolated as a continuation of the previous one: the last
/// input sample of every channel is carried over and the fractional read
/// position is kept, so output length tracks `total_input * target / source`
/// no matter how the input is split into cycles.
#[derive(Debug, Clone, Default)]
pub struct StreamResampler {
    /// Read position of the next output frame, in input frames relative to the
    /// first frame of the next block. `-1.0..0.0` interpolates from the carry.
    position: f64,
    carry: Vec<f32>,
}

impl StreamResampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the carried samples and read position.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.carry.clear();
    }

    /// Resample one block of planar channels (all of equal length).
    ///
    /// May return zero-length channels when a block is too short to reach
    /// the next output frame.
    pub fn process(&mut self, channels: &[Vec<f32>], source_rate: f64, target_rate: f64) -> Vec<Vec<f32>> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if channels.is_empty() || frames == 0 || source_rate <= 0.0 || target_rate <= 0.0 {
            return vec![Vec::new(); channels.len()];
        }
        if self.carry.len() != channels.len() {
            self.reset();
        }

        let step = source_rate / target_rate;
        let last = (frames - 1) as f64;
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity((frames as f64 / step) as usize + 1); channels.len()];

        let mut position = self.position;
        while position < last {
            let base = position.floor();
            let fraction = (position - base) as f32;
            let index = base as isize;
            for (ch, samples) in channels.iter().enumerate() {
                let current = if index < 0 { self.carry[ch] } else { samples[index as usize] };
                let next = samples[(index + 1) as usize];
                output[ch].push(current * (1.0 - fraction) + next * fraction);
            }
            position += step;
        }

        self.position = position - frames as f64;
        self.carry = channels.iter().map(|samples| samples[frames - 1]).collect();
        output
    }
}
