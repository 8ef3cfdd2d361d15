// DSP utilities - Output hygiene and parameter smoothing for the click bus

/// Flush denormals to zero
///
/// Threshold 1e-15 sits far below 32-bit float noise; decaying click tails
/// would otherwise linger in the denormal range.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// tanh soft clip into [-1, 1]
///
/// Overlapping clicks (a long metallic tail under the next accent) can sum
/// past full scale; tanh keeps them musical instead of hard clipping.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Final stage applied to every mixed sample before it reaches a device or file
#[inline]
pub fn master_sample(mixed: f32, gain: f32) -> f32 {
    soft_clip(flush_denormals_to_zero(mixed) * gain)
}

/// One-pole smoother
///
/// y[n] = y[n-1] + α * (x[n] - y[n-1])
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// `time_constant_ms` is the time to reach ~63% of a step
    ///
    /// ```
    /// use beatkeeper::audio::dsp_utils::OnePoleSmoother;
    /// // 10ms smoothing at 48kHz
    /// let mut smoother = OnePoleSmoother::new(0.5, 10.0, 48000.0);
    /// assert_eq!(smoother.process(0.5), 0.5);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = time_constant_ms * 0.001 * sample_rate;
        let coefficient = if time_constant_samples > 0.0 {
            1.0 / time_constant_samples
        } else {
            1.0
        };

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }
}
