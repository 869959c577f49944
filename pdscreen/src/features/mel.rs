//! Mel filterbank and DCT tables
//!
//! Both tables are computed once per extractor and are read-only afterwards,
//! so a single extractor can be shared across concurrent requests.

/// Convert frequency in Hz to the mel scale (HTK formula)
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert a mel value back to Hz
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over a one-sided power spectrum
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// `filters[m][k]` is the weight of FFT bin `k` in mel band `m`
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build `num_filters` triangles evenly spaced in mel between `fmin` and `fmax`
    ///
    /// `n_fft` is the FFT size; the spectrum it weights has `n_fft / 2 + 1` bins.
    pub fn new(n_fft: usize, sample_rate: u32, num_filters: usize, fmin: f32, fmax: f32) -> Self {
        let num_bins = n_fft / 2 + 1;
        let bin_hz = sample_rate as f32 / n_fft as f32;

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let step = (mel_max - mel_min) / (num_filters + 1) as f32;
        let edges: Vec<f32> = (0..num_filters + 2)
            .map(|i| mel_to_hz(mel_min + step * i as f32))
            .collect();

        let filters = (0..num_filters)
            .map(|m| {
                let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
                (0..num_bins)
                    .map(|k| {
                        let freq = k as f32 * bin_hz;
                        let rising = (freq - left) / (center - left).max(f32::EPSILON);
                        let falling = (right - freq) / (right - center).max(f32::EPSILON);
                        rising.min(falling).max(0.0)
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    /// Weighted band energies for one power spectrum
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|weights| weights.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// Orthonormal DCT-II table producing `num_coeffs` outputs from `num_inputs` inputs
#[derive(Debug, Clone)]
pub struct DctTable {
    basis: Vec<Vec<f32>>,
}

impl DctTable {
    pub fn new(num_coeffs: usize, num_inputs: usize) -> Self {
        let n = num_inputs as f32;
        let basis = (0..num_coeffs)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..num_inputs)
                    .map(|i| {
                        scale
                            * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / n).cos()
                    })
                    .collect()
            })
            .collect();

        Self { basis }
    }

    pub fn num_coeffs(&self) -> usize {
        self.basis.len()
    }

    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}
