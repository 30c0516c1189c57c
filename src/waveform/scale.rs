// Linear and band scales for laying out the waveform

/// Maps a continuous domain onto a pixel range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Degenerate domains map everything to the middle of the range.
    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 { 0.5 } else { (value - d0) / span };
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        let t = if span == 0.0 { 0.5 } else { (pixel - r0) / span };
        d0 + t * (d1 - d0)
    }

    /// Roughly ten round-numbered ticks across the domain
    pub fn ticks(&self) -> Vec<f64> {
        self.ticks_n(10)
    }

    /// Round-numbered ticks (steps of 1, 2 or 5 times a power of ten),
    /// approximately `count` of them
    pub fn ticks_n(&self, count: usize) -> Vec<f64> {
        let (mut start, mut stop) = self.domain;
        if count == 0 || !start.is_finite() || !stop.is_finite() {
            return Vec::new();
        }
        if start == stop {
            return vec![start];
        }
        let reverse = stop < start;
        if reverse {
            std::mem::swap(&mut start, &mut stop);
        }

        let step = (stop - start) / count as f64;
        let power = step.log10().floor();
        let error = step / 10f64.powf(power);
        let factor = if error >= 50f64.sqrt() {
            10.0
        } else if error >= 10f64.sqrt() {
            5.0
        } else if error >= 2f64.sqrt() {
            2.0
        } else {
            1.0
        };

        // Negative powers divide by an integer to keep ticks like 0.1 exact
        let mut ticks: Vec<f64> = if power < 0.0 {
            let inv = 10f64.powf(-power) / factor;
            let lo = (start * inv).ceil() as i64;
            let hi = (stop * inv).floor() as i64;
            (lo..=hi).map(|i| i as f64 / inv).collect()
        } else {
            let inc = factor * 10f64.powf(power);
            let lo = (start / inc).ceil() as i64;
            let hi = (stop / inc).floor() as i64;
            (lo..=hi).map(|i| i as f64 * inc).collect()
        };

        if reverse {
            ticks.reverse();
        }
        ticks
    }
}

/// Splits a pixel range into equal bands, one per item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    count: usize,
    range: (f64, f64),
}

impl BandScale {
    pub fn new(count: usize, range: (f64, f64)) -> Self {
        Self { count, range }
    }

    pub fn bandwidth(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.range.1 - self.range.0) / self.count as f64
        }
    }

    /// Left edge of band `index`
    pub fn start(&self, index: usize) -> f64 {
        self.range.0 + index as f64 * self.bandwidth()
    }

    pub fn center(&self, index: usize) -> f64 {
        self.start(index) + self.bandwidth() / 2.0
    }
}
