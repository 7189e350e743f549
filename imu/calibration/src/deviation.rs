//! Running mean and standard deviation (Welford's update).

use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviationCalc {
    mean: f64,
    m2: f64,
    count: usize,
}

impl DeviationCalc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let prior = self.mean;
        self.mean += (value - prior) / self.count as f64;
        self.m2 += (value - prior) * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation, 0 before the first sample.
    pub fn deviation(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).sqrt()
    }
}

/// Per-axis and magnitude statistics over 3-vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviationCalc3D {
    x: DeviationCalc,
    y: DeviationCalc,
    z: DeviationCalc,
    magnitude: DeviationCalc,
}

impl DeviationCalc3D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: &Vector3<f64>) {
        self.x.add(value.x);
        self.y.add(value.y);
        self.z.add(value.z);
        self.magnitude.add(value.norm());
    }

    pub fn count(&self) -> usize {
        self.x.count()
    }

    pub fn mean(&self) -> Vector3<f64> {
        Vector3::new(self.x.mean(), self.y.mean(), self.z.mean())
    }

    pub fn deviation(&self) -> Vector3<f64> {
        Vector3::new(self.x.deviation(), self.y.deviation(), self.z.deviation())
    }

    pub fn mean_magnitude(&self) -> f64 {
        self.magnitude.mean()
    }

    pub fn magnitude_deviation(&self) -> f64 {
        self.magnitude.deviation()
    }
}
