//! Log compression and CMVN

use ndarray::{Array3, Axis};

/// Additive floor applied before the log, keeps `ln(0)` finite
pub const LOG_FLOOR: f32 = 1e-6;

/// Apply `ln(LOG_FLOOR + x)` element-wise
pub fn log_with_floor(x: &mut Array3<f32>) {
    x.mapv_inplace(|v| (LOG_FLOOR + v).ln());
}

/// Cepstral mean and variance normalization along `axis`
///
/// Each lane along `axis` is shifted to zero mean and scaled by its
/// population standard deviation. Lanes with zero deviation become all
/// zeros. An empty axis leaves the tensor untouched.
pub fn cmvn(x: &mut Array3<f32>, axis: Axis) {
    let len = x.len_of(axis);
    if len == 0 {
        return;
    }

    for mut lane in x.lanes_mut(axis) {
        let mean = lane.iter().map(|&v| v as f64).sum::<f64>() / len as f64;
        let variance = lane
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / len as f64;
        let stddev = variance.sqrt();

        lane.mapv_inplace(|v| {
            if stddev == 0.0 {
                0.0
            } else {
                ((v as f64 - mean) / stddev) as f32
            }
        });
    }
}
