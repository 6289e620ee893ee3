//! Reassembles a decoded [`RealValue`] back into an `f64` by rebuilding its
//! textual form, mirroring the naive (and intentionally lossy-in-the-same-
//! way-as-encoding) decimal reconstruction used on the encode side.

use rde_diagnostics::RdeError;
use rde_sflv::RealValue;

/// # Errors
///
/// Returns [`RdeError::BejDecode`] if the reconstructed text does not parse
/// as a finite `f64`.
pub fn real_to_f64(real: RealValue) -> Result<f64, RdeError> {
    let mut text = format!("{}.", real.whole);
    for _ in 0..real.leading_zero_count {
        text.push('0');
    }
    text.push_str(&real.frac.to_string());
    text.push('e');
    text.push_str(&real.exponent.unwrap_or(0).to_string());
    text.parse::<f64>()
        .map_err(|_| RdeError::BejDecode {
            message: format!("malformed real value text {text}"),
        })
        .and_then(|value| {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(RdeError::BejDecode {
                    message: format!("real value {text} is not finite"),
                })
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_whole_and_frac() {
        let real = RealValue {
            whole: -3,
            leading_zero_count: 0,
            frac: 14,
            exponent: None,
        };
        assert!((real_to_f64(real).unwrap() - (-3.14)).abs() < 1e-9);
    }

    #[test]
    fn leading_zeros_shift_the_fraction() {
        let real = RealValue {
            whole: 1,
            leading_zero_count: 2,
            frac: 2,
            exponent: None,
        };
        assert!((real_to_f64(real).unwrap() - 1.002).abs() < 1e-9);
    }
}
