//! Decomposition of a JSON number into the `whole | leading_zero_count |
//! frac` shape BEJ's `Real` format expects, by splitting its textual
//! representation on `.` the way the reference encoder does (rather than
//! trying to recover decimal digits from the `f64` bit pattern).

use rde_diagnostics::RdeError;
use rde_sflv::RealValue;
use serde_json::Value;

/// BEJ `Real` values retain at most this many fractional digits; inputs
/// with a longer fractional part are truncated, matching the reference
/// encoder's fixed precision window.
const MAX_FRAC_DIGITS: usize = 16;

/// # Errors
///
/// Returns [`RdeError::BejEncode`] if `value` is not a JSON number, or its
/// whole part does not fit in an `i64`.
pub fn json_number_to_real(value: &Value) -> Result<RealValue, RdeError> {
    let number = value.as_number().ok_or_else(|| RdeError::BejEncode {
        message: "real value must be a JSON number".to_string(),
    })?;
    let text = number.to_string();
    let (whole_str, frac_str) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.as_str(), ""),
    };

    let whole: i64 = whole_str.parse().map_err(|_| RdeError::BejEncode {
        message: format!("real value {text} has a whole part that does not fit in a 64-bit integer"),
    })?;

    let mut frac_str = frac_str;
    let mut leading_zero_count = 0u64;
    while let Some(rest) = frac_str.strip_prefix('0') {
        leading_zero_count += 1;
        frac_str = rest;
    }
    let truncated = &frac_str[..frac_str.len().min(MAX_FRAC_DIGITS)];
    let frac: u64 = if truncated.is_empty() {
        0
    } else {
        truncated.parse().map_err(|_| RdeError::BejEncode {
            message: format!("real value {text} has a fractional part that does not fit in a 64-bit integer"),
        })?
    };

    Ok(RealValue {
        whole,
        leading_zero_count,
        frac,
        exponent: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_whole_and_frac() {
        let real = json_number_to_real(&json!(-3.14)).unwrap();
        assert_eq!(real.whole, -3);
        assert_eq!(real.leading_zero_count, 0);
        assert_eq!(real.frac, 14);
        assert_eq!(real.exponent, None);
    }

    #[test]
    fn counts_leading_zeros_in_fraction() {
        let real = json_number_to_real(&json!(1.002)).unwrap();
        assert_eq!(real.whole, 1);
        assert_eq!(real.leading_zero_count, 2);
        assert_eq!(real.frac, 2);
    }

    #[test]
    fn integer_valued_number_has_no_fraction() {
        let real = json_number_to_real(&json!(42)).unwrap();
        assert_eq!(real.whole, 42);
        assert_eq!(real.frac, 0);
        assert_eq!(real.leading_zero_count, 0);
    }

    #[test]
    fn non_number_is_rejected() {
        assert!(json_number_to_real(&json!("42")).is_err());
    }
}
