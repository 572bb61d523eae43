//! Aggregate: averaged readings over a device and time window.

use serde::{Deserialize, Serialize};

/// Average humidity and temperature over a `(device_id, [start, end])` window.
///
/// Both fields are `None` when the window holds no readings, so an empty
/// window is never confused with a genuine average of zero. Values are
/// rounded to two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub average_humidity: Option<f64>,
    pub average_temperature: Option<f64>,
}

impl Aggregate {
    /// The "no data" aggregate for an empty window.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an aggregate from raw (unrounded) means.
    #[must_use]
    pub fn from_means(humidity: Option<f64>, temperature: Option<f64>) -> Self {
        Self {
            average_humidity: humidity.map(round2),
            average_temperature: temperature.map(round2),
        }
    }

    /// Whether the window contained no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.average_humidity.is_none() && self.average_temperature.is_none()
    }
}

/// Round to two decimal places, halves away from zero.
///
/// Rounding happens on the shortest 15 significant digit decimal form of
/// `value`, so a mean such as `1.005` (stored as `1.00499999..`) rounds up
/// like its decimal spelling does.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let repr = format!("{value:.14e}");
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return value;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value;
    };
    let negative = mantissa.starts_with('-');
    let Ok(digits) = mantissa
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse::<i64>()
    else {
        return value;
    };

    // `digits` holds value * 10^(14 - exponent); drop down to hundredths.
    let Ok(shift) = u32::try_from(12 - exponent) else {
        // Nothing below the hundredths survives at this magnitude.
        return value;
    };
    let hundredths = if shift > 15 {
        0
    } else {
        let divisor = 10_i64.pow(shift);
        let quotient = digits / divisor;
        if 2 * (digits % divisor) >= divisor {
            quotient + 1
        } else {
            quotient
        }
    };

    #[allow(clippy::cast_precision_loss)]
    let magnitude = hundredths as f64 / 100.0;
    if negative { -magnitude } else { magnitude }
}
