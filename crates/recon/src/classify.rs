use crate::model::{CommissionStatus, Money};

/// Received share at or above which a commission counts as received.
pub const RECEIVED_THRESHOLD_PCT: f64 = 90.0;

/// `received / expected * 100`, clamped to `[0, ∞)`. Zero when nothing is expected.
pub fn received_percentage(received: Money, expected: Money) -> f64 {
    if expected.cents() <= 0 {
        return 0.0;
    }
    let pct = received.cents() as f64 / expected.cents() as f64 * 100.0;
    pct.max(0.0)
}

impl CommissionStatus {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= RECEIVED_THRESHOLD_PCT {
            Self::Received
        } else if pct > 0.0 {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_basic() {
        let pct = received_percentage(Money::from_cents(2168), Money::from_cents(10843));
        assert!((pct - 19.994).abs() < 0.001, "pct={pct}");
    }

    #[test]
    fn percentage_without_expected_is_zero() {
        assert_eq!(received_percentage(Money::from_cents(500), Money::ZERO), 0.0);
        assert_eq!(received_percentage(Money::from_cents(500), Money::from_cents(-100)), 0.0);
    }

    #[test]
    fn percentage_never_negative() {
        assert_eq!(received_percentage(Money::from_cents(-500), Money::from_cents(1000)), 0.0);
    }

    #[test]
    fn thresholds() {
        assert_eq!(CommissionStatus::from_percentage(90.0), CommissionStatus::Received);
        assert_eq!(CommissionStatus::from_percentage(100.01), CommissionStatus::Received);
        assert_eq!(CommissionStatus::from_percentage(89.999), CommissionStatus::Partial);
        assert_eq!(CommissionStatus::from_percentage(0.01), CommissionStatus::Partial);
        assert_eq!(CommissionStatus::from_percentage(0.0), CommissionStatus::Pending);
    }
}
