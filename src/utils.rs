//! Utility functions for the queue service

use uuid::Uuid;

/// Generate a new unique customer ID
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new unique feedback ID
pub fn generate_feedback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Round a minute value to the nearest whole minute, halves rounding up
pub fn round_minutes(minutes: f64) -> i64 {
    (minutes + 0.5).floor() as i64
}

/// Mean of a set of minute samples, rounded; 0 when there are none
pub fn rounded_mean(samples: &[f64]) -> i64 {
    if samples.is_empty() {
        return 0;
    }
    round_minutes(samples.iter().sum::<f64>() / samples.len() as f64)
}
