//! Customer feedback
//!
//! Feedback is write-once: it is validated, sent to the remote API and read
//! back for the summary. Nothing is cached locally.

use crate::error::Result;
use crate::gateway::QueueGateway;
use crate::types::{Feedback, FeedbackCategory};
use crate::validation::FeedbackRequest;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Aggregate view over all feedback entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackSummary {
    pub total: usize,
    /// Mean rating rounded to one decimal, 0.0 when empty
    pub average_rating: f64,
    /// Entry count per category; every category is present
    pub by_category: BTreeMap<FeedbackCategory, usize>,
    /// Entry count per rating, index 0 holding rating 1
    pub rating_histogram: [usize; 5],
}

/// Summarize feedback entries
pub fn summarize(entries: &[Feedback]) -> FeedbackSummary {
    let mut by_category: BTreeMap<FeedbackCategory, usize> = FeedbackCategory::ALL
        .into_iter()
        .map(|category| (category, 0))
        .collect();
    let mut rating_histogram = [0usize; 5];
    let mut rating_sum = 0u64;

    for entry in entries {
        *by_category.entry(entry.category).or_insert(0) += 1;
        if (1..=5).contains(&entry.rating) {
            rating_histogram[usize::from(entry.rating - 1)] += 1;
        }
        rating_sum += u64::from(entry.rating);
    }

    let average_rating = if entries.is_empty() {
        0.0
    } else {
        let mean = rating_sum as f64 / entries.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    FeedbackSummary {
        total: entries.len(),
        average_rating,
        by_category,
        rating_histogram,
    }
}

/// Validate and submit a feedback entry
pub async fn submit_feedback(
    gateway: &dyn QueueGateway,
    request: FeedbackRequest,
) -> Result<Feedback> {
    let feedback = request.validate()?;
    let created = gateway.create_feedback(feedback).await?;
    info!(
        "Recorded {} feedback {} (rating {})",
        created.category, created.id, created.rating
    );
    Ok(created)
}

/// All feedback entries as returned by the remote, newest first
pub async fn list_feedback(gateway: &dyn QueueGateway) -> Result<Vec<Feedback>> {
    gateway.list_feedback().await
}
