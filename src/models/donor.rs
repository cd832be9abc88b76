use serde::Serialize;

use crate::entities::donor;

/// Client-facing projection of a donor record. Carries no email field;
/// listings and submit echoes both use this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonorView {
    pub first_name: String,
    pub last_name: String,
    pub amount: f64,
    pub thoughts: String,
    pub date: String,
    #[serde(rename = "contributionsCount")]
    pub contributions_count: i32,
    pub publish_name: bool,
}

impl From<donor::Model> for DonorView {
    fn from(record: donor::Model) -> Self {
        Self {
            first_name: record.first_name,
            last_name: record.last_name,
            amount: record.amount,
            thoughts: record.thoughts,
            date: record.contribution_date,
            contributions_count: record.contributions_count,
            publish_name: record.publish_name,
        }
    }
}
