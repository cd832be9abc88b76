//! Contribution Ledger: upsert-by-email over the donor store.
//!
//! A submission for an unseen email creates a record; a submission for a
//! known email merges into the existing one. Merging accumulates the
//! amount, increments the contribution counter, replaces the free-text
//! remarks, date and publish flag, and retains the originally stored
//! donor name. Records are never deleted and counters never decrement.

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
    TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use crate::donor::{
    canonicalize_name, normalize_email, validate_amount, validate_contribution_date,
    validate_thoughts,
};
use crate::entities::donor;

/// A contribution as submitted by the caller, untrusted.
#[derive(Debug, Clone)]
pub struct NewContribution {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub amount: f64,
    pub thoughts: String,
    pub date: String,
    pub publish_name: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated,
}

#[derive(Debug)]
pub struct SubmitResult {
    pub outcome: SubmitOutcome,
    pub record: donor::Model,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("storage failure: {0}")]
    Storage(#[from] DbErr),
}

/// Owns the donor record store. The storage client is injected at
/// construction; there is no process-global handle.
#[derive(Clone)]
pub struct ContributionLedger {
    database: DatabaseConnection,
}

impl ContributionLedger {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    /// Validates the submission, then performs the merge-or-insert keyed by
    /// normalized email. Duplicate policy: merge.
    pub async fn submit(&self, input: NewContribution) -> Result<SubmitResult, LedgerError> {
        let update = validate(&input)?;

        // Two concurrent first submissions can both observe "absent"; the
        // loser hits the unique email index and retries as a merge.
        match self.try_submit(&update).await {
            Err(LedgerError::Storage(err)) if is_unique_violation(&err) => {
                debug!("concurrent first submission for email, retrying as merge");
                self.try_submit(&update).await
            }
            other => other,
        }
    }

    async fn try_submit(&self, update: &ValidatedContribution) -> Result<SubmitResult, LedgerError> {
        let txn = self.database.begin().await?;

        // Row lock serializes concurrent merges for the same email.
        let existing = donor::Entity::find()
            .filter(donor::Column::Email.eq(update.email.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let now = chrono::Utc::now().fixed_offset();
        let result = match existing {
            Some(record) => {
                let merged = merge_into(record, update, now);
                let record = merged.update(&txn).await?;
                assert!(
                    record.contributions_count >= 2,
                    "Merged record must count at least two submissions"
                );
                SubmitResult {
                    outcome: SubmitOutcome::Updated,
                    record,
                }
            }
            None => {
                let fresh = donor::ActiveModel {
                    id: NotSet,
                    first_name: Set(update.first_name.clone()),
                    last_name: Set(update.last_name.clone()),
                    email: Set(update.email.clone()),
                    amount: Set(update.amount),
                    thoughts: Set(update.thoughts.clone()),
                    contribution_date: Set(update.date.clone()),
                    publish_name: Set(update.publish_name),
                    contributions_count: Set(1),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                let record = fresh.insert(&txn).await?;
                SubmitResult {
                    outcome: SubmitOutcome::Created,
                    record,
                }
            }
        };
        txn.commit().await?;

        assert!(result.record.amount > 0.0, "Stored amount must stay positive");
        Ok(result)
    }

    /// Every stored record in insertion order. Callers project the email
    /// away before anything leaves the process.
    pub async fn list(&self) -> Result<Vec<donor::Model>, LedgerError> {
        let records = donor::Entity::find()
            .order_by_asc(donor::Column::Id)
            .all(&self.database)
            .await?;
        Ok(records)
    }
}

#[derive(Debug, Clone)]
struct ValidatedContribution {
    first_name: String,
    last_name: String,
    email: String,
    amount: f64,
    thoughts: String,
    date: String,
    publish_name: bool,
}

fn validate(input: &NewContribution) -> Result<ValidatedContribution, LedgerError> {
    let first_name = canonicalize_name(&input.first_name)
        .map_err(|err| field_error("first_name", err))?;
    let last_name =
        canonicalize_name(&input.last_name).map_err(|err| field_error("last_name", err))?;
    let email = normalize_email(&input.email).map_err(|err| field_error("email", err))?;
    let amount = validate_amount(input.amount).map_err(|err| field_error("amount", err))?;
    let thoughts =
        validate_thoughts(&input.thoughts).map_err(|err| field_error("thoughts", err))?;
    let date =
        validate_contribution_date(&input.date).map_err(|err| field_error("date", err))?;

    Ok(ValidatedContribution {
        first_name,
        last_name,
        email,
        amount,
        thoughts,
        date,
        publish_name: input.publish_name,
    })
}

fn field_error(field: &'static str, err: anyhow::Error) -> LedgerError {
    LedgerError::Validation {
        field,
        reason: err.to_string(),
    }
}

/// Merge policy: amount accumulates, the counter increments,
/// thoughts/date/publish flag take the submitted values, and the stored
/// name wins over the submitted one.
fn merge_into(
    existing: donor::Model,
    update: &ValidatedContribution,
    now: DateTimeWithTimeZone,
) -> donor::ActiveModel {
    assert!(
        existing.contributions_count >= 1,
        "Stored record must count at least one submission"
    );
    assert!(
        existing.contributions_count < i32::MAX,
        "Contribution counter would overflow"
    );

    let accumulated = existing.amount + update.amount;
    let count = existing.contributions_count + 1;

    let mut model = donor::ActiveModel::from(existing);
    model.amount = Set(accumulated);
    model.contributions_count = Set(count);
    model.thoughts = Set(update.thoughts.clone());
    model.contribution_date = Set(update.date.clone());
    model.publish_name = Set(update.publish_name);
    model.updated_at = Set(now);
    model
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(email: &str, amount: f64) -> NewContribution {
        NewContribution {
            first_name: "Asha".to_string(),
            last_name: "Gurung".to_string(),
            email: email.to_string(),
            amount,
            thoughts: "Stay strong".to_string(),
            date: "2026-08-05".to_string(),
            publish_name: true,
        }
    }

    fn stored(email: &str, amount: f64, count: i32) -> donor::Model {
        let now = chrono::Utc::now().fixed_offset();
        donor::Model {
            id: 1,
            first_name: "Original".to_string(),
            last_name: "Donor".to_string(),
            email: email.to_string(),
            amount,
            thoughts: "First thoughts".to_string(),
            contribution_date: "2026-01-01".to_string(),
            publish_name: false,
            contributions_count: count,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn validation_names_the_offending_field() {
        let cases = [
            (
                NewContribution {
                    email: "not-an-email".to_string(),
                    ..submission("a@x.com", 10.0)
                },
                "email",
            ),
            (
                NewContribution {
                    amount: -1.0,
                    ..submission("a@x.com", 10.0)
                },
                "amount",
            ),
            (
                NewContribution {
                    first_name: " ".to_string(),
                    ..submission("a@x.com", 10.0)
                },
                "first_name",
            ),
            (
                NewContribution {
                    date: "someday".to_string(),
                    ..submission("a@x.com", 10.0)
                },
                "date",
            ),
        ];

        for (input, expected_field) in cases {
            match validate(&input) {
                Err(LedgerError::Validation { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn validation_normalizes_the_email() {
        let validated = validate(&submission("  Donor@Example.COM ", 10.0)).expect("valid");
        assert_eq!(validated.email, "donor@example.com");
    }

    #[test]
    fn merge_accumulates_amount_and_count() {
        let now = chrono::Utc::now().fixed_offset();
        let update = validate(&submission("a@x.com", 5.0)).expect("valid");
        let merged = merge_into(stored("a@x.com", 10.0, 1), &update, now);

        assert_eq!(merged.amount.clone().unwrap(), 15.0);
        assert_eq!(merged.contributions_count.clone().unwrap(), 2);
    }

    #[test]
    fn merge_retains_stored_name_and_replaces_remarks() {
        let now = chrono::Utc::now().fixed_offset();
        let update = validate(&submission("a@x.com", 5.0)).expect("valid");
        let merged = merge_into(stored("a@x.com", 10.0, 3), &update, now);

        // Stored names win; the submitted "Asha Gurung" is ignored.
        assert_eq!(merged.first_name.clone().unwrap(), "Original");
        assert_eq!(merged.last_name.clone().unwrap(), "Donor");
        // Last write wins for remarks, date and the publish flag.
        assert_eq!(merged.thoughts.clone().unwrap(), "Stay strong");
        assert_eq!(merged.contribution_date.clone().unwrap(), "2026-08-05");
        assert!(merged.publish_name.clone().unwrap());
        assert_eq!(merged.email.clone().unwrap(), "a@x.com");
    }

    #[test]
    fn repeated_merges_sum_every_amount() {
        let now = chrono::Utc::now().fixed_offset();
        let amounts = [10.0, 5.0, 2.5, 7.5];

        let mut record = stored("a@x.com", amounts[0], 1);
        for amount in &amounts[1..] {
            let update = validate(&submission("a@x.com", *amount)).expect("valid");
            let merged = merge_into(record.clone(), &update, now);
            record.amount = merged.amount.clone().unwrap();
            record.contributions_count = merged.contributions_count.clone().unwrap();
        }

        assert_eq!(record.amount, amounts.iter().sum::<f64>());
        assert_eq!(record.contributions_count, amounts.len() as i32);
    }
}
