//! Donor record entity, one row per distinct email.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub first_name: String,
    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub last_name: String,
    /// Normalized email, the dedup key. Never exposed in listings.
    #[sea_orm(column_type = "String(StringLen::N(320))")]
    pub email: String,
    /// Running sum of every contribution merged into this record
    pub amount: f64,
    #[sea_orm(column_type = "Text")]
    pub thoughts: String,
    /// Caller-supplied ISO-8601 date of the latest contribution, stored verbatim
    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub contribution_date: String,
    pub publish_name: bool,
    /// Number of submissions merged into this record
    pub contributions_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
