use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Donor records, one row per distinct email
        manager
            .create_table(
                Table::create()
                    .table(Donors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Donors::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Donors::FirstName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Donors::LastName).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Donors::Email)
                            .string_len(320) // RFC 5321 upper bound
                            .not_null(),
                    )
                    .col(ColumnDef::new(Donors::Amount).double().not_null())
                    .col(ColumnDef::new(Donors::Thoughts).text().not_null())
                    .col(
                        ColumnDef::new(Donors::ContributionDate)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Donors::PublishName).boolean().not_null())
                    .col(
                        ColumnDef::new(Donors::ContributionsCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Donors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Donors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Unique index backing the one-record-per-email invariant
                    .index(
                        Index::create()
                            .name("idx_donors_email")
                            .col(Donors::Email)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Donors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Donors {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Amount,
    Thoughts,
    ContributionDate,
    PublishName,
    ContributionsCount,
    CreatedAt,
    UpdatedAt,
}
