//! Initial migration: the ranking table and the daily activity log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_top100(manager).await?;
        self.create_activity(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activity::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Top100::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_top100(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Top100::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Top100::Repo).string().not_null())
                    .col(ColumnDef::new(Top100::Owner).string().not_null())
                    // Ranks
                    .col(
                        ColumnDef::new(Top100::PositionCur)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Top100::PositionPrev)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // Metrics
                    .col(
                        ColumnDef::new(Top100::Stars)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Top100::Watchers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Top100::Forks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Top100::OpenIssues)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Top100::Language).string().null())
                    .primary_key(Index::create().col(Top100::Repo).col(Top100::Owner))
                    .to_owned(),
            )
            .await?;

        // Rank recompute orders by stars
        manager
            .create_index(
                Index::create()
                    .name("idx_top100_stars")
                    .table(Top100::Table)
                    .col((Top100::Stars, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_activity(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activity::Date).date().not_null())
                    .col(ColumnDef::new(Activity::Repo).string().not_null())
                    .col(ColumnDef::new(Activity::Owner).string().not_null())
                    .col(
                        ColumnDef::new(Activity::Commits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Activity::Authors)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .primary_key(
                        Index::create()
                            .col(Activity::Date)
                            .col(Activity::Repo)
                            .col(Activity::Owner),
                    )
                    .to_owned(),
            )
            .await?;

        // Watermark lookup: MAX(date) per (repo, owner)
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_repo_owner_date")
                    .table(Activity::Table)
                    .col(Activity::Repo)
                    .col(Activity::Owner)
                    .col(Activity::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "top100")]
enum Top100 {
    Table,
    Repo,
    Owner,
    PositionCur,
    PositionPrev,
    Stars,
    Watchers,
    Forks,
    OpenIssues,
    Language,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "activity")]
enum Activity {
    Table,
    Date,
    Repo,
    Owner,
    Commits,
    Authors,
}
