use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Promotions {
    Table,
    Id,
    Title,
    Body,
    ImageUrl,
    ButtonLabel,
    ButtonUrl,
    Status,
    ProcessedChannels,
    TotalReach,
    ChannelCount,
    ClickCount,
    CreatedAt,
    SentAt,
    ClaimedBy,
    ClaimedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::Title).string().not_null())
                    .col(ColumnDef::new(Promotions::Body).text().not_null())
                    .col(ColumnDef::new(Promotions::ImageUrl).string())
                    .col(ColumnDef::new(Promotions::ButtonLabel).string())
                    .col(ColumnDef::new(Promotions::ButtonUrl).string())
                    .col(ColumnDef::new(Promotions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Promotions::ProcessedChannels)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Promotions::TotalReach)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::ChannelCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Promotions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Promotions::SentAt).timestamp())
                    .col(ColumnDef::new(Promotions::ClaimedBy).string())
                    .col(ColumnDef::new(Promotions::ClaimedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-promotions-status")
                    .table(Promotions::Table)
                    .col(Promotions::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await
    }
}
