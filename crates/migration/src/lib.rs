pub use sea_orm_migration::prelude::*;

mod m20260110_090000_channels;
mod m20260110_091500_promotions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_090000_channels::Migration),
            Box::new(m20260110_091500_promotions::Migration),
        ]
    }
}
