use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_catalog::Migration),
            Box::new(m20250301_000002_create_order_tables::Migration),
            Box::new(m20250301_000003_create_events::Migration),
        ]
    }
}

// Tables are derived from the entity definitions so the same migration runs on
// PostgreSQL in production and SQLite in tests.

mod m20250301_000001_create_catalog {
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    use crate::entity::products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_catalog"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(
                    schema
                        .create_table_from_entity(products::Entity)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(products::Entity).to_owned())
                .await
        }
    }
}

mod m20250301_000002_create_order_tables {
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    use crate::entity::{order_items, order_messages, order_status_logs, orders, shipments};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());

            // Creation order follows the foreign keys.
            let tables = [
                schema.create_table_from_entity(orders::Entity),
                schema.create_table_from_entity(shipments::Entity),
                schema.create_table_from_entity(order_items::Entity),
                schema.create_table_from_entity(order_messages::Entity),
                schema.create_table_from_entity(order_status_logs::Entity),
            ];
            for mut table in tables {
                manager.create_table(table.if_not_exists().to_owned()).await?;
            }

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_status_created_at")
                        .table(orders::Entity)
                        .col(orders::Column::Status)
                        .col(orders::Column::CreatedAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(order_items::Entity)
                        .col(order_items::Column::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_order_status_logs_order_id")
                        .table(order_status_logs::Entity)
                        .col(order_status_logs::Column::OrderId)
                        .col(order_status_logs::Column::CreatedAt)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(order_status_logs::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(order_messages::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(order_items::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(shipments::Entity).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(orders::Entity).to_owned())
                .await
        }
    }
}

mod m20250301_000003_create_events {
    use sea_orm::Schema;
    use sea_orm_migration::prelude::*;

    use crate::entity::events;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_events"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let schema = Schema::new(manager.get_database_backend());
            manager
                .create_table(
                    schema
                        .create_table_from_entity(events::Entity)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(events::Entity).to_owned())
                .await
        }
    }
}
