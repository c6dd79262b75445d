use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_suppliers_table::Migration),
            Box::new(m20250301_000002_create_nonconformances_table::Migration),
            Box::new(m20250301_000003_create_inspection_batches_table::Migration),
        ]
    }
}

mod m20250301_000001_create_suppliers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Suppliers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Suppliers::LegalName).string().not_null())
                        .col(
                            ColumnDef::new(Suppliers::Cnpj)
                                .string_len(18)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Suppliers::ErpCode).string().not_null())
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_suppliers_legal_name")
                        .table(Suppliers::Table)
                        .col(Suppliers::LegalName)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        LegalName,
        Cnpj,
        ErpCode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_nonconformances_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_nonconformances_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Nonconformances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Nonconformances::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::SequenceNumber)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::InvoiceNumber)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Nonconformances::ReportDate).date().not_null())
                        .col(
                            ColumnDef::new(Nonconformances::Representative)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Nonconformances::Supplier).string().not_null())
                        .col(ColumnDef::new(Nonconformances::Item).string_len(9).not_null())
                        .col(
                            ColumnDef::new(Nonconformances::QuantityReceived)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::QuantityDefective)
                                .double()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::DefectDescription)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::Urgency)
                                .string_len(20)
                                .not_null()
                                .default("moderate"),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::RecommendedAction)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::Photos)
                                .text()
                                .not_null()
                                .default("[]"),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::Status)
                                .string_len(20)
                                .not_null()
                                .default("in_progress"),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Nonconformances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_nonconformances_invoice_number")
                        .table(Nonconformances::Table)
                        .col(Nonconformances::InvoiceNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_nonconformances_supplier")
                        .table(Nonconformances::Table)
                        .col(Nonconformances::Supplier)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_nonconformances_report_date")
                        .table(Nonconformances::Table)
                        .col(Nonconformances::ReportDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Nonconformances::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Nonconformances {
        Table,
        Id,
        SequenceNumber,
        InvoiceNumber,
        ReportDate,
        Representative,
        Supplier,
        Item,
        QuantityReceived,
        QuantityDefective,
        DefectDescription,
        Urgency,
        RecommendedAction,
        Photos,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_inspection_batches_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_inspection_batches_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InspectionBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InspectionBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InspectionBatches::InspectorId)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InspectionBatches::CrmToken).string().null())
                        .col(
                            ColumnDef::new(InspectionBatches::SourceFilename)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionBatches::RecordCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InspectionBatches::Records).text().not_null())
                        .col(
                            ColumnDef::new(InspectionBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inspection_batches_created_at")
                        .table(InspectionBatches::Table)
                        .col(InspectionBatches::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InspectionBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InspectionBatches {
        Table,
        Id,
        InspectorId,
        CrmToken,
        SourceFilename,
        RecordCount,
        Records,
        CreatedAt,
    }
}

/// Connects to `db_url` and applies every pending migration.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
