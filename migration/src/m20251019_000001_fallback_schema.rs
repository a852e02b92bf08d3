use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Local product mirror
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(id_col(Products::Id))
                    .col(string(Products::Name))
                    .col(string_null(Products::Description))
                    .col(double(Products::Price))
                    .col(string_null(Products::Category))
                    .col(string_null(Products::ImageUrl))
                    .col(
                        ColumnDef::new(Products::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::IsActive)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(big_integer(Products::CreatedAt))
                    .col(big_integer(Products::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Banners::Table)
                    .if_not_exists()
                    .col(id_col(Banners::Id))
                    .col(string_null(Banners::Title))
                    .col(string_null(Banners::ImageUrl))
                    .col(string_null(Banners::LinkUrl))
                    .col(
                        ColumnDef::new(Banners::IsActive)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Banners::Position)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(Banners::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AppUsers::Table)
                    .if_not_exists()
                    .col(id_col(AppUsers::Id))
                    .col(string(AppUsers::Email))
                    .col(string(AppUsers::Name))
                    .col(string_null(AppUsers::Phone))
                    .col(
                        ColumnDef::new(AppUsers::Blocked)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(AppUsers::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Search activity keyed by the remote user id
        manager
            .create_table(
                Table::create()
                    .table(UserActivity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserActivity::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserActivity::Searches)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(UserActivity::LastSeen))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(id_col(Vehicles::Id))
                    .col(string(Vehicles::Name))
                    .col(string(Vehicles::Category))
                    .col(double(Vehicles::DailyPrice))
                    .col(string_null(Vehicles::Transmission))
                    .col(
                        ColumnDef::new(Vehicles::PassengerCapacity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(string_null(Vehicles::AirConditioning))
                    .col(string_null(Vehicles::Description))
                    .col(string(Vehicles::Features)) // JSON array
                    .col(string(Vehicles::Photos)) // JSON array
                    .col(big_integer(Vehicles::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdminSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminSessions::SessionId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(AdminSessions::Username))
                    .col(big_integer(AdminSessions::CreatedAt))
                    .col(big_integer(AdminSessions::ExpiresAt))
                    .col(string_null(AdminSessions::UserAgent))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_admin_sessions_expires")
                    .table(AdminSessions::Table)
                    .col(AdminSessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserActivity::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Banners::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Description,
    Price,
    Category,
    ImageUrl,
    Stock,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Banners {
    Table,
    Id,
    Title,
    ImageUrl,
    LinkUrl,
    IsActive,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AppUsers {
    Table,
    Id,
    Email,
    Name,
    Phone,
    Blocked,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserActivity {
    Table,
    UserId,
    Searches,
    LastSeen,
}

#[derive(DeriveIden)]
enum Vehicles {
    Table,
    Id,
    Name,
    Category,
    DailyPrice,
    Transmission,
    PassengerCapacity,
    AirConditioning,
    Description,
    Features,
    Photos,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdminSessions {
    Table,
    SessionId,
    Username,
    CreatedAt,
    ExpiresAt,
    UserAgent,
}
