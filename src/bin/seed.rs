use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use avocado_shop_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Products,
        products::{ActiveModel as ProductActive, Column as ProdCol},
    },
};

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: i64,
    weight_grams: i32,
    variety: Option<&'static str>,
    season: Option<(i32, i32)>,
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        id: "hass-box-3kg",
        name: "Hass avocados 3 kg",
        description: "Creamy Hass, picked to order",
        price: 2400,
        weight_grams: 3000,
        variety: Some("hass"),
        season: Some((11, 4)),
    },
    SeedProduct {
        id: "hass-box-5kg",
        name: "Hass avocados 5 kg",
        description: "Creamy Hass, picked to order",
        price: 3500,
        weight_grams: 5000,
        variety: Some("hass"),
        season: Some((11, 4)),
    },
    SeedProduct {
        id: "lamb-hass-box-5kg",
        name: "Lamb Hass avocados 5 kg",
        description: "Late-season Lamb Hass, larger fruit",
        price: 3600,
        weight_grams: 5000,
        variety: Some("lamb_hass"),
        season: Some((5, 9)),
    },
    SeedProduct {
        id: "tasting-box-2kg",
        name: "Tasting box 2 kg",
        description: "Whatever is ripest this week",
        price: 1800,
        weight_grams: 2000,
        variety: None,
        season: None,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    seed_products(&orm).await?;

    if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?
            .to_string();
        println!("ADMIN_PASSWORD_HASH={hash}");
    }

    println!("Seed completed.");
    Ok(())
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    for product in CATALOG {
        let model = ProductActive {
            id: Set(product.id.to_string()),
            name: Set(product.name.to_string()),
            description: Set(Some(product.description.to_string())),
            price: Set(product.price),
            weight_grams: Set(product.weight_grams),
            variety: Set(product.variety.map(str::to_string)),
            season_start_month: Set(product.season.map(|(start, _)| start)),
            season_end_month: Set(product.season.map(|(_, end)| end)),
            active: Set(true),
            created_at: Set(Utc::now().into()),
        };
        Products::insert(model)
            .on_conflict(OnConflict::column(ProdCol::Id).do_nothing().to_owned())
            .do_nothing()
            .exec(orm)
            .await?;
        println!("Ensured product {}", product.id);
    }
    Ok(())
}
