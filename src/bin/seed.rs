use quotekaro_api::{
    config::AppConfig,
    db::create_pool,
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    plans::PlanTier,
    services::auth_service::hash_password,
};
use uuid::Uuid;

/// Built-in estimate themes: (theme_key, name, description, required plan).
const THEMES: [(&str, &str, &str, PlanTier); 5] = [
    ("classic", "Classic", "Clean single-column layout", PlanTier::Free),
    ("minimal", "Minimal", "Monochrome with generous spacing", PlanTier::Free),
    ("elegant", "Elegant", "Serif headings and a gold accent", PlanTier::Basic),
    ("luxe", "Luxe", "Full-bleed cover photo and dark palette", PlanTier::Pro),
    ("signature", "Signature", "Custom branding with logo watermark", PlanTier::Premium),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(
        &pool,
        "admin@quotekaro.in",
        "admin12345",
        "QuoteKaro Admin",
        ROLE_ADMIN,
        PlanTier::Premium,
    )
    .await?;
    let studio_id = ensure_user(
        &pool,
        "studio@example.com",
        "studio12345",
        "Pixel Perfect Studio",
        ROLE_USER,
        PlanTier::Free,
    )
    .await?;
    seed_themes(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Studio ID: {studio_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    studio_name: &str,
    role: &str,
    plan: PlanTier,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;
    let credits = plan.credits();

    // Existing accounts keep their credits; only the role is refreshed.
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role, studio_name, plan, plan_expires_at,
                           total_credits, left_credits, used_credits)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 0)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(studio_name)
    .bind(plan.as_str())
    .bind(plan.expiry_from(chrono::Utc::now()))
    .bind(credits)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn seed_themes(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (key, name, description, tier) in THEMES {
        sqlx::query(
            r#"
            INSERT INTO estimate_templates (id, theme_key, name, description, plan_tier)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (theme_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(name)
        .bind(description)
        .bind(tier.as_str())
        .execute(pool)
        .await?;
    }

    println!("Seeded {} estimate themes", THEMES.len());
    Ok(())
}
