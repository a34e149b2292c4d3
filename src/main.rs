use actix_web::{App, HttpServer, middleware, web};
use tokio_util::sync::CancellationToken;

use pollvote::auth::{password, rate_limit::RateLimiter, token::TokenKeys};
use pollvote::config::ServerConfig;
use pollvote::{db, expiry, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = ServerConfig::load();

    // Ensure the database directory exists
    db::ensure_parent_dir(&config.database_url)?;

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to open database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    if let Some(seed) = &config.admin_seed {
        let hash = password::hash_password(&seed.password)
            .expect("Failed to hash admin password");
        db::seed_admin(&pool, &seed.name, &seed.email, &hash)
            .await
            .expect("Failed to seed admin account");
    }

    let cancel = CancellationToken::new();
    let sweeper = expiry::spawn_sweeper(pool.clone(), config.expiry_sweep, cancel.clone());

    let pool_data = web::Data::new(pool);
    let keys = web::Data::new(TokenKeys::new(&config.jwt_secret, config.token_ttl));
    let limiter = web::Data::new(RateLimiter::new());

    log::info!("Starting server at http://{}", config.bind);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(pool_data.clone())
            .app_data(keys.clone())
            .app_data(limiter.clone())
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(handlers::not_found))
    })
    .bind(config.bind.as_str())?
    .run()
    .await?;

    cancel.cancel();
    let _ = sweeper.await;
    Ok(())
}
