//! Apply the embedded `documents` migrations without starting the API.
//!
//!   cargo run -p redops-api --bin migrate
//!
//! The server does the same on startup; this is for deploys that migrate
//! as a separate step. Needs DATABASE_URL (environment or .env).

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL is not set; the in-memory store has nothing to migrate");
        std::process::exit(1);
    };

    let applied = redops_api::db::migrations::run_pending(&database_url)
        .await
        .expect("failed to run migrations");

    match applied.as_slice() {
        [] => println!("documents schema is up to date"),
        names => names.iter().for_each(|name| println!("applied {name}")),
    }
}
