use clap::Parser;
use eyre::{Context, Result};
use recordstore::api::{self, Demo};
use recordstore::config::{Cli, Commands};
use recordstore::{PasswordHasher, Store};
use std::sync::{Arc, Mutex};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            println!("Migrating store schema...");
            let store = Store::open(&cli.store_path)?;
            println!(
                "Schema is at version {} in {}",
                recordstore::store::CURRENT_VERSION,
                store.base_path().display()
            );
        }
        Commands::Serve {
            demo,
            bind,
            hash_iterations,
        } => {
            let app = if demo.needs_store() {
                let store = Store::open(&cli.store_path)?;
                info!(path = %store.base_path().display(), "Opened store");
                let store = Arc::new(Mutex::new(store));

                match demo {
                    Demo::Wardrobe => api::wardrobe_app(store, PasswordHasher::new(hash_iterations)),
                    _ => api::library_app(store),
                }
            } else {
                match demo {
                    Demo::People => api::people_app(),
                    _ => api::bookshelf_app(),
                }
            };

            info!(%demo, %bind, "Starting demo");
            api::serve(app, &bind)
                .await
                .with_context(|| format!("Failed to serve on {}", bind))?;
        }
    }

    Ok(())
}
