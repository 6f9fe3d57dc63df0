//! Constructor injection with #[derive(Inject)]
//!
//! Run with:
//!   cargo run --example derive --features derive

use bindery::{BindingConfig, Container, Inject, Registrar};
use std::sync::Arc;

struct Database {
    url: String,
}

struct Cache {
    size: usize,
}

#[derive(Inject)]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject]
    cache: Arc<Cache>,
    // Non-injected field uses Default
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        format!(
            "UserService connected to {} with cache size {} (requests: {})",
            self.db.url, self.cache.size, self.request_count
        )
    }
}

// Nested injection
#[derive(Inject)]
struct ApiController {
    #[inject]
    users: Arc<UserService>,
}

fn main() -> bindery::Result<()> {
    println!("=== bindery derive demo ===\n");

    let container = Container::new();
    let registrar = Registrar::new(&container);

    registrar.register(BindingConfig::single().singleton(), "storage", || Database {
        url: "postgres://localhost:5432/myapp".into(),
    })?;
    registrar.register(BindingConfig::single().singleton(), "storage", || Cache { size: 1024 })?;
    registrar.register_constructed::<UserService, ()>(BindingConfig::single().singleton(), "users")?;
    registrar.register_constructed::<ApiController, ()>(BindingConfig::single(), "api")?;
    container.freeze();

    let controller = container.get::<ApiController>()?;
    println!("{}", controller.users.describe());

    let again = container.get::<ApiController>()?;
    println!(
        "Controllers share one UserService: {}",
        Arc::ptr_eq(&controller.users, &again.users)
    );

    Ok(())
}
