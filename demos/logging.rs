//! Registration and resolution events
//!
//! JSON output:
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Pretty output:
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use bindery::{BindingConfig, Container, Registrar, RegistrationEvent, RegistrationObserver};
use std::sync::Arc;

struct Database {
    url: String,
}

struct Sink(&'static str);

struct Printer;

impl RegistrationObserver for Printer {
    fn on_registered(&self, event: &RegistrationEvent) {
        println!(
            "  [observer] {} {} ({}) from {}",
            event.mode, event.type_descriptor, event.lifetime, event.source_name
        );
    }
}

fn main() -> bindery::Result<()> {
    bindery::logging::builder().trace().from_env().pretty().init();

    println!("=== bindery logging demo ===\n");

    let container = Container::new();
    let registrar = Registrar::new(&container).with_observer(Arc::new(Printer));

    registrar.register(BindingConfig::single().singleton(), "Storage", || Database {
        url: "postgres://localhost/mydb".into(),
    })?;
    registrar.register(BindingConfig::into_set(), "ConsoleModule", || Sink("console"))?;
    registrar.register(BindingConfig::into_set(), "FileModule", || Sink("file"))?;
    registrar.register(BindingConfig::into_map("audit").singleton(), "AuditModule", || Sink("audit"))?;

    // Rejected and logged with the offending key
    if let Err(err) = registrar.register(BindingConfig::single(), "Duplicate", || Database {
        url: "postgres://replica/mydb".into(),
    }) {
        println!("  [app] {err}");
    }

    container.freeze();

    println!("\nDatabase: {}", container.get::<Database>()?.url);
    let sinks = container.set::<Sink>(None)?;
    println!("Sinks: {:?}", sinks.iter().map(|sink| sink.0).collect::<Vec<_>>());
    let routes = container.map::<&'static str, Sink>(None)?;
    println!("Audit sink: {}", routes.get(&"audit").map(|sink| sink.0).unwrap_or("none"));

    Ok(())
}
