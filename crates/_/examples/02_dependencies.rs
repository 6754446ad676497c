use loadstar::{
    LoaderConfig, ModuleFactory, ModuleLoader,
    catalog::{CatalogConfig, ResourceDescriptor},
    environment::json::JsonModuleEnvironment,
    fetch::memory::MemoryTransport,
};
use serde_json::json;
use std::{error::Error, sync::mpsc::channel, time::Duration};

fn main() -> Result<(), Box<dyn Error>> {
    /* ANCHOR: main */
    let transport = MemoryTransport::default()
        .with("app.js", r#"{ "app": { "title": "Demo" } }"#)
        .with("lib/format.js", r#"{ "format": { "prefix": ">> " } }"#)
        .with("theme.css", "body { margin: 0; }");
    // Held locations stay in flight until released.
    transport.hold("lib/format.js");

    let mut loader = ModuleLoader::new(transport.clone(), JsonModuleEnvironment::default())
        .with_config(LoaderConfig::default().with_timeout(Duration::from_secs(1)))
        .with_catalog(
            CatalogConfig::default()
                .resource("banner", ResourceDescriptor::default().dependency("app"))
                .resource(
                    "app",
                    ResourceDescriptor::new("app.js").dependencies(["format", "theme"]),
                )
                .resource("format", ResourceDescriptor::new("lib/format.js"))
                .resource("theme", ResourceDescriptor::new("theme.css")),
        );

    // Events tell what the loader is doing.
    let (tx, rx) = channel();
    loader.events.bind(tx);

    // Modules can be defined by hand too, factories request what they need.
    loader.define(
        "banner",
        ModuleFactory::callable(|registry, exports| {
            let app = registry.request("app")?;
            let format = registry.request("format")?;
            let text = format!(
                "{}{}",
                format["prefix"].as_str().unwrap_or_default(),
                app["title"].as_str().unwrap_or_default()
            );
            exports.insert("text".to_owned(), json!(text));
            Ok(None)
        }),
    );

    // Banner is registered already, but its declared dependencies are not.
    loader.resolve(
        "banner",
        |_, exports| println!("Banner: {}", exports[0]["text"]),
        |_, error| eprintln!("Resolution failed: {error}"),
    );

    let mut ticks = 0;
    while loader.is_busy() {
        loader.maintain();
        ticks += 1;
        if ticks == 3 {
            transport.release("lib/format.js");
        }
        for event in rx.try_iter() {
            println!(
                "Event: {:?} id: {:?} location: {:?}",
                event.kind, event.id, event.location
            );
        }
    }
    /* ANCHOR_END: main */

    Ok(())
}
