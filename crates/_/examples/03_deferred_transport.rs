use loadstar::{
    ModuleLoader, environment::json::JsonModuleEnvironment, fetch::deferred::DeferredTransport,
};
use std::{error::Error, path::Path, time::Duration};

fn main() -> Result<(), Box<dyn Error>> {
    /* ANCHOR: main */
    let mut loader = ModuleLoader::new(
        // Deferred transport runs retrieval jobs in threads.
        DeferredTransport::new(|location: &str| {
            std::thread::sleep(Duration::from_millis(50));
            std::fs::read_to_string(Path::new("resources").join(location))
                .map_err(|error| format!("Failed to read `{location}`: {error}"))
        }),
        JsonModuleEnvironment::default(),
    );
    loader.merge_json(&std::fs::read_to_string("resources/catalog.json")?)?;

    loader.resolve(
        "greeting",
        |_, exports| println!("Greeting: {:#}", exports[0]),
        |_, error| eprintln!("Resolution failed: {error}"),
    );

    // Simulate waiting for jobs to complete.
    while loader.is_busy() {
        println!(
            "Waiting for: {:?}",
            loader.pending_ids().map(|id| id.as_str()).collect::<Vec<_>>()
        );
        loader.maintain();
        std::thread::sleep(Duration::from_millis(10));
    }
    /* ANCHOR_END: main */

    Ok(())
}
