use loadstar::{
    ModuleLoader, environment::json::JsonModuleEnvironment, fetch::file::FileTransport,
    store::PersistentStore,
};
use loadstar_fjall::{FjallStore, third_party::fjall::Config};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Fjall keyspace keeps fetched content between runs.
    let store = FjallStore::new(Config::new("./target/loadstar-cache/").open()?, "modules")?;

    let mut loader = ModuleLoader::new(
        FileTransport::default().with_root("resources"),
        JsonModuleEnvironment::default(),
    )
    .with_store(store.clone());
    loader.merge_json(&std::fs::read_to_string("resources/catalog.json")?)?;

    loader.resolve(
        "greeting",
        |_, exports| println!("Greeting: {:#}", exports[0]),
        |_, error| eprintln!("Resolution failed: {error}"),
    );
    while loader.is_busy() {
        loader.maintain();
    }
    store.persist()?;

    // Second run delivers everything from the store.
    println!(
        "Module `greeting` was last fetched from: {:?}",
        store.get("greeting")?
    );

    Ok(())
}
