use loadstar::{
    ModuleLoader, catalog::hotreload::CatalogWatcher, environment::json::JsonModuleEnvironment,
    fetch::file::FileTransport,
};
use std::{error::Error, time::Duration};

fn main() -> Result<(), Box<dyn Error>> {
    /* ANCHOR: main */
    let mut loader = ModuleLoader::new(
        FileTransport::default().with_root("resources"),
        JsonModuleEnvironment::default(),
    );

    // Catalog watcher merges the manifest again whenever it changes.
    let mut watcher = CatalogWatcher::new("resources/catalog.json")?;
    watcher.load(&mut loader.catalog)?;

    println!("Watching for catalog changes...");
    loop {
        if watcher.maintain(&mut loader.catalog)? {
            for id in loader.catalog.ids() {
                println!(
                    "Module `{}` at `{}` depends on: {:?}",
                    id,
                    loader.catalog.resolve_location(id),
                    loader.catalog.declared_dependencies(id)
                );
            }
        }
        loader.maintain();
        std::thread::sleep(Duration::from_millis(500));
    }
    /* ANCHOR_END: main */
}
