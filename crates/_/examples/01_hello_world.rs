use loadstar::{
    ModuleLoader, environment::json::JsonModuleEnvironment, fetch::file::FileTransport,
};
use std::{cell::RefCell, error::Error, rc::Rc};

fn main() -> Result<(), Box<dyn Error>> {
    let mut loader = ModuleLoader::new(
        // Transport tells how to get content of a location.
        FileTransport::default().with_root("resources"),
        // Environment tells how to run delivered content.
        JsonModuleEnvironment::default(),
    );
    // Catalog tells where modules live and what they depend on.
    loader.merge_json(&std::fs::read_to_string("resources/catalog.json")?)?;

    let result = Rc::new(RefCell::new(None));
    let output = result.clone();
    // Resolve waits until the module and all its dependencies are registered.
    loader.resolve(
        ["greeting", "words"],
        move |_, exports| *output.borrow_mut() = Some(exports),
        |_, error| eprintln!("Resolution failed: {error}"),
    );

    // Run maintain passes until every dispatched location got delivered.
    while loader.is_busy() {
        loader.maintain();
    }

    if let Some(exports) = result.borrow().as_ref() {
        println!("Greeting: {:#}", exports[0]);
        println!("Words: {:#}", exports[1]);
    }
    for id in loader.registry.ids() {
        println!("Registered module: `{id}`");
    }

    Ok(())
}
