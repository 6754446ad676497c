use loadstar::{
    ModuleLoader, environment::json::JsonModuleEnvironment, fetch::future::FutureTransport,
};
use std::{error::Error, path::PathBuf};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    /* ANCHOR: main */
    let runtime = tokio::runtime::Handle::current();
    // Future transport hands retrieval to async functions, here reading
    // files on tokio tasks.
    let transport = FutureTransport::new(move |location: String| {
        let task = runtime.spawn(async move {
            tokio::fs::read_to_string(PathBuf::from("resources").join(location)).await
        });
        async move {
            let content = task.await??;
            Ok::<_, Box<dyn Error>>(content)
        }
    });

    let mut loader = ModuleLoader::new(transport, JsonModuleEnvironment::default());
    loader.merge_json(&tokio::fs::read_to_string("resources/catalog.json").await?)?;

    loader.resolve(
        ["greeting", "punctuation"],
        |_, exports| {
            println!(
                "{}, {}{}",
                exports[0]["text"], exports[0]["target"], exports[1]["exclamation"]
            )
        },
        |_, error| eprintln!("Resolution failed: {error}"),
    );

    // Run maintain passes while tokio does the reading.
    while loader.is_busy() {
        loader.maintain();
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }
    /* ANCHOR_END: main */

    Ok(())
}
