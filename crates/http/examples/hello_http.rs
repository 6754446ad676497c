use loadstar::{ModuleLoader, environment::json::JsonModuleEnvironment};
use loadstar_http::HttpTransportJob;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    /* ANCHOR: main */
    // Serve `resources` directory locally first, for example with:
    // `python3 -m http.server 8080 --directory resources`
    let job = HttpTransportJob::new("http://localhost:8080/")?;
    let catalog = job.url("catalog.json")?;

    let mut loader = ModuleLoader::new(
        // HTTP transport runs blocking requests on worker threads.
        job.into_transport(),
        JsonModuleEnvironment::default(),
    );
    loader.merge_json(&loadstar_http::third_party::reqwest::blocking::get(catalog)?.text()?)?;

    loader.resolve(
        ["greeting", "words"],
        |_, exports| {
            println!("Greeting: {:#}", exports[0]);
            println!("Words: {:#}", exports[1]);
        },
        |_, error| eprintln!("Resolution failed: {error}"),
    );

    // Wait till loader is busy.
    while loader.is_busy() {
        println!(
            "Waiting for: {:?}",
            loader.pending_ids().map(|id| id.as_str()).collect::<Vec<_>>()
        );
        loader.maintain();
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    /* ANCHOR_END: main */

    Ok(())
}
