use loadstar::{
    ModuleLoader,
    environment::json::JsonModuleEnvironment,
    fetch::file::FileTransport,
    store::{PersistentStore, file::FileStore},
};
use std::{cell::RefCell, rc::Rc};

#[test]
fn test_file_transport_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let modules = dir.path().join("modules");
    std::fs::create_dir_all(&modules).unwrap();
    std::fs::write(
        modules.join("app.js"),
        r#"{ "app": { "title": "Loadstar" } }"#,
    )
    .unwrap();
    let store = FileStore::default().with_root(dir.path().join("cache"));

    let mut loader = ModuleLoader::new(
        FileTransport::default().with_root(&modules),
        JsonModuleEnvironment::default(),
    )
    .with_store(store.clone());
    loader
        .merge_json(r#"{ "res": { "app": { "url": "app.js", "deps": [] } } }"#)
        .unwrap();

    let title = Rc::new(RefCell::new(None));
    let output = title.clone();
    loader.resolve(
        "app",
        move |_, exports| *output.borrow_mut() = Some(exports[0]["title"].clone()),
        |_, error| panic!("{error}"),
    );

    assert_eq!(
        title.borrow().as_ref().and_then(|title| title.as_str()),
        Some("Loadstar")
    );
    assert_eq!(store.get("app").unwrap().as_deref(), Some("app.js"));
    assert!(store.get("app.js").unwrap().is_some());
}
