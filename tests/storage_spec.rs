use std::sync::Arc;

use artifact_manifest::db::{Database, DatabaseStorage, ARTIFACTS_COMPONENT};
use artifact_manifest::manager::ArtifactManager;
use artifact_manifest::models::{HookProperties, LibraryLevel, PackagingElement};
use artifact_manifest::registry::{Registry, POST_PROCESSING};
use artifact_manifest::storage::{DirectoryStorage, FileStorage, StateStorage};
use speculate2::speculate;

fn populated_manager() -> ArtifactManager {
    let manager = ArtifactManager::new(Arc::new(Registry::with_defaults()));
    let mut session = manager.create_session();

    let app = session.add_artifact("app", "jar").unwrap();
    app.set_output_path(Some("/out/app".into()));
    app.set_build_on_make(true);
    let app = app.id();
    let archive = session
        .root_element_mut(app)
        .unwrap()
        .find_or_create_directory("app.jar")
        .unwrap();
    archive
        .add_or_find_child(PackagingElement::module_output("core"))
        .unwrap();
    archive
        .find_or_create_directory("lib")
        .unwrap()
        .add_or_find_child(PackagingElement::library(LibraryLevel::Project, "serde", None))
        .unwrap();
    session
        .set_properties(
            app,
            POST_PROCESSING,
            Box::new(HookProperties {
                enabled: true,
                command: "sign app.jar".into(),
                working_dir: Some("/out/app".into()),
            }),
        )
        .unwrap();

    let docs = session.add_artifact("docs", "plain").unwrap().id();
    session
        .root_element_mut(docs)
        .unwrap()
        .add_or_find_child(PackagingElement::dir_copy("/project/docs"))
        .unwrap();

    manager.commit(session).unwrap();
    manager
}

/// Save `manager` to `storage`, load it into a fresh manager and compare.
fn assert_round_trip(manager: &ArtifactManager, storage: &dyn StateStorage) {
    storage.save(&manager.state()).unwrap();

    let reloaded = ArtifactManager::new(Arc::new(Registry::with_defaults()));
    let state = storage.load().unwrap().expect("saved state");
    assert!(reloaded.load_state(&state).is_empty());

    let before = manager.artifacts();
    let after = reloaded.artifacts();
    assert_eq!(before.len(), after.len());
    for artifact in &before {
        let loaded = reloaded.find_artifact(artifact.name()).unwrap();
        assert!(artifact.content_eq(&loaded), "{} differs", artifact.name());
    }
}

speculate! {
    before {
        let manager = populated_manager();
    }

    describe "file storage" {
        before {
            let dir = tempfile::tempdir().unwrap();
        }

        it "round trips the manager state" {
            assert_round_trip(&manager, &FileStorage::new(dir.path().join("nested/artifacts.json")));
        }

        it "loads nothing before the first save" {
            let storage = FileStorage::new(dir.path().join("artifacts.json"));
            assert!(storage.load().unwrap().is_none());

            storage.save(&manager.state()).unwrap();
            assert_eq!(storage.load().unwrap().unwrap().children.len(), 2);
        }

        it "fails on a corrupt file until it is saved over" {
            let path = dir.path().join("artifacts.json");
            std::fs::write(&path, "{ not json").unwrap();
            let storage = FileStorage::new(path);
            assert!(storage.load().is_err());

            storage.save(&manager.state()).unwrap();
            assert!(storage.load().unwrap().is_some());
        }
    }

    describe "directory storage" {
        before {
            let dir = tempfile::tempdir().unwrap();
        }

        it "round trips the manager state" {
            assert_round_trip(&manager, &DirectoryStorage::new(dir.path().join("artifacts")));
        }

        it "drops files of removed artifacts" {
            let storage = DirectoryStorage::new(dir.path());
            storage.save(&manager.state()).unwrap();

            let mut session = manager.create_session();
            let docs = manager.find_artifact("docs").unwrap().id();
            session.remove_artifact(docs).unwrap();
            manager.commit(session).unwrap();
            storage.save(&manager.state()).unwrap();

            assert!(dir.path().join("app.json").exists());
            assert!(!dir.path().join("docs.json").exists());
            let state = storage.load().unwrap().unwrap();
            assert_eq!(state.children.len(), 1);
        }
    }

    describe "database storage" {
        before {
            let db = Database::open_memory().expect("Failed to create in-memory database");
            db.migrate().expect("Failed to run migrations");
        }

        it "round trips the manager state" {
            assert_round_trip(&manager, &DatabaseStorage::new(db.clone()));
        }

        it "records when a component was saved" {
            assert!(db.component_saved_at(ARTIFACTS_COMPONENT).unwrap().is_none());

            let storage = DatabaseStorage::new(db.clone());
            storage.save(&manager.state()).unwrap();
            assert!(db.component_saved_at(ARTIFACTS_COMPONENT).unwrap().is_some());
        }

        it "keeps components apart" {
            let artifacts = DatabaseStorage::new(db.clone());
            let other = DatabaseStorage::for_component(db.clone(), "Scratch");
            artifacts.save(&manager.state()).unwrap();

            assert!(other.load().unwrap().is_none());
            assert!(artifacts.load().unwrap().is_some());
        }

        it "overwrites on repeated saves" {
            let storage = DatabaseStorage::new(db.clone());
            storage.save(&manager.state()).unwrap();

            let mut session = manager.create_session();
            session.add_artifact("extra", "plain").unwrap();
            manager.commit(session).unwrap();
            storage.save(&manager.state()).unwrap();

            assert_eq!(storage.load().unwrap().unwrap().children.len(), 3);
        }

        it "deletes a component" {
            let storage = DatabaseStorage::new(db.clone());
            storage.save(&manager.state()).unwrap();

            assert!(db.delete_component(ARTIFACTS_COMPONENT).unwrap());
            assert!(!db.delete_component(ARTIFACTS_COMPONENT).unwrap());
            assert!(storage.load().unwrap().is_none());
        }
    }
}
