use std::sync::{Arc, Mutex, OnceLock, Weak};

use artifact_manifest::manager::{ArtifactListener, ArtifactManager, ArtifactModel, WriteLock};
use artifact_manifest::models::{Artifact, ArtifactId, ElementState, NamedState, PackagingElement};
use artifact_manifest::registry::Registry;
use artifact_manifest::Error;
use proptest::prelude::*;
use speculate2::speculate;

/// Records every notification as `"<kind>:<name>"`.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ArtifactListener for Recorder {
    fn artifact_added(&self, artifact: &Arc<Artifact>) {
        self.events.lock().unwrap().push(format!("added:{}", artifact.name()));
    }

    fn artifact_removed(&self, artifact: &Arc<Artifact>) {
        self.events.lock().unwrap().push(format!("removed:{}", artifact.name()));
    }

    fn artifact_changed(&self, _original: &Arc<Artifact>, artifact: &Arc<Artifact>) {
        self.events.lock().unwrap().push(format!("changed:{}", artifact.name()));
    }
}

/// Tries to commit from inside a notification.
#[derive(Default)]
struct Reentrant {
    manager: OnceLock<Weak<ArtifactManager>>,
    results: Mutex<Vec<Result<(), String>>>,
}

impl ArtifactListener for Reentrant {
    fn artifact_added(&self, _artifact: &Arc<Artifact>) {
        let Some(manager) = self.manager.get().and_then(Weak::upgrade) else {
            return;
        };
        let mut session = manager.create_session();
        session.add_artifact("nested", "plain").unwrap();
        let result = match manager.commit(session) {
            Ok(_) => Ok(()),
            Err(Error::RecursiveCommit) => Err("recursive".to_string()),
            Err(other) => Err(other.to_string()),
        };
        self.results.lock().unwrap().push(result);
    }
}

fn manager_with(names: &[&str]) -> ArtifactManager {
    let manager = ArtifactManager::new(Arc::new(Registry::with_defaults()));
    let mut session = manager.create_session();
    for name in names {
        session.add_artifact(name, "plain").unwrap();
    }
    manager.commit(session).unwrap();
    manager
}

fn id_of(manager: &ArtifactManager, name: &str) -> ArtifactId {
    manager.find_artifact(name).unwrap().id()
}

fn names(manager: &ArtifactManager) -> Vec<String> {
    manager
        .artifacts()
        .iter()
        .map(|a| a.name().to_string())
        .collect()
}

speculate! {
    describe "sessions" {
        before {
            let manager = manager_with(&["A", "B", "C"]);
        }

        it "starts out showing the committed artifacts" {
            let session = manager.create_session();
            let seen: Vec<&str> = session.artifacts().iter().map(|a| a.name()).collect();
            assert_eq!(seen, vec!["A", "B", "C"]);
            assert!(!session.is_modified());
        }

        it "edits a private copy until committed" {
            let original = manager.find_artifact("A").unwrap();
            let mut session = manager.create_session();
            session.set_output_path(original.id(), Some("/out/a".into())).unwrap();

            assert!(session.is_changed(original.id()));
            assert_eq!(session.find_artifact("A").unwrap().output_path(), Some("/out/a"));
            assert_eq!(manager.find_artifact("A").unwrap().output_path(), None);
            assert_eq!(original.output_path(), None);
        }

        it "maps committed artifacts to their staged copies" {
            let original = manager.find_artifact("B").unwrap();
            let mut session = manager.create_session();
            assert!(std::ptr::eq(session.artifact_by_original(&original), original.as_ref()));

            session.set_build_on_make(original.id(), true).unwrap();
            assert!(session.artifact_by_original(&original).is_build_on_make());
        }

        it "rejects duplicate and empty names" {
            let mut session = manager.create_session();
            assert!(matches!(
                session.add_artifact("A", "plain"),
                Err(Error::DuplicateArtifactName(_))
            ));
            assert!(matches!(session.add_artifact("", "plain"), Err(Error::EmptyArtifactName)));

            let b = id_of(&manager, "B");
            assert!(matches!(
                session.rename_artifact(b, "C"),
                Err(Error::DuplicateArtifactName(_))
            ));
            session.rename_artifact(b, "B").unwrap();
        }

        it "rejects unknown artifact types" {
            let mut session = manager.create_session();
            assert!(matches!(
                session.add_artifact("D", "war"),
                Err(Error::UnknownArtifactType(_))
            ));
        }

        it "creates the default layout of the artifact type" {
            let mut session = manager.create_session();
            let artifact = session.add_artifact("app", "jar").unwrap();
            let children = artifact.root_element().children();
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].composite_name(), Some("app.jar"));
        }

        it "refuses to turn the root into another kind" {
            let a = id_of(&manager, "A");
            let mut session = manager.create_session();
            let root = session.root_element_mut(a).unwrap();
            root.find_or_create_directory("lib").unwrap();

            let err = root
                .set_state(ElementState::Directory(NamedState { name: "out".into() }))
                .unwrap_err();
            assert!(matches!(err, Error::KindChange { ref from, .. } if from == "root"));
            assert_eq!(root.type_id(), "root");
            assert_eq!(root.children().len(), 1);
        }

        it "does not notify listeners when loading state" {
            let state = manager.state();
            let other = ArtifactManager::new(Arc::new(Registry::with_defaults()));
            let quiet = Arc::new(Recorder::default());
            other.subscribe(quiet.clone());

            assert!(other.load_state(&state).is_empty());
            assert_eq!(names(&other), vec!["A", "B", "C"]);
            assert!(quiet.take().is_empty());
        }
    }

    describe "commit" {
        before {
            let manager = manager_with(&["A", "B", "C"]);
            let recorder = Arc::new(Recorder::default());
            manager.subscribe(recorder.clone());
        }

        it "publishes additions, then removals, then changes" {
            let b = id_of(&manager, "B");
            let c = id_of(&manager, "C");
            let mut session = manager.create_session();
            session.set_output_path(c, Some("/out/c".into())).unwrap();
            session.remove_artifact(b).unwrap();
            session.add_artifact("D", "plain").unwrap();

            let summary = manager.commit(session).unwrap();

            assert_eq!(recorder.take(), vec!["added:D", "removed:B", "changed:C"]);
            assert_eq!(summary.removed, vec![b]);
            assert_eq!(summary.changed, vec![c]);
            assert_eq!(summary.added.len(), 1);
            assert_eq!(names(&manager), vec!["A", "C", "D"]);
        }

        it "discards edits when dropped" {
            let count = manager.modification_count();
            {
                let mut session = manager.create_session();
                session.remove_artifact(id_of(&manager, "A")).unwrap();
                session.add_artifact("D", "plain").unwrap();
            }
            assert_eq!(names(&manager), vec!["A", "B", "C"]);
            assert_eq!(manager.modification_count(), count);
            assert!(recorder.take().is_empty());
        }

        it "treats a removed and re-added name as two artifacts" {
            let old = manager.find_artifact("A").unwrap();
            let mut session = manager.create_session();
            session.remove_artifact(old.id()).unwrap();
            session.add_artifact("A", "jar").unwrap();

            let summary = manager.commit(session).unwrap();

            assert_eq!(recorder.take(), vec!["added:A", "removed:A"]);
            assert!(summary.changed.is_empty());
            assert_eq!(summary.removed, vec![old.id()]);
            assert_ne!(id_of(&manager, "A"), old.id());
            assert_eq!(manager.find_artifact("A").unwrap().artifact_type(), "jar");
        }

        it "reports a copied but unaltered artifact as changed" {
            let a = id_of(&manager, "A");
            let mut session = manager.create_session();
            session.modifiable_artifact(a).unwrap();

            let summary = manager.commit(session).unwrap();
            assert_eq!(summary.changed, vec![a]);
            assert_eq!(recorder.take(), vec!["changed:A"]);
        }

        it "keeps identity across renames" {
            let a = manager.find_artifact("A").unwrap();
            let mut session = manager.create_session();
            session.rename_artifact(a.id(), "Z").unwrap();
            manager.commit(session).unwrap();

            assert_eq!(recorder.take(), vec!["changed:Z"]);
            assert!(manager.find_artifact("A").is_none());
            assert_eq!(manager.artifact_by_original(&a).name(), "Z");
            assert_eq!(a.name(), "A");
        }

        it "leaves snapshots held by readers untouched" {
            let before = manager.snapshot();
            let mut session = manager.create_session();
            session.remove_artifact(id_of(&manager, "C")).unwrap();
            manager.commit(session).unwrap();

            assert_eq!(recorder.take(), vec!["removed:C"]);
            assert_eq!(before.len(), 3);
            assert_eq!(manager.snapshot().len(), 2);
            assert!(manager.modification_count() > before.modification_count());
        }

        it "applies edits to the packaging tree" {
            let a = id_of(&manager, "A");
            let mut session = manager.create_session();
            session
                .root_element_mut(a)
                .unwrap()
                .find_or_create_directory("lib/ext")
                .unwrap()
                .add_or_find_child(PackagingElement::file_copy("/libs/x.jar", None))
                .unwrap();
            manager.commit(session).unwrap();

            assert_eq!(recorder.take(), vec!["changed:A"]);
            let committed = manager.find_artifact("A").unwrap();
            assert_eq!(committed.root_element().node_count(), 4);
        }

        it "rejects an artifact whose root was replaced" {
            let a = id_of(&manager, "A");
            let count = manager.modification_count();
            let mut session = manager.create_session();
            session.set_output_path(a, Some("/out/a".into())).unwrap();
            session.add_artifact("D", "plain").unwrap();
            *session.root_element_mut(a).unwrap() = PackagingElement::directory("out");

            assert!(matches!(
                manager.commit(session),
                Err(Error::InvalidRoot(ref kind)) if kind == "directory"
            ));
            assert!(recorder.take().is_empty());
            assert_eq!(manager.modification_count(), count);
            assert_eq!(names(&manager), vec!["A", "B", "C"]);
            let committed = manager.find_artifact("A").unwrap();
            assert_eq!(committed.root_element().type_id(), "root");
            assert_eq!(committed.output_path(), None);

            let mut session = manager.create_session();
            session.add_artifact("D", "plain").unwrap();
            manager.commit(session).unwrap();
            assert_eq!(recorder.take(), vec!["added:D"]);
        }
    }

    describe "commit guards" {
        it "rejects a commit started from a listener" {
            let manager = Arc::new(manager_with(&[]));
            let listener = Arc::new(Reentrant::default());
            listener.manager.set(Arc::downgrade(&manager)).unwrap();
            manager.subscribe(listener.clone());

            let mut session = manager.create_session();
            session.add_artifact("outer", "plain").unwrap();
            manager.commit(session).unwrap();

            assert_eq!(*listener.results.lock().unwrap(), vec![Err("recursive".to_string())]);
            assert!(manager.find_artifact("nested").is_none());

            // The flag is cleared once the outer commit returns.
            let mut session = manager.create_session();
            session.add_artifact("later", "plain").unwrap();
            assert!(manager.commit(session).is_ok());
        }

        it "requires write access" {
            let lock = Arc::new(WriteLock::new());
            let manager = ArtifactManager::new(Arc::new(Registry::with_defaults()))
                .with_write_access(lock.clone());

            let session = manager.create_session();
            assert!(matches!(manager.commit(session), Err(Error::WriteAccessRequired)));

            let _guard = lock.try_acquire().unwrap();
            let mut session = manager.create_session();
            session.add_artifact("A", "plain").unwrap();
            assert!(manager.commit(session).is_ok());
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(usize),
    Touch(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        (0usize..8).prop_map(Op::Remove),
        (0usize..8).prop_map(Op::Touch),
    ]
}

proptest! {
    #[test]
    fn commit_summary_matches_session_contents(base in 0usize..5, ops in prop::collection::vec(op(), 0..12)) {
        let base_names: Vec<String> = (0..base).map(|i| format!("base{i}")).collect();
        let refs: Vec<&str> = base_names.iter().map(String::as_str).collect();
        let manager = manager_with(&refs);
        let before: Vec<ArtifactId> = manager.artifacts().iter().map(|a| a.id()).collect();

        let mut session = manager.create_session();
        let mut touched = Vec::new();
        for (n, op) in ops.into_iter().enumerate() {
            let current: Vec<ArtifactId> = session.artifacts().iter().map(|a| a.id()).collect();
            match op {
                Op::Add => {
                    session.add_artifact(&format!("new{n}"), "plain").unwrap();
                }
                Op::Remove(i) if !current.is_empty() => {
                    session.remove_artifact(current[i % current.len()]).unwrap();
                }
                Op::Touch(i) if !current.is_empty() => {
                    let id = current[i % current.len()];
                    session.set_build_on_make(id, true).unwrap();
                    touched.push(id);
                }
                _ => {}
            }
        }
        let expected: Vec<ArtifactId> = session.artifacts().iter().map(|a| a.id()).collect();

        let summary = manager.commit(session).unwrap();
        let after: Vec<ArtifactId> = manager.artifacts().iter().map(|a| a.id()).collect();
        prop_assert_eq!(&after, &expected);

        for id in &summary.added {
            prop_assert!(!before.contains(id) && after.contains(id));
        }
        for id in &summary.removed {
            prop_assert!(before.contains(id) && !after.contains(id));
        }
        for id in &summary.changed {
            prop_assert!(before.contains(id) && after.contains(id) && touched.contains(id));
        }
        let survivors_touched = before
            .iter()
            .filter(|id| after.contains(id) && touched.contains(id))
            .count();
        prop_assert_eq!(summary.changed.len(), survivors_touched);
        prop_assert_eq!(
            summary.added.len(),
            after.iter().filter(|id| !before.contains(id)).count()
        );
        prop_assert_eq!(
            summary.removed.len(),
            before.iter().filter(|id| !after.contains(id)).count()
        );
    }
}
