use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artifact_manifest::codec;
use artifact_manifest::config::{Config, StorageKind};
use artifact_manifest::db::{Database, DatabaseStorage};
use artifact_manifest::document::Element;
use artifact_manifest::manager::{ArtifactManager, ArtifactModel, ArtifactSession, TracingListener};
use artifact_manifest::models::{options_of, ArtifactId, HookProperties, PackagingElement};
use artifact_manifest::registry::{self, Registry};
use artifact_manifest::render::render_artifact;
use artifact_manifest::storage::{DirectoryStorage, FileStorage, StateStorage};
use artifact_manifest::validation::validate_artifact;

#[derive(Parser)]
#[command(name = "amf")]
#[command(about = "Edit build-artifact layouts")]
struct Cli {
    /// Storage location (file, directory or database, depending on --format)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Storage format
    #[arg(long, global = true, value_enum)]
    format: Option<StorageKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List artifacts
    List,
    /// Print an artifact's layout as a tree
    Show { name: String },
    /// Create an artifact with the default layout of its type
    Add {
        name: String,
        #[arg(long = "type", default_value = registry::PLAIN)]
        artifact_type: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<String>,
        /// Build the artifact on every make
        #[arg(long)]
        build_on_make: bool,
    },
    /// Remove an artifact
    Remove { name: String },
    /// Rename an artifact
    Rename { name: String, new_name: String },
    /// Create a directory path inside an artifact
    Mkdir { artifact: String, path: String },
    /// Copy a file into an artifact
    AddFile {
        artifact: String,
        path: String,
        /// Directory inside the artifact, created if missing
        #[arg(long)]
        into: Option<String>,
        /// File name in the output
        #[arg(long = "as")]
        output_name: Option<String>,
    },
    /// Attach a command run before or after the artifact is built
    SetHook {
        artifact: String,
        #[arg(value_enum)]
        stage: HookStage,
        command: String,
        #[arg(long)]
        working_dir: Option<String>,
        /// Keep the command but don't run it
        #[arg(long)]
        disabled: bool,
    },
    /// Report unresolved references
    Check { name: Option<String> },
    /// Write the artifacts document as JSON
    Export {
        /// Target file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add or replace artifacts from an exported document
    Import { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum HookStage {
    Pre,
    Post,
}

impl HookStage {
    fn provider_id(self) -> &'static str {
        match self {
            Self::Pre => registry::PRE_PROCESSING,
            Self::Post => registry::POST_PROCESSING,
        }
    }
}

/// Initialize tracing with output to stderr so stdout stays clean for
/// command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "artifact_manifest=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_storage(kind: StorageKind, location: PathBuf) -> anyhow::Result<Box<dyn StateStorage>> {
    let storage: Box<dyn StateStorage> = match kind {
        StorageKind::File => Box::new(FileStorage::new(location)),
        StorageKind::Dir => Box::new(DirectoryStorage::new(location)),
        StorageKind::Sqlite => {
            let db = Database::open(location)?;
            db.migrate()?;
            Box::new(DatabaseStorage::new(db))
        }
    };
    Ok(storage)
}

fn find_id(session: &ArtifactSession, name: &str) -> anyhow::Result<ArtifactId> {
    session
        .find_artifact(name)
        .map(|a| a.id())
        .ok_or_else(|| anyhow!("No artifact named '{}'", name))
}

struct App {
    manager: ArtifactManager,
    storage: Box<dyn StateStorage>,
}

impl App {
    fn open(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let kind = cli.format.unwrap_or(config.storage);
        let location = cli
            .store
            .clone()
            .or_else(|| config.location.clone())
            .unwrap_or_else(|| PathBuf::from(kind.default_location()));
        let storage = open_storage(kind, location)?;

        let manager = ArtifactManager::new(Arc::new(Registry::with_defaults()))
            .with_resolving_context(Arc::new(config.resolving_context()));
        if let Some(state) = storage.load()? {
            for problem in manager.load_state(&state) {
                tracing::warn!("{}", problem);
            }
        }
        manager.subscribe(Arc::new(TracingListener));

        Ok(Self { manager, storage })
    }

    /// Run `edit` on a fresh session, then commit and save.
    fn edit<F>(&self, edit: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut ArtifactSession) -> anyhow::Result<()>,
    {
        let mut session = self.manager.create_session();
        edit(&mut session)?;
        if !session.is_modified() {
            tracing::info!("Nothing to commit");
            return Ok(());
        }

        let summary = self.manager.commit(session)?;
        tracing::debug!("Commit summary: {:?}", summary);
        self.storage.save(&self.manager.state())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();
    let app = App::open(&cli, &config)?;

    match cli.command {
        Commands::List => {
            for artifact in app.manager.artifacts() {
                println!(
                    "{}\t{}\t{}",
                    artifact.name(),
                    artifact.artifact_type(),
                    artifact.output_path().unwrap_or("-")
                );
            }
        }
        Commands::Show { name } => {
            let artifact = app
                .manager
                .find_artifact(&name)
                .ok_or_else(|| anyhow!("No artifact named '{}'", name))?;
            print!("{}", render_artifact(&artifact));

            let registry = app.manager.registry();
            for provider_id in registry.providers().ids() {
                let Some(properties) = registry.effective_properties(&artifact, provider_id) else {
                    continue;
                };
                let options: Vec<String> = options_of(properties.as_ref())
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect();
                println!("[{}] {}", provider_id, options.join(" "));
            }
        }
        Commands::Add {
            name,
            artifact_type,
            output,
            build_on_make,
        } => app.edit(|session| {
            let artifact = session.add_artifact(&name, &artifact_type)?;
            artifact.set_output_path(output);
            artifact.set_build_on_make(build_on_make);
            Ok(())
        })?,
        Commands::Remove { name } => app.edit(|session| {
            let id = find_id(session, &name)?;
            session.remove_artifact(id)?;
            Ok(())
        })?,
        Commands::Rename { name, new_name } => app.edit(|session| {
            let id = find_id(session, &name)?;
            session.rename_artifact(id, &new_name)?;
            Ok(())
        })?,
        Commands::Mkdir { artifact, path } => app.edit(|session| {
            let id = find_id(session, &artifact)?;
            session.root_element_mut(id)?.find_or_create_directory(&path)?;
            Ok(())
        })?,
        Commands::AddFile {
            artifact,
            path,
            into,
            output_name,
        } => app.edit(|session| {
            let id = find_id(session, &artifact)?;
            let root = session.root_element_mut(id)?;
            let target = match into.as_deref() {
                Some(dir) => root.find_or_create_directory(dir)?,
                None => root,
            };
            target.add_or_find_child(PackagingElement::file_copy(path, output_name))?;
            Ok(())
        })?,
        Commands::SetHook {
            artifact,
            stage,
            command,
            working_dir,
            disabled,
        } => app.edit(|session| {
            let id = find_id(session, &artifact)?;
            let hook = HookProperties {
                enabled: !disabled,
                command,
                working_dir,
            };
            session.set_properties(id, stage.provider_id(), Box::new(hook))?;
            Ok(())
        })?,
        Commands::Check { name } => {
            let snapshot = app.manager.snapshot();
            let artifacts = match name {
                Some(name) => vec![snapshot
                    .find(&name)
                    .ok_or_else(|| anyhow!("No artifact named '{}'", name))?],
                None => snapshot.entries().to_vec(),
            };

            let mut count = 0;
            for artifact in &artifacts {
                let problems =
                    validate_artifact(artifact, snapshot.as_ref(), app.manager.resolving_context());
                for problem in &problems {
                    println!("{}: {}", artifact.name(), problem);
                }
                count += problems.len();
            }
            if count > 0 {
                return Err(anyhow!("{} problem(s) found", count));
            }
            println!("{} artifact(s) OK", artifacts.len());
        }
        Commands::Export { output } => {
            let content = app
                .manager
                .state()
                .to_json()
                .context("Failed to serialize artifacts")?;
            match output {
                Some(path) => std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", content),
            }
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let state = Element::from_json(&content)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let report = codec::deserialize_artifacts(&state, app.manager.registry());
            for problem in &report.problems {
                tracing::warn!("{}", problem);
            }

            app.edit(|session| {
                for artifact in report.artifacts {
                    if let Some(existing) = session.find_artifact(artifact.name()).map(|a| a.id()) {
                        session.remove_artifact(existing)?;
                    }
                    session.insert_artifact(artifact)?;
                }
                Ok(())
            })?;
        }
    }

    Ok(())
}
