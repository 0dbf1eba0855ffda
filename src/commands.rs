//! CLI command implementations

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tuist_cache::{
    CacheError, CacheGraphMutator, CacheLocalStorage, CacheMapper, CacheRemoteStorage,
    CacheResources, CacheStorage, CacheStoring, CloudClient,
};
use tuist_graph::config::TOKEN_ENV;
use tuist_graph::{
    CacheDirectories, Config, ConfigError, Context, FatalError, FsError, GraphError, Severity,
    ValueGraph,
};
use tuist_hasher::{CacheOutputType, CacheProfile, ContentHasher, GraphContentHasher, HasherError};
use tuist_loader::{GraphLoader, LoaderError, ManifestLoader, ModelLoader, lint_globs};
use tuist_queue::{AsyncQueue, QueueError};

use crate::builder::XcodeBuilder;
use crate::telemetry::{CommandEventDispatcher, command_event};

/// Everything a command needs: config, context, cache directories and the
/// event queue.
struct Session {
    root: PathBuf,
    config: Config,
    context: Context,
    directories: CacheDirectories,
    cloud: Option<CloudClient>,
    queue: AsyncQueue,
}

impl Session {
    async fn start(path: &Path) -> anyhow::Result<Self> {
        let root = std::path::absolute(path)?;
        let config = Config::load(&root)?;
        let context = Context::system();
        let directories = CacheDirectories::new(config.cache_directory(&root));
        directories.ensure()?;

        let cloud = match &config.cloud {
            Some(cloud) => Some(CloudClient::from_config(
                cloud,
                std::env::var(TOKEN_ENV).ok(),
            )?),
            None => None,
        };

        let queue = AsyncQueue::from_context(&context, &directories);
        if let Some(client) = &cloud {
            queue.register(Arc::new(CommandEventDispatcher::new(client.clone())));
        }
        queue.start().await;

        Ok(Session {
            root,
            config,
            context,
            directories,
            cloud,
            queue,
        })
    }

    fn load_graph(&self) -> anyhow::Result<ValueGraph> {
        let file_handler = self.context.file_handler.clone();
        let models = ModelLoader::new(Arc::new(ManifestLoader::new(file_handler.clone())));
        let (workspace, projects) = models.load_workspace(&self.root)?;
        lint_globs(&projects, file_handler.as_ref())?;
        Ok(GraphLoader::from_context(&self.context).load_workspace(&workspace, &projects)?)
    }

    fn profile(&self, name: Option<&str>) -> anyhow::Result<CacheProfile> {
        Ok(self.config.resolve_profile(name)?.into())
    }

    fn hasher(&self) -> GraphContentHasher {
        GraphContentHasher::new(ContentHasher::new(self.context.file_handler.clone()))
    }

    /// The local cache, backed by the cloud when one is configured.
    fn storage(&self) -> Arc<dyn CacheStoring> {
        let file_handler = self.context.file_handler.clone();
        let local = CacheLocalStorage::new(self.directories.clone(), file_handler.clone());
        let mut remotes: Vec<Arc<dyn CacheStoring>> = Vec::new();
        if let (Some(client), Some(cloud)) = (&self.cloud, &self.config.cloud) {
            remotes.push(Arc::new(CacheRemoteStorage::new(
                client.clone(),
                CacheResources::new(cloud.project_id.clone()),
                self.directories.clone(),
                file_handler,
            )));
        }
        Arc::new(CacheStorage::new(local, remotes))
    }

    fn mapper(&self, profile: CacheProfile, output_type: CacheOutputType) -> CacheMapper {
        CacheMapper::new(
            self.hasher(),
            self.storage(),
            CacheGraphMutator::from_context(&self.context),
            profile,
            output_type,
        )
    }

    /// Queues the command's analytics event. On CI, waits until it's delivered.
    async fn finish<T>(self, name: &str, started: Instant, result: &anyhow::Result<T>) {
        let event = command_event(
            name,
            started.elapsed(),
            result.is_ok(),
            self.context.ci.is_ci(),
            self.context.clock.as_ref(),
        );
        if let Err(e) = self.queue.dispatch(event) {
            tracing::warn!("Couldn't queue the {} command event: {}", name, e);
        }
        if self.context.ci.is_ci() {
            self.queue.wait_until_finished().await;
        }
    }
}

pub async fn graph(path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let session = Session::start(&path).await?;
    let started = Instant::now();
    let result: anyhow::Result<()> = async {
        let graph = session.load_graph()?;
        let dot = graph.to_dot();
        match output {
            Some(output) => {
                session.context.file_handler.write(&output, dot.as_bytes())?;
                tracing::info!("Graph exported to {}", output.display());
            }
            None => println!("{dot}"),
        }
        Ok(())
    }
    .await;
    session.finish("graph", started, &result).await;
    result
}

pub async fn hash(
    path: PathBuf,
    profile: Option<String>,
    output_type: CacheOutputType,
) -> anyhow::Result<()> {
    let session = Session::start(&path).await?;
    let started = Instant::now();
    let result: anyhow::Result<()> = async {
        let graph = session.load_graph()?;
        let profile = session.profile(profile.as_deref())?;
        let hashes = session.hasher().content_hashes(
            &graph,
            GraphContentHasher::cacheable,
            &profile,
            output_type,
        )?;
        if hashes.is_empty() {
            tracing::info!("The project contains no cacheable targets");
        }
        for (target, hash) in hashes {
            println!("{} - {}", target.name(), hash);
        }
        Ok(())
    }
    .await;
    session.finish("hash", started, &result).await;
    result
}

pub async fn cache_warm(
    path: PathBuf,
    profile: Option<String>,
    output_type: CacheOutputType,
) -> anyhow::Result<()> {
    let session = Session::start(&path).await?;
    let started = Instant::now();
    let result: anyhow::Result<()> = async {
        let graph = session.load_graph()?;
        let profile = session.profile(profile.as_deref())?;
        let builder = XcodeBuilder::new(&graph, profile.configuration.clone());
        let build_dir = session.directories.root().join("Builds");

        let stored = session
            .mapper(profile, output_type)
            .warm(&graph, &builder, &build_dir)
            .await;
        session.context.file_handler.delete(&build_dir)?;
        let stored = stored?;
        tracing::info!("Stored {} targets in the cache", stored.len());
        Ok(())
    }
    .await;
    session.finish("cache warm", started, &result).await;
    result
}

pub async fn cache_focus(
    path: PathBuf,
    targets: Vec<String>,
    profile: Option<String>,
    output_type: CacheOutputType,
) -> anyhow::Result<()> {
    let session = Session::start(&path).await?;
    let started = Instant::now();
    let result: anyhow::Result<()> = async {
        let graph = session.load_graph()?;
        let sources: BTreeSet<String> = targets.into_iter().collect();
        for name in &sources {
            if !graph.all_targets().iter().any(|t| t.name() == name) {
                return Err(GraphError::TargetNotFound(name.clone(), graph.path.clone()).into());
            }
        }
        let profile = session.profile(profile.as_deref())?;
        let mapped = session
            .mapper(profile, output_type)
            .with_sources(sources)
            .map(&graph)
            .await?;

        let pruned = mapped
            .all_targets()
            .into_iter()
            .filter(|t| t.target.prune)
            .count();
        tracing::info!(
            "{} of {} targets replaced by binaries",
            pruned,
            mapped.target_count()
        );
        println!("{}", mapped.to_dot());
        Ok(())
    }
    .await;
    session.finish("cache focus", started, &result).await;
    result
}

pub async fn cache_clean(path: PathBuf) -> anyhow::Result<()> {
    let session = Session::start(&path).await?;
    let started = Instant::now();
    tracing::info!(
        "Clearing binary cache at: {}",
        session.directories.binary_cache().display()
    );
    let result = session
        .directories
        .clear_binaries()
        .map_err(anyhow::Error::from);
    if result.is_ok() {
        tracing::info!("Cache cleared");
    }
    session.finish("cache clean", started, &result).await;
    result
}

/// Severity of the first error in the chain that knows its own.
/// Anything else is the user's environment.
pub fn severity(error: &anyhow::Error) -> Severity {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<CacheError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<LoaderError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<HasherError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<QueueError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<GraphError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return e.severity();
        }
        if let Some(e) = cause.downcast_ref::<FsError>() {
            return e.severity();
        }
    }
    Severity::Abort
}
