//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::render::Renderer;
use scholarpath_core::config::{self, GuideConfig, MAX_PAPER_COUNT};
use scholarpath_core::navigation::PaperStage;
use scholarpath_core::types::{DocumentUpload, Level};
use scholarpath_core::{HttpBackend, ResearchBackend, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Values from global flags that take precedence over every config layer.
#[derive(Debug, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
}

/// Load layered configuration, apply CLI overrides and validate the result.
pub fn resolve_config(workspace: &Path, overrides: &Overrides) -> anyhow::Result<GuideConfig> {
    let mut config = config::load_config(Some(workspace), None)?;
    if let Some(url) = &overrides.backend_url {
        config.backend.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Configuration, backend and renderer shared by the commands that talk to the backend.
struct Connection {
    config: GuideConfig,
    backend: Arc<HttpBackend>,
    renderer: Renderer,
}

impl Connection {
    fn open(workspace: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        let config = resolve_config(workspace, overrides)?;
        let backend = Arc::new(HttpBackend::new(&config.backend)?);
        let renderer = Renderer::new(&config);
        Ok(Self {
            config,
            backend,
            renderer,
        })
    }
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    match command {
        Commands::Roadmap {
            topic,
            count,
            select,
        } => {
            let conn = Connection::open(workspace, overrides)?;
            handle_roadmap(&conn, &topic, count, select).await
        }
        Commands::Papers { concept, count } => {
            let conn = Connection::open(workspace, overrides)?;
            let count = count.unwrap_or(conn.config.roadmap.paper_count);
            handle_papers(conn.backend.as_ref(), &conn.renderer, &concept, count).await
        }
        Commands::Explain { pdf, level } => {
            let conn = Connection::open(workspace, overrides)?;
            let level = level.unwrap_or(conn.config.explain.default_level);
            handle_explain(&conn, pdf, level).await
        }
        Commands::Health => {
            let conn = Connection::open(workspace, overrides)?;
            handle_health(conn.backend.as_ref()).await
        }
        Commands::Config { action } => handle_config(action, workspace, overrides),
    }
}

async fn handle_roadmap(
    conn: &Connection,
    topic: &str,
    count: Option<u32>,
    select: Option<usize>,
) -> anyhow::Result<()> {
    let renderer = &conn.renderer;
    let (mut session, mut events) = Session::new(Arc::clone(&conn.backend), &conn.config);
    if let Some(count) = count {
        session.set_paper_count(count);
    }

    if !session.generate_roadmap(topic) {
        anyhow::bail!("Topic must not be blank");
    }
    session.settle_all(&mut events).await;
    if let Some(message) = session.navigator().roadmap_error() {
        anyhow::bail!(message);
    }
    println!("{}", renderer.roadmap(session.navigator()));

    let Some(position) = select else {
        return Ok(());
    };
    if !session.select_concept_at(position) {
        anyhow::bail!(
            "Concept {} is out of range (1-{})",
            position,
            session.navigator().concepts().len()
        );
    }
    session.settle_all(&mut events).await;
    println!("\n{}", renderer.papers(session.navigator()));
    if session.navigator().paper_stage() == Some(&PaperStage::Failed) {
        anyhow::bail!("Paper lookup failed");
    }
    Ok(())
}

async fn handle_papers(
    backend: &dyn ResearchBackend,
    renderer: &Renderer,
    concept: &str,
    count: u32,
) -> anyhow::Result<()> {
    let concept = concept.trim();
    if concept.is_empty() {
        anyhow::bail!("Concept must not be blank");
    }
    let count = count.clamp(1, MAX_PAPER_COUNT);

    let result = backend.fetch_papers(concept, count).await;
    if let Err(e) = &result {
        tracing::warn!(concept, error = %e, "Papers request failed");
    }
    let stage = PaperStage::from_result(result);
    println!("{}", renderer.paper_stage(concept, &stage));
    if stage == PaperStage::Failed {
        anyhow::bail!("Paper lookup failed");
    }
    Ok(())
}

async fn handle_explain(conn: &Connection, pdf: PathBuf, level: Level) -> anyhow::Result<()> {
    let upload = DocumentUpload::from_path(&pdf).await?;
    if !upload.is_pdf() {
        eprintln!("Warning: {} does not look like a PDF; the backend may reject it.", pdf.display());
    }

    let (mut session, mut events) = Session::new(Arc::clone(&conn.backend), &conn.config);
    session.set_level(level);
    session.upload(upload);
    session.settle_all(&mut events).await;
    if let Some(message) = session.explain_flow().error() {
        anyhow::bail!(message);
    }

    if !session.explain() {
        anyhow::bail!("No document to explain");
    }
    session.settle_all(&mut events).await;
    if let Some(message) = session.explain_flow().error() {
        anyhow::bail!(message);
    }

    match session.explain_flow().visible_explanation() {
        Some(explanation) => println!("{}", conn.renderer.explanation(explanation)),
        None => anyhow::bail!("No explanation was produced"),
    }
    Ok(())
}

async fn handle_health(backend: &HttpBackend) -> anyhow::Result<()> {
    match backend.health().await {
        Ok(()) => {
            println!("Backend at {} is reachable.", backend.base_url());
            Ok(())
        }
        Err(e) => anyhow::bail!("Backend at {} is not reachable: {}", backend.base_url(), e),
    }
}

fn handle_config(action: ConfigAction, workspace: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let (config_path, created) = config::write_default_config(workspace)?;
            if created {
                println!(
                    "Created default configuration at: {}",
                    config_path.display()
                );
            } else {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, overrides)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
