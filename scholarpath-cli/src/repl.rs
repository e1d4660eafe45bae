//! Interactive session: reads commands from stdin while backend calls settle.
//!
//! The loop waits on the next input line and the next settled backend call at
//! the same time, so a slow roadmap or explanation never blocks typing and a
//! stale completion is simply reported as superseded.

use scholarpath_core::config::{GuideConfig, PAPER_COUNT_CHOICES};
use scholarpath_core::session::{FlowEvent, Session};
use scholarpath_core::types::{DocumentUpload, Level};
use scholarpath_core::{HttpBackend, ResearchBackend};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render::Renderer;

const HELP: &str = "\
Commands:
  topic <goal>          Generate a conceptual roadmap for a research goal
  select <n|concept>    Load papers for a roadmap concept
  count <n>             Papers to request per concept (5, 10, 15, 20, 30; max 30)
  upload <path.pdf>     Upload a paper to explain
  level <level>         Switch explanation level: easy, intermediate, advanced
  explain               Explain the uploaded paper at the current level
  show                  Show the roadmap, papers and explanation
  help                  Show this help
  quit                  Exit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Topic(String),
    SelectAt(usize),
    SelectNamed(String),
    Count(u32),
    Upload(PathBuf),
    Level(Level),
    Explain,
    Show,
    Help,
    Quit,
}

/// Parse one input line. `Ok(None)` for blank lines; `Err` carries a usage hint.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    if line.is_empty() {
        return Ok(None);
    }
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    let command = match cmd.to_ascii_lowercase().as_str() {
        "topic" | "roadmap" => ReplCommand::Topic(arg.to_string()),
        "select" | "s" => {
            if arg.is_empty() {
                return Err("Usage: select <number|concept>".to_string());
            }
            match arg.parse::<usize>() {
                Ok(position) => ReplCommand::SelectAt(position),
                Err(_) => ReplCommand::SelectNamed(arg.to_string()),
            }
        }
        "count" => match arg.parse::<u32>() {
            Ok(count) => ReplCommand::Count(count),
            Err(_) => return Err("Usage: count <number>".to_string()),
        },
        "upload" => {
            if arg.is_empty() {
                return Err("Usage: upload <path.pdf>".to_string());
            }
            ReplCommand::Upload(PathBuf::from(arg))
        }
        "level" => ReplCommand::Level(arg.parse::<Level>()?),
        "explain" => ReplCommand::Explain,
        "show" | "status" => ReplCommand::Show,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => {
            return Err(format!(
                "Unknown command: {}. Type help for available commands.",
                other
            ));
        }
    };
    Ok(Some(command))
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Print(String),
    Quit,
}

/// Run one command against the session and return what to print.
pub async fn execute<B: ResearchBackend + ?Sized + 'static>(
    command: ReplCommand,
    session: &mut Session<B>,
    renderer: &Renderer,
) -> Step {
    let output = match command {
        ReplCommand::Topic(goal) => {
            if session.generate_roadmap(&goal) {
                renderer.roadmap(session.navigator())
            } else {
                "Enter a research goal, e.g. `topic graph neural networks`.".to_string()
            }
        }
        ReplCommand::SelectAt(position) => {
            if session.select_concept_at(position) {
                renderer.papers(session.navigator())
            } else {
                select_hint(session)
            }
        }
        ReplCommand::SelectNamed(concept) => {
            if session.select_concept(&concept) {
                renderer.papers(session.navigator())
            } else {
                select_hint(session)
            }
        }
        ReplCommand::Count(requested) => {
            let applied = session.set_paper_count(requested);
            let mut message = format!("Papers per concept: {applied}");
            if !PAPER_COUNT_CHOICES.contains(&applied) {
                message.push_str(" (the usual choices are 5, 10, 15, 20 and 30)");
            }
            message
        }
        ReplCommand::Upload(path) => match DocumentUpload::from_path(&path).await {
            Ok(upload) => {
                let mut message = String::new();
                if !upload.is_pdf() {
                    message.push_str("Warning: this does not look like a PDF; the backend may reject it.\n");
                }
                message.push_str(&format!("Uploading {}...", upload.file_name));
                session.upload(upload);
                message
            }
            Err(e) => e.to_string(),
        },
        ReplCommand::Level(level) => {
            session.set_level(level);
            renderer.explain_status(session.explain_flow())
        }
        ReplCommand::Explain => {
            let flow = session.explain_flow();
            if flow.document().is_none() {
                "Upload a PDF first with `upload <path.pdf>`.".to_string()
            } else if flow.loading() {
                "An explanation is already being generated.".to_string()
            } else if session.explain() {
                renderer.explain_status(session.explain_flow())
            } else {
                "Nothing to explain.".to_string()
            }
        }
        ReplCommand::Show => show(session, renderer),
        ReplCommand::Help => HELP.to_string(),
        ReplCommand::Quit => return Step::Quit,
    };
    Step::Print(output)
}

fn select_hint<B: ResearchBackend + ?Sized + 'static>(session: &Session<B>) -> String {
    let concepts = session.navigator().concepts().len();
    if concepts == 0 {
        "Generate a roadmap first with `topic <goal>`.".to_string()
    } else {
        format!("Pick a concept between 1 and {concepts}.")
    }
}

fn show<B: ResearchBackend + ?Sized + 'static>(session: &Session<B>, renderer: &Renderer) -> String {
    let mut sections = vec![renderer.roadmap(session.navigator())];
    let papers = renderer.papers(session.navigator());
    if !papers.is_empty() {
        sections.push(papers);
    }
    sections.push(renderer.explain_status(session.explain_flow()));
    sections.join("\n\n")
}

/// The view an event refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Roadmap,
    Papers,
    Explain,
}

impl View {
    fn of(event: &FlowEvent) -> Self {
        match event {
            FlowEvent::RoadmapSettled { .. } => View::Roadmap,
            FlowEvent::PapersSettled { .. } => View::Papers,
            FlowEvent::UploadSettled { .. } | FlowEvent::ExplainSettled { .. } => View::Explain,
        }
    }
}

/// Apply a settled event and return the refreshed view, or `None` if it was superseded.
pub fn on_event<B: ResearchBackend + ?Sized + 'static>(
    event: FlowEvent,
    session: &mut Session<B>,
    renderer: &Renderer,
) -> Option<String> {
    let view = View::of(&event);
    if !session.apply(event) {
        tracing::debug!(?view, "Superseded response ignored");
        return None;
    }
    Some(match view {
        View::Roadmap => renderer.roadmap(session.navigator()),
        View::Papers => renderer.papers(session.navigator()),
        View::Explain => renderer.explain_status(session.explain_flow()),
    })
}

fn prompt() {
    print!("\x1b[1;34mscholarpath> \x1b[0m");
    let _ = std::io::stdout().flush();
}

/// Run the interactive session until `quit` or end of input.
pub async fn run_interactive(config: GuideConfig, workspace: PathBuf) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    banner(&config, &workspace);
    let renderer = Renderer::new(&config);
    let (mut session, mut events) = Session::new(backend, &config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => match execute(command, &mut session, &renderer).await {
                        Step::Print(output) => println!("{output}"),
                        Step::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                    },
                    Ok(None) => {}
                    Err(hint) => println!("{hint}"),
                }
                prompt();
            }
            Some(event) = events.recv() => {
                if let Some(view) = on_event(event, &mut session, &renderer) {
                    println!("\n{view}");
                    prompt();
                }
            }
        }
    }
    Ok(())
}

fn banner(config: &GuideConfig, workspace: &Path) {
    println!("\n  \x1b[1;32mScholarPath\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Backend: {} | Level: {} | Papers per concept: {} | Workspace: {}",
        config.backend.base_url,
        config.explain.default_level,
        config.roadmap.paper_count,
        workspace.display()
    );
    println!("  Type help for commands, quit to exit\n");
}
