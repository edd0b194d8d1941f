use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use enc_remap::config::{default_settings, load_settings, user::user_config_path};
use enc_remap::debugger::{ManagedInstructionId, MethodToken, RecordedDebugger};
use enc_remap::fixtures::{FIXTURE_MODULE, MarkedSource, StatementDescription, active_statement_debug_infos};
use enc_remap::syntax::SyntaxRegistry;
use enc_remap::text::LinePositionSpan;
use enc_remap::workspace::{InMemoryWorkspace, WorkspaceService};
use enc_remap::{
    ActiveStatementId, ActiveStatementsMap, DebuggingSession, EncResult, ExceptionRegions,
    NonRemappableRegions, RemapResult, resolve_exception_regions,
};

/// Active statement remapping for edit-and-continue, driven by tagged sources
#[derive(Parser)]
#[command(name = "enc-remap")]
#[command(version)]
#[command(about = "Active statement remapping for edit-and-continue, driven by tagged sources")]
struct Cli {
    /// Language settings file (default: $XDG_CONFIG_HOME/enc-remap/enc-remap.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a tagged source with its tags blanked out
    Clear {
        /// Tagged source file
        file: PathBuf,
    },
    /// Print the active statements of a tagged source and their exception regions
    Describe {
        /// Tagged source file
        file: PathBuf,
    },
    /// Remap the active statements of one edit and print the updates and ledger
    Remap {
        /// Tagged source as compiled into the running program
        old: PathBuf,
        /// Edited source; tags are ignored
        new: PathBuf,

        /// MethodDef row recompiled by the edit (repeatable)
        #[arg(long = "updated-method", value_name = "ROW")]
        updated_methods: Vec<u32>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribedStatement {
    id: ActiveStatementId,
    instruction: ManagedInstructionId,
    flags: Vec<&'static str>,
    span: LinePositionSpan,
    exception_regions: ExceptionRegions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemapOutput<'a> {
    update: &'a RemapResult,
    ledger: &'a NonRemappableRegions,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_module("enc_remap", log::LevelFilter::Warn)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clear { file } => clear(&file),
        Commands::Describe { file } => describe(&file, cli.config.as_deref()),
        Commands::Remap {
            old,
            new,
            updated_methods,
        } => remap(&old, &new, &updated_methods, cli.config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn syntax_registry(config: Option<&Path>) -> EncResult<SyntaxRegistry> {
    let settings = match config.map(PathBuf::from).or_else(|| user_config_path().filter(|path| path.exists())) {
        Some(path) => load_settings(&path)?,
        None => default_settings(),
    };
    Ok(SyntaxRegistry::from_settings(&settings))
}

fn read_marked(path: &Path) -> EncResult<MarkedSource> {
    let text = std::fs::read_to_string(path)?;
    MarkedSource::parse(path.display().to_string(), text)
}

fn print_json<T: Serialize>(value: &T) -> EncResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| enc_remap::EncError::internal(format!("failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn clear(file: &Path) -> EncResult<()> {
    let source = read_marked(file)?;
    print!("{}", source.text());
    Ok(())
}

fn describe(file: &Path, config: Option<&Path>) -> EncResult<()> {
    let syntax = syntax_registry(config)?;
    let source = read_marked(file)?;
    let workspace = InMemoryWorkspace::new();
    let language = syntax.language_for_path(source.path()).map(String::from);
    workspace.add_document(source.path(), language.as_deref(), source.text());

    let infos = active_statement_debug_infos(std::slice::from_ref(&source), StatementDescription::for_ordinal)?;
    let map = ActiveStatementsMap::build(infos, |path| workspace.document_ids_for_path(path));
    let regions = resolve_exception_regions(&map, &workspace, &syntax);

    let described: Vec<_> = regions
        .entries()
        .iter()
        .map(|entry| DescribedStatement {
            id: entry.statement.id,
            instruction: entry.statement.instruction,
            flags: entry.statement.flags.names(),
            span: entry.statement.span,
            exception_regions: entry.exception_regions.clone(),
        })
        .collect();
    print_json(&described)
}

async fn remap(old: &Path, new: &Path, updated_methods: &[u32], config: Option<&Path>) -> EncResult<()> {
    let syntax = Arc::new(syntax_registry(config)?);
    let old_source = read_marked(old)?;
    let new_source = read_marked(new)?;

    let workspace = Arc::new(InMemoryWorkspace::new());
    let language = syntax.language_for_path(old_source.path()).map(String::from);
    let document = workspace.add_document(old_source.path(), language.as_deref(), old_source.text());
    workspace.edit_document(document, new_source.text());

    let infos = active_statement_debug_infos(std::slice::from_ref(&old_source), StatementDescription::for_ordinal)?;
    let debugger = Arc::new(RecordedDebugger::new(infos));
    debugger.load_module(FIXTURE_MODULE);

    let session = DebuggingSession::new(debugger, workspace, syntax);
    session.start_edit_session()?;

    let tokens: HashSet<MethodToken> = updated_methods
        .iter()
        .map(|&row| MethodToken::from_method_row(row))
        .collect();
    let cancel = CancellationToken::new();
    let update = session.prepare_update(FIXTURE_MODULE, &tokens, &cancel).await?;
    session.commit_update()?;

    let ledger = session.non_remappable_regions();
    print_json(&RemapOutput {
        update: &update,
        ledger: &ledger,
    })?;

    session.end();
    Ok(())
}
