use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transkey::{parse_line, Action, CloudCompletion, CloudTranslator, Document, PhoneticTable, Phrasebook};
use transkey_core::{
    CompletionService, Config, JsonFileStore, KeyResult, Keyboard, TranslationPipeline, Translator,
};

/// Interactive phonetic translating keyboard.
///
/// Reads key scripts from stdin, one line at a time. Plain words type their
/// letters; `:space :return :delete :toggle :up :down :N :orig :trans :wait
/// :purge` are named keys and commands.
#[derive(Parser)]
#[command(name = "transkey", version)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Phonetic table (`key<TAB>phrase[<TAB>freq]`), default: built-in demo
    #[arg(long)]
    table: Option<PathBuf>,

    /// Translation phrasebook (`source<TAB>translation`), default: built-in demo
    #[arg(long)]
    phrasebook: Option<PathBuf>,

    /// Use a completion/translation server instead of local tables
    #[arg(long)]
    endpoint: Option<String>,

    /// Translation cache file, default: ~/.transkey/translation_cache.json
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Start in direct-insert mode
    #[arg(long)]
    direct: bool,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_toml(path)?,
        None => Config::default(),
    };
    if args.direct {
        config.start_in_translate_mode = false;
    }
    Ok(config)
}

fn build_backends(args: &Args) -> Result<(Box<dyn CompletionService>, Arc<dyn Translator>)> {
    if let Some(url) = &args.endpoint {
        info!(%url, "using cloud backends");
        let completion = CloudCompletion::new(url).context("create completion client")?;
        let translator = CloudTranslator::new(url).context("create translation client")?;
        return Ok((Box::new(completion), Arc::new(translator)));
    }

    let table = match &args.table {
        Some(path) => PhoneticTable::load_tsv(path)?,
        None => PhoneticTable::demo(),
    };
    let book = match &args.phrasebook {
        Some(path) => Phrasebook::load_tsv(path)?,
        None => Phrasebook::demo(),
    };
    Ok((Box::new(table), Arc::new(book)))
}

fn print_state(kb: &Keyboard<Box<dyn CompletionService>, Document>, out: &mut impl Write) -> io::Result<()> {
    let ctx = kb.context();
    if !ctx.preedit_text.is_empty() {
        writeln!(out, "  input: {}", ctx.preedit_text)?;
    }
    if !ctx.candidates.is_empty() {
        let list: Vec<String> = ctx
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mark = if i == ctx.candidate_cursor { "*" } else { "" };
                format!("{}{}.{}", mark, i + 1, c)
            })
            .collect();
        writeln!(out, "  candidates: {}", list.join(" "))?;
    }
    if let Some(choice) = &ctx.pending_choice {
        writeln!(out, "  choose: {} (:orig) | {} (:trans)", choice.original, choice.translated)?;
    }
    writeln!(out, "  [{}]", ctx.auxiliary_text)?;
    writeln!(out, "  document: {:?}", kb.host().text())?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let (completion, translator) = build_backends(&args)?;
    let cache_path = args.cache.clone().unwrap_or_else(transkey::default_cache_path);

    let pipeline = TranslationPipeline::builder(translator)
        .config(&config)
        .store(Arc::new(JsonFileStore::new(&cache_path)))
        .build()?;
    // Kick off the model download before the first selection.
    let _ = pipeline.prepare();

    let mut kb = Keyboard::new(&config, completion, pipeline, Document::new());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let actions = match parse_line(&line) {
            Ok(actions) => actions,
            Err(err) => {
                eprintln!("{}", err);
                continue;
            }
        };
        for action in actions {
            match action {
                Action::Key(key) => {
                    if kb.on_key(key) == KeyResult::NotHandled {
                        warn!(?key, "key ignored");
                    }
                }
                Action::Choose(use_translated) => {
                    if !kb.choose(use_translated) {
                        eprintln!("nothing to choose");
                    }
                }
                Action::Wait => {
                    kb.wait_for_translations();
                }
                Action::Purge => {
                    let _ = kb.on_memory_pressure();
                }
            }
        }
        kb.pump();
        print_state(&kb, &mut stdout)?;
    }

    kb.wait_for_translations();
    println!("{}", kb.host().text());
    // Dropping the keyboard flushes the translation cache.
    drop(kb);
    info!(path = %cache_path.display(), "keyboard closed");
    Ok(())
}
