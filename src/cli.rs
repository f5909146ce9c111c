use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use adapdict_rs::language::LanguageState;
use adapdict_rs::store::JsonFileStore;
use adapdict_rs::{LangCode, LanguagePair, SearchMode, ShapeTag, classify, present};
use atty::Stream;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "adapdict-rs", about = "Classify and render adaptive dictionary results", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the shape a response document is classified as.
    Classify {
        /// Path to a JSON response document, or `-` for stdin.
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ModeArg::Dict)]
        mode: ModeArg,
    },
    /// Render a response document to HTML.
    Render {
        /// Path to a JSON response document, or `-` for stdin.
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ModeArg::Dict)]
        mode: ModeArg,
    },
    /// Inspect or change the persisted language pair.
    Lang {
        /// JSON file holding persisted UI state.
        #[arg(long, global = true, default_value = "adapdict-state.json")]
        store: PathBuf,
        /// Locale used when nothing is persisted yet, e.g. `de-DE`.
        #[arg(long, global = true, env = "LANG")]
        locale: Option<String>,
        #[command(subcommand)]
        action: LangCommand,
    },
    /// Run the HTTP front end.
    #[cfg(feature = "web")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Base URL of the query endpoint.
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        upstream: String,
        /// Upstream request timeout in seconds.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

#[derive(Subcommand, Debug)]
enum LangCommand {
    /// Show the current pair.
    Show,
    /// Set the native language; the target moves if it collides.
    SetNative { code: LangArg },
    /// Set the target language; the native moves if it collides.
    SetTarget { code: LangArg },
    /// Exchange native and target.
    Swap,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Dict,
    Encyclopedia,
}

impl From<ModeArg> for SearchMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Dict => SearchMode::Dictionary,
            ModeArg::Encyclopedia => SearchMode::Encyclopedia,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LangArg {
    Ko,
    En,
    Zh,
    De,
}

impl From<LangArg> for LangCode {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::Ko => LangCode::Ko,
            LangArg::En => LangCode::En,
            LangArg::Zh => LangCode::Zh,
            LangArg::De => LangCode::De,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Classify { file, mode } => handle_classify(&file, mode.into(), cli.json),
        Command::Render { file, mode } => handle_render(&file, mode.into(), cli.json),
        Command::Lang {
            store,
            locale,
            action,
        } => handle_lang(store, locale.as_deref(), action, cli.json),
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            upstream,
            timeout_secs,
        } => handle_serve(addr, upstream, timeout_secs),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_document(path: &Path) -> Result<Value, Box<dyn Error>> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path).map_err(|err| format!("{}: {err}", path.display()))?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn handle_classify(path: &Path, mode: SearchMode, as_json: bool) -> Result<(), Box<dyn Error>> {
    let document = read_document(path)?;
    let shape = classify(&document, mode);
    if as_json {
        println!("{}", json!({ "shape": shape, "mode": mode.query_value() }));
    } else {
        println!("{shape}");
    }
    Ok(())
}

fn handle_render(path: &Path, mode: SearchMode, as_json: bool) -> Result<(), Box<dyn Error>> {
    let document = read_document(path)?;
    let (shape, fragment) = present(&document, mode);
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "shape": shape,
                "html": fragment.html,
                "card_count": fragment.card_count,
                "carousels": fragment.carousels,
            }))?
        );
        return Ok(());
    }
    let summary = render_summary(shape, fragment.card_count, &fragment.carousels);
    render_markdown_block("Summary", &summary);
    println!("{}", fragment.html);
    Ok(())
}

fn render_summary(shape: ShapeTag, cards: usize, carousels: &[usize]) -> String {
    let mut summary = format!("**Shape:** `{shape}`  \n**Cards:** {cards}");
    if !carousels.is_empty() {
        let sizes = carousels
            .iter()
            .map(|len| len.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!("  \n**Carousels:** {sizes}"));
    }
    summary
}

fn handle_lang(
    path: PathBuf,
    locale: Option<&str>,
    action: LangCommand,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut state = LanguageState::restore(JsonFileStore::new(path), locale);
    let pair = match action {
        LangCommand::Show => state.pair(),
        LangCommand::SetNative { code } => state.set_native(code.into()),
        LangCommand::SetTarget { code } => state.set_target(code.into()),
        LangCommand::Swap => state.swap(),
    };
    print_pair(pair, as_json)
}

fn print_pair(pair: LanguagePair, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string(&pair)?);
    } else {
        println!(
            "{} ({}) -> {} ({})",
            pair.native().display_name(),
            pair.native(),
            pair.target().display_name(),
            pair.target()
        );
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(
    addr: std::net::SocketAddr,
    upstream: String,
    timeout_secs: u64,
) -> Result<(), Box<dyn Error>> {
    use adapdict_rs::web::{self, WebConfig};

    let config = WebConfig {
        addr,
        upstream_url: upstream,
        timeout: std::time::Duration::from_secs(timeout_secs.max(1)),
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::serve(config))?;
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn markdown_skin() -> MadSkin {
    MadSkin::default()
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        println!("{title}:");
        let skin = markdown_skin();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_lists_carousels_only_when_present() {
        let plain = render_summary(ShapeTag::WordDict, 1, &[]);
        assert!(plain.contains("`word_dict`"));
        assert!(!plain.contains("Carousels"));
        let nested = render_summary(ShapeTag::ParagraphL2ToL1, 4, &[3]);
        assert!(nested.contains("**Carousels:** 3"));
    }

    #[test]
    fn lang_arguments_parse() {
        let args = ["adapdict-rs", "--json", "lang", "--store", "x.json", "set-native", "en"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.json);
        let Command::Lang { store, action, .. } = cli.command else {
            panic!("expected lang command");
        };
        assert_eq!(store, PathBuf::from("x.json"));
        assert!(matches!(action, LangCommand::SetNative { code: LangArg::En }));
    }
}
