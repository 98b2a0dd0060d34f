use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use apertium_explain::align::{Aligner, TraceWriter};
use apertium_explain::apertium::ApertiumCommand;
use apertium_explain::config::{init_default_config, CliOverrides, RunConfig};
use apertium_explain::progress::ConsoleProgress;
use apertium_explain::report::{render, ReportOptions};

#[derive(Parser, Debug)]
#[command(name = "apertium-explain")]
#[command(
    about = "Align source subsegments with the parts of an Apertium translation they produce",
    long_about = None
)]
struct Args {
    /// Source language code (e.g. en)
    #[arg(value_name = "SOURCE_LANGUAGE", required_unless_present = "init_config")]
    source_language: Option<String>,

    /// Target language code (e.g. es)
    #[arg(value_name = "TARGET_LANGUAGE", required_unless_present = "init_config")]
    target_language: Option<String>,

    /// Input text
    #[arg(value_name = "S", required_unless_present = "init_config")]
    text: Option<String>,

    /// Maximum length of whole-word subsegments (for source text)
    #[arg(short = 'm', long)]
    max_source_length: Option<usize>,

    /// Maximum length of whole-word subsegments (for translated text)
    #[arg(short = 'M', long)]
    max_translation_length: Option<usize>,

    /// Directory of the Apertium language pair
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Print a reference table of characters after the correspondences
    #[arg(short, long)]
    table: bool,

    /// Also list subsegments that found no match
    #[arg(long)]
    gaps: bool,

    /// Output format: text or json
    #[arg(long)]
    format: Option<String>,

    /// Fail when the analyzer output does not reproduce the analyzed text
    #[arg(long)]
    strict_offsets: bool,

    /// Translate repeated subsegments every time instead of reusing the first result
    #[arg(long)]
    no_memo: bool,

    /// Write every external call's input and output to this directory
    #[arg(long, value_name = "DIR")]
    trace_dir: Option<PathBuf>,

    /// Config file path (default: search for apertium-explain.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// No progress output on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Write a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory for --init-config (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let (Some(source_lang), Some(target_lang), Some(text)) = (
        args.source_language.clone(),
        args.target_language.clone(),
        args.text.clone(),
    ) else {
        Args::command().print_help().context("print help")?;
        anyhow::bail!("missing <SOURCE_LANGUAGE> <TARGET_LANGUAGE> <S>");
    };

    let cfg = RunConfig::from_args(CliOverrides {
        config: args.config,
        source_lang,
        target_lang,
        max_source_length: args.max_source_length,
        max_translation_length: args.max_translation_length,
        directory: args.directory,
        table: args.table,
        gaps: args.gaps,
        format: args.format,
        strict_offsets: args.strict_offsets,
        no_memo: args.no_memo,
        trace_dir: args.trace_dir,
    })
    .context("build config")?;

    if let Some(p) = cfg.config_path.as_ref() {
        progress.info(format!("Config: {}", p.display()));
    }
    let pair = cfg.apertium.pair.to_string();
    progress.info(format!("Pair: {pair}"));

    let trace = match cfg.trace_dir.clone() {
        Some(dir) => {
            progress.info(format!("Trace: {}", dir.display()));
            TraceWriter::new(dir)?
        }
        None => TraceWriter::disabled(),
    };

    let translator = ApertiumCommand::new(cfg.apertium.clone());
    let mut aligner = Aligner::new(translator, cfg.align)
        .with_progress(progress)
        .with_trace(trace);
    let alignment = aligner.align(&text)?;

    let report = render(
        &alignment,
        &pair,
        cfg.format,
        ReportOptions {
            table: cfg.table,
            gaps: cfg.gaps,
        },
    )?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(report.as_bytes())
        .context("write report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn missing_positionals_are_a_usage_error() {
        let err = Args::try_parse_from(["apertium-explain", "en"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn init_config_needs_no_positionals() {
        let args = Args::try_parse_from(["apertium-explain", "--init-config"]).unwrap();
        assert!(args.init_config);
        assert!(args.text.is_none());
    }

    #[test]
    fn parses_pair_text_and_lengths() {
        let args =
            Args::try_parse_from(["apertium-explain", "en", "es", "the cat sat", "-m", "2"]).unwrap();
        assert_eq!(args.source_language.as_deref(), Some("en"));
        assert_eq!(args.target_language.as_deref(), Some("es"));
        assert_eq!(args.text.as_deref(), Some("the cat sat"));
        assert_eq!(args.max_source_length, Some(2));
    }
}
