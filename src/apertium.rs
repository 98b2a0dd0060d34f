use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context};
use encoding_rs::UTF_8;
use once_cell::sync::Lazy;
use regex::Regex;

static LANG_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:_[A-Za-z0-9]+)?$").expect("lang code regex"));

pub const DEFAULT_INSTALL_PREFIX: &str = "/usr/local/share/apertium";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: &str, target: &str) -> anyhow::Result<Self> {
        for code in [source, target] {
            if !LANG_CODE_RE.is_match(code) {
                return Err(anyhow!("invalid language code: {code:?}"));
            }
        }
        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// Which half of the sentence pair an analysis is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

/// The two external operations the aligner needs. Both return raw text; the analysis is an
/// Apertium stream, parsed by the caller.
pub trait Translator {
    fn analyze(&self, text: &str, side: Side) -> anyhow::Result<String>;
    fn translate(&self, text: &str) -> anyhow::Result<String>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn analyze(&self, text: &str, side: Side) -> anyhow::Result<String> {
        (**self).analyze(text, side)
    }

    fn translate(&self, text: &str) -> anyhow::Result<String> {
        (**self).translate(text)
    }
}

#[derive(Clone, Debug)]
pub struct ApertiumSettings {
    pub pair: LanguagePair,
    pub directory: Option<PathBuf>,
    pub install_prefix: PathBuf,
    pub lt_proc: String,
    pub apertium: String,
}

/// Runs `lt-proc -a` and `apertium` as child processes.
pub struct ApertiumCommand {
    settings: ApertiumSettings,
}

impl ApertiumCommand {
    #[must_use]
    pub fn new(settings: ApertiumSettings) -> Self {
        Self { settings }
    }

    /// Locates the analyzer binary for one side. Returns the path to pass to `lt-proc` and the
    /// working directory to run it in.
    pub fn resolve_analyzer(&self, side: Side) -> anyhow::Result<(PathBuf, Option<PathBuf>)> {
        let pair = &self.settings.pair;
        let direction = match side {
            Side::Source => pair.clone(),
            Side::Target => pair.reversed(),
        };
        let fname = format!("{direction}.automorf.bin");

        if let Some(dir) = self.settings.directory.as_ref() {
            let rel = Path::new(".").join(&fname);
            if !dir.join(&fname).exists() {
                return Err(anyhow!(
                    "analyzer not found: {} (directory={})",
                    fname,
                    dir.display()
                ));
            }
            return Ok((rel, Some(dir.clone())));
        }

        let prefix = &self.settings.install_prefix;
        let searched: Vec<PathBuf> = [pair.clone(), pair.reversed()]
            .iter()
            .map(|p| prefix.join(format!("apertium-{p}")).join(&fname))
            .collect();
        searched
            .iter()
            .find(|p| p.exists())
            .map(|p| (p.clone(), None))
            .ok_or_else(|| {
                anyhow!(
                    "analyzer not found: {} (searched: {})",
                    fname,
                    searched
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                )
            })
    }
}

impl Translator for ApertiumCommand {
    fn analyze(&self, text: &str, side: Side) -> anyhow::Result<String> {
        let (automorf, cwd) = self.resolve_analyzer(side)?;
        let mut cmd = Command::new(&self.settings.lt_proc);
        cmd.arg("-a").arg(&automorf);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        run_with_stdin(cmd, text)
            .with_context(|| format!("analyze {} text", side.label()))
    }

    fn translate(&self, text: &str) -> anyhow::Result<String> {
        let mut cmd = Command::new(&self.settings.apertium);
        if let Some(dir) = self.settings.directory.as_ref() {
            cmd.arg("-d").arg(dir);
        }
        cmd.arg(self.settings.pair.to_string());
        run_with_stdin(cmd, text)
            .with_context(|| format!("translate {}", self.settings.pair))
    }
}

/// Feeds `text` plus a newline to the child, waits for it, and returns its stdout decoded and
/// trimmed.
fn run_with_stdin(mut cmd: Command, text: &str) -> anyhow::Result<String> {
    let cmdline = describe(&cmd);
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn: {cmdline}"))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin not captured: {cmdline}"))?;
    let mut input = Vec::with_capacity(text.len() + 1);
    input.extend_from_slice(text.as_bytes());
    input.push(b'\n');
    // The child may fill its stdout pipe before it has read all of stdin.
    let writer = std::thread::spawn(move || stdin.write_all(&input));

    let output = child
        .wait_with_output()
        .with_context(|| format!("wait: {cmdline}"))?;
    let written = writer
        .join()
        .map_err(|_| anyhow!("stdin writer panicked: {cmdline}"))?;
    if !output.status.success() {
        let (stderr, _, _) = UTF_8.decode(&output.stderr);
        return Err(anyhow!(
            "{} exited with {}: {}",
            cmdline,
            output.status,
            stderr.trim()
        ));
    }
    written.with_context(|| format!("write stdin: {cmdline}"))?;

    decode_output(&output.stdout).with_context(|| format!("decode output: {cmdline}"))
}

fn decode_output(bytes: &[u8]) -> anyhow::Result<String> {
    let text = UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| anyhow!("output is not valid UTF-8"))?;
    Ok(text.trim().to_string())
}

fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
