use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::align::{AlignOptions, DEFAULT_MAX_LENGTH};
use crate::apertium::{ApertiumSettings, LanguagePair, DEFAULT_INSTALL_PREFIX};

pub const CONFIG_FILENAME: &str = "apertium-explain.toml";
pub const CONFIG_ENV: &str = "APERTIUM_EXPLAIN_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub apertium: ApertiumSection,
    #[serde(default)]
    pub align: AlignSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ApertiumSection {
    /// Where installed pairs live (`<prefix>/apertium-xx-yy/`).
    #[serde(default)]
    pub install_prefix: Option<PathBuf>,
    #[serde(default)]
    pub lt_proc: Option<String>,
    #[serde(default)]
    pub apertium: Option<String>,
    /// Pair directory to use instead of the install prefix. Relative paths are resolved against
    /// the config file's directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AlignSection {
    #[serde(default)]
    pub max_source_length: Option<usize>,
    #[serde(default)]
    pub max_translation_length: Option<usize>,
    #[serde(default)]
    pub memoize: Option<bool>,
    #[serde(default)]
    pub strict_offsets: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OutputSection {
    /// "text" or "json".
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub table: Option<bool>,
    #[serde(default)]
    pub gaps: Option<bool>,
    #[serde(default)]
    pub trace_dir: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: Option<&str>) -> anyhow::Result<Self> {
        match s.unwrap_or("text").trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown output format: {other} (expected text or json)")),
        }
    }
}

/// Values given on the command line. `None`/`false` defers to the config file.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub source_lang: String,
    pub target_lang: String,
    pub max_source_length: Option<usize>,
    pub max_translation_length: Option<usize>,
    pub directory: Option<PathBuf>,
    pub table: bool,
    pub gaps: bool,
    pub format: Option<String>,
    pub strict_offsets: bool,
    pub no_memo: bool,
    pub trace_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub config_path: Option<PathBuf>,
    pub apertium: ApertiumSettings,
    pub align: AlignOptions,
    pub format: OutputFormat,
    pub table: bool,
    pub gaps: bool,
    pub trace_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Locates and loads the config file (if any), then layers the CLI values on top.
    pub fn from_args(args: CliOverrides) -> anyhow::Result<Self> {
        let cfg_file = args
            .config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(CONFIG_FILENAME));

        let file_cfg = match cfg_file.as_ref() {
            Some(p) if p.exists() => load_config(p)?,
            Some(p) if args.config.is_some() => {
                return Err(anyhow!("config not found: {}", p.display()));
            }
            _ => AppConfig::default(),
        };
        let cfg_path = cfg_file.filter(|p| p.exists());
        Self::merge(file_cfg, cfg_path, args)
    }

    pub fn merge(
        file_cfg: AppConfig,
        config_path: Option<PathBuf>,
        args: CliOverrides,
    ) -> anyhow::Result<Self> {
        let config_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let relative_to_config = |p: PathBuf| {
            if p.is_relative() {
                config_dir.join(p)
            } else {
                p
            }
        };

        let pair = LanguagePair::new(args.source_lang.trim(), args.target_lang.trim())?;
        let directory = args
            .directory
            .or_else(|| file_cfg.apertium.directory.clone().map(relative_to_config));
        if let Some(dir) = directory.as_ref() {
            if !dir.is_dir() {
                return Err(anyhow!("pair directory not found: {}", dir.display()));
            }
        }

        let apertium = ApertiumSettings {
            pair,
            directory,
            install_prefix: file_cfg
                .apertium
                .install_prefix
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_PREFIX)),
            lt_proc: non_empty(file_cfg.apertium.lt_proc.clone())
                .unwrap_or_else(|| "lt-proc".to_string()),
            apertium: non_empty(file_cfg.apertium.apertium.clone())
                .unwrap_or_else(|| "apertium".to_string()),
        };

        let align = AlignOptions {
            max_source_length: args
                .max_source_length
                .or(file_cfg.align.max_source_length)
                .unwrap_or(DEFAULT_MAX_LENGTH),
            max_translation_length: args
                .max_translation_length
                .or(file_cfg.align.max_translation_length)
                .unwrap_or(DEFAULT_MAX_LENGTH),
            memoize: !args.no_memo && file_cfg.align.memoize.unwrap_or(true),
            strict_offsets: args.strict_offsets || file_cfg.align.strict_offsets.unwrap_or(false),
        };

        let format = OutputFormat::parse(
            args.format
                .as_deref()
                .or(file_cfg.output.format.as_deref()),
        )?;
        let trace_dir = args.trace_dir.or_else(|| {
            non_empty(file_cfg.output.trace_dir.clone())
                .map(PathBuf::from)
                .map(relative_to_config)
        });

        Ok(Self {
            config_path,
            apertium,
            align,
            format,
            table: args.table || file_cfg.output.table.unwrap_or(false),
            gaps: args.gaps || file_cfg.output.gaps.unwrap_or(false),
            trace_dir,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 4) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text)
        .with_context(|| format!("parse config toml: {}", path.display()))?;
    Ok(cfg)
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[apertium]
install_prefix = "/usr/local/share/apertium"
lt_proc = "lt-proc"
apertium = "apertium"
# Use a local pair checkout instead of the installed one:
# directory = "apertium-en-es"

[align]
max_source_length = 5
max_translation_length = 5
# Translate each distinct subsegment only once per run.
memoize = true
# Fail instead of warning when the analyzer does not reproduce the input text.
strict_offsets = false

[output]
format = "text"
table = false
gaps = false
# trace_dir = "_trace"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliOverrides {
        CliOverrides {
            source_lang: "en".into(),
            target_lang: "es".into(),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let cfg = RunConfig::merge(AppConfig::default(), None, args()).unwrap();
        assert_eq!(cfg.align, AlignOptions::default());
        assert_eq!(cfg.format, OutputFormat::Text);
        assert_eq!(cfg.apertium.install_prefix, PathBuf::from(DEFAULT_INSTALL_PREFIX));
        assert_eq!(cfg.apertium.lt_proc, "lt-proc");
        assert!(cfg.apertium.directory.is_none());
        assert!(!cfg.table && !cfg.gaps);
        assert!(cfg.trace_dir.is_none());
    }

    #[test]
    fn cli_values_override_file_values() {
        let file: AppConfig = toml::from_str(
            r#"
[align]
max_source_length = 3
max_translation_length = 7
memoize = true

[output]
format = "json"
"#,
        )
        .unwrap();
        let mut a = args();
        a.max_source_length = Some(2);
        a.no_memo = true;
        a.format = Some("text".into());
        let cfg = RunConfig::merge(file, None, a).unwrap();
        assert_eq!(cfg.align.max_source_length, 2);
        assert_eq!(cfg.align.max_translation_length, 7);
        assert!(!cfg.align.memoize);
        assert_eq!(cfg.format, OutputFormat::Text);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("apertium-en-es")).unwrap();
        let cfg_path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &cfg_path,
            "[apertium]\ndirectory = \"apertium-en-es\"\n\n[output]\ntrace_dir = \"_trace\"\n",
        )
        .unwrap();

        let file = load_config(&cfg_path).unwrap();
        let cfg = RunConfig::merge(file, Some(cfg_path), args()).unwrap();
        assert_eq!(
            cfg.apertium.directory,
            Some(tmp.path().join("apertium-en-es"))
        );
        assert_eq!(cfg.trace_dir, Some(tmp.path().join("_trace")));
    }

    #[test]
    fn rejects_missing_directory_and_bad_input() {
        let mut a = args();
        a.directory = Some(PathBuf::from("/definitely/not/here"));
        assert!(RunConfig::merge(AppConfig::default(), None, a).is_err());

        let mut a = args();
        a.format = Some("yaml".into());
        assert!(RunConfig::merge(AppConfig::default(), None, a).is_err());

        let mut a = args();
        a.source_lang = "English".into();
        assert!(RunConfig::merge(AppConfig::default(), None, a).is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let mut a = args();
        a.config = Some(PathBuf::from("/definitely/not/here.toml"));
        assert!(RunConfig::from_args(a).is_err());
    }

    #[test]
    fn init_writes_parseable_config_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = init_default_config(tmp.path(), false).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.align.max_source_length, Some(5));
        assert_eq!(cfg.output.format.as_deref(), Some("text"));

        std::fs::write(&path, "[align]\nmax_source_length = 9\n").unwrap();
        init_default_config(tmp.path(), false).unwrap();
        assert_eq!(load_config(&path).unwrap().align.max_source_length, Some(9));
        init_default_config(tmp.path(), true).unwrap();
        assert_eq!(load_config(&path).unwrap().align.max_source_length, Some(5));
    }

    #[test]
    fn find_file_upwards_walks_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILENAME), "").unwrap();
        assert_eq!(
            find_file_upwards(&nested, CONFIG_FILENAME, 4),
            Some(tmp.path().join(CONFIG_FILENAME))
        );
        assert_eq!(find_file_upwards(&nested, CONFIG_FILENAME, 1), None);
    }
}
