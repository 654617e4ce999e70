use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::readwise::ReadwiseConfig;
use crate::version::DEFAULT_VERSION_FILE;
use crate::zotero::{ItemFilter, LibraryType, ZoteroConfig};

/// Zotero's highlight palette: yellow, red, green, blue, purple, magenta,
/// orange, gray.
pub const ANNOTATION_COLORS: [&str; 8] = [
    "#ffd400", "#ff6666", "#5fb236", "#2ea8e5", "#a28ae5", "#e56eee", "#f19837", "#aaaaaa",
];

#[derive(Parser, Debug, Default)]
#[command(name = "zotwise")]
#[command(about = "Pushes Zotero annotations and notes to Readwise", long_about = None)]
pub struct Cli {
    /// Readwise access token (https://readwise.io/access_token)
    #[arg(env = "READWISE_TOKEN", hide_env_values = true)]
    pub readwise_token: Option<String>,

    /// Zotero API key (https://www.zotero.org/settings/keys)
    #[arg(env = "ZOTERO_KEY", hide_env_values = true)]
    pub zotero_key: Option<String>,

    /// Zotero user or group ID
    #[arg(env = "ZOTERO_LIBRARY_ID")]
    pub zotero_library_id: Option<String>,

    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// 'user' for a personal library, 'group' for a shared one
    #[arg(long, alias = "library_type", value_enum, env = "LIBRARY_TYPE")]
    pub library_type: Option<LibraryType>,

    /// Include annotations (highlights and comments): y/n
    #[arg(long, alias = "include_annotations", value_parser = parse_yes_no)]
    pub include_annotations: Option<bool>,

    /// Include notes: y/n
    #[arg(long, alias = "include_notes", value_parser = parse_yes_no)]
    pub include_notes: Option<bool>,

    /// Only sync annotations of this color (repeatable)
    #[arg(long = "filter-color", alias = "filter_color", value_parser = ANNOTATION_COLORS)]
    pub filter_colors: Vec<String>,

    /// Only sync annotations carrying this tag (repeatable)
    #[arg(long = "filter-tags", alias = "filter_tags")]
    pub filter_tags: Vec<String>,

    /// Keep the --filter-tags tags on the synced highlights
    #[arg(long, alias = "include_filter_tags")]
    pub include_filter_tags: bool,

    /// Only sync items changed since the last run
    #[arg(long, alias = "use_since")]
    pub use_since: bool,

    /// Do not write failed items to report files
    #[arg(long, alias = "suppress_failures")]
    pub suppress_failures: bool,

    /// Extra tag added to every highlight
    #[arg(long, alias = "custom_tag")]
    pub custom_tag: Option<String>,
}

/// Accepts the usual spellings of yes and no.
pub fn parse_yes_no(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(format!("invalid value '{}'; use 'y' or 'n'", other)),
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".zotwise")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Default)]
pub struct ZoteroSection {
    pub api_key: Option<String>,
    pub library_id: Option<String>,
    pub library_type: Option<LibraryType>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReadwiseSection {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SyncSection {
    pub include_annotations: Option<bool>,
    pub include_notes: Option<bool>,
    #[serde(default)]
    pub filter_colors: Vec<String>,
    #[serde(default)]
    pub filter_tags: Vec<String>,
    #[serde(default)]
    pub include_filter_tags: bool,
    pub custom_tag: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub version_file: Option<PathBuf>,
    pub write_failures: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub zotero: ZoteroSection,
    #[serde(default)]
    pub readwise: ReadwiseSection,
    #[serde(default)]
    pub sync: SyncSection,
}

impl Config {
    /// Reads a YAML config, expanding `${VAR}` and `${VAR:-default}` from the
    /// process environment first.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let expanded = expand_env_refs(&raw, |name| env::var(name).ok());
        serde_yaml::from_str(&expanded)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Replaces `${NAME}` / `${NAME:-fallback}` references using `lookup`. An
/// unset name without a fallback becomes empty. Unterminated references are
/// left as they are.
fn expand_env_refs(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        let reference = &rest[open + 2..open + close];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match (lookup(name), fallback) {
            (Some(value), _) => out.push_str(&value),
            (None, Some(fallback)) => out.push_str(fallback),
            (None, None) => tracing::warn!(name, "config references unset environment variable"),
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

/// Everything one run needs, merged from the config file and the command
/// line (command line wins).
#[derive(Debug, Clone)]
pub struct Settings {
    pub zotero: ZoteroConfig,
    pub readwise: ReadwiseConfig,
    pub filter: ItemFilter,
    pub include_annotations: bool,
    pub include_notes: bool,
    pub custom_tag: Option<String>,
    pub use_since: bool,
    pub write_failures: bool,
    pub output_dir: PathBuf,
    pub version_file: PathBuf,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config_path {
            Some(path) => Config::load(Path::new(path))?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Config::load(&path)?
                } else {
                    Config::default()
                }
            }
        };
        Settings::merge(cli, config)
    }

    pub fn merge(cli: &Cli, config: Config) -> Result<Self> {
        let Config {
            zotero,
            readwise,
            sync,
        } = config;

        let token = required(cli.readwise_token.clone().or(readwise.token), "Readwise token", "READWISE_TOKEN")?;
        let api_key = required(cli.zotero_key.clone().or(zotero.api_key), "Zotero API key", "ZOTERO_KEY")?;
        let library_id = required(
            cli.zotero_library_id.clone().or(zotero.library_id),
            "Zotero library ID",
            "ZOTERO_LIBRARY_ID",
        )?;

        let library_type = cli.library_type.or(zotero.library_type).unwrap_or_default();
        let mut zotero_config = ZoteroConfig::new(&api_key, &library_id, library_type);
        if let Some(url) = zotero.base_url {
            zotero_config.base_url = url;
        }

        let output_dir = sync.output_dir.unwrap_or_else(|| PathBuf::from("."));
        let mut readwise_config = ReadwiseConfig::new(&token);
        readwise_config.error_log_dir = output_dir.clone();
        if let Some(url) = readwise.base_url {
            readwise_config.base_url = url;
        }

        for color in &sync.filter_colors {
            if !ANNOTATION_COLORS.contains(&color.as_str()) {
                bail!("unknown annotation color '{}' in config file", color);
            }
        }

        let filter = ItemFilter {
            colors: if cli.filter_colors.is_empty() { sync.filter_colors } else { cli.filter_colors.clone() },
            tags: if cli.filter_tags.is_empty() { sync.filter_tags } else { cli.filter_tags.clone() },
            include_filter_tags: cli.include_filter_tags || sync.include_filter_tags,
        };

        Ok(Settings {
            zotero: zotero_config,
            readwise: readwise_config,
            filter,
            include_annotations: cli.include_annotations.or(sync.include_annotations).unwrap_or(true),
            include_notes: cli.include_notes.or(sync.include_notes).unwrap_or(false),
            custom_tag: cli.custom_tag.clone().or(sync.custom_tag),
            use_since: cli.use_since,
            write_failures: !cli.suppress_failures && sync.write_failures.unwrap_or(true),
            version_file: sync
                .version_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VERSION_FILE)),
            output_dir,
        })
    }
}

fn required(value: Option<String>, what: &str, env_var: &str) -> Result<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => Ok(v),
        None => bail!(
            "no value for the {} was found; pass it as an argument or set the {} environment variable",
            what,
            env_var
        ),
    }
}
