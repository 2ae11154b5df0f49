// config.rs — command line + optional JSON file -> viewer settings
//
// Precedence: CLI / environment > config file > built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use fisheye_envmap::illumination::DEFAULT_LIGHT_COUNT;
use fisheye_envmap::{CandidateOrder, CutStrategy, SourceProjection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutArg {
    Median,
    Variance,
}

impl From<CutArg> for CutStrategy {
    fn from(arg: CutArg) -> Self {
        match arg {
            CutArg::Median => CutStrategy::MedianCut,
            CutArg::Variance => CutStrategy::VarianceCut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderArg {
    Ascending,
    Descending,
}

impl From<OrderArg> for CandidateOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Ascending => CandidateOrder::Ascending,
            OrderArg::Descending => CandidateOrder::Descending,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fisheye_envmap", about = "Environment mapping and light estimation from a fisheye photograph")]
pub struct Cli {
    /// Fisheye (or mirror-ball) photograph to open at startup
    pub image: Option<PathBuf>,

    /// Treat the input as a mirror-ball photograph
    #[arg(long)]
    pub mirrorball: bool,

    /// Number of lights to estimate
    #[arg(long)]
    pub lights: Option<usize>,

    /// Region cut heuristic
    #[arg(long, value_enum)]
    pub cut: Option<CutArg>,

    /// Candidate order before truncation to the light count
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// UI language (en, zh-Hans)
    #[arg(long, env = "ENVMAP_LANG")]
    pub lang: Option<String>,

    /// JSON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the remapped panorama to this PNG
    #[arg(long)]
    pub save_panorama: Option<PathBuf>,

    /// Write the panorama with cut lines and light positions to this PNG
    #[arg(long)]
    pub save_debug: Option<PathBuf>,

    /// Process the image and exit without opening a window
    #[arg(long)]
    pub headless: bool,
}

/// Settings that may come from a JSON file. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub light_count: Option<usize>,
    pub cut: Option<CutArg>,
    pub order: Option<OrderArg>,
    pub lang: Option<String>,
    pub fov: Option<f32>,
    pub sensitivity: Option<f32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub image: Option<PathBuf>,
    pub source: SourceProjection,
    pub light_count: usize,
    pub cut: CutStrategy,
    pub order: CandidateOrder,
    pub lang: String,
    pub fov: f32,
    pub sensitivity: f32,
    pub save_panorama: Option<PathBuf>,
    pub save_debug: Option<PathBuf>,
    pub headless: bool,
}

impl ViewerConfig {
    pub const DEFAULT_FOV: f32 = 75.0;
    pub const DEFAULT_LANG: &'static str = "en";

    pub fn from_args() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file))
    }

    pub fn resolve(cli: Cli, file: FileConfig) -> Self {
        Self {
            image: cli.image,
            source: if cli.mirrorball {
                SourceProjection::Mirrorball
            } else {
                SourceProjection::Fisheye
            },
            light_count: cli
                .lights
                .or(file.light_count)
                .unwrap_or(DEFAULT_LIGHT_COUNT),
            cut: cli.cut.or(file.cut).map(Into::into).unwrap_or_default(),
            order: cli.order.or(file.order).map(Into::into).unwrap_or_default(),
            lang: cli
                .lang
                .filter(|l| !l.trim().is_empty())
                .or(file.lang)
                .unwrap_or_else(|| Self::DEFAULT_LANG.to_string()),
            fov: file.fov.unwrap_or(Self::DEFAULT_FOV).clamp(5.0, 180.0),
            sensitivity: file.sensitivity.unwrap_or(1.0).clamp(0.1, 5.0),
            save_panorama: cli.save_panorama,
            save_debug: cli.save_debug,
            headless: cli.headless,
        }
    }
}
