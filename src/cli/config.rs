use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::align::scorer::{ScoreWeights, ScorerConfig};
use crate::repair::engine::{ClassifierConfig, EngineConfig};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "layout-repair",
    version,
    about = "Locator drift repair for recorded mobile UI test scripts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Classifier API endpoint used to break near-ties
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Classifier model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: layout-repair.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Repair one recorded script against live layout dumps
    Repair {
        /// Script bundle directory (script.jsonl + snapshots/)
        #[arg(long)]
        script: String,

        /// Directory of live step_NN.json dumps (default: <script>/live)
        #[arg(long)]
        live: Option<String>,

        /// Output path for the repaired script (default: <script>/repaired.jsonl)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Repair every script bundle found under a directory
    BatchRepair {
        /// Directory whose subdirectories are script bundles
        #[arg(long)]
        root: String,

        /// Parallel worker slots
        #[arg(long, default_value_t = 4)]
        slots: usize,
    },

    /// Align two layout snapshots and report matched and drifted elements
    DiffLayout {
        #[arg(long)]
        before: String,

        #[arg(long)]
        after: String,
    },

    /// Normalize a raw device dump into a snapshot
    Dump {
        /// Raw device-tree dump (JSON)
        #[arg(long)]
        input: String,

        /// Write the normalized snapshot here instead of only printing it
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Pretty-print a persisted repair backtrace
    Show {
        /// Backtrace JSONL file
        #[arg(long)]
        backtrace: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `layout-repair.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub repair: RepairSettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_w_identifier")]
    pub identifier: f64,

    #[serde(default = "default_w_text")]
    pub text: f64,

    #[serde(default = "default_w_class")]
    pub class_name: f64,

    #[serde(default = "default_w_geometry")]
    pub geometry: f64,

    #[serde(default = "default_w_ancestry")]
    pub ancestry: f64,

    /// Pairings below this score are never proposed
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            identifier: 0.4,
            text: 0.25,
            class_name: 0.15,
            geometry: 0.1,
            ancestry: 0.1,
            min_score: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairSettings {
    /// Top-two score margin below which the classifier is consulted
    #[serde(default = "default_ambiguity")]
    pub ambiguity_threshold: f64,

    /// Candidates kept in an ambiguous verdict
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Parallel worker slots for batch repair
    #[serde(default = "default_slots")]
    pub slots: usize,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            ambiguity_threshold: 0.05,
            top_k: 3,
            slots: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    pub endpoint: Option<String>,
    pub model: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            timeout_ms: 10_000,
        }
    }
}

// Serde default helpers
fn default_w_identifier() -> f64 { 0.4 }
fn default_w_text() -> f64 { 0.25 }
fn default_w_class() -> f64 { 0.15 }
fn default_w_geometry() -> f64 { 0.1 }
fn default_w_ancestry() -> f64 { 0.1 }
fn default_min_score() -> f64 { 0.3 }
fn default_ambiguity() -> f64 { 0.05 }
fn default_top_k() -> usize { 3 }
fn default_slots() -> usize { 4 }
fn default_timeout_ms() -> u64 { 10_000 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("layout-repair.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Build an EngineConfig from the config file plus CLI overrides
/// (CLI > config > defaults).
pub fn build_engine_config(
    config: &AppConfig,
    endpoint: Option<&str>,
    model: Option<&str>,
) -> EngineConfig {
    let endpoint = endpoint
        .map(str::to_string)
        .or_else(|| config.ollama.endpoint.clone());
    let model = model
        .map(str::to_string)
        .or_else(|| config.ollama.model.clone())
        .unwrap_or_else(|| "qwen2.5:1.5b".to_string());

    EngineConfig {
        scorer: ScorerConfig {
            weights: ScoreWeights {
                identifier: config.scoring.identifier,
                text: config.scoring.text,
                class_name: config.scoring.class_name,
                geometry: config.scoring.geometry,
                ancestry: config.scoring.ancestry,
            },
            min_score: config.scoring.min_score,
        },
        ambiguity_threshold: config.repair.ambiguity_threshold,
        top_k: config.repair.top_k,
        classifier: ClassifierConfig {
            endpoint,
            model,
            timeout_ms: config.ollama.timeout_ms,
        },
    }
}
