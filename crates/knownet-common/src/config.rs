//! Runtime configuration for the KnowNet service.
//!
//! Loaded from a TOML file (`knownet.toml` by default, overridable with the
//! `KNOWNET_CONFIG` environment variable). Every section has sensible
//! defaults so a missing file yields a runnable local setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KnownetError, Result};

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub kg: KgConfig,
}

impl KnownetConfig {
    /// Load from an explicit TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| KnownetError::Config(format!("{}: {e}", path.display())))
    }

    /// Load from `$KNOWNET_CONFIG`, then `./knownet.toml`, then defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("KNOWNET_CONFIG") {
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new("knownet.toml");
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

// ── LLM ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend provider: "openai" | "ollama" | "openai-compatible" | "anthropic".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL for local / OpenAI-compatible providers.
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key. The key itself never
    /// appears in config files.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider() -> String { "openai".to_string() }
fn default_model() -> String { "gpt-4o".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_max_tokens() -> u32 { 4096 }
fn default_temperature() -> f32 { 1.0 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Geometry for the layered graph layout. Clients render nodes as fixed-size
/// boxes, so the layout works in those units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_node_width")]
    pub node_width: f64,

    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Gap between consecutive ranks.
    #[serde(default = "default_rank_gap")]
    pub rank_gap: f64,

    /// Gap between adjacent nodes within a rank.
    #[serde(default = "default_node_gap")]
    pub node_gap: f64,

    /// Canvas the drawing is centered on.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f64,

    #[serde(default = "default_canvas_height")]
    pub canvas_height: f64,
}

fn default_node_width() -> f64 { 172.0 }
fn default_node_height() -> f64 { 86.0 }
fn default_rank_gap() -> f64 { 50.0 }
fn default_node_gap() -> f64 { 40.0 }
fn default_canvas_width() -> f64 { 1280.0 }
fn default_canvas_height() -> f64 { 720.0 }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_height: default_node_height(),
            rank_gap: default_rank_gap(),
            node_gap: default_node_gap(),
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
        }
    }
}

// ── Knowledge graph ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgConfig {
    /// JSON seed document loaded into the in-memory store at startup.
    pub seed_path: Option<PathBuf>,

    /// Node labels containing these terms are too generic to draw and are
    /// filtered out of the flow graph.
    #[serde(default = "default_high_level_terms")]
    pub high_level_terms: Vec<String>,
}

fn default_high_level_terms() -> Vec<String> {
    vec!["physiology".to_string(), "supplement".to_string()]
}

impl Default for KgConfig {
    fn default() -> Self {
        Self { seed_path: None, high_level_terms: default_high_level_terms() }
    }
}
