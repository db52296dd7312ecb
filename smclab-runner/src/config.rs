//! Serializable backtest configuration.
//!
//! A [`BacktestConfig`] is read from TOML and validated into the core types the
//! runner needs: [`RiskParams`] in price units, a [`SignalEngine`], a
//! [`SessionTable`] and the pattern filter. Risk distances are written in pips
//! and converted with `pip_size`.
//!
//! ```toml
//! [backtest]
//! symbol = "EURUSD"
//! reference = "15m"
//! warmup_bars = 50
//!
//! [risk]
//! pip_size = 0.0001
//! pip_value = 10.0
//! stop_loss_pips = 35.0
//! # ...
//!
//! [engine]
//! threshold = 0.5
//!
//! [[engine.strategies]]
//! type = "preset"
//! preset = "smc"
//! weight = 1.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use smclab_core::patterns::PatternKind;
use smclab_core::session::{Session, SessionError, SessionTable, SessionWindow};
use smclab_core::signal_engine::{EngineError, SignalEngine};
use smclab_core::simulator::{RiskError, RiskParams};
use smclab_core::strategy::{ConfluenceScorer, Preset, ScorerConfig, Strategy};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid risk parameters: {0}")]
    Risk(#[from] RiskError),

    #[error("invalid engine: {0}")]
    Engine(#[from] EngineError),

    #[error("invalid session table: {0}")]
    Sessions(#[from] SessionError),

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("reference timeframe must not be empty")]
    EmptyReference,

    #[error("pattern mode needs at least one pattern kind")]
    NoPatternKinds,
}

/// Where entry signals come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Weighted engine decision on the aligned frame.
    #[default]
    Engine,
    /// Raw detector signals on the reference timeframe.
    Patterns,
}

fn default_allow_overlap() -> bool {
    false
}

/// `[backtest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    /// Timeframe label that drives the bar-by-bar walk.
    pub reference: String,
    /// Bars skipped before the first evaluation.
    #[serde(default)]
    pub warmup_bars: usize,
    /// Allow a new entry while a previous trade is still open.
    #[serde(default = "default_allow_overlap")]
    pub allow_overlap: bool,
    #[serde(default)]
    pub signal_source: SignalSource,
}

/// `[risk]` section. Distances are in pips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSection {
    pub pip_size: f64,
    pub pip_value: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub break_even_trigger_pips: f64,
    pub break_even_buffer_pips: f64,
    pub partial_trigger_pips: f64,
    pub partial_ratio: f64,
    pub trail_trigger_pips: f64,
    pub trail_distance_pips: f64,
}

impl RiskSection {
    /// Convert pip distances to price units and validate them.
    pub fn to_params(&self) -> Result<RiskParams, RiskError> {
        let pip = self.pip_size;
        let params = RiskParams {
            pip_size: pip,
            pip_value: self.pip_value,
            stop_loss: self.stop_loss_pips * pip,
            take_profit: self.take_profit_pips * pip,
            break_even_trigger: self.break_even_trigger_pips * pip,
            break_even_buffer: self.break_even_buffer_pips * pip,
            partial_trigger: self.partial_trigger_pips * pip,
            partial_ratio: self.partial_ratio,
            trail_trigger: self.trail_trigger_pips * pip,
            trail_distance: self.trail_distance_pips * pip,
        };
        params.validate()?;
        Ok(params)
    }
}

/// One weighted strategy of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyEntry {
    Preset { preset: Preset, weight: f64 },
    Custom { config: ScorerConfig, weight: f64 },
}

impl StrategyEntry {
    pub fn weight(&self) -> f64 {
        match self {
            Self::Preset { weight, .. } | Self::Custom { weight, .. } => *weight,
        }
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        match self {
            Self::Preset { preset, .. } => preset.config(),
            Self::Custom { config, .. } => config.clone(),
        }
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    pub threshold: f64,
    pub strategies: Vec<StrategyEntry>,
}

/// `[sessions]` section. Omitted means the standard table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsSection {
    pub windows: Vec<SessionWindow>,
}

/// `[patterns]` section, used when `signal_source = "patterns"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternsSection {
    #[serde(default = "default_pattern_kinds")]
    pub kinds: Vec<PatternKind>,
    /// Sessions in which signals may trigger entries. Empty means all.
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// Trade against the signal bias instead of with it.
    #[serde(default)]
    pub fade: bool,
}

fn default_pattern_kinds() -> Vec<PatternKind> {
    PatternKind::ALL.to_vec()
}

impl Default for PatternsSection {
    fn default() -> Self {
        Self {
            kinds: default_pattern_kinds(),
            sessions: Vec::new(),
            fade: false,
        }
    }
}

impl PatternsSection {
    /// Whether a signal tagged with `session` may trigger an entry.
    pub fn admits(&self, session: Session) -> bool {
        self.sessions.is_empty() || self.sessions.contains(&session)
    }
}

/// Full backtest configuration as read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub risk: RiskSection,
    pub engine: EngineSection,
    #[serde(default)]
    pub sessions: Option<SessionsSection>,
    #[serde(default)]
    pub patterns: PatternsSection,
}

impl BacktestConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Check every section by building the core types once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.backtest.reference.trim().is_empty() {
            return Err(ConfigError::EmptyReference);
        }
        self.risk_params()?;
        self.build_engine()?;
        if self.backtest.signal_source == SignalSource::Patterns && self.patterns.kinds.is_empty() {
            return Err(ConfigError::NoPatternKinds);
        }
        if self.backtest.signal_source == SignalSource::Engine && self.engine.threshold == 0.0 {
            tracing::warn!("engine threshold is 0: neutral bars decide Buy and are never traded");
        }
        Ok(())
    }

    pub fn risk_params(&self) -> Result<RiskParams, ConfigError> {
        Ok(self.risk.to_params()?)
    }

    pub fn session_table(&self) -> Result<SessionTable, ConfigError> {
        match &self.sessions {
            Some(section) => Ok(SessionTable::new(section.windows.clone())?),
            None => Ok(SessionTable::standard()),
        }
    }

    /// Build the weighted engine, one scorer per configured strategy.
    pub fn build_engine(&self) -> Result<SignalEngine, ConfigError> {
        let sessions = self.session_table()?;
        let strategies: Vec<Box<dyn Strategy>> = self
            .engine
            .strategies
            .iter()
            .map(|s| Box::new(ConfluenceScorer::new(s.scorer_config(), sessions.clone())) as Box<dyn Strategy>)
            .collect();
        let weights = self.engine.strategies.iter().map(StrategyEntry::weight).collect();
        Ok(SignalEngine::new(strategies, weights, self.engine.threshold)?)
    }

    /// Every timeframe label some strategy reads, reference first.
    pub fn timeframes(&self) -> Vec<String> {
        let mut labels = vec![self.backtest.reference.clone()];
        for entry in &self.engine.strategies {
            for tf in entry.scorer_config().timeframes {
                if !labels.contains(&tf.timeframe) {
                    labels.push(tf.timeframe);
                }
            }
        }
        labels
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share the same id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
