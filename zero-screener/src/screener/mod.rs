//! A-share Screener Module.
//!
//! Scans the full-market snapshot and narrows it to a short ranked list of
//! candidates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      短线选股流程                                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐           │
//! │  │  全市场快照  │────▶│  区间过滤    │────▶│  候选池 (30) │           │
//! │  │  Snapshot   │     │  Filter     │     │  Pool       │           │
//! │  └─────────────┘     └─────────────┘     └──────┬──────┘           │
//! │                                                 │                   │
//! │  ┌──────────────────────────────────────────────┴───────┐          │
//! │  │       Candidate Evaluator (≤5 concurrent)            │          │
//! │  │  - MA alignment, volume escalation (daily history)   │          │
//! │  │  - Strong trend, new-high pullback (intraday)        │          │
//! │  └──────────────────────────────────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use zero_screener::screener::{ScreenerEngine, ScreenerConfig, ScreeningCriteria};
//!
//! let engine = ScreenerEngine::new(ScreenerConfig::default(), snapshot, history);
//!
//! let criteria = ScreeningCriteria {
//!     min_change: Some(2.0),
//!     check_volume_up: true,
//!     ..Default::default()
//! };
//! let result = engine.screen(criteria).await?;
//! ```

pub mod config;
pub mod engine;
pub mod evaluator;
pub mod filter;

pub use config::{ScreenerConfig, ScreeningCriteria, MARKET_CAP_UNIT};
pub use engine::{rank_candidates, ScreenerEngine, ScreenerResult};
pub use evaluator::{CandidateEvaluator, CandidateResult};
pub use filter::{FilterResult, FilterStage, SnapshotFilter};
