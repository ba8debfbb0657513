// strategy-engine - per-shard instrument state fold and strategy dispatch

mod config;
mod engine;
mod lane;
mod state;
mod strategy;
mod window;

pub use config::{EngineConfig, MeanReversionConfig, MomentumConfig};
pub use engine::{EngineMetrics, ShardEngine};
pub use lane::{shard_channel, FastLane, ShardReceiver, ShardSender};
pub use state::{InstrumentPhase, InstrumentState};
pub use strategy::{build_strategies, MeanReversionStrategy, MomentumStrategy, SignalOutput, Strategy};
pub use window::RollingWindow;
