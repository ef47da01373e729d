//! 汉诺塔核心逻辑模块（状态、规则引擎、配置）。

pub mod config;
pub mod rules;
pub mod state;

pub use config::{DiskCount, EngineConfig};
pub use rules::{MoveResolution, RuleEngine, RuleError};
pub use state::{
    optimal_moves,
    Disk,
    GameEvent,
    GameStatus,
    IntegrityError,
    LastMove,
    MoveRecord,
    PegIndex,
    PuzzleState,
    PEG_COUNT,
    TARGET_PEG,
};
