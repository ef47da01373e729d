pub mod game;
pub mod utils;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use game::{
    optimal_moves, Disk, DiskCount, EngineConfig, GameEvent, GameStatus, IntegrityError, LastMove,
    MoveRecord, MoveResolution, PegIndex, PuzzleState, RuleEngine, RuleError, PEG_COUNT,
    TARGET_PEG,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logger(log::LevelFilter::Info);
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// 下拉框给的是字符串，脚本里可能是数字，其余一律回退到默认值。
fn disk_count_from_js(value: &JsValue) -> DiskCount {
    if let Some(number) = value.as_f64() {
        DiskCount::from_f64(number)
    } else if let Some(text) = value.as_string() {
        DiskCount::parse_lenient(&text)
    } else {
        DiskCount::default()
    }
}

/// 非 0、1、2 的整数或任何小数都会落到越界下标上。
fn peg_from_js(value: f64) -> PegIndex {
    if value >= 0.0 && value.fract() == 0.0 {
        value as PegIndex
    } else {
        PegIndex::MAX
    }
}

#[derive(Serialize)]
struct StateResolution {
    state: PuzzleState,
    resolution: MoveResolution,
}

#[wasm_bindgen]
pub struct HanoiEngine {
    state: PuzzleState,
    rules: RuleEngine,
}

#[wasm_bindgen]
impl HanoiEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(disk_count: JsValue, challenge_mode: Option<bool>) -> HanoiEngine {
        let mut state = PuzzleState::default();
        RuleEngine::initialize(
            &mut state,
            disk_count_from_js(&disk_count),
            challenge_mode.unwrap_or(false),
        );
        HanoiEngine {
            state,
            rules: RuleEngine::new(),
        }
    }

    pub fn initialize(&mut self, disk_count: JsValue, challenge_mode: Option<bool>) {
        RuleEngine::initialize(
            &mut self.state,
            disk_count_from_js(&disk_count),
            challenge_mode.unwrap_or(false),
        );
    }

    #[wasm_bindgen(js_name = "setLockAfterWin")]
    pub fn set_lock_after_win(&mut self, lock: bool) {
        self.rules = RuleEngine::with_config(self.rules.config().with_lock_after_win(lock));
    }

    #[wasm_bindgen(js_name = "isMoveLegal")]
    pub fn is_move_legal(&self, from: f64, to: f64) -> bool {
        self.rules.is_move_legal(&self.state, peg_from_js(from), peg_from_js(to))
    }

    #[wasm_bindgen(js_name = "legalTargets")]
    pub fn legal_targets(&self, from: f64) -> Vec<u32> {
        self.rules
            .legal_targets(&self.state, peg_from_js(from))
            .into_iter()
            .map(|peg| peg as u32)
            .collect()
    }

    #[wasm_bindgen(js_name = "applyMove")]
    pub fn apply_move(&mut self, from: f64, to: f64) -> Result<JsValue, JsValue> {
        let outcome = self
            .rules
            .apply_move(&mut self.state, peg_from_js(from), peg_from_js(to));
        to_value(&MoveResolution::new(&self.state, outcome)).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "undoLastMove")]
    pub fn undo_last_move(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.rules.undo_last_move(&mut self.state);
        to_value(&MoveResolution::new(&self.state, outcome)).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "isWon")]
    pub fn is_won(&self) -> bool {
        RuleEngine::is_won(&self.state)
    }

    #[wasm_bindgen(js_name = "isChallengeFailed")]
    pub fn is_challenge_failed(&self) -> bool {
        RuleEngine::is_challenge_failed(&self.state)
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.status()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "topDisk")]
    pub fn top_disk(&self, peg: f64) -> Option<u8> {
        self.state.top_disk(peg_from_js(peg))
    }

    #[wasm_bindgen(getter, js_name = "diskCount")]
    pub fn disk_count(&self) -> u8 {
        self.state.disk_count.get()
    }

    #[wasm_bindgen(getter, js_name = "moveCount")]
    pub fn move_count(&self) -> u32 {
        self.state.move_count
    }

    #[wasm_bindgen(getter, js_name = "movesRemaining")]
    pub fn moves_remaining(&self) -> i32 {
        self.state.moves_remaining
    }

    #[wasm_bindgen(getter, js_name = "challengeMode")]
    pub fn challenge_mode(&self) -> bool {
        self.state.challenge_mode
    }

    #[wasm_bindgen(getter, js_name = "historyLength")]
    pub fn history_length(&self) -> u32 {
        self.state.history_len() as u32
    }

    #[wasm_bindgen(getter, js_name = "optimalMoves")]
    pub fn optimal_moves(&self) -> u32 {
        self.state.optimal_moves()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "stateJson")]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }
}

/// 新建一局的状态快照，供无状态调用方式使用。
#[wasm_bindgen(js_name = "createPuzzleState")]
pub fn create_puzzle_state(
    disk_count: JsValue,
    challenge_mode: Option<bool>,
) -> Result<JsValue, JsValue> {
    let state = PuzzleState::new(
        disk_count_from_js(&disk_count),
        challenge_mode.unwrap_or(false),
    );
    to_value(&state).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "applyMoveToState")]
pub fn apply_move_to_state(state: JsValue, from: f64, to: f64) -> Result<JsValue, JsValue> {
    let mut state: PuzzleState = from_value(state).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    let outcome = engine.apply_move(&mut state, peg_from_js(from), peg_from_js(to));
    let resolution = MoveResolution::new(&state, outcome);
    to_value(&StateResolution { state, resolution }).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "undoMoveOnState")]
pub fn undo_move_on_state(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: PuzzleState = from_value(state).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    let outcome = engine.undo_last_move(&mut state);
    let resolution = MoveResolution::new(&state, outcome);
    to_value(&StateResolution { state, resolution }).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: PuzzleState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[wasm_bindgen(js_name = "optimalMoves")]
pub fn optimal_moves_for(disk_count: JsValue) -> u32 {
    optimal_moves(disk_count_from_js(&disk_count))
}
