use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    config::{DiskCount, EngineConfig},
    state::{
        Disk, GameEvent, GameStatus, IntegrityError, LastMove, MoveRecord, PegIndex, PuzzleState,
        PEG_COUNT,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    PegOutOfRange { peg: PegIndex },
    SamePeg { peg: PegIndex },
    EmptySource { peg: PegIndex },
    LargerOnSmaller { disk: Disk, onto: Disk },
    NothingToUndo,
    IntegrityViolation { error: IntegrityError },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::GameFinished => write!(f, "The puzzle is already solved."),
            RuleError::PegOutOfRange { peg } => write!(f, "Peg index {peg} is out of range."),
            RuleError::SamePeg { .. } => {
                write!(f, "Pick a different peg as the destination.")
            }
            RuleError::EmptySource { peg } => write!(f, "Peg {} has no disk to move.", peg + 1),
            RuleError::LargerOnSmaller { disk, onto } => write!(
                f,
                "Illegal move: disk {disk} cannot be placed on the smaller disk {onto}."
            ),
            RuleError::NothingToUndo => write!(f, "Nothing to undo."),
            RuleError::IntegrityViolation { error } => {
                write!(f, "Puzzle state is corrupted: {error:?}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// 一次操作的结果，前端按 `{ ok, reason? }` 读取。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveResolution {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<GameEvent>,
    pub status: GameStatus,
}

impl MoveResolution {
    pub fn new(state: &PuzzleState, outcome: Result<Vec<GameEvent>, RuleError>) -> Self {
        let status = state.status();
        match outcome {
            Ok(events) => Self {
                ok: true,
                reason: None,
                events,
                status,
            },
            Err(error) => Self {
                ok: false,
                reason: Some(error.to_string()),
                events: Vec::new(),
                status,
            },
        }
    }
}

/// 汉诺塔规则引擎：所有状态变更都经过这里。
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: EngineConfig,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn ensure_integrity(state: &PuzzleState) -> Result<(), RuleError> {
        state.integrity_check().map_err(|error| {
            log::warn!("integrity violation: {error:?}");
            RuleError::IntegrityViolation { error }
        })
    }

    fn ensure_playable(&self, state: &PuzzleState) -> Result<(), RuleError> {
        if self.config.lock_after_win && state.is_solved() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    /// 合法性的唯一判定来源，附带具体原因；胜利锁也在这里生效。
    pub fn check_move(
        &self,
        state: &PuzzleState,
        from: PegIndex,
        to: PegIndex,
    ) -> Result<Disk, RuleError> {
        self.ensure_playable(state)?;
        for peg in [from, to] {
            if peg >= PEG_COUNT {
                return Err(RuleError::PegOutOfRange { peg });
            }
        }
        if from == to {
            return Err(RuleError::SamePeg { peg: from });
        }

        let disk = state
            .top_disk(from)
            .ok_or(RuleError::EmptySource { peg: from })?;
        match state.top_disk(to) {
            Some(onto) if disk >= onto => Err(RuleError::LargerOnSmaller { disk, onto }),
            _ => Ok(disk),
        }
    }

    pub fn is_move_legal(&self, state: &PuzzleState, from: PegIndex, to: PegIndex) -> bool {
        self.check_move(state, from, to).is_ok()
    }

    pub fn legal_targets(&self, state: &PuzzleState, from: PegIndex) -> Vec<PegIndex> {
        (0..PEG_COUNT)
            .filter(|to| self.is_move_legal(state, from, *to))
            .collect()
    }

    pub fn initialize(
        state: &mut PuzzleState,
        disk_count: impl Into<DiskCount>,
        challenge_mode: bool,
    ) {
        *state = PuzzleState::new(disk_count, challenge_mode);
        log::info!(
            "new puzzle: {} disks, challenge mode {}",
            state.disk_count,
            if challenge_mode { "on" } else { "off" }
        );
    }

    pub fn apply_move(
        &mut self,
        state: &mut PuzzleState,
        from: PegIndex,
        to: PegIndex,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;
        self.check_move(state, from, to)?;

        let disk = state
            .transfer_top(from, to)
            .ok_or(RuleError::EmptySource { peg: from })?;
        state.move_count += 1;
        state.history.push(MoveRecord { from, to });
        state.last_move = Some(LastMove { from, to, disk });
        if state.challenge_mode {
            state.moves_remaining -= 1;
        }
        log::debug!("disk {disk} moved from peg {from} to peg {to}");

        let mut events = vec![GameEvent::DiskMoved { from, to, disk }];
        if state.is_solved() {
            log::info!("puzzle solved in {} moves", state.move_count);
            events.push(GameEvent::PuzzleSolved {
                moves: state.move_count,
            });
        } else if state.challenge_failed() {
            log::info!("move budget exhausted after {} moves", state.move_count);
            events.push(GameEvent::BudgetExhausted {
                moves: state.move_count,
            });
        }

        Ok(events)
    }

    pub fn undo_last_move(
        &mut self,
        state: &mut PuzzleState,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_integrity(state)?;

        let record = state.history.pop().ok_or(RuleError::NothingToUndo)?;
        // 撤销总是作用于最近一步，被移动的盘子必然仍在目标柱顶。
        let Some(disk) = state.transfer_top(record.to, record.from) else {
            state.history.push(record);
            return Err(RuleError::EmptySource { peg: record.to });
        };
        state.move_count -= 1;
        if state.challenge_mode {
            state.moves_remaining += 1;
        }
        state.last_move = None;
        log::debug!(
            "undid move of disk {disk} from peg {} to peg {}",
            record.from,
            record.to
        );

        Ok(vec![GameEvent::MoveUndone {
            from: record.from,
            to: record.to,
            disk,
        }])
    }

    pub fn is_won(state: &PuzzleState) -> bool {
        state.is_solved()
    }

    pub fn is_challenge_failed(state: &PuzzleState) -> bool {
        state.challenge_failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::TARGET_PEG;

    fn solve(engine: &mut RuleEngine, state: &mut PuzzleState, n: u8, from: usize, to: usize) {
        if n == 0 {
            return;
        }
        let via = 3 - from - to;
        solve(engine, state, n - 1, from, via);
        engine
            .apply_move(state, from, to)
            .expect("recursive solution only makes legal moves");
        solve(engine, state, n - 1, via, to);
    }

    #[test]
    fn move_checks_report_specific_reasons() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(2u8, false);
        assert_eq!(
            engine.check_move(&state, 3, 0),
            Err(RuleError::PegOutOfRange { peg: 3 })
        );
        assert_eq!(
            engine.check_move(&state, 0, 0),
            Err(RuleError::SamePeg { peg: 0 })
        );
        assert_eq!(
            engine.check_move(&state, 1, 0),
            Err(RuleError::EmptySource { peg: 1 })
        );

        engine.apply_move(&mut state, 0, 1).expect("first move is legal");
        assert_eq!(
            engine.check_move(&state, 0, 1),
            Err(RuleError::LargerOnSmaller { disk: 2, onto: 1 })
        );
        assert_eq!(engine.check_move(&state, 1, 0), Ok(1));
    }

    #[test]
    fn legal_targets_preview_does_not_mutate() {
        let engine = RuleEngine::new();
        let state = PuzzleState::new(3u8, false);
        let before = state.clone();
        assert_eq!(engine.legal_targets(&state, 0), vec![1, 2]);
        assert!(engine.legal_targets(&state, 1).is_empty());
        assert!(engine.legal_targets(&state, 7).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn apply_move_records_history_and_last_move() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(3u8, true);

        let events = engine.apply_move(&mut state, 0, 2).expect("move should succeed");
        assert_eq!(
            events,
            vec![GameEvent::DiskMoved {
                from: 0,
                to: 2,
                disk: 1
            }]
        );
        assert_eq!(state.move_count, 1);
        assert_eq!(state.history, vec![MoveRecord { from: 0, to: 2 }]);
        assert_eq!(
            state.last_move,
            Some(LastMove {
                from: 0,
                to: 2,
                disk: 1
            })
        );
        assert_eq!(state.moves_remaining, 6);
    }

    #[test]
    fn rejected_move_leaves_state_untouched() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(2u8, true);
        engine.apply_move(&mut state, 0, 1).expect("first move is legal");
        let before = state.clone();

        let error = engine
            .apply_move(&mut state, 0, 1)
            .expect_err("larger disk onto smaller must fail");
        assert!(error.to_string().contains("cannot be placed"));
        assert_eq!(state, before);
    }

    #[test]
    fn undo_clears_last_move_and_restores_budget() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(3u8, true);
        engine.apply_move(&mut state, 0, 1).expect("legal");

        let events = engine.undo_last_move(&mut state).expect("undo should succeed");
        assert_eq!(
            events,
            vec![GameEvent::MoveUndone {
                from: 0,
                to: 1,
                disk: 1
            }]
        );
        assert_eq!(state, PuzzleState::new(3u8, true));
        assert_eq!(
            engine.undo_last_move(&mut state),
            Err(RuleError::NothingToUndo)
        );
    }

    #[test]
    fn solving_emits_puzzle_solved_and_locks_moves() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(4u8, false);
        solve(&mut engine, &mut state, 4, 0, TARGET_PEG);

        assert!(RuleEngine::is_won(&state));
        assert_eq!(state.move_count, 15);
        assert_eq!(
            engine.apply_move(&mut state, 2, 0),
            Err(RuleError::GameFinished)
        );

        let last = *state.history.last().expect("solution has moves");
        engine.undo_last_move(&mut state).expect("undo after win is allowed");
        assert!(!RuleEngine::is_won(&state));
        let events = engine
            .apply_move(&mut state, last.from, last.to)
            .expect("replay the final move");
        assert!(events.contains(&GameEvent::PuzzleSolved { moves: 15 }));
    }

    #[test]
    fn solved_state_offers_no_legal_moves_while_locked() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(1u8, false);
        engine.apply_move(&mut state, 0, 2).expect("legal");
        assert!(RuleEngine::is_won(&state));

        assert!(!engine.is_move_legal(&state, 2, 0));
        assert!(engine.legal_targets(&state, 2).is_empty());
        assert_eq!(
            engine.check_move(&state, 2, 0),
            Err(RuleError::GameFinished)
        );
        assert_eq!(
            engine.apply_move(&mut state, 2, 0),
            Err(RuleError::GameFinished)
        );

        let unlocked = RuleEngine::with_config(EngineConfig::default().with_lock_after_win(false));
        assert!(unlocked.is_move_legal(&state, 2, 0));
        assert_eq!(unlocked.legal_targets(&state, 2), vec![0, 1]);
    }

    #[test]
    fn unlocked_engine_keeps_accepting_moves_after_win() {
        let mut engine = RuleEngine::with_config(EngineConfig::default().with_lock_after_win(false));
        let mut state = PuzzleState::new(1u8, false);
        engine.apply_move(&mut state, 0, 2).expect("legal");
        assert!(RuleEngine::is_won(&state));
        engine.apply_move(&mut state, 2, 1).expect("lock is disabled");
        assert!(!RuleEngine::is_won(&state));
    }

    #[test]
    fn budget_exhaustion_is_reported_and_revivable() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(1u8, true);
        assert_eq!(state.moves_remaining, 1);

        let events = engine.apply_move(&mut state, 0, 1).expect("legal");
        assert!(events.contains(&GameEvent::BudgetExhausted { moves: 1 }));
        assert!(RuleEngine::is_challenge_failed(&state));
        assert_eq!(state.status(), GameStatus::ChallengeFailed);

        engine.apply_move(&mut state, 1, 2).expect("failure does not block moves");
        assert_eq!(state.moves_remaining, -1);
        assert!(RuleEngine::is_won(&state));
        assert!(!RuleEngine::is_challenge_failed(&state));

        engine.undo_last_move(&mut state).expect("undo");
        engine.undo_last_move(&mut state).expect("undo");
        assert_eq!(state.moves_remaining, 1);
        assert!(!RuleEngine::is_challenge_failed(&state));
    }

    #[test]
    fn corrupted_state_is_rejected() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(3u8, false);
        state.pegs = [vec![3, 1], vec![2], vec![2]];
        assert!(matches!(
            engine.apply_move(&mut state, 0, 2),
            Err(RuleError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn resolution_carries_reason_only_on_failure() {
        let mut engine = RuleEngine::new();
        let mut state = PuzzleState::new(2u8, false);

        let outcome = engine.apply_move(&mut state, 0, 2);
        let resolution = MoveResolution::new(&state, outcome);
        assert!(resolution.ok);
        assert!(resolution.reason.is_none());
        assert_eq!(resolution.status, GameStatus::Playing);

        let outcome = engine.apply_move(&mut state, 1, 2);
        let resolution = MoveResolution::new(&state, outcome);
        assert!(!resolution.ok);
        assert_eq!(resolution.reason.as_deref(), Some("Peg 2 has no disk to move."));
        assert!(resolution.events.is_empty());
    }
}
