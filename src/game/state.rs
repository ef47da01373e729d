use serde::{Deserialize, Serialize};

use super::config::DiskCount;

/// 柱子数量。
pub const PEG_COUNT: usize = 3;
/// 胜利时所有盘子必须所在的目标柱。
pub const TARGET_PEG: PegIndex = 2;

/// 盘子只以尺寸区分，1 为最小。
pub type Disk = u8;
/// 柱子下标（0、1、2）。
pub type PegIndex = usize;

/// 经典汉诺塔的最少步数 `2^n - 1`，超出 `u32` 时饱和。
pub fn optimal_moves(disk_count: DiskCount) -> u32 {
    1u32.checked_shl(disk_count.get() as u32).map_or(u32::MAX, |power| power - 1)
}

/// 历史记录中的一步，用于撤销。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRecord {
    pub from: PegIndex,
    pub to: PegIndex,
}

/// 最近一步，仅供前端高亮刚移动的盘子。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMove {
    pub from: PegIndex,
    pub to: PegIndex,
    pub disk: Disk,
}

/// 对局状态派生出的阶段。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Playing,
    Won,
    ChallengeFailed,
}

/// 规则引擎产生的事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    DiskMoved {
        from: PegIndex,
        to: PegIndex,
        disk: Disk,
    },
    MoveUndone {
        from: PegIndex,
        to: PegIndex,
        disk: Disk,
    },
    PuzzleSolved {
        moves: u32,
    },
    BudgetExhausted {
        moves: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MissingDisk { disk: Disk },
    UnexpectedDisk { disk: Disk },
    DuplicateDisk { disk: Disk },
    OrderViolation { peg: PegIndex, below: Disk, above: Disk },
    HistoryMismatch { history: usize, move_count: u32 },
    BudgetMismatch { expected: i64, actual: i32 },
}

/// 游戏整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PuzzleState {
    /// 每根柱子自底向上的盘子尺寸。
    pub pegs: [Vec<Disk>; PEG_COUNT],
    pub disk_count: DiskCount,
    pub move_count: u32,
    #[serde(default)]
    pub history: Vec<MoveRecord>,
    #[serde(default)]
    pub last_move: Option<LastMove>,
    #[serde(default)]
    pub challenge_mode: bool,
    /// 挑战模式剩余步数，可以为负（超出预算）。
    #[serde(default)]
    pub moves_remaining: i32,
}

impl PuzzleState {
    pub fn new(disk_count: impl Into<DiskCount>, challenge_mode: bool) -> Self {
        let disk_count = disk_count.into();
        let first_peg: Vec<Disk> = (1..=disk_count.get()).rev().collect();
        let moves_remaining = if challenge_mode {
            optimal_moves(disk_count) as i32
        } else {
            0
        };

        Self {
            pegs: [first_peg, Vec::new(), Vec::new()],
            disk_count,
            move_count: 0,
            history: Vec::new(),
            last_move: None,
            challenge_mode,
            moves_remaining,
        }
    }

    pub fn top_disk(&self, index: PegIndex) -> Option<Disk> {
        self.pegs.get(index).and_then(|peg| peg.last().copied())
    }

    pub fn optimal_moves(&self) -> u32 {
        optimal_moves(self.disk_count)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn is_solved(&self) -> bool {
        self.pegs[TARGET_PEG].len() == self.disk_count.as_usize()
    }

    /// 每次按需计算，不做锁存：撤销可以让失败的挑战复活。
    pub fn challenge_failed(&self) -> bool {
        self.challenge_mode && self.moves_remaining <= 0 && !self.is_solved()
    }

    pub fn status(&self) -> GameStatus {
        if self.is_solved() {
            GameStatus::Won
        } else if self.challenge_failed() {
            GameStatus::ChallengeFailed
        } else {
            GameStatus::Playing
        }
    }

    /// 移动柱顶盘子，不做规则校验。
    pub(crate) fn transfer_top(&mut self, from: PegIndex, to: PegIndex) -> Option<Disk> {
        if to >= PEG_COUNT {
            return None;
        }
        let disk = self.pegs.get_mut(from)?.pop()?;
        self.pegs[to].push(disk);
        Some(disk)
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let count = self.disk_count.get();

        let mut seen = [false; DiskCount::MAX as usize + 1];
        for (peg_index, peg) in self.pegs.iter().enumerate() {
            for &disk in peg {
                if disk == 0 || disk > count {
                    return Err(IntegrityError::UnexpectedDisk { disk });
                }
                if std::mem::replace(&mut seen[disk as usize], true) {
                    return Err(IntegrityError::DuplicateDisk { disk });
                }
            }
            for pair in peg.windows(2) {
                if pair[0] <= pair[1] {
                    return Err(IntegrityError::OrderViolation {
                        peg: peg_index,
                        below: pair[0],
                        above: pair[1],
                    });
                }
            }
        }
        if let Some(disk) = (1..=count).find(|disk| !seen[*disk as usize]) {
            return Err(IntegrityError::MissingDisk { disk });
        }

        if self.history.len() != self.move_count as usize {
            return Err(IntegrityError::HistoryMismatch {
                history: self.history.len(),
                move_count: self.move_count,
            });
        }

        if self.challenge_mode {
            let expected = self.optimal_moves() as i64 - self.move_count as i64;
            if expected != self.moves_remaining as i64 {
                return Err(IntegrityError::BudgetMismatch {
                    expected,
                    actual: self.moves_remaining,
                });
            }
        }

        Ok(())
    }
}

impl Default for PuzzleState {
    fn default() -> Self {
        Self::new(DiskCount::default(), false)
    }
}
