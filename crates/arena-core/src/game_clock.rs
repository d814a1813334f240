//! Per-slot game timing.
//!
//! ```text
//! NOT_STARTED ──start──▶ RUNNING ◀──resume/pause──▶ PAUSED
//!                           │                          │
//!                           └────────over──────────────┴──▶ OVER
//! ```
//!
//! `restart` replaces the clock with a fresh running one from any state.
//! `OVER` ignores start/pause/resume/over; only restart or a slot
//! release gets rid of it.
//!
//! Resuming shifts `start` forward by the paused interval, so a game
//! paused at 10s and resumed at 15s reads 11s at 16s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slot::SlotIndex;
use crate::slot_registry::SlotRegistry;
use crate::time::{as_seconds, Millis};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockPhase {
    Running,
    Paused,
    Over,
}

/// Lifecycle events reported by a slot's owner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    Started,
    Restarted,
    Paused,
    Resumed,
    Over,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameClock {
    /// Start time, shifted forward by every completed pause.
    start: Millis,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    paused_at: Option<Millis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    over_at: Option<Millis>,
}

impl GameClock {
    /// A clock running from `now`.
    pub fn started(now: Millis) -> Self {
        GameClock {
            start: now,
            paused_at: None,
            over_at: None,
        }
    }

    /// A clock created already paused (pause arrived before start).
    pub fn paused(now: Millis) -> Self {
        GameClock {
            start: now,
            paused_at: Some(now),
            over_at: None,
        }
    }

    pub fn phase(&self) -> ClockPhase {
        if self.over_at.is_some() {
            ClockPhase::Over
        } else if self.paused_at.is_some() {
            ClockPhase::Paused
        } else {
            ClockPhase::Running
        }
    }

    pub fn start(&self) -> Millis {
        self.start
    }

    /// Freeze the clock. Returns `false` if it was not running.
    pub fn pause(&mut self, now: Millis) -> bool {
        if self.phase() != ClockPhase::Running {
            return false;
        }
        self.paused_at = Some(now.max(self.start));
        true
    }

    /// Unfreeze the clock, compensating for the paused interval.
    /// Returns `false` if it was not paused.
    pub fn resume(&mut self, now: Millis) -> bool {
        if self.phase() != ClockPhase::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.start = self.start.saturating_add(now.saturating_sub(paused_at));
        }
        true
    }

    /// Mark the game over. A paused game ends at its pause time.
    /// Returns `false` if it was already over.
    pub fn finish(&mut self, now: Millis) -> bool {
        if self.phase() == ClockPhase::Over {
            return false;
        }
        let end = self.paused_at.take().unwrap_or(now);
        self.over_at = Some(end.max(self.start));
        true
    }

    /// Game duration as of `now`, excluding paused time.
    pub fn elapsed(&self, now: Millis) -> Millis {
        let end = match self.phase() {
            ClockPhase::Over => self.over_at.unwrap_or(now),
            ClockPhase::Paused => self.paused_at.unwrap_or(now),
            ClockPhase::Running => now,
        };
        end.saturating_sub(self.start)
    }
}

/// Durations broadcast on every timer tick, in seconds, keyed by slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdate {
    pub selection_durations: BTreeMap<SlotIndex, f64>,
    pub game_durations: BTreeMap<SlotIndex, f64>,
}

/// All game clocks, at most one per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockService {
    clocks: BTreeMap<SlotIndex, GameClock>,
}

impl ClockService {
    pub fn new() -> Self {
        ClockService::default()
    }

    pub fn from_clocks(clocks: BTreeMap<SlotIndex, GameClock>) -> Self {
        ClockService { clocks }
    }

    /// Apply an owner event to the slot's clock.
    ///
    /// Returns `true` if the clock changed (and should be persisted).
    pub fn apply(&mut self, index: SlotIndex, event: ClockEvent, now: Millis) -> bool {
        match event {
            ClockEvent::Restarted => {
                self.clocks.insert(index, GameClock::started(now));
                true
            }
            ClockEvent::Started | ClockEvent::Resumed => match self.clocks.get_mut(&index) {
                Some(clock) => clock.resume(now),
                None => {
                    self.clocks.insert(index, GameClock::started(now));
                    true
                }
            },
            ClockEvent::Paused => match self.clocks.get_mut(&index) {
                Some(clock) => clock.pause(now),
                None => {
                    self.clocks.insert(index, GameClock::paused(now));
                    true
                }
            },
            ClockEvent::Over => match self.clocks.get_mut(&index) {
                Some(clock) => clock.finish(now),
                None => false,
            },
        }
    }

    pub fn get(&self, index: SlotIndex) -> Option<&GameClock> {
        self.clocks.get(&index)
    }

    /// Drop the slot's clock (slot released).
    pub fn clear(&mut self, index: SlotIndex) -> bool {
        self.clocks.remove(&index).is_some()
    }

    pub fn clocks(&self) -> &BTreeMap<SlotIndex, GameClock> {
        &self.clocks
    }

    /// Compute the periodic broadcast.
    ///
    /// Selection time is reported for owned slots whose game has not
    /// started; game time for every slot that has a clock.
    pub fn timer_update(&self, slots: &SlotRegistry, now: Millis) -> TimerUpdate {
        let mut update = TimerUpdate::default();

        for (index, slot) in slots.owned() {
            if !self.clocks.contains_key(&index) {
                let held = now.saturating_sub(slot.selected_at);
                update.selection_durations.insert(index, as_seconds(held));
            }
        }

        for (index, clock) in &self.clocks {
            update
                .game_durations
                .insert(*index, as_seconds(clock.elapsed(now)));
        }

        update
    }
}
