// The authoritative game session: player lifecycle, ready gating, the
// lock/answer/expiry protocol, win evaluation, and cycle reset.

use crate::domain::planet::{AnswerOutcome, PlanetLedger};
use crate::domain::player::{PlayerId, PlayerRegistry};
use crate::use_cases::types::{
    GameEvent, GameSnapshot, Phase, PlanetSnapshot, PlayerSnapshot, Reaction, SessionEvent, TimerOp,
};
use std::collections::HashMap;
use tracing::info;

/// Winner label for a claimant whose record was never seen. Not reachable
/// through the public event flow, but keeps winner display total.
const UNKNOWN_PLAYER_LABEL: &str = "A disconnected player";

/// All mutable game state for the single live cycle. Owned by the session
/// task; every mutation happens inside [`GameSession::apply`], one event at a
/// time, which is what makes the lock protocol's check-and-clear race-free.
#[derive(Debug, Default)]
pub struct GameSession {
    phase: Phase,
    registry: PlayerRegistry,
    ledger: PlanetLedger,
    /// Last known names of players who left mid-cycle, for winner display.
    departed: HashMap<PlayerId, String>,
    /// Monotonic id distinguishing lock attempts, so a quiz expiry enqueued
    /// behind a resolution can be recognized as stale.
    next_attempt: u64,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &PlanetLedger {
        &self.ledger
    }

    /// Applies one inbound event and returns everything the outside world
    /// should do about it. Pure state transition; no I/O happens here.
    pub fn apply(&mut self, event: GameEvent) -> Reaction {
        match event {
            GameEvent::Join { player_id } => self.on_join(player_id),
            GameEvent::Leave { player_id } => self.on_leave(player_id),
            GameEvent::Ready { player_id } => self.on_ready(player_id),
            GameEvent::LockRequest { player_id, planet } => self.on_lock_request(player_id, planet),
            GameEvent::SubmitAnswer {
                player_id,
                planet,
                answer,
            } => self.on_submit_answer(player_id, planet, &answer),
            GameEvent::QuizExpired { planet, attempt } => self.on_quiz_expired(planet, attempt),
            GameEvent::ResetDue => self.on_reset_due(),
        }
    }

    fn on_join(&mut self, id: PlayerId) -> Reaction {
        let mut reaction = Reaction::default();
        self.registry.add_player(id);
        info!(player_id = id, "player joined");
        reaction.to_one(
            id,
            SessionEvent::Welcome {
                player_id: id,
                snapshot: self.snapshot(),
            },
        );
        reaction.to_all(self.roster_event());
        reaction
    }

    fn on_leave(&mut self, id: PlayerId) -> Reaction {
        let mut reaction = Reaction::default();
        let Some(profile) = self.registry.get(id) else {
            return reaction;
        };
        self.departed.insert(id, profile.name.clone());
        info!(player_id = id, "player left");

        // Disconnection is an implicit unlock of anything the player held.
        for planet in self.ledger.unlock_all_held_by(id) {
            reaction.timers.push(TimerOp::CancelQuiz {
                planet: planet.to_string(),
            });
            reaction.to_all(SessionEvent::PlanetLockChanged {
                planet: planet.to_string(),
                is_locked: false,
            });
        }

        self.registry.remove_player(id);
        reaction.to_all(self.roster_event());
        reaction
    }

    fn on_ready(&mut self, id: PlayerId) -> Reaction {
        let mut reaction = Reaction::default();
        if self.registry.get(id).is_none() {
            return reaction;
        }
        self.registry.set_ready(id);
        reaction.to_all(self.roster_event());

        // The ready gate is evaluated after every ready-flag update; the
        // phase guard makes the start signal fire exactly once per cycle.
        if self.phase == Phase::Waiting && self.registry.all_ready() {
            self.phase = Phase::Playing;
            info!(players = self.registry.players().len(), "game started");
            reaction.to_all(SessionEvent::GameStarted);
        }
        reaction
    }

    fn on_lock_request(&mut self, id: PlayerId, planet: String) -> Reaction {
        let mut reaction = Reaction::default();
        if self.phase != Phase::Playing || self.registry.get(id).is_none() {
            return reaction;
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        let Some(quiz) = self.ledger.try_lock(&planet, id, attempt) else {
            // Locked, claimed, or unknown: the requester simply never
            // receives a quiz prompt.
            return reaction;
        };

        info!(player_id = id, planet = %planet, "planet locked");
        reaction.to_all(SessionEvent::PlanetLockChanged {
            planet: planet.clone(),
            is_locked: true,
        });
        reaction.to_one(
            id,
            SessionEvent::QuizStarted {
                planet: planet.clone(),
                question: quiz.question,
                answers: quiz.answers,
            },
        );
        reaction.timers.push(TimerOp::StartQuiz { planet, attempt });
        reaction
    }

    fn on_submit_answer(&mut self, id: PlayerId, planet: String, answer: &str) -> Reaction {
        let mut reaction = Reaction::default();
        let Some(outcome) = self.ledger.resolve_answer(&planet, id, answer) else {
            // Wrong lock holder, already unlocked, or unknown planet.
            return reaction;
        };

        // The expiry timer dies in the same reaction that resolved the
        // answer, so no stale timeout can follow a valid resolution.
        reaction.timers.push(TimerOp::CancelQuiz {
            planet: planet.clone(),
        });
        reaction.to_all(SessionEvent::PlanetLockChanged {
            planet: planet.clone(),
            is_locked: false,
        });

        match outcome {
            AnswerOutcome::Claimed { points } => {
                info!(player_id = id, planet = %planet, points, "planet claimed");
                reaction.to_one(
                    id,
                    SessionEvent::QuizResult {
                        correct: true,
                        fact: None,
                    },
                );
                self.registry.award(id, points);
                let (name, color) = self
                    .registry
                    .get(id)
                    .map(|p| (p.name.clone(), p.color.clone()))
                    .unwrap_or_default();
                reaction.to_all(SessionEvent::PlanetClaimed {
                    planet,
                    claimed_by: id,
                    player_name: name,
                    player_color: color,
                    points,
                });
                reaction.to_all(SessionEvent::ScoreUpdate {
                    scores: self.registry.scores().clone(),
                });
                self.check_game_over(&mut reaction);
            }
            AnswerOutcome::Rejected { fact } => {
                reaction.to_one(
                    id,
                    SessionEvent::QuizResult {
                        correct: false,
                        fact: Some(fact),
                    },
                );
            }
        }
        reaction
    }

    fn on_quiz_expired(&mut self, planet: String, attempt: u64) -> Reaction {
        let mut reaction = Reaction::default();
        let Some(holder) = self.ledger.expire_lock(&planet, attempt) else {
            // The lock was already resolved or replaced; this expiry lost.
            return reaction;
        };
        info!(player_id = holder, planet = %planet, "quiz timed out");
        reaction.to_all(SessionEvent::PlanetLockChanged {
            planet,
            is_locked: false,
        });
        reaction.to_one(holder, SessionEvent::QuizTimeout);
        reaction
    }

    fn check_game_over(&mut self, reaction: &mut Reaction) {
        if !self.ledger.all_claimed() {
            return;
        }
        self.phase = Phase::Finished;
        let winners = self.winners();
        info!(winners = ?winners, "game over");
        reaction.to_all(SessionEvent::GameOver {
            winners,
            scores: self.registry.scores().clone(),
        });
        reaction.timers.push(TimerOp::ScheduleReset);
    }

    /// Names of the players owning the most planets. Planet count is the win
    /// metric, not score; every player tied at the maximum is a co-winner.
    fn winners(&self) -> Vec<String> {
        let counts = self.ledger.claim_counts();
        let max = counts.values().copied().max().unwrap_or(0);
        let mut names: Vec<String> = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(id, _)| self.display_name(*id))
            .collect();
        names.sort();
        names
    }

    /// Resolves a player's display name, falling back to the name recorded
    /// when they disconnected mid-cycle.
    fn display_name(&self, id: PlayerId) -> String {
        if let Some(profile) = self.registry.get(id) {
            return profile.name.clone();
        }
        self.departed
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAYER_LABEL.to_string())
    }

    fn on_reset_due(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        if self.phase != Phase::Finished {
            return reaction;
        }
        self.reset_cycle();
        info!("game reset");
        reaction.to_all(SessionEvent::GameReset {
            snapshot: self.snapshot(),
        });
        reaction
    }

    /// Rebuilds planet and player state for a new cycle. Connected players
    /// keep their identities but get fresh names, colors, and scores.
    pub fn reset_cycle(&mut self) {
        self.phase = Phase::Waiting;
        self.ledger = PlanetLedger::new();
        self.registry.reset_for_new_cycle();
        self.departed.clear();
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            players: self.player_snapshots(),
            planets: self
                .ledger
                .iter()
                .map(|p| PlanetSnapshot {
                    name: p.name,
                    claimed_by: p.claimed_by,
                    is_locked: p.is_locked(),
                    points: p.points,
                })
                .collect(),
            scores: self.registry.scores().clone(),
        }
    }

    fn player_snapshots(&self) -> HashMap<PlayerId, PlayerSnapshot> {
        self.registry
            .players()
            .iter()
            .map(|(id, p)| {
                (
                    *id,
                    PlayerSnapshot {
                        name: p.name.clone(),
                        color: p.color.clone(),
                        is_ready: p.is_ready,
                    },
                )
            })
            .collect()
    }

    fn roster_event(&self) -> SessionEvent {
        SessionEvent::RosterUpdate {
            players: self.player_snapshots(),
        }
    }
}
