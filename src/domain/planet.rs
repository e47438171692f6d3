// The eight claimable planets: claim/lock bookkeeping and trivia content.

use crate::domain::player::PlayerId;
use std::collections::HashMap;

/// Trivia prompt attached to a planet. The correct answer only leaves this
/// module through [`PlanetLedger::resolve_answer`].
#[derive(Debug, Clone, Copy)]
pub struct Quiz {
    pub question: &'static str,
    pub answers: [&'static str; 2],
    pub correct_answer: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct PlanetSpec {
    name: &'static str,
    points: u32,
    fact: &'static str,
    quiz: Quiz,
}

const CATALOGUE: [PlanetSpec; 8] = [
    PlanetSpec {
        name: "Mercury",
        points: 8,
        fact: "Mercury is the closest planet to the Sun and has no atmosphere.",
        quiz: Quiz {
            question: "Does Mercury have any moons?",
            answers: ["Yes", "No"],
            correct_answer: "No",
        },
    },
    PlanetSpec {
        name: "Venus",
        points: 12,
        fact: "Venus is the hottest planet with surface temperatures over 450°C.",
        quiz: Quiz {
            question: "Is Venus closer to the Sun than Mercury?",
            answers: ["Yes", "No"],
            correct_answer: "No",
        },
    },
    PlanetSpec {
        name: "Earth",
        points: 10,
        fact: "Earth is the only known planet to support life and has liquid water on its surface.",
        quiz: Quiz {
            question: "What is the most abundant gas in Earth's atmosphere?",
            answers: ["Oxygen", "Nitrogen"],
            correct_answer: "Nitrogen",
        },
    },
    PlanetSpec {
        name: "Mars",
        points: 15,
        fact: "Mars is known as the Red Planet due to iron oxide on its surface.",
        quiz: Quiz {
            question: "What is the common name for the iron oxide that gives Mars its color?",
            answers: ["Rust", "Soot"],
            correct_answer: "Rust",
        },
    },
    PlanetSpec {
        name: "Jupiter",
        points: 20,
        fact: "Jupiter is the largest planet in our solar system and has a Great Red Spot.",
        quiz: Quiz {
            question: "Jupiter's Great Red Spot is a massive, long-lasting...",
            answers: ["Volcano", "Storm"],
            correct_answer: "Storm",
        },
    },
    PlanetSpec {
        name: "Saturn",
        points: 18,
        fact: "Saturn is famous for its prominent ring system.",
        quiz: Quiz {
            question: "Are Saturn's rings solid?",
            answers: ["Yes", "No"],
            correct_answer: "No",
        },
    },
    PlanetSpec {
        name: "Uranus",
        points: 16,
        fact: "Uranus rotates on its side, making its seasons very unusual.",
        quiz: Quiz {
            question: "What is unique about Uranus's rotation?",
            answers: ["It's retrograde (backwards)", "It's on its side"],
            correct_answer: "It's on its side",
        },
    },
    PlanetSpec {
        name: "Neptune",
        points: 17,
        fact: "Neptune is the farthest planet from the Sun and has strong winds.",
        quiz: Quiz {
            question: "Which planet was discovered using mathematical prediction?",
            answers: ["Neptune", "Uranus"],
            correct_answer: "Neptune",
        },
    },
];

#[derive(Debug, Clone, Copy)]
struct Lock {
    holder: PlayerId,
    attempt: u64,
}

/// One claimable planet within the current cycle.
#[derive(Debug, Clone)]
pub struct Planet {
    pub name: &'static str,
    pub points: u32,
    pub fact: &'static str,
    pub quiz: Quiz,
    pub claimed_by: Option<PlayerId>,
    lock: Option<Lock>,
}

impl Planet {
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn lock_holder(&self) -> Option<PlayerId> {
        self.lock.map(|l| l.holder)
    }
}

/// Outcome of a valid answer resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Claimed { points: u32 },
    Rejected { fact: &'static str },
}

/// Claim and lock state for the fixed planet set, rebuilt each cycle.
#[derive(Debug)]
pub struct PlanetLedger {
    planets: Vec<Planet>,
}

impl Default for PlanetLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanetLedger {
    /// Fresh ledger with all eight planets unclaimed and unlocked.
    pub fn new() -> Self {
        Self {
            planets: CATALOGUE
                .iter()
                .map(|spec| Planet {
                    name: spec.name,
                    points: spec.points,
                    fact: spec.fact,
                    quiz: spec.quiz,
                    claimed_by: None,
                    lock: None,
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Planet> {
        self.planets.iter().find(|p| p.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Planet> {
        self.planets.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Planet> {
        self.planets.iter()
    }

    /// Locks the planet for one quiz attempt, recording the attempt id.
    /// Returns `None` (and changes nothing) when the planet is unknown,
    /// already claimed, or already locked.
    pub fn try_lock(&mut self, name: &str, holder: PlayerId, attempt: u64) -> Option<Quiz> {
        let planet = self.get_mut(name)?;
        if planet.claimed_by.is_some() || planet.lock.is_some() {
            return None;
        }
        planet.lock = Some(Lock { holder, attempt });
        Some(planet.quiz)
    }

    /// Clears the planet's lock regardless of holder; idempotent.
    pub fn unlock(&mut self, name: &str) {
        if let Some(planet) = self.get_mut(name) {
            planet.lock = None;
        }
    }

    /// Resolves a submitted answer. Returns `None` unless the planet is
    /// currently locked by exactly this player, so a late submission from
    /// anyone else cannot claim a planet someone is answering. On a valid
    /// call the lock is cleared and the claim recorded if the answer matches.
    pub fn resolve_answer(
        &mut self,
        name: &str,
        player: PlayerId,
        answer: &str,
    ) -> Option<AnswerOutcome> {
        let planet = self.get_mut(name)?;
        match planet.lock {
            Some(lock) if lock.holder == player => {}
            _ => return None,
        }
        planet.lock = None;
        if answer == planet.quiz.correct_answer {
            planet.claimed_by = Some(player);
            Some(AnswerOutcome::Claimed {
                points: planet.points,
            })
        } else {
            Some(AnswerOutcome::Rejected { fact: planet.fact })
        }
    }

    /// Releases an expired lock, but only if the recorded attempt id still
    /// matches; a stale expiry loses to whichever resolution ran first.
    pub fn expire_lock(&mut self, name: &str, attempt: u64) -> Option<PlayerId> {
        let planet = self.get_mut(name)?;
        match planet.lock {
            Some(lock) if lock.attempt == attempt => {
                planet.lock = None;
                Some(lock.holder)
            }
            _ => None,
        }
    }

    /// Releases every lock held by a departing player, returning the affected
    /// planet names.
    pub fn unlock_all_held_by(&mut self, player: PlayerId) -> Vec<&'static str> {
        let mut released = Vec::new();
        for planet in &mut self.planets {
            if planet.lock.map(|l| l.holder) == Some(player) {
                planet.lock = None;
                released.push(planet.name);
            }
        }
        released
    }

    pub fn all_claimed(&self) -> bool {
        self.planets.iter().all(|p| p.claimed_by.is_some())
    }

    /// Claimed-planet tally per owner. Planet count is the win metric.
    pub fn claim_counts(&self) -> HashMap<PlayerId, usize> {
        let mut counts = HashMap::new();
        for planet in &self.planets {
            if let Some(owner) = planet.claimed_by {
                *counts.entry(owner).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Sum of points across claimed planets.
    pub fn claimed_points(&self) -> u32 {
        self.planets
            .iter()
            .filter(|p| p.claimed_by.is_some())
            .map(|p| p.points)
            .sum()
    }
}
