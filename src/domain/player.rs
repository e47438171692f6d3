// Connected players, ready flags, and per-cycle scores.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

pub type PlayerId = u64;

/// Fixed palette players are colored from; two players may share a color.
pub const COLOR_PALETTE: [&str; 12] = [
    "#FF5252", "#FF4081", "#E040FB", "#7C4DFF", "#536DFE", "#448AFF", "#40C4FF", "#18FFFF",
    "#64FFDA", "#69F0AE", "#B2FF59", "#EEFF41",
];

#[derive(Debug, Clone)]
pub struct PlayerProfile {
    pub name: String,
    pub color: String,
    pub is_ready: bool,
}

impl PlayerProfile {
    fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let color = COLOR_PALETTE
            .choose(&mut rng)
            .copied()
            .unwrap_or(COLOR_PALETTE[0]);
        Self {
            name: format!("Explorer-{}", rng.gen_range(0..1000)),
            color: color.to_string(),
            is_ready: false,
        }
    }
}

/// Roster of connected participants plus their scores for the current cycle.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, PlayerProfile>,
    scores: HashMap<PlayerId, u32>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection with a fresh random profile and a zeroed score.
    pub fn add_player(&mut self, id: PlayerId) {
        self.players.insert(id, PlayerProfile::generate());
        self.scores.insert(id, 0);
    }

    /// Removes the player and its score entry; no-op for unknown ids.
    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.remove(&id);
        self.scores.remove(&id);
    }

    /// Flags the player as ready; silently ignores unknown ids.
    pub fn set_ready(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.is_ready = true;
        }
    }

    /// True iff at least two players are present and every one is ready.
    /// This is the sole gate for starting a match.
    pub fn all_ready(&self) -> bool {
        self.players.len() >= 2 && self.players.values().all(|p| p.is_ready)
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerProfile> {
        self.players.get(&id)
    }

    pub fn players(&self) -> &HashMap<PlayerId, PlayerProfile> {
        &self.players
    }

    pub fn scores(&self) -> &HashMap<PlayerId, u32> {
        &self.scores
    }

    /// Adds claim points to the player's score; unknown ids are ignored.
    pub fn award(&mut self, id: PlayerId, points: u32) {
        if let Some(score) = self.scores.get_mut(&id) {
            *score = score.saturating_add(points);
        }
    }

    /// Rebuilds every still-connected player with a fresh random profile,
    /// ready flag cleared and score zeroed. Identities persist.
    pub fn reset_for_new_cycle(&mut self) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        self.players.clear();
        self.scores.clear();
        for id in ids {
            self.add_player(id);
        }
    }
}
