// Wire protocol DTOs and conversions for the public game messages.
// Message names and payload field casing are contractual with the browser
// client; domain and use-case types never cross the wire directly.

use crate::domain::player::PlayerId;
use crate::use_cases::types::{GameSnapshot, Phase, PlayerSnapshot, SessionEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Sent once per new connection: assigned id plus the full game state.
    #[serde(rename = "init")]
    Init(InitDto),
    // Full players mapping, sent on any roster or ready change.
    #[serde(rename = "player-status-update")]
    PlayerStatusUpdate(HashMap<PlayerId, PlayerDto>),
    #[serde(rename = "game-start")]
    GameStart,
    #[serde(rename = "game-reset")]
    GameReset(GameStateDto),
    #[serde(rename = "game-over")]
    GameOver(GameOverDto),
    // A planet was claimed; includes claimant display data for the board.
    #[serde(rename = "planet-update")]
    PlanetUpdate(PlanetUpdateDto),
    #[serde(rename = "score-update")]
    ScoreUpdate(HashMap<PlayerId, u32>),
    #[serde(rename = "planet-locked")]
    PlanetLocked(PlanetLockedDto),
    // Sent only to the lock holder; the correct answer is withheld.
    #[serde(rename = "start-quiz")]
    StartQuiz(StartQuizDto),
    #[serde(rename = "quiz-result")]
    QuizResult(QuizResultDto),
    #[serde(rename = "quiz-timeout")]
    QuizTimeout,
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "player-ready")]
    PlayerReady,
    #[serde(rename = "request-planet-quiz")]
    RequestPlanetQuiz(PlanetRef),
    #[serde(rename = "submit-answer")]
    SubmitAnswer(AnswerPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanetRef {
    pub planet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerPayload {
    pub planet: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDto {
    pub player_id: PlayerId,
    pub game_state: GameStateDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub name: String,
    pub color: String,
    pub is_ready: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseDto {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetStateDto {
    pub claimed_by: Option<PlayerId>,
    pub is_locked: bool,
    pub points: u32,
}

/// Snapshot of the whole session, used by `init` and `game-reset`.
#[derive(Debug, Clone, Serialize)]
pub struct GameStateDto {
    pub status: PhaseDto,
    pub players: HashMap<PlayerId, PlayerDto>,
    // Ordered map keeps snapshot output stable across runs.
    pub planets: BTreeMap<String, PlanetStateDto>,
    pub scores: HashMap<PlayerId, u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverDto {
    pub winners: Vec<String>,
    pub scores: HashMap<PlayerId, u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetUpdateDto {
    pub planet: String,
    pub claimed_by: PlayerId,
    pub player_name: String,
    pub player_color: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetLockedDto {
    pub planet: String,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartQuizDto {
    pub planet: String,
    pub quiz: QuizDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizDto {
    pub question: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultDto {
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact: Option<String>,
}

impl From<Phase> for PhaseDto {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Waiting => PhaseDto::Waiting,
            Phase::Playing => PhaseDto::Playing,
            Phase::Finished => PhaseDto::Finished,
        }
    }
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            name: player.name.clone(),
            color: player.color.clone(),
            is_ready: player.is_ready,
        }
    }
}

fn players_dto(players: &HashMap<PlayerId, PlayerSnapshot>) -> HashMap<PlayerId, PlayerDto> {
    players.iter().map(|(id, p)| (*id, PlayerDto::from(p))).collect()
}

impl From<GameSnapshot> for GameStateDto {
    fn from(snapshot: GameSnapshot) -> Self {
        Self {
            status: snapshot.phase.into(),
            players: players_dto(&snapshot.players),
            planets: snapshot
                .planets
                .iter()
                .map(|p| {
                    (
                        p.name.to_string(),
                        PlanetStateDto {
                            claimed_by: p.claimed_by,
                            is_locked: p.is_locked,
                            points: p.points,
                        },
                    )
                })
                .collect(),
            scores: snapshot.scores,
        }
    }
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Welcome { player_id, snapshot } => ServerMessage::Init(InitDto {
                player_id,
                game_state: snapshot.into(),
            }),
            SessionEvent::RosterUpdate { players } => {
                ServerMessage::PlayerStatusUpdate(players_dto(&players))
            }
            SessionEvent::GameStarted => ServerMessage::GameStart,
            SessionEvent::GameReset { snapshot } => ServerMessage::GameReset(snapshot.into()),
            SessionEvent::GameOver { winners, scores } => {
                ServerMessage::GameOver(GameOverDto { winners, scores })
            }
            SessionEvent::PlanetClaimed {
                planet,
                claimed_by,
                player_name,
                player_color,
                points,
            } => ServerMessage::PlanetUpdate(PlanetUpdateDto {
                planet,
                claimed_by,
                player_name,
                player_color,
                points,
            }),
            SessionEvent::ScoreUpdate { scores } => ServerMessage::ScoreUpdate(scores),
            SessionEvent::PlanetLockChanged { planet, is_locked } => {
                ServerMessage::PlanetLocked(PlanetLockedDto { planet, is_locked })
            }
            SessionEvent::QuizStarted {
                planet,
                question,
                answers,
            } => ServerMessage::StartQuiz(StartQuizDto {
                planet,
                quiz: QuizDto {
                    question: question.to_string(),
                    answers: answers.iter().map(|a| a.to_string()).collect(),
                },
            }),
            SessionEvent::QuizResult { correct, fact } => {
                ServerMessage::QuizResult(QuizResultDto {
                    correct,
                    fact: fact.map(str::to_string),
                })
            }
            SessionEvent::QuizTimeout => ServerMessage::QuizTimeout,
        }
    }
}
