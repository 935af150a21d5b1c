use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::user::bson_datetime_as_chrono;

pub const GAMES_COLLECTION: &str = "games";

/// Multiplayer game stored in the `games` collection.
/// Modeled only; routes are not mounted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub category_id: ObjectId,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Waiting,
    Ongoing,
    Completed,
}

/// Embedded in `Game`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub user_id: ObjectId,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Embedded in `Player`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: ObjectId,
    pub selected_option: String,
    pub is_correct: bool,
}

impl Game {
    pub fn new(category_id: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            category_id,
            players: Vec::new(),
            status: GameStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn test_new_game_is_waiting() {
        let game = Game::new(ObjectId::new());
        assert_eq!(game.status, GameStatus::Waiting);
        assert!(game.players.is_empty());
    }

    #[test]
    fn test_stored_shape() {
        let mut game = Game::new(ObjectId::new());
        game.status = GameStatus::Ongoing;
        game.players.push(Player {
            user_id: ObjectId::new(),
            score: 1,
            answers: vec![Answer {
                question_id: ObjectId::new(),
                selected_option: "Paris".to_string(),
                is_correct: true,
            }],
        });

        let stored = bson::to_document(&game).unwrap();
        assert_eq!(stored.get_str("status").unwrap(), "ongoing");
        assert!(stored.get_datetime("createdAt").is_ok());
        assert!(!stored.contains_key("_id"));

        let player = &stored.get_array("players").unwrap()[0];
        let answer = &player.as_document().unwrap().get_array("answers").unwrap()[0];
        assert!(answer.as_document().unwrap().get_bool("isCorrect").unwrap());
    }

    #[test]
    fn test_missing_status_defaults_to_waiting() {
        let stored = doc! {
            "categoryId": ObjectId::new(),
            "createdAt": bson::DateTime::now(),
            "updatedAt": bson::DateTime::now(),
        };
        let game: Game = bson::from_document(stored).unwrap();
        assert_eq!(game.status, GameStatus::Waiting);
    }
}
