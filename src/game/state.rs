//! Shared world model: players, food, and the root game state.
//!
//! Exactly one authoritative copy exists, owned by the host. Guests hold a
//! disposable copy that is wholesale replaced on every received snapshot.

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{food, snake, world};
use crate::util::vec2::Vec2;

/// Transport-assigned peer identity; doubles as the player key.
pub type PeerId = Uuid;

/// Identifier for food items (unique within one world)
pub type FoodId = u64;

/// One participant's live state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Transport identity of the owning peer
    pub id: PeerId,
    /// Display name
    pub name: String,
    /// Display color (hex string chosen in the lobby)
    pub color: String,
    /// Non-negative, monotonically non-decreasing while alive
    pub score: u32,
    /// Body chain, head first. Never shorter than `snake::INITIAL_LENGTH`.
    pub segments: Vec<Vec2>,
    /// Current heading in radians, overwritten by input
    pub angle: f32,
    /// Movement distance per tick
    pub speed: f32,
    /// Terminal flag; dead players stay visible for the scoreboard
    pub dead: bool,
}

impl Player {
    /// Create a player at `start` facing `angle`, body trailing behind the head.
    pub fn spawn(id: PeerId, name: String, color: String, start: Vec2, angle: f32) -> Self {
        let dir = Vec2::from_angle(angle);
        let segments = (0..snake::INITIAL_LENGTH)
            .map(|i| start - dir * (i as f32 * snake::SEGMENT_SPACING))
            .collect();
        Self {
            id,
            name,
            color,
            score: 0,
            segments,
            angle,
            speed: snake::BASE_SPEED,
            dead: false,
        }
    }

    /// Head position. The chain is never empty by construction.
    pub fn head(&self) -> Vec2 {
        self.segments[0]
    }

    /// Chain length this player's score entitles it to.
    pub fn target_len(&self) -> usize {
        snake::INITIAL_LENGTH + (self.score / snake::GROWTH_DIVISOR) as usize
    }
}

/// Food kinds. The nominal value catalog is kept for display parity; spawned
/// items always carry the flat `food::SPAWN_VALUE`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FoodKind {
    Coffee,
    Donut,
    Stapler,
    Laptop,
}

impl FoodKind {
    pub const ALL: [FoodKind; 4] = [
        FoodKind::Coffee,
        FoodKind::Donut,
        FoodKind::Stapler,
        FoodKind::Laptop,
    ];

    /// Catalog value shown next to the item; not what pickups award.
    pub fn nominal_value(&self) -> u32 {
        match self {
            FoodKind::Coffee => 5,
            FoodKind::Donut => 10,
            FoodKind::Stapler => 15,
            FoodKind::Laptop => 25,
        }
    }
}

/// A single consumable item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: FoodId,
    pub position: Vec2,
    pub kind: FoodKind,
    /// Score awarded on pickup
    pub value: u32,
}

/// Session phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameStatus {
    Lobby,
    Playing,
    GameOver,
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::Lobby
    }
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub players: HashMap<PeerId, Player>,
    pub foods: Vec<Food>,
    pub world_width: f32,
    pub world_height: f32,
    pub status: GameStatus,
    next_food_id: FoodId,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            foods: Vec::new(),
            world_width: world::SIZE,
            world_height: world::SIZE,
            status: GameStatus::Lobby,
            next_food_id: 0,
        }
    }

    /// Whether a point lies inside the playable area (edges inclusive)
    pub fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.world_width && p.y >= 0.0 && p.y <= self.world_height
    }

    /// Get player by ID - O(1) with HashMap
    pub fn get_player(&self, id: PeerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get mutable player by ID - O(1) with HashMap
    pub fn get_player_mut(&mut self, id: PeerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Add a player to the world. Players are never removed once added.
    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id, player);
    }

    /// Count players that are still alive
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| !p.dead).count()
    }

    /// Spawn one food item at a uniform random position with a uniform
    /// random kind. Every item carries the flat spawn value.
    pub fn spawn_food(&mut self, rng: &mut impl Rng) -> FoodId {
        let id = self.next_food_id;
        self.next_food_id += 1;
        let kind = FoodKind::ALL[rng.gen_range(0..FoodKind::ALL.len())];
        self.foods.push(Food {
            id,
            position: Vec2::new(
                rng.gen_range(0.0..self.world_width),
                rng.gen_range(0.0..self.world_height),
            ),
            kind,
            value: food::SPAWN_VALUE,
        });
        id
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_player_spawn_chain() {
        let id = Uuid::new_v4();
        let start = Vec2::new(500.0, 500.0);
        let player = Player::spawn(id, "Dave".to_string(), "#3b82f6".to_string(), start, 0.0);

        assert_eq!(player.id, id);
        assert_eq!(player.score, 0);
        assert!(!player.dead);
        assert_eq!(player.segments.len(), snake::INITIAL_LENGTH);
        assert_eq!(player.head(), start);

        // Body trails opposite the heading at the configured spacing
        for (i, seg) in player.segments.iter().enumerate() {
            let expected = Vec2::new(start.x - i as f32 * snake::SEGMENT_SPACING, start.y);
            assert!(seg.approx_eq(expected, 1e-3), "segment {} off: {:?}", i, seg);
        }
    }

    #[test]
    fn test_target_len_growth_law() {
        let mut player = Player::spawn(
            Uuid::new_v4(),
            "Eve".to_string(),
            "#ef4444".to_string(),
            Vec2::new(100.0, 100.0),
            1.0,
        );
        assert_eq!(player.target_len(), snake::INITIAL_LENGTH);

        player.score = 4;
        assert_eq!(player.target_len(), snake::INITIAL_LENGTH);

        player.score = 5;
        assert_eq!(player.target_len(), snake::INITIAL_LENGTH + 1);

        player.score = 123;
        assert_eq!(player.target_len(), snake::INITIAL_LENGTH + 24);
    }

    #[test]
    fn test_food_kind_catalog() {
        assert!(FoodKind::Coffee.nominal_value() < FoodKind::Donut.nominal_value());
        assert!(FoodKind::Stapler.nominal_value() < FoodKind::Laptop.nominal_value());
    }

    #[test]
    fn test_spawn_food_flat_value() {
        let mut state = GameState::new();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..food::TARGET_COUNT {
            state.spawn_food(&mut rng);
        }

        assert_eq!(state.foods.len(), food::TARGET_COUNT);
        for item in &state.foods {
            assert_eq!(item.value, food::SPAWN_VALUE);
            assert!(state.in_bounds(item.position));
        }

        // Ids are unique
        let mut ids: Vec<_> = state.foods.iter().map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), food::TARGET_COUNT);
    }

    #[test]
    fn test_in_bounds_edges() {
        let state = GameState::new();
        assert!(state.in_bounds(Vec2::new(0.0, 0.0)));
        assert!(state.in_bounds(Vec2::new(world::SIZE, world::SIZE)));
        assert!(!state.in_bounds(Vec2::new(-0.1, 100.0)));
        assert!(!state.in_bounds(Vec2::new(100.0, world::SIZE + 0.1)));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut state = GameState::new();
        state.status = GameStatus::Playing;
        let mut rng = StdRng::seed_from_u64(42);

        let p1 = Player::spawn(
            Uuid::new_v4(),
            "Alice".to_string(),
            "#10b981".to_string(),
            Vec2::new(300.0, 400.0),
            0.5,
        );
        let mut p2 = Player::spawn(
            Uuid::new_v4(),
            "Bob".to_string(),
            "#f59e0b".to_string(),
            Vec2::new(900.0, 900.0),
            2.0,
        );
        p2.score = 35;
        let ids = [p1.id, p2.id];
        state.add_player(p1);
        state.add_player(p2);
        for _ in 0..5 {
            state.spawn_food(&mut rng);
        }

        let encoded = bincode::serde::encode_to_vec(&state, bincode::config::standard()).unwrap();
        let (decoded, _): (GameState, usize) =
            bincode::serde::decode_from_slice(&encoded, bincode::config::standard()).unwrap();

        assert_eq!(decoded.status, GameStatus::Playing);
        for id in ids {
            let before = state.get_player(id).unwrap();
            let after = decoded.get_player(id).unwrap();
            assert_eq!(before.score, after.score);
            assert_eq!(before.segments.len(), after.segments.len());
        }
        let before_ids: Vec<_> = state.foods.iter().map(|f| f.id).collect();
        let after_ids: Vec<_> = decoded.foods.iter().map(|f| f.id).collect();
        assert_eq!(before_ids, after_ids);
    }
}
