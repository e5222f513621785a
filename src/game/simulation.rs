//! Host-side simulation: advances the authoritative world by one tick.
//!
//! Runs only on the host, at a fixed cadence, while the session is playing.
//! Guests never simulate; they render snapshots.

use rand::Rng;

use crate::game::constants::{food, snake};
use crate::game::state::{GameState, PeerId, Player};
use crate::util::vec2::Vec2;

/// Events produced by one tick, consumed by the coordinator for
/// commentary and logging.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    /// Player left the playable area and died
    HitWall { player: PeerId },
    /// Player ran into a body chain and died
    Collision { player: PeerId },
    /// Player consumed a food item
    AteFood { player: PeerId, value: u32 },
}

/// Pick a spawn position inside the world margin and a random heading.
pub fn random_spawn(state: &GameState, rng: &mut impl Rng) -> (Vec2, f32) {
    let position = Vec2::new(
        rng.gen_range(snake::SPAWN_MARGIN..state.world_width - snake::SPAWN_MARGIN),
        rng.gen_range(snake::SPAWN_MARGIN..state.world_height - snake::SPAWN_MARGIN),
    );
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    (position, angle)
}

/// Advance the world by one tick.
///
/// Each live player is processed independently using its currently stored
/// angle and speed. Same-tick food races between players are resolved by
/// iteration order; first processed wins the item.
pub fn advance(state: &mut GameState, rng: &mut impl Rng) -> Vec<TickEvent> {
    let mut events = Vec::new();
    let ids: Vec<PeerId> = state.players.keys().copied().collect();

    for id in ids {
        let new_head = match state.players.get(&id) {
            Some(p) if !p.dead => p.head() + Vec2::from_angle(p.angle) * p.speed,
            _ => continue,
        };

        if !state.in_bounds(new_head) {
            if let Some(p) = state.players.get_mut(&id) {
                p.dead = true;
            }
            events.push(TickEvent::HitWall { player: id });
            continue;
        }

        if hits_any_body(state, id, new_head) {
            if let Some(p) = state.players.get_mut(&id) {
                p.dead = true;
            }
            events.push(TickEvent::Collision { player: id });
            continue;
        }

        if let Some(player) = state.players.get_mut(&id) {
            rebuild_chain(player, new_head);

            let score = &mut player.score;
            state.foods.retain(|item| {
                if item.position.distance_to(new_head) < food::PICKUP_RADIUS {
                    *score += item.value;
                    events.push(TickEvent::AteFood {
                        player: id,
                        value: item.value,
                    });
                    false
                } else {
                    true
                }
            });

            clamp_chain(player);
        }
    }

    // One item per tick; the count converges back to the target.
    if state.foods.len() < food::TARGET_COUNT {
        state.spawn_food(rng);
    }

    events
}

/// Whether `new_head` is fatally close to any live player's body.
/// The first segments of one's own chain are excluded so the head cannot
/// collide with its own neck.
fn hits_any_body(state: &GameState, id: PeerId, new_head: Vec2) -> bool {
    for (other_id, other) in state.players.iter() {
        if other.dead {
            continue;
        }
        let skip = if *other_id == id {
            snake::SELF_SKIP_SEGMENTS
        } else {
            0
        };
        if other
            .segments
            .iter()
            .skip(skip)
            .any(|seg| seg.distance_to(new_head) < snake::COLLISION_RADIUS)
        {
            return true;
        }
    }
    false
}

/// Rebuild the chain behind a new head position.
///
/// Walks the previous chain keeping a segment only once the running
/// distance from the last kept point reaches the configured spacing, then
/// reuses trailing segments so the chain never shrinks during the walk.
fn rebuild_chain(player: &mut Player, new_head: Vec2) {
    let old = &player.segments;
    let mut chain = Vec::with_capacity(old.len() + 1);
    chain.push(new_head);
    let mut last = new_head;
    for current in old.iter().take(old.len() - 1).copied() {
        if last.distance_to(current) >= snake::SEGMENT_SPACING {
            chain.push(current);
            last = current;
        }
    }
    while chain.len() < old.len() {
        chain.push(old[chain.len()]);
    }
    player.segments = chain;
}

/// Truncate or extend the chain to the length the player's score entitles
/// it to. New segments emerge stacked on the tail and space out over the
/// following ticks.
fn clamp_chain(player: &mut Player) {
    let target = player.target_len();
    if player.segments.len() > target {
        player.segments.truncate(target);
    } else if let Some(&tail) = player.segments.last() {
        while player.segments.len() < target {
            player.segments.push(tail);
        }
    }
}
