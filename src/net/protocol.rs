use serde::{Deserialize, Serialize};

use crate::game::state::{HazardId, HazardZone, PickupId, Pickup, Player, PlayerId, PlayerKind};
use crate::util::vec2::Vec2;

/// Messages from a client's transport session to the room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for a player in the room
    Join,
    /// Movement intent for this client's player
    Move(MoveIntent),
    /// Leave the room
    Leave,
    /// Reset the round for everyone
    Restart,
}

/// Desired movement for one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveIntent {
    /// Move along a raw direction vector (any length)
    Direction { x: f32, y: f32 },
    /// Move toward an absolute world point
    Target { x: f32, y: f32 },
}

impl MoveIntent {
    pub fn direction(v: Vec2) -> Self {
        MoveIntent::Direction { x: v.x, y: v.y }
    }

    pub fn target(p: Vec2) -> Self {
        MoveIntent::Target { x: p.x, y: p.y }
    }

    /// Unit direction for a player standing at `from`
    ///
    /// None for zero-length or non-finite input.
    pub fn unit_direction(&self, from: Vec2) -> Option<Vec2> {
        let raw = match *self {
            MoveIntent::Direction { x, y } => Vec2::new(x, y),
            MoveIntent::Target { x, y } => Vec2::new(x, y) - from,
        };
        if !raw.is_finite() {
            return None;
        }
        // Scale by the largest component first so length_sq cannot overflow
        let largest = raw.x.abs().max(raw.y.abs());
        if largest == 0.0 {
            return None;
        }
        Some((raw * (1.0 / largest)).normalize())
    }
}

/// Player as seen by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec2,
    pub size: f32,
    pub color: String,
    pub kind: PlayerKind,
}

impl PlayerSnapshot {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            position: player.position(),
            size: player.size,
            color: player.color.clone(),
            kind: player.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: PickupId,
    pub position: Vec2,
}

impl PickupSnapshot {
    pub fn from_pickup(pickup: &Pickup) -> Self {
        Self {
            id: pickup.id,
            position: pickup.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardSnapshot {
    pub id: HazardId,
    pub position: Vec2,
    pub radius: f32,
    pub remaining_lifetime: f32,
}

impl HazardSnapshot {
    pub fn from_hazard(hazard: &HazardZone) -> Self {
        Self {
            id: hazard.id,
            position: hazard.position,
            radius: hazard.radius,
            remaining_lifetime: hazard.remaining_lifetime,
        }
    }
}

/// Visibility-filtered view of the world for one client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    /// Visible players, the requesting player first, then closest first
    pub players: Vec<PlayerSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
    pub hazards: Vec<HazardSnapshot>,
    /// Players in the room before filtering
    pub total_players: u32,
    /// Pickups in the room before filtering
    pub total_pickups: u32,
}

impl WorldSnapshot {
    /// Snapshot for a client with no live player
    pub fn empty(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.pickups.is_empty() && self.hazards.is_empty()
    }
}
