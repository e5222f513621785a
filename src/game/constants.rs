/// World constants
pub mod world {
    /// Side length of the square world, in world units
    pub const SIZE: f32 = 2000.0;
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 30;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
}

/// Snake movement and body constants
pub mod snake {
    /// Number of body segments at spawn (also the minimum chain length)
    pub const INITIAL_LENGTH: usize = 10;
    /// Target spacing between consecutive body segments
    pub const SEGMENT_SPACING: f32 = 15.0;
    /// Movement distance per tick
    pub const BASE_SPEED: f32 = 3.5;
    /// Reserved boost speed; not wired to any input yet
    #[allow(dead_code)]
    pub const BOOST_SPEED: f32 = 6.0;
    /// Head-to-segment distance below which a collision is fatal
    pub const COLLISION_RADIUS: f32 = 15.0;
    /// Own segments nearest the head excluded from self-collision
    pub const SELF_SKIP_SEGMENTS: usize = 5;
    /// Score points required per extra body segment
    pub const GROWTH_DIVISOR: u32 = 5;
    /// Minimum distance from the world edge for spawn positions
    pub const SPAWN_MARGIN: f32 = 100.0;
}

/// Food constants
pub mod food {
    /// Live food count the world is replenished toward
    pub const TARGET_COUNT: usize = 50;
    /// Head-to-food distance below which the item is consumed
    pub const PICKUP_RADIUS: f32 = 25.0;
    /// Score awarded by every spawned item, regardless of kind
    pub const SPAWN_VALUE: u32 = 10;
}

/// Networking constants
pub mod net {
    /// Delay between endpoint initialization attempts
    pub const INIT_RETRY_DELAY_MS: u64 = 1000;
    /// Upper bound on a single wire frame
    pub const MAX_FRAME_SIZE: usize = 256 * 1024;
}

/// Display color palette offered to players (hex, office theme)
pub const OFFICE_COLORS: [&str; 7] = [
    "#3b82f6", // blue
    "#ef4444", // red
    "#10b981", // green
    "#f59e0b", // amber
    "#8b5cf6", // violet
    "#ec4899", // pink
    "#06b6d4", // cyan
];
