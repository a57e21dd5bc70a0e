//! Reverb room presets.

/// Shape of a synthesized reverb kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomPreset {
    /// Lookup name.
    pub name: &'static str,
    /// Kernel length in seconds.
    pub size_secs: f32,
    /// Decay time in seconds; the tail envelope is `exp(-3t / decay)`.
    pub decay_secs: f32,
    /// Tail amplitude, 0–1.
    pub brightness: f32,
}

/// Built-in rooms, smallest first.
pub static ROOM_PRESETS: &[RoomPreset] = &[
    RoomPreset {
        name: "small",
        size_secs: 0.8,
        decay_secs: 0.6,
        brightness: 0.7,
    },
    RoomPreset {
        name: "room",
        size_secs: 1.5,
        decay_secs: 1.2,
        brightness: 0.6,
    },
    RoomPreset {
        name: "hall",
        size_secs: 2.5,
        decay_secs: 2.0,
        brightness: 0.5,
    },
    RoomPreset {
        name: "cathedral",
        size_secs: 4.0,
        decay_secs: 3.5,
        brightness: 0.4,
    },
];

/// Find a room by name, ignoring case.
pub fn find_room(name: &str) -> Option<RoomPreset> {
    ROOM_PRESETS
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
        .copied()
}
