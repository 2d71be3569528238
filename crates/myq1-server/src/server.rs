// server.rs -- entity records and world constants shared by the server modules

use myq1_common::q_shared::*;

// ============================================================
// Constants
// ============================================================

pub const MAX_ENT_LEAFS: usize = 16;

// sv_move types
pub const MOVE_NORMAL: i32 = 0;
pub const MOVE_NOMONSTERS: i32 = 1;
pub const MOVE_MISSILE: i32 = 2;

// area_edicts list selection
pub const AREA_SOLID: i32 = 1;
pub const AREA_TRIGGERS: i32 = 2;

// ============================================================
// Entity classification
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Solid {
    #[default]
    Not = 0, // no interaction with other objects
    Trigger,  // touch on edge, but not blocking
    Bbox,     // touch on edge, block
    Slidebox, // touch on edge, but not an onground
    Bsp,      // bsp clip, touch on edge, block
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum MoveType {
    #[default]
    None = 0,
    AngleNoclip,
    AngleClip,
    Walk, // gravity
    Step, // gravity, special edge handling
    Fly,
    Toss, // gravity
    Push, // no clip to world, push and crush
    Noclip,
    FlyMissile, // extra size to monsters
    Bounce,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntityFlags: i32 {
        const FLY           = 1;
        const SWIM          = 2;
        const CONVEYOR      = 4;
        const CLIENT        = 8;
        const INWATER       = 16;
        const MONSTER       = 32;
        const GODMODE       = 64;
        const NOTARGET      = 128;
        const ITEM          = 256;
        const ONGROUND      = 512;
        const PARTIALGROUND = 1024; // not all corners are valid
        const WATERJUMP     = 2048; // player jumping out of water
        const JUMPRELEASED  = 4096; // for jump debouncing
    }
}
pub const FL_ITEM: EntityFlags = EntityFlags::ITEM;
pub const FL_MONSTER: EntityFlags = EntityFlags::MONSTER;
pub const FL_ONGROUND: EntityFlags = EntityFlags::ONGROUND;
pub const FL_PARTIALGROUND: EntityFlags = EntityFlags::PARTIALGROUND;

// ============================================================
// Edict
//
// The fields of an entity the world code reads and writes. Everything
// else about an entity lives with the progs.
// ============================================================

#[derive(Debug, Clone)]
pub struct Edict {
    pub inuse: bool,

    pub origin: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub size: Vec3,
    pub absmin: Vec3,
    pub absmax: Vec3,

    pub solid: Solid,
    pub movetype: MoveType,
    pub flags: EntityFlags,
    pub owner_index: i32, // index into edicts, -1 = none
    pub modelindex: i32,
    pub touch: i32, // progs function, 0 = none

    pub num_leafs: usize,
    pub leafnums: [i32; MAX_ENT_LEAFS],
}

impl Default for Edict {
    fn default() -> Self {
        Self {
            inuse: false,
            origin: [0.0; 3],
            mins: [0.0; 3],
            maxs: [0.0; 3],
            size: [0.0; 3],
            absmin: [0.0; 3],
            absmax: [0.0; 3],
            solid: Solid::Not,
            movetype: MoveType::None,
            flags: EntityFlags::empty(),
            owner_index: -1,
            modelindex: 0,
            touch: 0,
            num_leafs: 0,
            leafnums: [0; MAX_ENT_LEAFS],
        }
    }
}

impl Edict {
    /// Sets the local bounds and the derived size.
    pub fn set_size(&mut self, mins: &Vec3, maxs: &Vec3) {
        self.mins = *mins;
        self.maxs = *maxs;
        self.size = vector_subtract(maxs, mins);
    }

    /// World leafs recorded by the last link.
    pub fn leafs(&self) -> &[i32] {
        &self.leafnums[..self.num_leafs]
    }
}
