// q_shared.rs -- foundational types and functions shared by all modules

use crate::error::{QError, QResult};

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

// ============================================================
// Contents
// ============================================================

// Leaf and clip-node content codes. Always negative, so a clip node child
// can hold either a node index or one of these.
pub const CONTENTS_EMPTY: i32 = -1;
pub const CONTENTS_SOLID: i32 = -2;
pub const CONTENTS_WATER: i32 = -3;
pub const CONTENTS_SLIME: i32 = -4;
pub const CONTENTS_LAVA: i32 = -5;
pub const CONTENTS_SKY: i32 = -6;
pub const CONTENTS_ORIGIN: i32 = -7; // removed at csg time
pub const CONTENTS_CLIP: i32 = -8; // changed to contents_solid

pub const CONTENTS_CURRENT_0: i32 = -9;
pub const CONTENTS_CURRENT_90: i32 = -10;
pub const CONTENTS_CURRENT_180: i32 = -11;
pub const CONTENTS_CURRENT_270: i32 = -12;
pub const CONTENTS_CURRENT_UP: i32 = -13;
pub const CONTENTS_CURRENT_DOWN: i32 = -14;

/// True for the six water-current variants.
pub fn contents_is_current(contents: i32) -> bool {
    contents <= CONTENTS_CURRENT_0 && contents >= CONTENTS_CURRENT_DOWN
}

// ============================================================
// Plane
// ============================================================

// 0-2 are axial planes
pub const PLANE_X: u8 = 0;
pub const PLANE_Y: u8 = 1;
pub const PLANE_Z: u8 = 2;

// 3-5 are non-axial planes snapped to the nearest
pub const PLANE_ANYX: u8 = 3;
pub const PLANE_ANYY: u8 = 4;
pub const PLANE_ANYZ: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8, // for fast side tests
    pub signbits: u8,   // signx + (signy<<1) + (signz<<2)
}

impl Default for CPlane {
    fn default() -> Self {
        Self {
            normal: [0.0; 3],
            dist: 0.0,
            plane_type: 0,
            signbits: 0,
        }
    }
}

impl CPlane {
    /// Builds a plane and derives its type and sign bits from the normal.
    pub fn new(normal: Vec3, dist: f32) -> Self {
        Self {
            normal,
            dist,
            plane_type: plane_type_for_normal(&normal),
            signbits: signbits_for_normal(&normal),
        }
    }

    /// An axial plane facing +X, +Y or +Z.
    pub fn axial(axis: usize, dist: f32) -> Self {
        let mut normal = [0.0; 3];
        normal[axis] = 1.0;
        Self::new(normal, dist)
    }

    /// The same plane seen from the other side.
    pub fn flipped(&self) -> Self {
        Self::new(vector_negate(&self.normal), -self.dist)
    }

    /// Checks that the tags agree with the normal.
    pub fn validate(&self) -> QResult<()> {
        if self.signbits > 7 || self.signbits != signbits_for_normal(&self.normal) {
            return Err(QError::corrupt(format!(
                "plane signbits {} do not match normal {:?}",
                self.signbits, self.normal
            )));
        }
        if self.plane_type < 3 {
            let t = self.plane_type as usize;
            for i in 0..3 {
                let expect = if i == t { 1.0 } else { 0.0 };
                if self.normal[i] != expect {
                    return Err(QError::corrupt(format!(
                        "axial plane type {} with normal {:?}",
                        self.plane_type, self.normal
                    )));
                }
            }
        }
        Ok(())
    }

    /// Signed distance of `p` from the plane.
    ///
    /// General planes are evaluated in double precision and rounded back,
    /// which keeps thin walls tight at large coordinates.
    #[inline]
    pub fn distance(&self, p: &Vec3) -> f32 {
        if self.plane_type < 3 {
            p[self.plane_type as usize] - self.dist
        } else {
            (double_dot_product(&self.normal, p) - self.dist as f64) as f32
        }
    }
}

pub fn plane_type_for_normal(normal: &Vec3) -> u8 {
    // NOTE: should these have an epsilon around 1.0?
    if normal[0] == 1.0 {
        return PLANE_X;
    }
    if normal[1] == 1.0 {
        return PLANE_Y;
    }
    if normal[2] == 1.0 {
        return PLANE_Z;
    }

    let ax = normal[0].abs();
    let ay = normal[1].abs();
    let az = normal[2].abs();

    if ax >= ay && ax >= az {
        PLANE_ANYX
    } else if ay >= ax && ay >= az {
        PLANE_ANYY
    } else {
        PLANE_ANYZ
    }
}

pub fn signbits_for_normal(normal: &Vec3) -> u8 {
    let mut bits = 0u8;
    for j in 0..3 {
        if normal[j] < 0.0 {
            bits |= 1 << j;
        }
    }
    bits
}

// For each signbits value, which of [mins, maxs] supplies each coordinate of
// the corner that projects furthest along the normal. The nearest corner is
// the opposite pick on every axis.
const FAR_CORNER: [[usize; 3]; 8] = [
    [1, 1, 1],
    [0, 1, 1],
    [1, 0, 1],
    [0, 0, 1],
    [1, 1, 0],
    [0, 1, 0],
    [1, 0, 0],
    [0, 0, 0],
];

/// Returns 1 (front), 2 (back), or 3 (crossing) for a box vs. plane test.
pub fn box_on_plane_side(emins: &Vec3, emaxs: &Vec3, p: &CPlane) -> QResult<i32> {
    // fast axial cases
    if p.plane_type < 3 {
        let t = p.plane_type as usize;
        if p.dist <= emins[t] {
            return Ok(1);
        }
        if p.dist >= emaxs[t] {
            return Ok(2);
        }
        return Ok(3);
    }

    // general case
    let corner = match FAR_CORNER.get(p.signbits as usize) {
        Some(c) => c,
        None => {
            return Err(QError::corrupt(format!(
                "BoxOnPlaneSide: bad signbits {}",
                p.signbits
            )))
        }
    };
    let bounds = [emins, emaxs];

    let mut dist1 = 0.0;
    let mut dist2 = 0.0;
    for i in 0..3 {
        dist1 += p.normal[i] * bounds[corner[i]][i];
        dist2 += p.normal[i] * bounds[corner[i] ^ 1][i];
    }

    let mut sides = 0;
    if dist1 >= p.dist {
        sides = 1;
    }
    if dist2 < p.dist {
        sides |= 2;
    }
    Ok(sides)
}

// ============================================================
// Trace
// ============================================================

#[derive(Debug, Clone)]
pub struct Trace {
    pub allsolid: bool,   // if true, plane is not valid
    pub startsolid: bool, // if true, the initial point was in a solid area
    pub inopen: bool,
    pub inwater: bool,
    pub fraction: f32, // time completed, 1.0 = didn't hit anything
    pub endpos: Vec3,  // final position
    pub plane: CPlane, // surface normal at impact
    pub ent_index: i32, // entity the surface is on, -1 = none
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            inopen: false,
            inwater: false,
            fraction: 1.0,
            endpos: [0.0; 3],
            plane: CPlane::default(),
            ent_index: -1,
        }
    }
}

impl Trace {
    /// A trace ready to be handed to the hull tracer for a sweep ending at
    /// `end`: nothing hit yet, and solid until some part of the sweep is
    /// proven open.
    pub fn for_sweep(end: &Vec3) -> Self {
        Self {
            allsolid: true,
            endpos: *end,
            ..Default::default()
        }
    }
}

// ============================================================
// MATHLIB -- Vector operations
// ============================================================

#[inline]
pub fn double_dot_product(a: &Vec3, b: &Vec3) -> f64 {
    a[0] as f64 * b[0] as f64 + a[1] as f64 * b[1] as f64 + a[2] as f64 * b[2] as f64
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_negate(v: &Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

/// Point `frac` of the way from `p1` to `p2`.
#[inline]
pub fn vector_lerp(p1: &Vec3, p2: &Vec3, frac: f32) -> Vec3 {
    [
        p1[0] + frac * (p2[0] - p1[0]),
        p1[1] + frac * (p2[1] - p1[1]),
        p1[2] + frac * (p2[2] - p1[2]),
    ]
}

/// True if two boxes overlap or touch.
#[inline]
pub fn boxes_touch(mins1: &Vec3, maxs1: &Vec3, mins2: &Vec3, maxs2: &Vec3) -> bool {
    !(mins1[0] > maxs2[0]
        || mins1[1] > maxs2[1]
        || mins1[2] > maxs2[2]
        || maxs1[0] < mins2[0]
        || maxs1[1] < mins2[1]
        || maxs1[2] < mins2[2])
}
