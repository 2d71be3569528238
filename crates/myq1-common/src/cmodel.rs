// cmodel.rs -- clipping hulls: point classification and swept-point traces

use std::sync::Arc;

use crate::common::com_dprintf;
use crate::error::{QError, QResult};
use crate::q_shared::*;

/// 1/32 epsilon to keep floating point happy
pub const DIST_EPSILON: f32 = 0.03125;

/// Fraction stepped back each time a computed impact point still lands in
/// solid.
pub const BACKOFF_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipNode {
    pub planenum: usize,
    /// >= 0 is a clip node index, < 0 is a CONTENTS_* code
    pub children: [i32; 2],
}

/// A plane-partitioned solid/empty tree for one bounding box size class.
///
/// Every hull of a map (and of its submodels) shares the same clip node and
/// plane arrays; they differ only in the node range and the box size the
/// hull was expanded for.
#[derive(Debug, Clone)]
pub struct Hull {
    pub clipnodes: Arc<[ClipNode]>,
    pub planes: Arc<[CPlane]>,
    pub firstclipnode: i32,
    pub lastclipnode: i32,
    pub clip_mins: Vec3,
    pub clip_maxs: Vec3,
}

impl Default for Hull {
    fn default() -> Self {
        Self {
            clipnodes: Arc::from(Vec::new()),
            planes: Arc::from(Vec::new()),
            firstclipnode: 0,
            lastclipnode: -1,
            clip_mins: [0.0; 3],
            clip_maxs: [0.0; 3],
        }
    }
}

impl Hull {
    /// A six-plane hull that is solid inside `mins`..`maxs` and empty
    /// everywhere else, so non-BSP entities can be traced with the same
    /// code as map geometry.
    pub fn for_box(mins: &Vec3, maxs: &Vec3) -> Hull {
        let mut clipnodes = Vec::with_capacity(6);
        let mut planes = Vec::with_capacity(6);

        for i in 0..6 {
            let side = i & 1;
            let mut children = [0i32; 2];
            children[side] = CONTENTS_EMPTY;
            children[side ^ 1] = if i != 5 { i as i32 + 1 } else { CONTENTS_SOLID };
            clipnodes.push(ClipNode { planenum: i, children });

            let axis = i >> 1;
            let dist = if side == 0 { maxs[axis] } else { mins[axis] };
            planes.push(CPlane::axial(axis, dist));
        }

        Hull {
            clipnodes: Arc::from(clipnodes),
            planes: Arc::from(planes),
            firstclipnode: 0,
            lastclipnode: 5,
            clip_mins: [0.0; 3],
            clip_maxs: [0.0; 3],
        }
    }

    fn node(&self, num: i32, caller: &str) -> QResult<(&ClipNode, &CPlane)> {
        if num < self.firstclipnode || num > self.lastclipnode {
            return Err(QError::corrupt(format!("{}: bad node number {}", caller, num)));
        }
        let node = self
            .clipnodes
            .get(num as usize)
            .ok_or_else(|| QError::corrupt(format!("{}: bad node number {}", caller, num)))?;
        let plane = self
            .planes
            .get(node.planenum)
            .ok_or_else(|| QError::corrupt(format!("{}: bad plane number {}", caller, node.planenum)))?;
        Ok((node, plane))
    }

    /// Content code of the leaf containing `p`, starting the descent at
    /// node `num`. A negative `num` is already a content code.
    pub fn point_contents(&self, mut num: i32, p: &Vec3) -> QResult<i32> {
        while num >= 0 {
            let (node, plane) = self.node(num, "SV_HullPointContents")?;
            let d = plane.distance(p);
            num = if d < 0.0 { node.children[1] } else { node.children[0] };
        }
        Ok(num)
    }

    /// Sweeps a point from `p1` to `p2` through the subtree at `num`,
    /// updating `trace`. `p1f`/`p2f` are the fractions of the whole move
    /// that `p1`/`p2` correspond to.
    ///
    /// Returns `Ok(true)` if the segment got through without hitting solid,
    /// `Ok(false)` once an impact was recorded (or the move never left
    /// solid).
    pub fn recursive_check(
        &self,
        num: i32,
        p1f: f32,
        p2f: f32,
        p1: &Vec3,
        p2: &Vec3,
        trace: &mut Trace,
    ) -> QResult<bool> {
        // check for empty
        if num < 0 {
            if num != CONTENTS_SOLID {
                trace.allsolid = false;
                if num == CONTENTS_EMPTY {
                    trace.inopen = true;
                } else {
                    trace.inwater = true;
                }
            } else {
                trace.startsolid = true;
            }
            return Ok(true);
        }

        let (node, plane) = self.node(num, "SV_RecursiveHullCheck")?;

        let t1 = plane.distance(p1);
        let t2 = plane.distance(p2);

        if t1 >= 0.0 && t2 >= 0.0 {
            return self.recursive_check(node.children[0], p1f, p2f, p1, p2, trace);
        }
        if t1 < 0.0 && t2 < 0.0 {
            return self.recursive_check(node.children[1], p1f, p2f, p1, p2, trace);
        }

        // put the crosspoint DIST_EPSILON pixels on the near side
        let mut frac = if t1 < 0.0 {
            (t1 + DIST_EPSILON) / (t1 - t2)
        } else {
            (t1 - DIST_EPSILON) / (t1 - t2)
        };
        frac = frac.clamp(0.0, 1.0);

        let mut midf = p1f + (p2f - p1f) * frac;
        let mut mid = vector_lerp(p1, p2, frac);

        let side = (t1 < 0.0) as usize;

        // move up to the node
        if !self.recursive_check(node.children[side], p1f, midf, p1, &mid, trace)? {
            return Ok(false);
        }

        if self.point_contents(node.children[side ^ 1], &mid)? != CONTENTS_SOLID {
            // go past the node
            return self.recursive_check(node.children[side ^ 1], midf, p2f, &mid, p2, trace);
        }

        if trace.allsolid {
            return Ok(false); // never got out of the solid area
        }

        // the other side of the node is solid, this is the impact point
        trace.plane = if side == 0 { *plane } else { plane.flipped() };

        while self.point_contents(self.firstclipnode, &mid)? == CONTENTS_SOLID {
            // shouldn't really happen, but does occasionally
            frac -= BACKOFF_STEP;
            if frac < 0.0 {
                trace.fraction = midf;
                trace.endpos = mid;
                com_dprintf("backup past 0\n");
                return Ok(false);
            }
            midf = p1f + (p2f - p1f) * frac;
            mid = vector_lerp(p1, p2, frac);
        }

        trace.fraction = midf;
        trace.endpos = mid;
        Ok(false)
    }

    /// Traces a point from `p1` to `p2` starting at node `num` and returns
    /// the finished trace.
    pub fn check(&self, num: i32, p1f: f32, p2f: f32, p1: &Vec3, p2: &Vec3) -> QResult<Trace> {
        let mut trace = Trace::for_sweep(p2);
        self.recursive_check(num, p1f, p2f, p1, p2, &mut trace)?;
        Ok(trace)
    }
}
