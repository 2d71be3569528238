// sv_world.rs -- world query functions
//
// Entity area checking: spatial partitioning via area nodes,
// linking/unlinking entities, trigger touching, point contents, and moves.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use myq1_common::cmodel::Hull;
use myq1_common::common::{com_dprintf, fatal};
use myq1_common::cvar::cvar_init;
use myq1_common::error::{QError, QResult};
use myq1_common::model::{ModType, Model, NodeRef};
use myq1_common::q_shared::*;

use crate::server::*;

// ===============================================================================
// ENTITY AREA CHECKING
// ===============================================================================

const AREA_DEPTH: i32 = 4;
const AREA_NODES: usize = 32;

// ============================================================
// Area node (spatial partitioning BSP for entities)
// ============================================================

#[derive(Debug, Clone)]
pub struct AreaNode {
    pub axis: i32, // -1 = leaf node
    pub dist: f32,
    pub children: [usize; 2],       // indices into SvWorldContext::areanodes
    pub trigger_edicts: Vec<usize>, // edict indices
    pub solid_edicts: Vec<usize>,   // edict indices
}

impl Default for AreaNode {
    fn default() -> Self {
        Self {
            axis: -1,
            dist: 0.0,
            children: [usize::MAX; 2],
            trigger_edicts: Vec::new(),
            solid_edicts: Vec::new(),
        }
    }
}

impl AreaNode {
    /// The split axis, or `None` for a terminal node.
    fn split_axis(&self) -> QResult<Option<usize>> {
        match self.axis {
            -1 => Ok(None),
            0 | 1 => Ok(Some(self.axis as usize)),
            axis => Err(fatal(QError::corrupt(format!("SV_AreaNode: bad axis {}", axis)))),
        }
    }
}

// ============================================================
// Progs interface
// ============================================================

/// The progs globals the world code sets around a touch call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgGlobals {
    pub self_ent: i32,
    pub other: i32,
    pub time: f32,
}

/// Runs game code on behalf of the world. The callee may link, unlink and
/// modify entities through the arguments it is handed.
pub trait ProgsExecutor {
    fn globals(&mut self) -> &mut ProgGlobals;
    fn execute_program(
        &mut self,
        fnum: i32,
        world: &mut SvWorldContext,
        edicts: &mut [Edict],
    ) -> QResult<()>;
}

// ============================================================
// MoveClip -- internal trace structure
// ============================================================

struct MoveClip {
    boxmins: Vec3, // enclose the test object along entire move
    boxmaxs: Vec3,
    mins: Vec3, // size of the moving object
    maxs: Vec3,
    mins2: Vec3, // size when clipping against monsters
    maxs2: Vec3,
    start: Vec3,
    end: Vec3,
    trace: Trace,
    move_type: i32,
    passedict: Option<usize>,
}

impl Default for MoveClip {
    fn default() -> Self {
        Self {
            boxmins: [0.0; 3],
            boxmaxs: [0.0; 3],
            mins: [0.0; 3],
            maxs: [0.0; 3],
            mins2: [0.0; 3],
            maxs2: [0.0; 3],
            start: [0.0; 3],
            end: [0.0; 3],
            trace: Trace::default(),
            move_type: MOVE_NORMAL,
            passedict: None,
        }
    }
}

// ============================================================
// SvWorldContext
// ============================================================

pub struct SvWorldContext {
    pub areanodes: Vec<AreaNode>,
    pub numareanodes: usize,
    /// edict -> (area node, AREA_SOLID or AREA_TRIGGERS)
    links: HashMap<usize, (usize, i32)>,

    /// sv.models; index 1 is the world, 0 is unused
    pub models: Vec<Option<Arc<Model>>>,
    pub time: f32,

    // check_bottom statistics
    pub c_yes: i32,
    pub c_no: i32,
}

impl Default for SvWorldContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SvWorldContext {
    pub fn new() -> Self {
        cvar_init();
        Self {
            areanodes: Vec::new(),
            numareanodes: 0,
            links: HashMap::new(),
            models: Vec::new(),
            time: 0.0,
            c_yes: 0,
            c_no: 0,
        }
    }

    /// Sets up entity 0 as the world, the way the server spawns it.
    pub fn init_world_edict(ent: &mut Edict) {
        ent.inuse = true;
        ent.modelindex = 1;
        ent.solid = Solid::Bsp;
        ent.movetype = MoveType::Push;
    }

    pub fn world_model(&self) -> QResult<&Arc<Model>> {
        self.models
            .get(1)
            .and_then(|m| m.as_ref())
            .ok_or_else(|| fatal(QError::invariant("no world model loaded")))
    }

    /// The area node and list an entity is currently linked into.
    pub fn area_link(&self, ent_idx: usize) -> Option<(usize, i32)> {
        self.links.get(&ent_idx).copied()
    }

    pub fn is_linked(&self, ent_idx: usize) -> bool {
        self.links.contains_key(&ent_idx)
    }

    // ================================================================
    // SV_CreateAreaNode
    //
    // Builds a uniformly subdivided tree for the given world size.
    // Returns the index of the created node.
    // ================================================================
    fn create_area_node(&mut self, depth: i32, mins: &Vec3, maxs: &Vec3) -> usize {
        let anode_idx = self.numareanodes;
        self.numareanodes += 1;

        if anode_idx >= self.areanodes.len() {
            self.areanodes.push(AreaNode::default());
        } else {
            self.areanodes[anode_idx] = AreaNode::default();
        }

        if depth == AREA_DEPTH {
            return anode_idx;
        }

        let size = vector_subtract(maxs, mins);
        let axis = if size[0] > size[1] { 0 } else { 1 };
        let dist = 0.5 * (maxs[axis] + mins[axis]);
        self.areanodes[anode_idx].axis = axis as i32;
        self.areanodes[anode_idx].dist = dist;

        let mins1 = *mins;
        let mut mins2 = *mins;
        let mut maxs1 = *maxs;
        let maxs2 = *maxs;

        maxs1[axis] = dist;
        mins2[axis] = dist;

        let child0 = self.create_area_node(depth + 1, &mins2, &maxs2);
        let child1 = self.create_area_node(depth + 1, &mins1, &maxs1);

        self.areanodes[anode_idx].children = [child0, child1];

        anode_idx
    }

    // ================================================================
    // SV_ClearWorld
    // ================================================================
    pub fn clear_world(&mut self, models: Vec<Option<Arc<Model>>>) -> QResult<()> {
        self.models = models;
        let world = Arc::clone(self.world_model()?);

        self.areanodes.clear();
        self.areanodes.resize(AREA_NODES, AreaNode::default());
        self.numareanodes = 0;
        self.links.clear();
        self.create_area_node(0, &world.mins, &world.maxs);
        Ok(())
    }

    // ================================================================
    // SV_UnlinkEdict
    // ================================================================
    pub fn unlink_edict(&mut self, ent_idx: usize) {
        let Some((node_idx, list)) = self.links.remove(&ent_idx) else {
            return; // not linked in anywhere
        };

        if let Some(node) = self.areanodes.get_mut(node_idx) {
            if list == AREA_TRIGGERS {
                node.trigger_edicts.retain(|&e| e != ent_idx);
            } else {
                node.solid_edicts.retain(|&e| e != ent_idx);
            }
        }
    }

    // ================================================================
    // SV_FindTouchedLeafs
    // ================================================================
    fn find_touched_leafs(world: &Model, ent: &mut Edict, node: NodeRef) -> QResult<()> {
        match node {
            NodeRef::Leaf(leafnum) => {
                let leaf = world.leafs.get(leafnum).ok_or_else(|| {
                    fatal(QError::corrupt(format!("SV_FindTouchedLeafs: bad leaf {}", leafnum)))
                })?;
                if leaf.contents == CONTENTS_SOLID {
                    return Ok(());
                }
                if ent.num_leafs == MAX_ENT_LEAFS {
                    return Ok(());
                }
                // leaf 0 is the shared solid leaf, so it is never recorded
                ent.leafnums[ent.num_leafs] = leafnum as i32 - 1;
                ent.num_leafs += 1;
                Ok(())
            }
            NodeRef::Node(n) => {
                let mnode = world.nodes.get(n).ok_or_else(|| {
                    fatal(QError::corrupt(format!("SV_FindTouchedLeafs: bad node {}", n)))
                })?;
                let plane = world.planes.get(mnode.plane).ok_or_else(|| {
                    fatal(QError::corrupt(format!("SV_FindTouchedLeafs: bad plane {}", mnode.plane)))
                })?;
                let sides = box_on_plane_side(&ent.absmin, &ent.absmax, plane).map_err(fatal)?;

                // recurse down the contacted sides
                if sides & 1 != 0 {
                    Self::find_touched_leafs(world, ent, mnode.children[0])?;
                }
                if sides & 2 != 0 {
                    Self::find_touched_leafs(world, ent, mnode.children[1])?;
                }
                Ok(())
            }
        }
    }

    // ================================================================
    // SV_LinkEdict
    // ================================================================
    pub fn link_edict(
        &mut self,
        edicts: &mut [Edict],
        ent_idx: usize,
        touch_triggers: bool,
        progs: &mut dyn ProgsExecutor,
    ) -> QResult<()> {
        self.unlink_edict(ent_idx); // unlink from old position

        if ent_idx == 0 {
            return Ok(()); // don't add the world
        }
        if !edicts[ent_idx].inuse {
            return Ok(());
        }
        if self.numareanodes == 0 {
            return Err(fatal(QError::invariant("SV_LinkEdict: world not cleared")));
        }

        let world = self.world_model()?;
        let ent = &mut edicts[ent_idx];

        // set the abs box
        ent.absmin = vector_add(&ent.origin, &ent.mins);
        ent.absmax = vector_add(&ent.origin, &ent.maxs);

        if ent.flags.contains(FL_ITEM) {
            // to make items easier to pick up and allow them to be grabbed
            // off of shelves, the abs sizes are expanded
            for i in 0..2 {
                ent.absmin[i] -= 15.0;
                ent.absmax[i] += 15.0;
            }
        } else {
            // because movement is clipped an epsilon away from an actual edge,
            // we must fully check even when bounding boxes don't quite touch
            for i in 0..3 {
                ent.absmin[i] -= 1.0;
                ent.absmax[i] += 1.0;
            }
        }

        // link to PVS leafs
        ent.num_leafs = 0;
        if ent.modelindex != 0 {
            Self::find_touched_leafs(world, ent, NodeRef::Node(world.firstnode))?;
        }

        if ent.solid == Solid::Not {
            return Ok(());
        }

        let absmin = ent.absmin;
        let absmax = ent.absmax;
        let list = if ent.solid == Solid::Trigger { AREA_TRIGGERS } else { AREA_SOLID };

        // find the first node that the ent's box crosses
        let mut node_idx = 0;
        while let Some(axis) = self.areanodes[node_idx].split_axis()? {
            let node = &self.areanodes[node_idx];
            if absmin[axis] > node.dist {
                node_idx = node.children[0];
            } else if absmax[axis] < node.dist {
                node_idx = node.children[1];
            } else {
                break; // crosses the node
            }
        }

        // link it in
        let node = &mut self.areanodes[node_idx];
        if list == AREA_TRIGGERS {
            node.trigger_edicts.push(ent_idx);
        } else {
            node.solid_edicts.push(ent_idx);
        }
        self.links.insert(ent_idx, (node_idx, list));

        // if touch_triggers, touch all entities at this node and descend for more
        if touch_triggers {
            self.touch_links(edicts, ent_idx, progs)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_TouchLinks
    //
    // The candidates are gathered first; a touch function may relink or
    // remove anything, so each one is checked again just before the call.
    // ================================================================
    fn touch_links(
        &mut self,
        edicts: &mut [Edict],
        ent_idx: usize,
        progs: &mut dyn ProgsExecutor,
    ) -> QResult<()> {
        let absmin = edicts[ent_idx].absmin;
        let absmax = edicts[ent_idx].absmax;
        let touched = self.area_edicts(&absmin, &absmax, edicts, AREA_TRIGGERS)?;

        for touch_idx in touched {
            if touch_idx == ent_idx {
                continue;
            }
            let ent = &edicts[ent_idx];
            let touch = &edicts[touch_idx];
            if !touch.inuse || touch.touch == 0 || touch.solid != Solid::Trigger {
                continue;
            }
            if !boxes_touch(&ent.absmin, &ent.absmax, &touch.absmin, &touch.absmax) {
                continue;
            }
            let fnum = touch.touch;

            let globals = progs.globals();
            let old_self = globals.self_ent;
            let old_other = globals.other;
            globals.self_ent = touch_idx as i32;
            globals.other = ent_idx as i32;
            globals.time = self.time;

            let result = progs.execute_program(fnum, self, edicts);

            let globals = progs.globals();
            globals.self_ent = old_self;
            globals.other = old_other;
            result?;
        }
        Ok(())
    }

    // ================================================================
    // SV_AreaEdicts_r
    // ================================================================
    fn area_edicts_r(
        &self,
        node_idx: usize,
        edicts: &[Edict],
        area_mins: &Vec3,
        area_maxs: &Vec3,
        area_type: i32,
        area_list: &mut Vec<usize>,
    ) -> QResult<()> {
        let node = &self.areanodes[node_idx];

        // touch linked edicts
        let start = if area_type == AREA_SOLID {
            &node.solid_edicts
        } else {
            &node.trigger_edicts
        };

        for &check_idx in start.iter() {
            let check = &edicts[check_idx];
            if check.solid == Solid::Not {
                continue; // deactivated
            }
            if !boxes_touch(&check.absmin, &check.absmax, area_mins, area_maxs) {
                continue; // not touching
            }
            area_list.push(check_idx);
        }

        let Some(axis) = node.split_axis()? else {
            return Ok(()); // terminal node
        };

        // recurse down both sides
        if area_maxs[axis] > node.dist {
            self.area_edicts_r(node.children[0], edicts, area_mins, area_maxs, area_type, area_list)?;
        }
        if area_mins[axis] < node.dist {
            self.area_edicts_r(node.children[1], edicts, area_mins, area_maxs, area_type, area_list)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_AreaEdicts
    //
    // Solid (AREA_SOLID) or trigger (AREA_TRIGGERS) entities whose
    // bounds touch mins/maxs.
    // ================================================================
    pub fn area_edicts(
        &self,
        mins: &Vec3,
        maxs: &Vec3,
        edicts: &[Edict],
        area_type: i32,
    ) -> QResult<Vec<usize>> {
        let mut list = Vec::new();
        if self.numareanodes > 0 {
            self.area_edicts_r(0, edicts, mins, maxs, area_type, &mut list)?;
        }
        Ok(list)
    }

    // ================================================================
    // POINT TESTING IN HULLS
    // ================================================================

    /// Contents of the world at `p`, with currents reported as water.
    pub fn point_contents(&self, p: &Vec3) -> QResult<i32> {
        let cont = self.true_point_contents(p)?;
        if contents_is_current(cont) {
            return Ok(CONTENTS_WATER);
        }
        Ok(cont)
    }

    pub fn true_point_contents(&self, p: &Vec3) -> QResult<i32> {
        let hull = &self.world_model()?.hulls[0];
        hull.point_contents(hull.firstclipnode, p).map_err(fatal)
    }

    // ================================================================
    // SV_TestEntityPosition
    //
    // A small wrapper around sv_move to allow the entity to pass through
    // itself.
    // ================================================================
    pub fn test_entity_position(&self, edicts: &[Edict], ent_idx: usize) -> QResult<bool> {
        let ent = &edicts[ent_idx];
        let trace = self.sv_move(
            &ent.origin,
            &ent.mins,
            &ent.maxs,
            &ent.origin,
            MOVE_NORMAL,
            Some(ent_idx),
            edicts,
        )?;
        Ok(trace.startsolid)
    }

    // ================================================================
    // SV_HullForEntity
    //
    // Returns a hull that can be used for testing or clipping an object
    // of mins/maxs size, and the offset of the hull origin in the world.
    // ================================================================
    pub fn hull_for_entity<'a>(
        &'a self,
        ent: &Edict,
        mins: &Vec3,
        maxs: &Vec3,
    ) -> QResult<(Cow<'a, Hull>, Vec3)> {
        // decide which clipping hull to use, based on the size
        if ent.solid == Solid::Bsp {
            // explicit hulls in the BSP model
            if ent.movetype != MoveType::Push {
                return Err(fatal(QError::invariant("SOLID_BSP without MOVETYPE_PUSH")));
            }

            let model = usize::try_from(ent.modelindex)
                .ok()
                .and_then(|i| self.models.get(i))
                .and_then(|m| m.as_ref())
                .filter(|m| m.mod_type == ModType::Brush)
                .ok_or_else(|| fatal(QError::corrupt("MOVETYPE_PUSH with a non bsp model")))?;

            let size = vector_subtract(maxs, mins);
            let hull = if size[0] < 3.0 {
                &model.hulls[0]
            } else if size[0] <= 32.0 {
                &model.hulls[1]
            } else {
                &model.hulls[2]
            };

            // calculate an offset value to center the origin
            let offset = vector_add(&vector_subtract(&hull.clip_mins, mins), &ent.origin);
            return Ok((Cow::Borrowed(hull), offset));
        }

        // create a temp hull from bounding box sizes
        let hullmins = vector_subtract(&ent.mins, maxs);
        let hullmaxs = vector_subtract(&ent.maxs, mins);
        Ok((Cow::Owned(Hull::for_box(&hullmins, &hullmaxs)), ent.origin))
    }

    // ================================================================
    // SV_ClipMoveToEntity
    //
    // Handles selection or creation of a clipping hull, and offsetting
    // (and eventually rotation) of the end points.
    // ================================================================
    pub fn clip_move_to_entity(
        &self,
        edicts: &[Edict],
        ent_idx: usize,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
    ) -> QResult<Trace> {
        let ent = &edicts[ent_idx];

        // fill in a default trace
        let mut trace = Trace::for_sweep(end);

        // get the clipping hull
        let (hull, offset) = self.hull_for_entity(ent, mins, maxs)?;

        let start_l = vector_subtract(start, &offset);
        let end_l = vector_subtract(end, &offset);

        // trace a line through the apropriate clipping hull
        hull.recursive_check(hull.firstclipnode, 0.0, 1.0, &start_l, &end_l, &mut trace)
            .map_err(fatal)?;

        // fix trace up by the offset
        if trace.fraction != 1.0 {
            trace.endpos = vector_add(&trace.endpos, &offset);
        }

        // did we clip the move?
        if trace.fraction < 1.0 || trace.startsolid {
            trace.ent_index = ent_idx as i32;
        }

        Ok(trace)
    }

    // ================================================================
    // SV_ClipToLinks
    //
    // Mins and maxs enclose the entire area swept by the move.
    // ================================================================
    fn clip_to_links(&self, node_idx: usize, clip: &mut MoveClip, edicts: &[Edict]) -> QResult<()> {
        let node = &self.areanodes[node_idx];

        // touch linked edicts
        for &touch_idx in node.solid_edicts.iter() {
            let touch = &edicts[touch_idx];

            if touch.solid == Solid::Not {
                continue;
            }
            if Some(touch_idx) == clip.passedict {
                continue;
            }
            if touch.solid == Solid::Trigger {
                return Err(fatal(QError::invariant("Trigger in clipping list")));
            }
            if clip.move_type == MOVE_NOMONSTERS && touch.solid != Solid::Bsp {
                continue;
            }
            if !boxes_touch(&clip.boxmins, &clip.boxmaxs, &touch.absmin, &touch.absmax) {
                continue;
            }

            if let Some(pass) = clip.passedict {
                if edicts[pass].size[0] != 0.0 && touch.size[0] == 0.0 {
                    continue; // points never interact
                }
            }

            // might intersect, so do an exact clip
            if clip.trace.allsolid {
                return Ok(());
            }
            if let Some(pass) = clip.passedict {
                if touch.owner_index == pass as i32 {
                    continue; // don't clip against own missiles
                }
                if edicts[pass].owner_index == touch_idx as i32 {
                    continue; // don't clip against owner
                }
            }

            let trace = if touch.flags.contains(FL_MONSTER) {
                self.clip_move_to_entity(edicts, touch_idx, &clip.start, &clip.mins2, &clip.maxs2, &clip.end)?
            } else {
                self.clip_move_to_entity(edicts, touch_idx, &clip.start, &clip.mins, &clip.maxs, &clip.end)?
            };

            if trace.allsolid || trace.startsolid || trace.fraction < clip.trace.fraction {
                let startsolid = clip.trace.startsolid;
                clip.trace = trace;
                clip.trace.ent_index = touch_idx as i32;
                if startsolid {
                    clip.trace.startsolid = true;
                }
            } else if trace.startsolid {
                clip.trace.startsolid = true;
            }
        }

        let Some(axis) = node.split_axis()? else {
            return Ok(()); // terminal node
        };

        // recurse down both sides
        if clip.boxmaxs[axis] > node.dist {
            self.clip_to_links(node.children[0], clip, edicts)?;
        }
        if clip.boxmins[axis] < node.dist {
            self.clip_to_links(node.children[1], clip, edicts)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_MoveBounds
    // ================================================================
    fn move_bounds(start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> (Vec3, Vec3) {
        let mut boxmins = [0.0; 3];
        let mut boxmaxs = [0.0; 3];
        for i in 0..3 {
            if end[i] > start[i] {
                boxmins[i] = start[i] + mins[i] - 1.0;
                boxmaxs[i] = end[i] + maxs[i] + 1.0;
            } else {
                boxmins[i] = end[i] + mins[i] - 1.0;
                boxmaxs[i] = start[i] + maxs[i] + 1.0;
            }
        }
        (boxmins, boxmaxs)
    }

    // ================================================================
    // SV_Move
    //
    // Moves the given mins/maxs volume through the world from start to end.
    // Passedict and edicts owned by passedict are explicitly not checked.
    // ================================================================
    pub fn sv_move(
        &self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        move_type: i32,
        passedict: Option<usize>,
        edicts: &[Edict],
    ) -> QResult<Trace> {
        let mut clip = MoveClip::default();

        // clip to world
        clip.trace = self.clip_move_to_entity(edicts, 0, start, mins, maxs, end)?;

        clip.start = *start;
        clip.end = *end;
        clip.mins = *mins;
        clip.maxs = *maxs;
        clip.move_type = move_type;
        clip.passedict = passedict;

        if move_type == MOVE_MISSILE {
            clip.mins2 = [-15.0; 3];
            clip.maxs2 = [15.0; 3];
        } else {
            clip.mins2 = *mins;
            clip.maxs2 = *maxs;
        }

        // create the bounding box of the entire move
        let (boxmins, boxmaxs) = Self::move_bounds(start, &clip.mins2, &clip.maxs2, end);
        clip.boxmins = boxmins;
        clip.boxmaxs = boxmaxs;

        // clip to entities
        if self.numareanodes > 0 {
            self.clip_to_links(0, &mut clip, edicts)?;
        } else {
            com_dprintf("SV_Move: world has no area nodes\n");
        }

        Ok(clip.trace)
    }
}
