// sv_move.rs -- monster movement support

use myq1_common::error::QResult;
use myq1_common::q_shared::{vector_add, Vec3, CONTENTS_SOLID, VEC3_ORIGIN};

use crate::server::{Edict, MOVE_NOMONSTERS};
use crate::sv_world::SvWorldContext;

pub const STEPSIZE: f32 = 18.0;

impl SvWorldContext {
    // ============================================================
    // SV_CheckBottom
    //
    // Returns false if any part of the bottom of the entity is off
    // an edge that is not a staircase.
    // ============================================================
    pub fn check_bottom(&mut self, edicts: &[Edict], ent_idx: usize) -> QResult<bool> {
        let ent = &edicts[ent_idx];
        let mins = vector_add(&ent.origin, &ent.mins);
        let maxs = vector_add(&ent.origin, &ent.maxs);

        // if all of the points under the corners are solid world, don't bother
        // with the tougher checks
        let mut start = [0.0_f32; 3];
        start[2] = mins[2] - 1.0;

        for x in 0..=1 {
            for y in 0..=1 {
                start[0] = if x != 0 { maxs[0] } else { mins[0] };
                start[1] = if y != 0 { maxs[1] } else { mins[1] };
                if self.point_contents(&start)? != CONTENTS_SOLID {
                    self.c_no += 1;
                    return self.expensive_check_bottom(edicts, ent_idx, &mins, &maxs);
                }
            }
        }

        self.c_yes += 1;
        Ok(true) // we got out easy
    }

    /// Traces down from the middle and the four corners of the box; the
    /// corners must all land within a step of the middle.
    pub fn expensive_check_bottom(
        &mut self,
        edicts: &[Edict],
        ent_idx: usize,
        mins: &Vec3,
        maxs: &Vec3,
    ) -> QResult<bool> {
        // the midpoint must be within 16 of the bottom
        let mut start = [(mins[0] + maxs[0]) * 0.5, (mins[1] + maxs[1]) * 0.5, mins[2]];
        let mut stop = [start[0], start[1], start[2] - 2.0 * STEPSIZE];
        let trace = self.sv_move(
            &start,
            &VEC3_ORIGIN,
            &VEC3_ORIGIN,
            &stop,
            MOVE_NOMONSTERS,
            Some(ent_idx),
            edicts,
        )?;

        if trace.fraction == 1.0 {
            return Ok(false);
        }
        let mid = trace.endpos[2];
        let mut bottom = mid;

        // the corners must be within 16 of the midpoint
        for x in 0..=1 {
            for y in 0..=1 {
                start[0] = if x != 0 { maxs[0] } else { mins[0] };
                start[1] = if y != 0 { maxs[1] } else { mins[1] };
                stop[0] = start[0];
                stop[1] = start[1];

                let trace = self.sv_move(
                    &start,
                    &VEC3_ORIGIN,
                    &VEC3_ORIGIN,
                    &stop,
                    MOVE_NOMONSTERS,
                    Some(ent_idx),
                    edicts,
                )?;

                if trace.fraction != 1.0 && trace.endpos[2] > bottom {
                    bottom = trace.endpos[2];
                }
                if trace.fraction == 1.0 || mid - trace.endpos[2] > STEPSIZE {
                    return Ok(false);
                }
            }
        }

        self.c_yes += 1;
        Ok(true)
    }
}
