// pvs.rs -- potentially visible set decoding and merging

use crate::common::LOG_TARGET;
use crate::error::{QError, QResult};
use crate::model::{Model, NodeRef};
use crate::q_shared::{Vec3, CONTENTS_SOLID};

/// Leafs within this distance of a point contribute to its fat PVS.
pub const FATPVS_RADIUS: f32 = 8.0;

/// Expands one run-length encoded visibility row into `out`.
///
/// `None` or an empty slice means the map has no vis data for the leaf, so
/// everything is visible. Non-zero bytes are copied; a zero byte is followed
/// by a count of zero bytes to emit. Decoding stops after `row` bytes or when
/// the input runs out. Returns the number of bytes decoded; anything short of
/// `row` is zeroed.
pub fn decompress_vis(compressed: Option<&[u8]>, row: usize, out: &mut [u8]) -> usize {
    let row = row.min(out.len());

    let input = match compressed {
        Some(input) if !input.is_empty() => input,
        _ => {
            // no vis info, so make all visible
            out[..row].fill(0xff);
            return row;
        }
    };

    let mut out_p = 0;
    let mut inp = 0;
    while out_p < row {
        if inp >= input.len() {
            log::warn!(target: LOG_TARGET, "Vis decompression truncated");
            break;
        }
        if input[inp] != 0 {
            out[out_p] = input[inp];
            out_p += 1;
            inp += 1;
            continue;
        }

        if inp + 1 >= input.len() {
            log::warn!(target: LOG_TARGET, "Vis decompression truncated");
            break;
        }
        let mut c = input[inp + 1] as usize;
        inp += 2;
        if out_p + c > row {
            c = row - out_p;
            log::warn!(target: LOG_TARGET, "Vis decompression overrun");
        }
        out[out_p..out_p + c].fill(0);
        out_p += c;
    }

    out[out_p..row].fill(0);
    out_p
}

impl Model {
    /// Bytes in one decoded visibility row.
    pub fn vis_row_bytes(&self) -> usize {
        (self.numleafs + 7) >> 3
    }

    /// Bytes in a fat PVS buffer, rounded up to whole words.
    pub fn fat_pvs_bytes(&self) -> usize {
        (self.numleafs + 31) >> 3
    }

    /// Decodes the PVS of `leaf` into `out`, which must hold at least
    /// `vis_row_bytes()` bytes. The solid leaf 0 sees everything.
    pub fn leaf_pvs_into(&self, leaf: usize, out: &mut [u8]) -> QResult<()> {
        let row = self.vis_row_bytes();
        if leaf == 0 {
            let n = row.min(out.len());
            out[..n].fill(0xff);
            return Ok(());
        }
        let mleaf = self
            .leafs
            .get(leaf)
            .ok_or_else(|| QError::corrupt(format!("Mod_LeafPVS: {} has no leaf {}", self.name, leaf)))?;
        let compressed = mleaf.vis_offset.and_then(|ofs| self.visdata.get(ofs..));
        decompress_vis(compressed, row, out);
        Ok(())
    }

    pub fn leaf_pvs(&self, leaf: usize) -> QResult<Vec<u8>> {
        let mut out = vec![0u8; self.vis_row_bytes()];
        self.leaf_pvs_into(leaf, &mut out)?;
        Ok(out)
    }

    /// Union of the PVS of every non-solid leaf within `FATPVS_RADIUS` of
    /// `org`, written to `out` (at least `fat_pvs_bytes()` long).
    pub fn fat_pvs_into(&self, org: &Vec3, out: &mut [u8]) -> QResult<()> {
        let fatbytes = self.fat_pvs_bytes().min(out.len());
        out[..fatbytes].fill(0);
        if self.nodes.is_empty() {
            return Ok(());
        }
        let mut scratch = vec![0u8; self.vis_row_bytes()];
        self.add_to_fat_pvs(org, NodeRef::Node(self.firstnode), &mut out[..fatbytes], &mut scratch)
    }

    pub fn fat_pvs(&self, org: &Vec3) -> QResult<Vec<u8>> {
        let mut out = vec![0u8; self.fat_pvs_bytes()];
        self.fat_pvs_into(org, &mut out)?;
        Ok(out)
    }

    fn add_to_fat_pvs(&self, org: &Vec3, mut node: NodeRef, fat: &mut [u8], scratch: &mut [u8]) -> QResult<()> {
        loop {
            match node {
                NodeRef::Leaf(l) => {
                    let contents = self
                        .leafs
                        .get(l)
                        .ok_or_else(|| QError::corrupt(format!("SV_AddToFatPVS: {} has no leaf {}", self.name, l)))?
                        .contents;
                    if contents != CONTENTS_SOLID {
                        self.leaf_pvs_into(l, scratch)?;
                        for (f, v) in fat.iter_mut().zip(scratch.iter()) {
                            *f |= *v;
                        }
                    }
                    return Ok(());
                }
                NodeRef::Node(n) => {
                    let mnode = self
                        .nodes
                        .get(n)
                        .ok_or_else(|| QError::corrupt(format!("SV_AddToFatPVS: {} has no node {}", self.name, n)))?;
                    let d = self.planes[mnode.plane].distance(org);
                    if d > FATPVS_RADIUS {
                        node = mnode.children[0];
                    } else if d < -FATPVS_RADIUS {
                        node = mnode.children[1];
                    } else {
                        // go down both
                        self.add_to_fat_pvs(org, mnode.children[0], fat, scratch)?;
                        node = mnode.children[1];
                    }
                }
            }
        }
    }
}
