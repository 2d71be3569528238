// model.rs -- in-memory brush models and the BSP lump decoder

use std::sync::Arc;

use rayon::prelude::*;

use crate::cmodel::{ClipNode, Hull};
use crate::common::com_dprintf;
use crate::error::{QError, QResult};
use crate::md4::com_block_checksum;
use crate::q_shared::*;
use crate::qfiles::*;

pub const HULL1_MINS: Vec3 = [-16.0, -16.0, -24.0];
pub const HULL1_MAXS: Vec3 = [16.0, 16.0, 32.0];
pub const HULL2_MINS: Vec3 = [-32.0, -32.0, -24.0];
pub const HULL2_MAXS: Vec3 = [32.0, 32.0, 64.0];

/// Below this record count, sequential decoding is faster.
const PARALLEL_LUMP_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModType {
    #[default]
    Brush,
    Sprite,
}

/// Child link of a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Node(usize),
    Leaf(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct MNode {
    pub plane: usize,
    pub children: [NodeRef; 2],
    pub mins: Vec3,
    pub maxs: Vec3,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MLeaf {
    pub contents: i32,
    /// Offset of this leaf's run-length row in the visibility lump.
    pub vis_offset: Option<usize>,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub ambient_level: [u8; NUM_AMBIENTS],
}

/// A loaded model. Brush models carry the BSP data; submodels share the
/// world's arrays.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub mod_type: ModType,
    pub mins: Vec3,
    pub maxs: Vec3,

    /// Leafs covered by the visibility rows (leaf 0 excluded).
    pub numleafs: usize,
    /// Root render node of this (sub)model.
    pub firstnode: usize,

    pub planes: Arc<[CPlane]>,
    pub nodes: Arc<[MNode]>,
    pub leafs: Arc<[MLeaf]>,
    pub visdata: Arc<[u8]>,
    pub hulls: [Hull; MAX_MAP_HULLS],

    pub entities: Arc<str>,
    pub checksum: u32,
}

/// One record of the models lump.
#[derive(Debug, Clone, Copy)]
struct DModel {
    mins: Vec3,
    maxs: Vec3,
    headnode: [i32; MAX_MAP_HULLS],
    visleafs: i32,
}

fn funny_lump(name: &str, what: &str) -> QError {
    QError::corrupt(format!("Mod_LoadBrushModel: funny lump size in {} ({})", name, what))
}

/// Decodes fixed-size records, in parallel for large lumps.
fn decode_lump<T, F>(name: &str, what: &str, lump: &[u8], stride: usize, decode: F) -> QResult<Vec<T>>
where
    T: Send,
    F: Fn(&[u8]) -> QResult<T> + Sync,
{
    if lump.len() % stride != 0 {
        return Err(funny_lump(name, what));
    }
    let count = lump.len() / stride;
    if count >= PARALLEL_LUMP_THRESHOLD {
        lump.par_chunks_exact(stride).map(&decode).collect()
    } else {
        lump.chunks_exact(stride).map(&decode).collect()
    }
}

fn read_vec3(data: &[u8], offset: usize) -> Vec3 {
    [
        read_f32_le(data, offset),
        read_f32_le(data, offset + 4),
        read_f32_le(data, offset + 8),
    ]
}

fn read_short_vec3(data: &[u8], offset: usize) -> Vec3 {
    [
        read_i16_le(data, offset) as f32,
        read_i16_le(data, offset + 2) as f32,
        read_i16_le(data, offset + 4) as f32,
    ]
}

impl Model {
    /// Decodes a BSP29, BSP2 or 2PSB file.
    ///
    /// Returns the world model first, followed by one model per inline
    /// submodel, named `*1`, `*2`, ...
    pub fn load_brush_model(name: &str, data: &[u8]) -> QResult<Vec<Model>> {
        let header = DHeader::parse(name, data)?;
        let version = header.version;

        let planes = Self::load_planes(name, header.lump_data(data, LUMP_PLANES))?;
        let visdata: Arc<[u8]> = Arc::from(header.lump_data(data, LUMP_VISIBILITY));
        let leafs = Self::load_leafs(name, version, header.lump_data(data, LUMP_LEAFS), visdata.len())?;
        let nodes = Self::load_nodes(
            name,
            version,
            header.lump_data(data, LUMP_NODES),
            planes.len(),
            leafs.len(),
        )?;
        let clipnodes = Self::load_clipnodes(
            name,
            version,
            header.lump_data(data, LUMP_CLIPNODES),
            planes.len(),
        )?;
        let hull0 = Self::make_hull0(&nodes, &leafs);
        let submodels = Self::load_submodels(name, header.lump_data(data, LUMP_MODELS))?;
        let entities = Self::load_entities(header.lump_data(data, LUMP_ENTITIES));
        let checksum = com_block_checksum(data);

        let planes: Arc<[CPlane]> = Arc::from(planes);
        let nodes: Arc<[MNode]> = Arc::from(nodes);
        let leafs: Arc<[MLeaf]> = Arc::from(leafs);
        let hull0: Arc<[ClipNode]> = Arc::from(hull0);
        let clipnodes: Arc<[ClipNode]> = Arc::from(clipnodes);

        let mut models = Vec::with_capacity(submodels.len());
        for (i, bm) in submodels.iter().enumerate() {
            if bm.headnode[0] < 0 || bm.headnode[0] as usize >= nodes.len() {
                return Err(QError::corrupt(format!(
                    "Mod_LoadBrushModel: {} model {} has bad headnode {}",
                    name, i, bm.headnode[0]
                )));
            }
            for j in 1..3 {
                if !clipnodes.is_empty() && (bm.headnode[j] < 0 || bm.headnode[j] as usize >= clipnodes.len()) {
                    return Err(QError::corrupt(format!(
                        "Mod_LoadBrushModel: {} model {} has bad clip headnode {}",
                        name, i, bm.headnode[j]
                    )));
                }
            }

            let mut hulls: [Hull; MAX_MAP_HULLS] = Default::default();
            hulls[0] = Hull {
                clipnodes: hull0.clone(),
                planes: planes.clone(),
                firstclipnode: bm.headnode[0],
                lastclipnode: nodes.len() as i32 - 1,
                clip_mins: [0.0; 3],
                clip_maxs: [0.0; 3],
            };
            hulls[1] = Hull {
                clipnodes: clipnodes.clone(),
                planes: planes.clone(),
                firstclipnode: bm.headnode[1],
                lastclipnode: clipnodes.len() as i32 - 1,
                clip_mins: HULL1_MINS,
                clip_maxs: HULL1_MAXS,
            };
            hulls[2] = Hull {
                clipnodes: clipnodes.clone(),
                planes: planes.clone(),
                firstclipnode: bm.headnode[2],
                lastclipnode: clipnodes.len() as i32 - 1,
                clip_mins: HULL2_MINS,
                clip_maxs: HULL2_MAXS,
            };

            models.push(Model {
                name: if i == 0 { name.to_string() } else { format!("*{}", i) },
                mod_type: ModType::Brush,
                mins: bm.mins,
                maxs: bm.maxs,
                numleafs: bm.visleafs.max(0) as usize,
                firstnode: bm.headnode[0] as usize,
                planes: planes.clone(),
                nodes: nodes.clone(),
                leafs: leafs.clone(),
                visdata: visdata.clone(),
                hulls,
                entities: entities.clone(),
                checksum,
            });
        }

        com_dprintf(&format!(
            "{}: {:?}, {} planes, {} nodes, {} leafs, {} clipnodes, {} models\n",
            name,
            version,
            planes.len(),
            nodes.len(),
            leafs.len(),
            clipnodes.len(),
            models.len()
        ));

        Ok(models)
    }

    fn load_planes(name: &str, lump: &[u8]) -> QResult<Vec<CPlane>> {
        decode_lump(name, "planes", lump, PLANE_SIZE, |rec| {
            let normal = read_vec3(rec, 0);
            let plane = CPlane {
                normal,
                dist: read_f32_le(rec, 12),
                plane_type: read_i32_le(rec, 16) as u8,
                signbits: signbits_for_normal(&normal),
            };
            plane.validate()?;
            Ok(plane)
        })
    }

    fn load_leafs(name: &str, version: BspVersion, lump: &[u8], vislen: usize) -> QResult<Vec<MLeaf>> {
        let leafs = decode_lump(name, "leafs", lump, version.leaf_size(), |rec| {
            let (mins, maxs, ambient_ofs) = match version {
                BspVersion::Bsp29 => (read_short_vec3(rec, 8), read_short_vec3(rec, 14), 24),
                BspVersion::Bsp2Rmq => (read_short_vec3(rec, 8), read_short_vec3(rec, 14), 28),
                BspVersion::Bsp2 => (read_vec3(rec, 8), read_vec3(rec, 20), 40),
            };
            let visofs = read_i32_le(rec, 4);
            let vis_offset = if visofs == -1 || vislen == 0 {
                None
            } else if visofs < 0 || visofs as usize >= vislen {
                return Err(QError::corrupt(format!(
                    "Mod_LoadLeafs: {} leaf visibility offset {} out of range",
                    name, visofs
                )));
            } else {
                Some(visofs as usize)
            };
            let mut ambient_level = [0u8; NUM_AMBIENTS];
            ambient_level.copy_from_slice(&rec[ambient_ofs..ambient_ofs + NUM_AMBIENTS]);
            Ok(MLeaf {
                contents: read_i32_le(rec, 0),
                vis_offset,
                mins,
                maxs,
                ambient_level,
            })
        })?;
        if leafs.is_empty() {
            return Err(QError::corrupt(format!("Mod_LoadLeafs: {} has no leafs", name)));
        }
        Ok(leafs)
    }

    fn load_nodes(
        name: &str,
        version: BspVersion,
        lump: &[u8],
        numplanes: usize,
        numleafs: usize,
    ) -> QResult<Vec<MNode>> {
        let count = lump.len() / version.node_size();
        let child = |raw: i64| -> QResult<NodeRef> {
            if raw >= 0 && (raw as usize) < count {
                return Ok(NodeRef::Node(raw as usize));
            }
            // leaf references count down from -1 (0xffff in BSP29), -1 is leaf 0
            let leaf = match version {
                BspVersion::Bsp29 => 0xffff - raw,
                BspVersion::Bsp2Rmq | BspVersion::Bsp2 => -1 - raw,
            };
            if leaf >= 0 && (leaf as usize) < numleafs {
                Ok(NodeRef::Leaf(leaf as usize))
            } else {
                Err(QError::corrupt(format!(
                    "Mod_LoadNodes: {} has invalid leaf index {} (file has only {} leafs)",
                    name, leaf, numleafs
                )))
            }
        };

        let nodes = decode_lump(name, "nodes", lump, version.node_size(), |rec| {
            let plane = read_i32_le(rec, 0);
            if plane < 0 || plane as usize >= numplanes {
                return Err(QError::corrupt(format!("Mod_LoadNodes: {} has bad plane {}", name, plane)));
            }
            let (c0, c1, mins, maxs) = match version {
                BspVersion::Bsp29 => (
                    read_u16_le(rec, 4) as i64,
                    read_u16_le(rec, 6) as i64,
                    read_short_vec3(rec, 8),
                    read_short_vec3(rec, 14),
                ),
                BspVersion::Bsp2Rmq => (
                    read_i32_le(rec, 4) as i64,
                    read_i32_le(rec, 8) as i64,
                    read_short_vec3(rec, 12),
                    read_short_vec3(rec, 18),
                ),
                BspVersion::Bsp2 => (
                    read_i32_le(rec, 4) as i64,
                    read_i32_le(rec, 8) as i64,
                    read_vec3(rec, 12),
                    read_vec3(rec, 24),
                ),
            };
            Ok(MNode {
                plane: plane as usize,
                children: [child(c0)?, child(c1)?],
                mins,
                maxs,
            })
        })?;
        if nodes.is_empty() {
            return Err(QError::corrupt(format!("Mod_LoadNodes: {} has no nodes", name)));
        }
        Ok(nodes)
    }

    fn load_clipnodes(name: &str, version: BspVersion, lump: &[u8], numplanes: usize) -> QResult<Vec<ClipNode>> {
        let count = (lump.len() / version.clipnode_size()) as i32;
        decode_lump(name, "clipnodes", lump, version.clipnode_size(), |rec| {
            let planenum = read_i32_le(rec, 0);
            if planenum < 0 || planenum as usize >= numplanes {
                return Err(QError::corrupt(format!(
                    "Mod_LoadClipnodes: {} has bad plane {}",
                    name, planenum
                )));
            }
            let mut children = match version {
                BspVersion::Bsp29 => [read_u16_le(rec, 4) as i32, read_u16_le(rec, 6) as i32],
                BspVersion::Bsp2Rmq | BspVersion::Bsp2 => [read_i32_le(rec, 4), read_i32_le(rec, 8)],
            };
            for c in children.iter_mut() {
                // unsigned shorts past the node count wrap to content codes
                if version == BspVersion::Bsp29 && *c >= count {
                    *c -= 65536;
                }
                if *c >= count {
                    return Err(QError::corrupt(format!(
                        "Mod_LoadClipnodes: {} has bad child {}",
                        name, c
                    )));
                }
            }
            Ok(ClipNode {
                planenum: planenum as usize,
                children,
            })
        })
    }

    fn load_submodels(name: &str, lump: &[u8]) -> QResult<Vec<DModel>> {
        let models = decode_lump(name, "models", lump, MODEL_SIZE, |rec| {
            let mut mins = read_vec3(rec, 0);
            let mut maxs = read_vec3(rec, 12);
            // spread the mins / maxs by a pixel
            for j in 0..3 {
                mins[j] -= 1.0;
                maxs[j] += 1.0;
            }
            let mut headnode = [0i32; MAX_MAP_HULLS];
            for (j, h) in headnode.iter_mut().enumerate() {
                *h = read_i32_le(rec, 36 + j * 4);
            }
            Ok(DModel {
                mins,
                maxs,
                headnode,
                visleafs: read_i32_le(rec, 52),
            })
        })?;
        if models.is_empty() {
            return Err(QError::corrupt(format!("Mod_LoadBrushModel: {} has no models", name)));
        }
        if models.len() > MAX_MAP_MODELS {
            return Err(QError::corrupt(format!("Mod_LoadBrushModel: {} has too many models", name)));
        }
        Ok(models)
    }

    fn load_entities(lump: &[u8]) -> Arc<str> {
        let text = String::from_utf8_lossy(lump);
        Arc::from(text.trim_end_matches('\0'))
    }

    /// Hull 0 is the render tree itself, with leafs replaced by their
    /// contents.
    fn make_hull0(nodes: &[MNode], leafs: &[MLeaf]) -> Vec<ClipNode> {
        nodes
            .iter()
            .map(|node| {
                let mut children = [0i32; 2];
                for (j, child) in node.children.iter().enumerate() {
                    children[j] = match *child {
                        NodeRef::Node(n) => n as i32,
                        NodeRef::Leaf(l) => leafs[l].contents,
                    };
                }
                ClipNode {
                    planenum: node.plane,
                    children,
                }
            })
            .collect()
    }

    /// Index of the leaf containing `p`.
    pub fn point_in_leaf(&self, p: &Vec3) -> QResult<usize> {
        if self.nodes.is_empty() {
            return Err(QError::corrupt(format!("Mod_PointInLeaf: bad model {}", self.name)));
        }
        let mut node = NodeRef::Node(self.firstnode);
        loop {
            match node {
                NodeRef::Leaf(l) => return Ok(l),
                NodeRef::Node(n) => {
                    let mnode = &self.nodes[n];
                    let d = self.planes[mnode.plane].distance(p);
                    node = if d > 0.0 { mnode.children[0] } else { mnode.children[1] };
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writes a tiny map: one plane at x = 0 splitting the world into an
    /// empty leaf (front, x > 0) and a water leaf (back). Clip hulls treat
    /// the front as empty and the back as solid.
    pub(crate) fn build_bsp(version: BspVersion, submodels: usize) -> Vec<u8> {
        let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); HEADER_LUMPS];

        let put_i32 = |v: &mut Vec<u8>, x: i32| v.extend_from_slice(&x.to_le_bytes());
        let put_f32 = |v: &mut Vec<u8>, x: f32| v.extend_from_slice(&x.to_le_bytes());
        let put_i16 = |v: &mut Vec<u8>, x: i16| v.extend_from_slice(&x.to_le_bytes());
        let put_u16 = |v: &mut Vec<u8>, x: u16| v.extend_from_slice(&x.to_le_bytes());

        lumps[LUMP_ENTITIES] = b"{\n\"classname\" \"worldspawn\"\n}\n\0".to_vec();

        let planes = &mut lumps[LUMP_PLANES];
        for f in [1.0, 0.0, 0.0, 0.0] {
            put_f32(planes, f);
        }
        put_i32(planes, PLANE_X as i32);

        // leaf 1 sees both leafs, leaf 2 only itself
        lumps[LUMP_VISIBILITY] = vec![0x03, 0x02];

        let leafs_desc = [(CONTENTS_SOLID, -1), (CONTENTS_EMPTY, 0), (CONTENTS_WATER, 1)];
        let leafs = &mut lumps[LUMP_LEAFS];
        for (contents, visofs) in leafs_desc {
            put_i32(leafs, contents);
            put_i32(leafs, visofs);
            match version {
                BspVersion::Bsp29 | BspVersion::Bsp2Rmq => {
                    for x in [-64i16, -64, -64, 64, 64, 64] {
                        put_i16(leafs, x);
                    }
                }
                BspVersion::Bsp2 => {
                    for x in [-64.0f32, -64.0, -64.0, 64.0, 64.0, 64.0] {
                        put_f32(leafs, x);
                    }
                }
            }
            match version {
                BspVersion::Bsp29 => {
                    put_u16(leafs, 0);
                    put_u16(leafs, 0);
                }
                _ => {
                    put_i32(leafs, 0);
                    put_i32(leafs, 0);
                }
            }
            leafs.extend_from_slice(&[7, 0, 0, 0]);
        }

        // front -> leaf 1, back -> leaf 2
        let nodes = &mut lumps[LUMP_NODES];
        put_i32(nodes, 0);
        match version {
            BspVersion::Bsp29 => {
                put_u16(nodes, 0xffff - 1);
                put_u16(nodes, 0xffff - 2);
                for x in [-64i16, -64, -64, 64, 64, 64] {
                    put_i16(nodes, x);
                }
                put_u16(nodes, 0);
                put_u16(nodes, 0);
            }
            BspVersion::Bsp2Rmq => {
                put_i32(nodes, -2);
                put_i32(nodes, -3);
                for x in [-64i16, -64, -64, 64, 64, 64] {
                    put_i16(nodes, x);
                }
                put_i32(nodes, 0);
                put_i32(nodes, 0);
            }
            BspVersion::Bsp2 => {
                put_i32(nodes, -2);
                put_i32(nodes, -3);
                for x in [-64.0f32, -64.0, -64.0, 64.0, 64.0, 64.0] {
                    put_f32(nodes, x);
                }
                put_i32(nodes, 0);
                put_i32(nodes, 0);
            }
        }

        let clipnodes = &mut lumps[LUMP_CLIPNODES];
        put_i32(clipnodes, 0);
        match version {
            BspVersion::Bsp29 => {
                put_u16(clipnodes, CONTENTS_EMPTY as u16);
                put_u16(clipnodes, CONTENTS_SOLID as u16);
            }
            _ => {
                put_i32(clipnodes, CONTENTS_EMPTY);
                put_i32(clipnodes, CONTENTS_SOLID);
            }
        }

        let models = &mut lumps[LUMP_MODELS];
        for i in 0..=submodels {
            let ext = if i == 0 { 64.0 } else { 8.0 };
            for f in [-ext, -ext, -ext, ext, ext, ext, 0.0, 0.0, 0.0] {
                put_f32(models, f);
            }
            for h in [0, 0, 0, 0] {
                put_i32(models, h);
            }
            put_i32(models, if i == 0 { 2 } else { 0 });
            put_i32(models, 0);
            put_i32(models, 0);
        }

        let ident = match version {
            BspVersion::Bsp29 => BSPVERSION,
            BspVersion::Bsp2Rmq => BSP2VERSION_2PSB,
            BspVersion::Bsp2 => BSP2VERSION_BSP2,
        };
        let mut out = Vec::new();
        put_i32(&mut out, ident);
        let mut ofs = HEADER_SIZE;
        for lump in &lumps {
            put_i32(&mut out, ofs as i32);
            put_i32(&mut out, lump.len() as i32);
            ofs += lump.len();
        }
        for lump in &lumps {
            out.extend_from_slice(lump);
        }
        out
    }

    fn load(version: BspVersion) -> Vec<Model> {
        let data = build_bsp(version, 1);
        Model::load_brush_model("maps/test.bsp", &data).unwrap()
    }

    #[test]
    fn test_load_all_versions_agree() {
        for version in [BspVersion::Bsp29, BspVersion::Bsp2Rmq, BspVersion::Bsp2] {
            let models = load(version);
            let world = &models[0];
            assert_eq!(world.name, "maps/test.bsp");
            assert_eq!(world.leafs.len(), 3);
            assert_eq!(world.numleafs, 2);
            assert_eq!(world.nodes[0].children, [NodeRef::Leaf(1), NodeRef::Leaf(2)]);
            assert_eq!(world.nodes[0].mins, [-64.0, -64.0, -64.0]);
            assert_eq!(world.leafs[0].contents, CONTENTS_SOLID);
            assert_eq!(world.leafs[0].vis_offset, None);
            assert_eq!(world.leafs[2].vis_offset, Some(1));
            assert_eq!(world.leafs[1].ambient_level, [7, 0, 0, 0]);
            assert_eq!(world.leafs[2].maxs, [64.0, 64.0, 64.0]);
            assert_eq!(world.mins, [-65.0, -65.0, -65.0]);
            assert!(world.entities.contains("worldspawn"));
            assert!(!world.entities.ends_with('\0'));
        }
    }

    #[test]
    fn test_hull0_uses_leaf_contents() {
        let world = &load(BspVersion::Bsp29)[0];
        let hull = &world.hulls[0];
        assert_eq!(hull.clipnodes[0].children, [CONTENTS_EMPTY, CONTENTS_WATER]);
        assert_eq!(hull.point_contents(hull.firstclipnode, &[10.0, 0.0, 0.0]).unwrap(), CONTENTS_EMPTY);
        assert_eq!(hull.point_contents(hull.firstclipnode, &[-10.0, 0.0, 0.0]).unwrap(), CONTENTS_WATER);
        assert_eq!(hull.clip_mins, [0.0; 3]);
    }

    #[test]
    fn test_clip_hulls_resign_children() {
        for version in [BspVersion::Bsp29, BspVersion::Bsp2] {
            let world = &load(version)[0];
            let hull1 = &world.hulls[1];
            assert_eq!(hull1.clipnodes[0].children, [CONTENTS_EMPTY, CONTENTS_SOLID]);
            assert_eq!(hull1.clip_mins, HULL1_MINS);
            assert_eq!(hull1.clip_maxs, HULL1_MAXS);
            assert_eq!(world.hulls[2].clip_mins, HULL2_MINS);
            assert_eq!(world.hulls[2].clip_maxs, HULL2_MAXS);
            assert_eq!(hull1.point_contents(0, &[-1.0, 0.0, 0.0]).unwrap(), CONTENTS_SOLID);
            assert!(Arc::ptr_eq(&hull1.clipnodes, &world.hulls[2].clipnodes));
        }
    }

    #[test]
    fn test_submodels_share_arrays() {
        let models = load(BspVersion::Bsp2);
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].name, "*1");
        assert_eq!(models[1].maxs, [9.0, 9.0, 9.0]);
        assert!(Arc::ptr_eq(&models[0].planes, &models[1].planes));
        assert!(Arc::ptr_eq(&models[0].hulls[1].clipnodes, &models[1].hulls[1].clipnodes));
        assert_eq!(models[0].checksum, models[1].checksum);
    }

    #[test]
    fn test_checksum_covers_file() {
        let data = build_bsp(BspVersion::Bsp29, 0);
        let models = Model::load_brush_model("maps/test.bsp", &data).unwrap();
        assert_eq!(models[0].checksum, com_block_checksum(&data));
    }

    #[test]
    fn test_point_in_leaf() {
        let world = &load(BspVersion::Bsp29)[0];
        assert_eq!(world.point_in_leaf(&[5.0, 0.0, 0.0]).unwrap(), 1);
        assert_eq!(world.point_in_leaf(&[-5.0, 0.0, 0.0]).unwrap(), 2);
        // on the plane goes to the back
        assert_eq!(world.point_in_leaf(&[0.0, 0.0, 0.0]).unwrap(), 2);
        assert!(Model::default().point_in_leaf(&[0.0; 3]).is_err());
    }

    #[test]
    fn test_funny_lump_size_rejected() {
        let mut data = build_bsp(BspVersion::Bsp29, 0);
        // shorten the planes lump by one byte
        let base = 4 + LUMP_PLANES * 8 + 4;
        let len = read_i32_le(&data, base);
        data[base..base + 4].copy_from_slice(&(len - 1).to_le_bytes());
        let err = Model::load_brush_model("maps/bad.bsp", &data).unwrap_err();
        assert!(err.to_string().contains("funny lump size"));
    }

    #[test]
    fn test_bad_plane_reference_rejected() {
        let mut data = build_bsp(BspVersion::Bsp2, 0);
        let nodes_ofs = read_i32_le(&data, 4 + LUMP_NODES * 8) as usize;
        data[nodes_ofs..nodes_ofs + 4].copy_from_slice(&5i32.to_le_bytes());
        let err = Model::load_brush_model("maps/bad.bsp", &data).unwrap_err();
        assert!(matches!(err, QError::AssetCorruption(_)));
    }

    #[test]
    fn test_bad_leaf_reference_rejected() {
        let mut data = build_bsp(BspVersion::Bsp2, 0);
        let nodes_ofs = read_i32_le(&data, 4 + LUMP_NODES * 8) as usize;
        data[nodes_ofs + 4..nodes_ofs + 8].copy_from_slice(&(-10i32).to_le_bytes());
        let err = Model::load_brush_model("maps/bad.bsp", &data).unwrap_err();
        assert!(err.to_string().contains("invalid leaf index 9"));
    }

    #[test]
    fn test_large_lump_decodes_in_parallel_path() {
        let mut lump = Vec::new();
        for i in 0..(PARALLEL_LUMP_THRESHOLD * 2) {
            for f in [0.0f32, 0.0, 1.0, i as f32] {
                lump.extend_from_slice(&f.to_le_bytes());
            }
            lump.extend_from_slice(&(PLANE_Z as i32).to_le_bytes());
        }
        let planes = Model::load_planes("big", &lump).unwrap();
        assert_eq!(planes.len(), PARALLEL_LUMP_THRESHOLD * 2);
        for (i, p) in planes.iter().enumerate() {
            assert_eq!(p.dist, i as f32);
            assert_eq!(p.plane_type, PLANE_Z);
        }
    }
}
