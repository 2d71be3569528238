// qfiles.rs -- on-disk BSP layouts (BSP29, BSP2, 2PSB)

use crate::error::{QError, QResult};

// ============================================================
// BSP file format
// ============================================================

pub const BSPVERSION: i32 = 29;
/// "BSP2" in file order
pub const BSP2VERSION_BSP2: i32 =
    (b'B' as i32) | (b'S' as i32) << 8 | (b'P' as i32) << 16 | (b'2' as i32) << 24;
/// "2PSB" in file order (the RMQ flavour with 16-bit bounds)
pub const BSP2VERSION_2PSB: i32 =
    (b'2' as i32) | (b'P' as i32) << 8 | (b'S' as i32) << 16 | (b'B' as i32) << 24;

pub const MAX_MAP_HULLS: usize = 4;

// Upper design bounds
pub const MAX_MAP_MODELS: usize = 2048;

// Lump indices
pub const LUMP_ENTITIES: usize = 0;
pub const LUMP_PLANES: usize = 1;
pub const LUMP_TEXTURES: usize = 2;
pub const LUMP_VERTEXES: usize = 3;
pub const LUMP_VISIBILITY: usize = 4;
pub const LUMP_NODES: usize = 5;
pub const LUMP_TEXINFO: usize = 6;
pub const LUMP_FACES: usize = 7;
pub const LUMP_LIGHTING: usize = 8;
pub const LUMP_CLIPNODES: usize = 9;
pub const LUMP_LEAFS: usize = 10;
pub const LUMP_MARKSURFACES: usize = 11;
pub const LUMP_EDGES: usize = 12;
pub const LUMP_SURFEDGES: usize = 13;
pub const LUMP_MODELS: usize = 14;
pub const HEADER_LUMPS: usize = 15;

/// version + lump directory
pub const HEADER_SIZE: usize = 4 + HEADER_LUMPS * 8;

// Record sizes shared by every version
pub const PLANE_SIZE: usize = 20; // normal[3], dist, type
pub const MODEL_SIZE: usize = 64; // mins[3], maxs[3], origin[3], headnode[4], visleafs, firstface, numfaces

pub const NUM_AMBIENTS: usize = 4;

/// Which of the three layouts a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspVersion {
    /// 16-bit children and bounds
    Bsp29,
    /// 32-bit children, 16-bit bounds
    Bsp2Rmq,
    /// 32-bit children, float bounds
    Bsp2,
}

impl BspVersion {
    pub fn from_ident(version: i32) -> Option<Self> {
        match version {
            BSPVERSION => Some(BspVersion::Bsp29),
            BSP2VERSION_2PSB => Some(BspVersion::Bsp2Rmq),
            BSP2VERSION_BSP2 => Some(BspVersion::Bsp2),
            _ => None,
        }
    }

    pub fn node_size(self) -> usize {
        match self {
            BspVersion::Bsp29 => 24,
            BspVersion::Bsp2Rmq => 32,
            BspVersion::Bsp2 => 44,
        }
    }

    pub fn clipnode_size(self) -> usize {
        match self {
            BspVersion::Bsp29 => 8,
            BspVersion::Bsp2Rmq | BspVersion::Bsp2 => 12,
        }
    }

    pub fn leaf_size(self) -> usize {
        match self {
            BspVersion::Bsp29 => 28,
            BspVersion::Bsp2Rmq => 32,
            BspVersion::Bsp2 => 44,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lump {
    pub fileofs: i32,
    pub filelen: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct DHeader {
    pub version: BspVersion,
    pub lumps: [Lump; HEADER_LUMPS],
}

impl DHeader {
    /// Reads the version and lump directory and checks every lump lies
    /// inside `data`.
    pub fn parse(name: &str, data: &[u8]) -> QResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(QError::corrupt(format!("Mod_LoadBrushModel: {} is too short", name)));
        }
        let ident = read_i32_le(data, 0);
        let version = BspVersion::from_ident(ident).ok_or_else(|| {
            QError::corrupt(format!(
                "Mod_LoadBrushModel: {} has wrong version number ({} should be {})",
                name, ident, BSPVERSION
            ))
        })?;

        let mut lumps = [Lump::default(); HEADER_LUMPS];
        for (i, lump) in lumps.iter_mut().enumerate() {
            let base = 4 + i * 8;
            lump.fileofs = read_i32_le(data, base);
            lump.filelen = read_i32_le(data, base + 4);
            if lump.fileofs < 0
                || lump.filelen < 0
                || lump.fileofs as usize + lump.filelen as usize > data.len()
            {
                return Err(QError::corrupt(format!(
                    "Mod_LoadBrushModel: {} lump {} out of bounds",
                    name, i
                )));
            }
        }

        Ok(DHeader { version, lumps })
    }

    /// The bytes of lump `index`.
    pub fn lump_data<'a>(&self, data: &'a [u8], index: usize) -> &'a [u8] {
        let l = self.lumps[index];
        &data[l.fileofs as usize..(l.fileofs + l.filelen) as usize]
    }
}

// ============================================================
// Little-endian readers
// ============================================================

pub fn read_i32_le(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

pub fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    read_i32_le(data, offset) as u32
}

pub fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub fn read_i16_le(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

pub fn read_f32_le(data: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32_le(data, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_idents() {
        assert_eq!(BspVersion::from_ident(29), Some(BspVersion::Bsp29));
        assert_eq!(BspVersion::from_ident(read_i32_le(b"BSP2", 0)), Some(BspVersion::Bsp2));
        assert_eq!(BspVersion::from_ident(read_i32_le(b"2PSB", 0)), Some(BspVersion::Bsp2Rmq));
        assert_eq!(BspVersion::from_ident(38), None);
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(BspVersion::Bsp29.node_size(), 24);
        assert_eq!(BspVersion::Bsp2Rmq.node_size(), 32);
        assert_eq!(BspVersion::Bsp2.node_size(), 44);
        assert_eq!(BspVersion::Bsp29.clipnode_size(), 8);
        assert_eq!(BspVersion::Bsp2.clipnode_size(), 12);
        assert_eq!(BspVersion::Bsp29.leaf_size(), 28);
        assert_eq!(BspVersion::Bsp2Rmq.leaf_size(), 32);
        assert_eq!(BspVersion::Bsp2.leaf_size(), 44);
    }

    #[test]
    fn test_header_rejects_short_and_bad_version() {
        assert!(DHeader::parse("short", &[0u8; 10]).is_err());

        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&38i32.to_le_bytes());
        let err = DHeader::parse("q2map", &data).unwrap_err();
        assert!(err.to_string().contains("wrong version number"));
    }

    #[test]
    fn test_header_rejects_lump_past_end() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(&BSPVERSION.to_le_bytes());
        let base = 4 + LUMP_PLANES * 8;
        data[base..base + 4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());
        data[base + 4..base + 8].copy_from_slice(&20i32.to_le_bytes());
        assert!(DHeader::parse("cut", &data).is_err());
    }

    #[test]
    fn test_readers() {
        let data = [0xffu8, 0xff, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3f];
        assert_eq!(read_u16_le(&data, 0), 65535);
        assert_eq!(read_i16_le(&data, 0), -1);
        assert_eq!(read_i32_le(&data, 0), 65535);
        assert_eq!(read_f32_le(&data, 4), 1.0);
    }
}
