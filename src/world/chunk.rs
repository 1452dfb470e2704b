use crate::protocol::chunk_data::ChunkDataPacket;
use crate::protocol::packet::MinecraftPacketBuffer;
use crate::world::palette::{PaletteContainer, State};
use std::io;

pub const SECTION_SIZE: usize = 16;
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
pub const SECTIONS_PER_CHUNK: usize = 16;
/// Biomes are kept per 4x4x4 cube inside a section.
pub const BIOME_VOLUME: usize = 64;
const LIGHT_LEN: usize = SECTION_VOLUME / 2;
const COLUMN_BIOMES: usize = SECTION_SIZE * SECTION_SIZE;

/// Global block state id, `block << 4 | metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockState(pub u32);

impl BlockState {
    pub const AIR: BlockState = BlockState(0);

    pub fn new(block_id: u32, metadata: u8) -> Self {
        BlockState((block_id << 4) | (metadata as u32 & 0x0F))
    }

    pub fn block_id(&self) -> u32 {
        self.0 >> 4
    }

    pub fn metadata(&self) -> u8 {
        (self.0 & 0x0F) as u8
    }

    pub fn is_air(&self) -> bool {
        self.block_id() == 0
    }
}

impl State for BlockState {
    const MIN_INDIRECT_BITS: u8 = 4;
    const MAX_LINEAR_BITS: u8 = 4;
    const MAX_INDIRECT_BITS: u8 = 8;
    const GLOBAL_BITS: u8 = 13;

    fn from_id(id: u32) -> Self {
        BlockState(id)
    }

    fn to_id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Biome(pub u32);

impl State for Biome {
    const MIN_INDIRECT_BITS: u8 = 1;
    const MAX_LINEAR_BITS: u8 = 3;
    const MAX_INDIRECT_BITS: u8 = 3;
    const GLOBAL_BITS: u8 = 8;

    fn from_id(id: u32) -> Self {
        Biome(id)
    }

    fn to_id(self) -> u32 {
        self.0
    }
}

fn block_index(x: usize, y: usize, z: usize) -> usize {
    (y << 8) | (z << 4) | x
}

fn biome_index(x: usize, y: usize, z: usize) -> usize {
    ((y >> 2) << 4) | ((z >> 2) << 2) | (x >> 2)
}

/// Half a byte of light per block.
type LightArray = Box<[u8; LIGHT_LEN]>;

fn read_light(buffer: &mut MinecraftPacketBuffer) -> io::Result<LightArray> {
    let bytes = buffer.read_bytes(LIGHT_LEN)?;
    bytes.into_boxed_slice().try_into().map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "Truncated light array")
    })
}

fn nibble(light: &[u8], index: usize) -> u8 {
    let byte = light[index >> 1];
    if index & 1 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

/// One 16x16x16 cube of blocks with its light and biomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    /// Non-air blocks, kept in step with `states`
    block_count: u16,
    states: PaletteContainer<BlockState>,
    biomes: PaletteContainer<Biome>,
    block_light: LightArray,
    sky_light: Option<LightArray>,
}

impl ChunkSection {
    /// Empty section, fully lit by the sky when the dimension has one.
    pub fn new(has_sky_light: bool) -> Self {
        ChunkSection {
            block_count: 0,
            states: PaletteContainer::new(SECTION_VOLUME, BlockState::AIR),
            biomes: PaletteContainer::new(BIOME_VOLUME, Biome::default()),
            block_light: Box::new([0; LIGHT_LEN]),
            sky_light: has_sky_light.then(|| Box::new([0xFF; LIGHT_LEN])),
        }
    }

    pub fn block_count(&self) -> u16 {
        self.block_count
    }

    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockState {
        self.states.get(block_index(x, y, z))
    }

    /// Sets a block and returns the one it replaced. A state without a 13-bit global id is
    /// rejected and leaves the section unchanged.
    pub fn set_block(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        state: BlockState,
    ) -> io::Result<BlockState> {
        let index = block_index(x, y, z);
        let previous = self.states.get(index);
        self.states.set(index, state)?;

        match (previous.is_air(), state.is_air()) {
            (true, false) => self.block_count += 1,
            (false, true) => self.block_count -= 1,
            _ => {}
        }
        Ok(previous)
    }

    /// Counts non-air blocks cell by cell.
    pub fn recount(&self) -> u16 {
        self.states.count(|state| !state.is_air()) as u16
    }

    pub fn get_biome(&self, x: usize, y: usize, z: usize) -> Biome {
        self.biomes.get(biome_index(x, y, z))
    }

    pub fn set_biome(&mut self, x: usize, y: usize, z: usize, biome: Biome) -> io::Result<()> {
        self.biomes.set(biome_index(x, y, z), biome)
    }

    pub fn block_light(&self, x: usize, y: usize, z: usize) -> u8 {
        nibble(&self.block_light[..], block_index(x, y, z))
    }

    pub fn sky_light(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        self.sky_light
            .as_ref()
            .map(|light| nibble(&light[..], block_index(x, y, z)))
    }

    pub fn states(&self) -> &PaletteContainer<BlockState> {
        &self.states
    }

    /// Reads one section in the protocol-340 layout.
    pub fn read(buffer: &mut MinecraftPacketBuffer, has_sky_light: bool) -> io::Result<Self> {
        let bits = buffer.read_u8()?;

        let palette_len = buffer.read_varint()?;
        if !(0..=256).contains(&palette_len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid palette length {}", palette_len),
            ));
        }
        let palette = (0..palette_len)
            .map(|_| buffer.read_varint().map(|id| BlockState(id as u32)))
            .collect::<io::Result<Vec<_>>>()?;

        let data_len = buffer.read_varint()?;
        if data_len < 0 || data_len as usize > buffer.remaining() / 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid data array length {}", data_len),
            ));
        }
        let data = (0..data_len)
            .map(|_| buffer.read_u64())
            .collect::<io::Result<Vec<_>>>()?;

        let states = PaletteContainer::from_wire(bits, SECTION_VOLUME, palette, data)?;
        let block_light = read_light(buffer)?;
        let sky_light = if has_sky_light {
            Some(read_light(buffer)?)
        } else {
            None
        };

        Ok(ChunkSection {
            block_count: states.count(|state| !state.is_air()) as u16,
            states,
            biomes: PaletteContainer::new(BIOME_VOLUME, Biome::default()),
            block_light,
            sky_light,
        })
    }

    pub fn write(&self, buffer: &mut MinecraftPacketBuffer) {
        let (palette, data) = self.states.export();
        if self.states.bits() == 0 {
            // A single value goes out as a one-entry palette of the smallest width.
            let bits = BlockState::MIN_INDIRECT_BITS;
            buffer.write_u8(bits);
            buffer.write_varint(1);
            buffer.write_varint(self.states.get(0).0 as i32);
            let words = SECTION_VOLUME * bits as usize / 64;
            buffer.write_varint(words as i32);
            for _ in 0..words {
                buffer.write_u64(0);
            }
        } else {
            buffer.write_u8(self.states.bits());
            buffer.write_varint(palette.len() as i32);
            for state in &palette {
                buffer.write_varint(state.0 as i32);
            }
            buffer.write_varint(data.len() as i32);
            for word in data {
                buffer.write_u64(*word);
            }
        }

        buffer.write_bytes(&self.block_light[..]);
        if let Some(sky_light) = &self.sky_light {
            buffer.write_bytes(&sky_light[..]);
        }
    }

    /// Spreads a column's 16x16 biome map over the 4x4x4 biome cells.
    fn apply_column_biomes(&mut self, biomes: &[u8]) {
        for cell in 0..BIOME_VOLUME {
            let (x, z) = ((cell & 3) << 2, ((cell >> 2) & 3) << 2);
            // Byte ids always fit the 8-bit global width.
            let _ = self
                .biomes
                .set(cell, Biome(biomes[z * SECTION_SIZE + x] as u32));
        }
    }
}

/// Decoded Chunk Data packet, ready to be applied to a column.
#[derive(Debug)]
pub struct ChunkUpdate {
    pub ground_up_continuous: bool,
    pub sections: Vec<(usize, ChunkSection)>,
    pub biomes: Option<Vec<u8>>,
}

impl ChunkUpdate {
    pub fn decode(packet: &ChunkDataPacket, has_sky_light: bool) -> io::Result<Self> {
        let mask = packet.primary_bit_mask;
        if mask as u32 >> SECTIONS_PER_CHUNK != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid section mask {:#x}", mask),
            ));
        }

        let mut buffer = MinecraftPacketBuffer::from_slice(&packet.data);
        let mut sections = Vec::new();
        for y in 0..SECTIONS_PER_CHUNK {
            if mask & (1 << y) != 0 {
                sections.push((y, ChunkSection::read(&mut buffer, has_sky_light)?));
            }
        }

        let biomes = if packet.ground_up_continuous {
            let biomes = buffer.read_bytes(COLUMN_BIOMES)?;
            for (_, section) in sections.iter_mut() {
                section.apply_column_biomes(&biomes);
            }
            Some(biomes)
        } else {
            None
        };

        Ok(ChunkUpdate {
            ground_up_continuous: packet.ground_up_continuous,
            sections,
            biomes,
        })
    }
}

/// A 16x256x16 column of sections.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    sections: [Option<ChunkSection>; SECTIONS_PER_CHUNK],
    biomes: Option<Vec<u8>>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a decoded update. A ground-up update replaces the whole column, otherwise only the
    /// sections it carries are replaced.
    pub fn apply(&mut self, update: ChunkUpdate) {
        if update.ground_up_continuous {
            self.sections = Default::default();
            self.biomes = update.biomes;
        }
        for (y, mut section) in update.sections {
            if let Some(biomes) = &self.biomes {
                section.apply_column_biomes(biomes);
            }
            self.sections[y] = Some(section);
        }
    }

    pub fn section(&self, y: usize) -> Option<&ChunkSection> {
        self.sections.get(y)?.as_ref()
    }

    /// Block at column-local coordinates, `y` from 0 to 255. Missing sections are air.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockState {
        self.section(y / SECTION_SIZE)
            .map(|section| section.get_block(x, y % SECTION_SIZE, z))
            .unwrap_or(BlockState::AIR)
    }

    /// Sets a block, creating its section if needed, and returns the previous state.
    pub fn set_block(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        state: BlockState,
        has_sky_light: bool,
    ) -> io::Result<BlockState> {
        let Some(slot) = self.sections.get_mut(y / SECTION_SIZE) else {
            return Ok(BlockState::AIR);
        };
        if slot.is_none() && state.is_air() {
            return Ok(BlockState::AIR);
        }
        let section = slot.get_or_insert_with(|| ChunkSection::new(has_sky_light));
        section.set_block(x, y % SECTION_SIZE, z, state)
    }

    /// Biome id of a block column.
    pub fn biome(&self, x: usize, z: usize) -> Option<u8> {
        self.biomes
            .as_ref()
            .map(|biomes| biomes[z * SECTION_SIZE + x])
    }

    /// Encodes the column as a full Chunk Data packet.
    pub fn encode(&self, chunk_x: i32, chunk_z: i32) -> ChunkDataPacket {
        let mut buffer = MinecraftPacketBuffer::new();
        let mut mask = 0;
        for (y, section) in self.sections.iter().enumerate() {
            if let Some(section) = section {
                mask |= 1 << y;
                section.write(&mut buffer);
            }
        }
        match &self.biomes {
            Some(biomes) => buffer.write_bytes(biomes),
            None => buffer.write_bytes(&[0; COLUMN_BIOMES]),
        }

        ChunkDataPacket {
            chunk_x,
            chunk_z,
            ground_up_continuous: true,
            primary_bit_mask: mask,
            data: buffer.into_inner(),
            block_entity_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STONE: BlockState = BlockState(1 << 4);
    const DIRT: BlockState = BlockState(3 << 4);

    #[test]
    fn test_block_state_ids() {
        let granite = BlockState::new(1, 1);
        assert_eq!(granite.0, 17);
        assert_eq!(granite.block_id(), 1);
        assert_eq!(granite.metadata(), 1);
        assert!(BlockState(0x0F).is_air());
        assert!(!granite.is_air());
    }

    #[test]
    fn test_block_count_tracks_air() {
        let mut section = ChunkSection::new(true);
        assert_eq!(section.block_count(), 0);

        section.set_block(1, 2, 3, STONE).unwrap();
        assert_eq!(section.block_count(), 1);
        section.set_block(1, 2, 3, DIRT).unwrap();
        assert_eq!(section.block_count(), 1);
        section.set_block(4, 5, 6, DIRT).unwrap();
        assert_eq!(section.block_count(), 2);
        section.set_block(1, 2, 3, BlockState::AIR).unwrap();
        assert_eq!(section.block_count(), 1);
        section.set_block(0, 0, 0, BlockState::AIR).unwrap();
        assert_eq!(section.block_count(), 1);
        assert_eq!(section.block_count(), section.recount());
    }

    #[test]
    fn test_block_count_across_resizes() {
        let mut section = ChunkSection::new(false);
        for i in 0..300u32 {
            let x = (i % 16) as usize;
            let z = ((i / 16) % 16) as usize;
            let y = (i / 256) as usize;
            section.set_block(x, y, z, BlockState(16 + i)).unwrap();
        }
        assert!(section.states().is_global());
        assert_eq!(section.block_count(), 300);
        assert_eq!(section.recount(), 300);
        assert_eq!(section.get_block(15, 0, 15), BlockState(16 + 255));
    }

    #[test]
    fn test_section_wire_round_trip() {
        let mut section = ChunkSection::new(true);
        section.set_block(0, 0, 0, STONE).unwrap();
        section.set_block(15, 15, 15, DIRT).unwrap();

        let mut buffer = MinecraftPacketBuffer::new();
        section.write(&mut buffer);
        let bytes = buffer.into_inner();
        // bits, palette length, three palette entries, data length, 256 longs, two light arrays
        assert_eq!(bytes.len(), 1 + 1 + 3 + 2 + 256 * 8 + 2 * 2048);

        let mut buffer = MinecraftPacketBuffer::from_bytes(bytes);
        let decoded = ChunkSection::read(&mut buffer, true).unwrap();
        assert_eq!(buffer.remaining(), 0);
        assert_eq!(decoded.get_block(0, 0, 0), STONE);
        assert_eq!(decoded.get_block(15, 15, 15), DIRT);
        assert_eq!(decoded.get_block(7, 7, 7), BlockState::AIR);
        assert_eq!(decoded.block_count(), 2);
        assert_eq!(decoded.sky_light(3, 3, 3), Some(15));
    }

    #[test]
    fn test_single_value_section_is_written_with_palette() {
        let section = ChunkSection::new(false);
        let mut buffer = MinecraftPacketBuffer::new();
        section.write(&mut buffer);

        let mut buffer = MinecraftPacketBuffer::from_bytes(buffer.into_inner());
        assert_eq!(buffer.read_u8().unwrap(), 4);
        assert_eq!(buffer.read_varint().unwrap(), 1);
        assert_eq!(buffer.read_varint().unwrap(), 0);
        assert_eq!(buffer.read_varint().unwrap(), 256);
    }

    #[test]
    fn test_direct_section_has_empty_palette() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_u8(13);
        buffer.write_varint(0);
        let mut storage = crate::world::bit_storage::BitStorage::new(13, SECTION_VOLUME);
        storage.set(block_index(2, 3, 4), STONE.0);
        buffer.write_varint(storage.data().len() as i32);
        for word in storage.data() {
            buffer.write_u64(*word);
        }
        buffer.write_bytes(&[0; LIGHT_LEN]);

        let mut buffer = MinecraftPacketBuffer::from_bytes(buffer.into_inner());
        let section = ChunkSection::read(&mut buffer, false).unwrap();
        assert!(section.states().is_global());
        assert_eq!(section.get_block(2, 3, 4), STONE);
        assert_eq!(section.block_count(), 1);
        assert_eq!(section.sky_light(0, 0, 0), None);
    }

    #[test]
    fn test_chunk_round_trip_with_biomes() {
        let mut chunk = Chunk::new();
        chunk.set_block(3, 70, 9, STONE, true).unwrap();
        chunk.set_block(3, 5, 9, DIRT, true).unwrap();
        let mut biomes = vec![1u8; COLUMN_BIOMES];
        biomes[4 * 16 + 8] = 6;
        chunk.biomes = Some(biomes);

        let packet = chunk.encode(2, -3);
        assert_eq!(packet.primary_bit_mask, (1 << 4) | 1);

        let update = ChunkUpdate::decode(&packet, true).unwrap();
        let mut decoded = Chunk::new();
        decoded.apply(update);
        assert_eq!(decoded.get_block(3, 70, 9), STONE);
        assert_eq!(decoded.get_block(3, 5, 9), DIRT);
        assert_eq!(decoded.get_block(3, 200, 9), BlockState::AIR);
        assert_eq!(decoded.biome(8, 4), Some(6));

        let section = decoded.section(4).unwrap();
        assert_eq!(section.get_biome(8, 0, 4), Biome(6));
        assert_eq!(section.get_biome(8, 15, 4), Biome(6));
        assert_eq!(section.get_biome(0, 0, 0), Biome(1));
    }

    #[test]
    fn test_partial_update_keeps_other_sections() {
        let mut chunk = Chunk::new();
        chunk.set_block(0, 0, 0, STONE, true).unwrap();
        chunk.set_block(0, 40, 0, STONE, true).unwrap();

        let mut section = ChunkSection::new(true);
        section.set_block(0, 8, 0, DIRT).unwrap();
        let mut buffer = MinecraftPacketBuffer::new();
        section.write(&mut buffer);
        let packet = ChunkDataPacket {
            chunk_x: 0,
            chunk_z: 0,
            ground_up_continuous: false,
            primary_bit_mask: 1 << 2,
            data: buffer.into_inner(),
            block_entity_count: 0,
        };

        chunk.apply(ChunkUpdate::decode(&packet, true).unwrap());
        assert_eq!(chunk.get_block(0, 0, 0), STONE);
        assert_eq!(chunk.get_block(0, 40, 0), DIRT);
        assert_eq!(chunk.get_block(0, 32, 0), BlockState::AIR);
    }

    #[test]
    fn test_truncated_chunk_is_rejected() {
        let mut chunk = Chunk::new();
        chunk.set_block(0, 0, 0, STONE, true).unwrap();
        let mut packet = chunk.encode(0, 0);
        packet.data.truncate(packet.data.len() - 300);
        assert!(ChunkUpdate::decode(&packet, true).is_err());
    }

    #[test]
    fn test_out_of_range_block_is_rejected() {
        let mut section = ChunkSection::new(true);
        // Air plus 255 states fills the widest indirect palette.
        for i in 0..255u32 {
            section.set_block((i % 16) as usize, 0, (i / 16) as usize, BlockState(16 + i)).unwrap();
        }
        assert!(!section.states().is_global());

        assert!(section.set_block(0, 1, 0, BlockState(8192)).is_err());
        assert!(section.set_block(1, 1, 0, BlockState(-1i32 as u32)).is_err());
        assert_eq!(section.get_block(0, 1, 0), BlockState::AIR);
        assert_eq!(section.block_count(), 255);
        assert_eq!(section.recount(), 255);

        section.set_block(0, 1, 0, BlockState(8191)).unwrap();
        assert!(section.states().is_global());
        assert_eq!(section.get_block(0, 0, 0), BlockState(16));
        assert_eq!(section.get_block(14, 0, 15), BlockState(16 + 254));
        assert_eq!(section.block_count(), section.recount());
    }

    #[test]
    fn test_out_of_range_palette_entry_is_rejected() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(2);
        buffer.write_varint(0);
        buffer.write_varint(-16);
        buffer.write_varint(256);
        for _ in 0..256 {
            buffer.write_u64(0);
        }
        buffer.write_bytes(&[0; LIGHT_LEN]);

        let mut buffer = MinecraftPacketBuffer::from_bytes(buffer.into_inner());
        assert!(ChunkSection::read(&mut buffer, false).is_err());
    }
}
