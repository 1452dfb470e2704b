use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use std::io;

/// Chunk Data (clientbound). The section payload is kept as raw bytes and decoded by the world
/// module, which knows the dimension and therefore whether sky light is present.
#[derive(Debug, Clone)]
pub struct ChunkDataPacket {
    /// X coordinate of the chunk
    pub chunk_x: i32,
    /// Z coordinate of the chunk
    pub chunk_z: i32,
    /// Whether this is a full column, in which case biomes follow the sections
    pub ground_up_continuous: bool,
    /// Bitmask of chunk sections present in the packet, bit 0 is the lowest section
    pub primary_bit_mask: i32,
    /// Sections followed by the biome array
    pub data: Vec<u8>,
    /// Number of block entities after the data, which are not decoded
    pub block_entity_count: i32,
}

impl Packet for ChunkDataPacket {
    fn packet_id() -> i32 {
        0x20
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let chunk_x = buffer.read_i32()?;
        let chunk_z = buffer.read_i32()?;
        let ground_up_continuous = buffer.read_bool()?;
        let primary_bit_mask = buffer.read_varint()?;
        let data = buffer.read_byte_array()?;
        let block_entity_count = buffer.read_varint()?;

        Ok(ChunkDataPacket {
            chunk_x,
            chunk_z,
            ground_up_continuous,
            primary_bit_mask,
            data,
            block_entity_count,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i32(self.chunk_x);
        buffer.write_i32(self.chunk_z);
        buffer.write_bool(self.ground_up_continuous);
        buffer.write_varint(self.primary_bit_mask);
        buffer.write_byte_array(&self.data);
        buffer.write_varint(0);
        Ok(())
    }
}
