use crate::protocol::packet::{BlockPos, MinecraftPacketBuffer, Packet};
use std::io;

/// Block Change (clientbound)
#[derive(Debug, Clone)]
pub struct BlockChangePacket {
    pub position: BlockPos,
    /// Global block state id, `block << 4 | metadata`
    pub block_id: i32,
}

impl Packet for BlockChangePacket {
    fn packet_id() -> i32 {
        0x0B
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(BlockChangePacket {
            position: buffer.read_position()?,
            block_id: buffer.read_varint()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_position(self.position);
        buffer.write_varint(self.block_id);
        Ok(())
    }
}

/// Multi Block Change (clientbound). Records are relative to the chunk.
#[derive(Debug, Clone)]
pub struct MultiBlockChangePacket {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub records: Vec<BlockChangeRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChangeRecord {
    /// 0-15 within the chunk
    pub x: u8,
    pub y: u8,
    /// 0-15 within the chunk
    pub z: u8,
    pub block_id: i32,
}

impl BlockChangeRecord {
    pub fn world_position(&self, chunk_x: i32, chunk_z: i32) -> BlockPos {
        BlockPos::new(
            chunk_x * 16 + self.x as i32,
            self.y as i32,
            chunk_z * 16 + self.z as i32,
        )
    }
}

impl Packet for MultiBlockChangePacket {
    fn packet_id() -> i32 {
        0x10
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let chunk_x = buffer.read_i32()?;
        let chunk_z = buffer.read_i32()?;
        let count = buffer.read_varint()?;
        // Each record takes at least three bytes
        if count < 0 || count as usize > buffer.remaining() / 3 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record count {}", count),
            ));
        }

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let horizontal = buffer.read_u8()?;
            records.push(BlockChangeRecord {
                x: horizontal >> 4,
                z: horizontal & 0x0F,
                y: buffer.read_u8()?,
                block_id: buffer.read_varint()?,
            });
        }

        Ok(MultiBlockChangePacket {
            chunk_x,
            chunk_z,
            records,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i32(self.chunk_x);
        buffer.write_i32(self.chunk_z);
        buffer.write_varint(self.records.len() as i32);
        for record in &self.records {
            buffer.write_u8((record.x << 4) | (record.z & 0x0F));
            buffer.write_u8(record.y);
            buffer.write_varint(record.block_id);
        }
        Ok(())
    }
}

/// Unload Chunk (clientbound)
#[derive(Debug, Clone)]
pub struct UnloadChunkPacket {
    pub chunk_x: i32,
    pub chunk_z: i32,
}

impl Packet for UnloadChunkPacket {
    fn packet_id() -> i32 {
        0x1D
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(UnloadChunkPacket {
            chunk_x: buffer.read_i32()?,
            chunk_z: buffer.read_i32()?,
        })
    }
}

/// Time Update (clientbound)
#[derive(Debug, Clone)]
pub struct TimeUpdatePacket {
    pub world_age: i64,
    /// Negative when the daylight cycle is frozen
    pub time_of_day: i64,
}

impl Packet for TimeUpdatePacket {
    fn packet_id() -> i32 {
        0x47
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(TimeUpdatePacket {
            world_age: buffer.read_i64()?,
            time_of_day: buffer.read_i64()?,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i64(self.world_age);
        buffer.write_i64(self.time_of_day);
        Ok(())
    }
}

/// Spawn Position (clientbound), where the compass points.
#[derive(Debug, Clone)]
pub struct SpawnPositionPacket {
    pub position: BlockPos,
}

impl Packet for SpawnPositionPacket {
    fn packet_id() -> i32 {
        0x46
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        Ok(SpawnPositionPacket {
            position: buffer.read_position()?,
        })
    }
}
