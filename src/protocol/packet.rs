use byteorder::{BigEndian, ByteOrder};
use std::io::{self};

/// Packet trait. Contains the packet ID and the functions to write and read the packet body.
/// The id itself is never part of the body, it is added by the envelope.
pub trait Packet {
    /// Packet ID
    fn packet_id() -> i32
    where
        Self: Sized;

    /// Reads the packet body from the buffer. Default implementation is used for serverbound
    /// packets, which the client never has to read.
    fn read_from_buffer(_buffer: &mut MinecraftPacketBuffer) -> io::Result<Self>
    where
        Self: Sized,
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Serverbound packets are never read by the client",
        ))
    }

    /// Writes the packet body to the buffer. Default implementation is used for clientbound
    /// packets, which the client never has to write.
    fn write_to_buffer(&self, _buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Clientbound packets are never written by the client",
        ))
    }
}

/// One protocol message as it travels through the envelope: an id and its opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    id: i32,
    data: Vec<u8>,
}

impl RawPacket {
    pub fn new(id: i32, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// Serializes a typed packet into its id and body.
    pub fn from_packet<P: Packet>(packet: &P) -> io::Result<Self> {
        let mut buffer = MinecraftPacketBuffer::new();
        packet.write_to_buffer(&mut buffer)?;
        Ok(Self::new(P::packet_id(), buffer.buffer))
    }

    /// Decodes the body as a typed packet. Trailing bytes are left unread.
    pub fn decode<P: Packet>(&self) -> io::Result<P> {
        if self.id != P::packet_id() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Expected packet 0x{:02x}, got 0x{:02x}",
                    P::packet_id(),
                    self.id
                ),
            ));
        }
        let mut buffer = MinecraftPacketBuffer::from_slice(&self.data);
        P::read_from_buffer(&mut buffer)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Block coordinates as carried by the packed 64-bit position field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Packs the coordinates as x (26 bits), y (12 bits), z (26 bits).
    pub fn to_packed(self) -> u64 {
        ((self.x as u64 & 0x3FF_FFFF) << 38) | ((self.y as u64 & 0xFFF) << 26) | (self.z as u64 & 0x3FF_FFFF)
    }

    pub fn from_packed(value: u64) -> Self {
        let value = value as i64;
        Self {
            x: (value >> 38) as i32,
            y: ((value << 26) >> 52) as i32,
            z: ((value << 38) >> 38) as i32,
        }
    }
}

/// Longest VarInt on the wire.
pub const MAX_VARINT_LEN: usize = 5;

/// Number of bytes `value` takes as a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut value = value as u32;
    let mut len = 1;
    while value & !0x7F != 0 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Minecraft packet buffer. Contains the buffer and the cursor.
/// The cursor is used to keep track of the current position in the buffer.
/// The buffer is used to store the packet data.
#[derive(Debug, Default)]
pub struct MinecraftPacketBuffer {
    pub buffer: Vec<u8>,
    cursor: usize,
}

impl MinecraftPacketBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes.to_vec())
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Takes the next `len` bytes, failing without moving the cursor if fewer are left.
    fn take(&mut self, len: usize, what: &str) -> io::Result<&[u8]> {
        if self.remaining() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Not enough bytes to read {}", what),
            ));
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.buffer[start..start + len])
    }

    /// Writes a VarInt to the buffer.
    /// A VarInt is a variable-length integer. It is encoded using 7 bits per byte, least
    /// significant group first, with the most significant bit of each byte set to 1 unless it is
    /// the final byte. Negative values always take 5 bytes.
    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        while (value & !0x7F) != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push((value & 0x7F) as u8);
    }

    /// Reads a VarInt from the buffer. Fails on more than 5 bytes or on a truncated value.
    pub fn read_varint(&mut self) -> io::Result<i32> {
        let mut result: u32 = 0;

        for i in 0..MAX_VARINT_LEN {
            let byte = self.take(1, "VarInt")?[0];
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if (byte & 0x80) == 0 {
                return Ok(result as i32);
            }
        }

        Err(io::Error::new(io::ErrorKind::InvalidData, "VarInt too big"))
    }

    /// Writes a string as a VarInt byte length followed by its UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        self.write_varint(bytes.len() as i32);
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_string(&mut self) -> io::Result<String> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Negative string length",
            ));
        }
        let bytes = self.take(length as usize, "the full string")?.to_vec();
        String::from_utf8(bytes).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "Failed to convert bytes to UTF-8 string",
            )
        })
    }

    /// Reads a string whose byte length must not exceed `max_len`.
    pub fn read_string_max(&mut self, max_len: usize) -> io::Result<String> {
        let value = self.read_string()?;
        if value.len() > max_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("String of {} bytes exceeds {}", value.len(), max_len),
            ));
        }
        Ok(value)
    }

    /// Writes a byte array prefixed with its VarInt length.
    pub fn write_byte_array(&mut self, value: &[u8]) {
        self.write_varint(value.len() as i32);
        self.buffer.extend_from_slice(value);
    }

    pub fn read_byte_array(&mut self) -> io::Result<Vec<u8>> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Negative array length",
            ));
        }
        self.read_bytes(length as usize)
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buffer.extend_from_slice(value);
    }

    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        Ok(self.take(len, "byte array")?.to_vec())
    }

    /// Consumes everything left in the buffer.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let rest = self.buffer[self.cursor..].to_vec();
        self.cursor = self.buffer.len();
        rest
    }

    /// Writes a UUID as its 16 raw bytes, most significant first.
    pub fn write_uuid(&mut self, value: uuid::Uuid) {
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn read_uuid(&mut self) -> io::Result<uuid::Uuid> {
        let bytes = self.take(16, "UUID")?;
        Ok(uuid::Uuid::from_u128(BigEndian::read_u128(bytes)))
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? == 0x01)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.push(value as u8);
    }

    pub fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    // Write an u16 in network (big-endian) order.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    // Read an u16 in network (big-endian) order.
    pub fn read_u16(&mut self) -> io::Result<u16> {
        Ok(BigEndian::read_u16(self.take(2, "u16")?))
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(BigEndian::read_u32(self.take(4, "u32")?))
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        Ok(BigEndian::read_u64(self.take(8, "u64")?))
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Floats travel as their IEEE-754 bit pattern.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn read_f64(&mut self) -> io::Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn write_position(&mut self, value: BlockPos) {
        self.write_u64(value.to_packed());
    }

    pub fn read_position(&mut self) -> io::Result<BlockPos> {
        Ok(BlockPos::from_packed(self.read_u64()?))
    }

    /// Writes an angle in degrees as steps of 1/256 of a full turn.
    pub fn write_angle(&mut self, degrees: f32) {
        let steps = (degrees * 256.0 / 360.0).round() as i64;
        self.buffer.push((steps & 0xFF) as u8);
    }

    /// Reads an angle and returns it in degrees.
    pub fn read_angle(&mut self) -> io::Result<f32> {
        Ok(self.read_u8()? as f32 * 360.0 / 256.0)
    }
}
