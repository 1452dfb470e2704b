use crate::error::{ClientError, Result};
use crate::protocol::packet::{varint_len, MinecraftPacketBuffer, RawPacket, MAX_VARINT_LEN};
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

/// Largest frame body a 3-byte length prefix can announce.
pub const MAX_FRAME_LEN: usize = 2_097_151;
/// Largest body we agree to inflate.
pub const MAX_UNCOMPRESSED_LEN: usize = 8_388_608;
/// Threshold value meaning compression is off.
pub const COMPRESSION_DISABLED: i32 = -1;

/// Frames a packet for the wire.
///
/// With `threshold < 0` the frame is `VarInt(len) || id || payload`. Otherwise an inner VarInt
/// follows the length: the uncompressed size when `id || payload` is longer than the threshold
/// and the body is zlib-compressed, or `0` when the body is sent literally.
pub fn frame(packet: &RawPacket, threshold: i32) -> Result<Vec<u8>> {
    let mut body = MinecraftPacketBuffer::new();
    body.write_varint(packet.id());
    body.write_bytes(packet.data());
    let body = body.into_inner();

    let mut out = MinecraftPacketBuffer::new();
    if threshold < 0 {
        check_frame_len(body.len())?;
        out.write_varint(body.len() as i32);
        out.write_bytes(&body);
    } else if body.len() > threshold as usize {
        let compressed = compress(&body)?;
        let total = varint_len(body.len() as i32) + compressed.len();
        check_frame_len(total)?;
        out.write_varint(total as i32);
        out.write_varint(body.len() as i32);
        out.write_bytes(&compressed);
    } else {
        check_frame_len(body.len() + 1)?;
        out.write_varint(body.len() as i32 + 1);
        out.write_varint(0);
        out.write_bytes(&body);
    }
    Ok(out.into_inner())
}

/// Reads one frame from an in-memory buffer, leaving the cursor right after it.
pub fn deframe(buffer: &mut MinecraftPacketBuffer, compression_active: bool) -> Result<RawPacket> {
    let len = checked_len(buffer.read_varint()?)?;
    let body = buffer.read_bytes(len)?;
    unpack(body, compression_active)
}

/// Reads exactly one frame from an async stream, one byte at a time for the length prefix so that
/// nothing past the frame is consumed.
pub async fn read_packet<R>(reader: &mut R, compression_active: bool) -> Result<RawPacket>
where
    R: AsyncRead + Unpin,
{
    let len = checked_len(read_varint_async(reader).await?)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    unpack(body, compression_active)
}

pub async fn write_packet<W>(writer: &mut W, packet: &RawPacket, threshold: i32) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame(packet, threshold)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_varint_async<R>(reader: &mut R) -> Result<i32>
where
    R: AsyncRead + Unpin,
{
    let mut result: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && i == 0 => {
                return Err(ClientError::ConnectionClosed)
            }
            Err(e) => return Err(e.into()),
        };
        result |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result as i32);
        }
    }
    Err(ClientError::FramingError("VarInt too big".to_owned()))
}

fn checked_len(len: i32) -> Result<usize> {
    if len <= 0 {
        return Err(ClientError::FramingError(format!(
            "Invalid frame length {}",
            len
        )));
    }
    check_frame_len(len as usize)?;
    Ok(len as usize)
}

fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_FRAME_LEN {
        return Err(ClientError::FramingError(format!(
            "Frame of {} bytes exceeds {}",
            len, MAX_FRAME_LEN
        )));
    }
    Ok(())
}

/// Turns a frame body (everything after the outer length) into a packet.
fn unpack(body: Vec<u8>, compression_active: bool) -> Result<RawPacket> {
    let body = if compression_active {
        let mut buffer = MinecraftPacketBuffer::from_bytes(body);
        let declared = buffer.read_varint()?;
        let rest = buffer.read_remaining();
        match declared {
            0 => rest,
            n if n < 0 || n as usize > MAX_UNCOMPRESSED_LEN => {
                return Err(ClientError::FramingError(format!(
                    "Invalid uncompressed length {}",
                    n
                )))
            }
            n => decompress(&rest, n as usize)?,
        }
    } else {
        body
    };

    if body.is_empty() {
        return Err(ClientError::FramingError("Empty packet body".to_owned()));
    }
    let mut buffer = MinecraftPacketBuffer::from_bytes(body);
    let id = buffer.read_varint()?;
    Ok(RawPacket::new(id, buffer.read_remaining()))
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    // One extra byte is enough to notice a body longer than announced.
    ZlibDecoder::new(data)
        .take(expected as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() != expected {
        return Err(ClientError::FramingError(format!(
            "Decompressed {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

/// Frame codec for the play phase. Carries the compression threshold negotiated during login.
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    threshold: i32,
}

impl PacketCodec {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(COMPRESSION_DISABLED)
    }
}

impl Decoder for PacketCodec {
    type Item = RawPacket;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawPacket>> {
        let mut len: u32 = 0;
        let mut header = 0;
        loop {
            if header == MAX_VARINT_LEN {
                return Err(ClientError::FramingError("VarInt too big".to_owned()));
            }
            let Some(&byte) = src.get(header) else {
                return Ok(None);
            };
            len |= ((byte & 0x7F) as u32) << (7 * header);
            header += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }

        let len = checked_len(len as i32)?;
        if src.len() < header + len {
            src.reserve(header + len - src.len());
            return Ok(None);
        }

        src.advance(header);
        let body = src.split_to(len);
        unpack(body.to_vec(), self.threshold >= 0).map(Some)
    }
}

impl Encoder<RawPacket> for PacketCodec {
    type Error = ClientError;

    fn encode(&mut self, item: RawPacket, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&frame(&item, self.threshold)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Returns the inner VarInt of a compressed-format frame.
    fn inner_length(framed: &[u8]) -> i32 {
        let mut buffer = MinecraftPacketBuffer::from_slice(framed);
        buffer.read_varint().unwrap();
        buffer.read_varint().unwrap()
    }

    #[test]
    fn test_uncompressed_frame_layout() {
        let packet = RawPacket::new(0x1F, vec![1, 2, 3]);
        let framed = frame(&packet, COMPRESSION_DISABLED).unwrap();
        assert_eq!(framed, vec![4, 0x1F, 1, 2, 3]);
    }

    #[test]
    fn test_frame_round_trip() {
        for threshold in [COMPRESSION_DISABLED, 0, 64, 256] {
            for len in [0, 10, 63, 64, 65, 255, 300, 5000] {
                let packet = RawPacket::new(0x20, payload(len));
                let framed = frame(&packet, threshold).unwrap();
                let mut buffer = MinecraftPacketBuffer::from_bytes(framed);
                let decoded = deframe(&mut buffer, threshold >= 0).unwrap();
                assert_eq!(decoded, packet, "threshold {} len {}", threshold, len);
                assert_eq!(buffer.remaining(), 0);
            }
        }
    }

    #[test]
    fn test_threshold_selects_compression() {
        // id (1 byte) + 299 bytes of payload = 300 bytes of body
        let large = RawPacket::new(0x0F, payload(299));
        let small = RawPacket::new(0x0F, payload(99));

        let framed = frame(&large, 256).unwrap();
        assert_eq!(inner_length(&framed), 300);

        let framed = frame(&small, 256).unwrap();
        assert_eq!(inner_length(&framed), 0);
        assert_eq!(framed.len(), 2 + 100);
    }

    #[test]
    fn test_compressed_total_length() {
        let packet = RawPacket::new(0x20, vec![0; 1000]);
        let framed = frame(&packet, 256).unwrap();
        let mut buffer = MinecraftPacketBuffer::from_slice(&framed);
        let total = buffer.read_varint().unwrap() as usize;
        assert_eq!(total, buffer.remaining());
    }

    #[test]
    fn test_rejects_non_positive_length() {
        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0x00]);
        assert_matches!(deframe(&mut buffer, false), Err(ClientError::FramingError(_)));

        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_matches!(deframe(&mut buffer, false), Err(ClientError::FramingError(_)));
    }

    #[test]
    fn test_rejects_decompressed_length_mismatch() {
        let compressed = compress(&[0x01, 0x02, 0x03]).unwrap();
        let mut framed = MinecraftPacketBuffer::new();
        framed.write_varint(1 + compressed.len() as i32);
        framed.write_varint(4);
        framed.write_bytes(&compressed);

        let mut buffer = MinecraftPacketBuffer::from_bytes(framed.into_inner());
        assert_matches!(deframe(&mut buffer, true), Err(ClientError::FramingError(_)));
    }

    #[test]
    fn test_codec_waits_for_full_frame() {
        let mut codec = PacketCodec::new(128);
        let framed = frame(&RawPacket::new(0x26, payload(500)), 128).unwrap();

        let mut src = BytesMut::new();
        src.extend_from_slice(&framed[..1]);
        assert_matches!(codec.decode(&mut src), Ok(None));
        src.extend_from_slice(&framed[1..10]);
        assert_matches!(codec.decode(&mut src), Ok(None));
        src.extend_from_slice(&framed[10..]);
        src.extend_from_slice(&frame(&RawPacket::new(0x1F, vec![9]), 128).unwrap());

        let first = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(first.id(), 0x26);
        assert_eq!(first.data().len(), 500);
        let second = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(second, RawPacket::new(0x1F, vec![9]));
        assert!(src.is_empty());
    }

    #[test]
    fn test_codec_encoder_matches_frame() {
        let mut codec = PacketCodec::default();
        let packet = RawPacket::new(0x02, b"hi".to_vec());
        let mut dst = BytesMut::new();
        codec.encode(packet.clone(), &mut dst).unwrap();
        assert_eq!(&dst[..], &frame(&packet, COMPRESSION_DISABLED).unwrap()[..]);
    }

    #[tokio::test]
    async fn test_read_packet_stops_at_frame_end() {
        let mut bytes = frame(&RawPacket::new(0x03, vec![0x80, 0x02]), COMPRESSION_DISABLED).unwrap();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let mut reader = tokio_test::io::Builder::new().read(&bytes).build();

        let packet = read_packet(&mut reader, false).await.unwrap();
        assert_eq!(packet, RawPacket::new(0x03, vec![0x80, 0x02]));
        let mut rest = [0u8; 2];
        reader.read_exact(&mut rest).await.unwrap();
        assert_eq!(rest, [0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn test_read_packet_on_closed_stream() {
        let mut reader = tokio_test::io::Builder::new().build();
        assert_matches!(
            read_packet(&mut reader, false).await,
            Err(ClientError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_write_packet() {
        let packet = RawPacket::new(0x0B, vec![0, 0, 0, 0, 0, 0, 0, 7]);
        let expected = frame(&packet, 256).unwrap();
        let mut writer = tokio_test::io::Builder::new().write(&expected).build();
        write_packet(&mut writer, &packet, 256).await.unwrap();
    }
}
