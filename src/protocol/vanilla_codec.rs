//! Codec implementation for the vanilla packet framing.
//! Supports zlib compression. Frames carry [`RawPacket`]s: the codec never
//! looks past the packet id.

use super::BUFFER_LIMIT;
use crate::protocol::{packet::RawPacket, DecodeError, Decoder, Encoder};
use anyhow::bail;
use flate2::Compression;
use std::{
    borrow::Cow,
    io::{Read, Write},
    num::NonZeroUsize,
};

/// Frames are written once per replayed packet, so favor speed.
const COMPRESSION_LEVEL: Compression = Compression::fast();

/// Threshold in bytes where a packet will be compressed.
#[derive(Copy, Clone, Debug)]
pub struct CompressionThreshold(NonZeroUsize);

impl CompressionThreshold {
    pub fn new(threshold: NonZeroUsize) -> Self {
        Self(threshold)
    }
}

/// Codec state.
#[derive(Debug, Default)]
pub struct VanillaCodec {
    /// Buffered incoming bytes.
    read_buffer: Vec<u8>,
    compression_state: Option<CompressionState>,
}

impl VanillaCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_compression(&mut self, threshold: CompressionThreshold) -> anyhow::Result<()> {
        if self.compression_state.is_some() {
            bail!("compression enabled twice");
        }
        self.compression_state = Some(CompressionState { threshold });
        Ok(())
    }

    /// Encodes a packet to a stream of bytes in the protocol format.
    pub fn encode_packet(&mut self, packet: &RawPacket) -> anyhow::Result<Vec<u8>> {
        let plain_buf = packet.bytes();
        let uncompressed_length = i32::try_from(plain_buf.len())?;

        let mut buf = Vec::new();
        let mut encoder = Encoder::new(&mut buf);
        match &self.compression_state {
            Some(CompressionState { threshold }) => {
                let (data_length, compressed_data) = if plain_buf.len() >= threshold.0.get() {
                    let mut zlib = flate2::write::ZlibEncoder::new(Vec::new(), COMPRESSION_LEVEL);
                    zlib.write_all(plain_buf)?;
                    (uncompressed_length, Cow::Owned(zlib.finish()?))
                } else {
                    // send uncompressed
                    (0, Cow::Borrowed(plain_buf))
                };
                encoder.write_var_int(
                    i32::try_from(var_int_size(data_length))? + i32::try_from(compressed_data.len())?,
                );
                encoder.write_var_int(data_length);
                encoder.write_slice(&compressed_data);
            }
            None => {
                encoder.write_var_int(uncompressed_length);
                encoder.write_slice(plain_buf);
            }
        }
        Ok(buf)
    }

    /// Gives data to the internal read buffer.
    ///
    /// Call `decode_packet` to get a packet.
    pub fn give_data(&mut self, data: &[u8]) {
        self.read_buffer.extend_from_slice(data);
    }

    /// Returns whether a partial frame is still buffered.
    pub fn has_pending_data(&self) -> bool {
        !self.read_buffer.is_empty()
    }

    /// Attempts to decode a packet.
    /// This should be called in a loop after any call to `give_data`
    /// until this function returns `None`.
    ///
    /// * If not enough data is available, returns `Ok(None)`.
    /// * If a packet was read, returns `Ok(Some(packet))`. More packets may be available.
    /// * If an error occurs, returns `Err(e)`, invalidating the stream.
    pub fn decode_packet(&mut self) -> anyhow::Result<Option<RawPacket>> {
        let mut decoder = Decoder::new(&self.read_buffer);
        let (length, length_size) = match decoder.read_var_int_with_size() {
            Ok(x) => x,
            Err(DecodeError::EndOfStream(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let length = usize::try_from(length)?;
        if length > BUFFER_LIMIT {
            bail!("packet length of {length} exceeds maximum allowed");
        }
        let total_bytes = length + length_size;

        let packet_contents = match decoder.consume_slice(length) {
            Ok(x) => x,
            Err(DecodeError::EndOfStream(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let plain_data = match &self.compression_state {
            Some(_) => {
                let mut decoder = Decoder::new(packet_contents);
                let uncompressed_length = usize::try_from(decoder.read_var_int()?)?;
                if uncompressed_length == 0 {
                    Cow::Borrowed(decoder.buffer())
                } else {
                    if uncompressed_length > BUFFER_LIMIT {
                        bail!("uncompressed length of {uncompressed_length} exceeds maximum allowed");
                    }
                    let mut buf = Vec::with_capacity(uncompressed_length);
                    flate2::read::ZlibDecoder::new(decoder.buffer())
                        .take(u64::try_from(BUFFER_LIMIT)?)
                        .read_to_end(&mut buf)?;
                    Cow::Owned(buf)
                }
            }
            None => Cow::Borrowed(packet_contents),
        };

        let packet = RawPacket::new(plain_data.into_owned());
        self.read_buffer.drain(..total_bytes);
        Ok(Some(packet))
    }
}

#[derive(Debug)]
struct CompressionState {
    threshold: CompressionThreshold,
}

pub fn var_int_size(x: i32) -> usize {
    Encoder::new(&mut Vec::new()).write_var_int(x)
}
