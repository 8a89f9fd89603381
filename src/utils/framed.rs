//! Length-prefixed MessagePack framing over async byte streams.
//!
//! Every frame is a big-endian `u64` body length followed by the
//! `rmp-serde`-encoded body.

use std::marker::Unpin;

use crate::utils::TribError;

use bytes::{BufMut, BytesMut};

use serde::de::DeserializeOwned;
use serde::Serialize;

use rmp_serde::decode::from_slice as decode_from_slice;
use rmp_serde::encode::to_vec as encode_to_vec;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Largest frame body accepted from a peer.
pub(crate) const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

/// Sends an object of type `T` through writable connection `conn_write` as a
/// single frame.
pub(crate) async fn write_frame<T, Conn>(
    obj: &T,
    conn_write: &mut Conn,
) -> Result<(), TribError>
where
    T: Serialize,
    Conn: AsyncWriteExt + Unpin,
{
    let obj_bytes = encode_to_vec(obj)?;
    let mut frame = BytesMut::with_capacity(8 + obj_bytes.len());
    frame.put_u64(obj_bytes.len() as u64); // length first
    frame.extend_from_slice(&obj_bytes);
    conn_write.write_all(&frame).await?;
    conn_write.flush().await?;
    Ok(())
}

/// Receives an object of type `T` from readable connection `conn_read`.
/// Returns:
///   - `Ok(Some(obj))` if a whole frame was read
///   - `Ok(None)` if the peer closed the connection cleanly between frames
///   - `Err(err)` if the peer closed mid-frame (including inside the length
///     prefix) or any other error occurs
pub(crate) async fn read_frame<T, Conn>(
    conn_read: &mut Conn,
) -> Result<Option<T>, TribError>
where
    T: DeserializeOwned,
    Conn: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 8];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = conn_read.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TribError::msg(format!(
                "connection closed after {} of {} length bytes",
                filled,
                len_buf.len()
            )));
        }
        filled += n;
    }
    let obj_len = u64::from_be_bytes(len_buf);
    if obj_len > MAX_FRAME_LEN {
        return Err(TribError::msg(format!(
            "frame length {} exceeds limit {}",
            obj_len, MAX_FRAME_LEN
        )));
    }

    #[allow(clippy::cast_possible_truncation)]
    let mut obj_buf: Vec<u8> = vec![0; obj_len as usize];
    conn_read.read_exact(&mut obj_buf[..]).await?;
    let obj = decode_from_slice(&obj_buf)?;
    Ok(Some(obj))
}
