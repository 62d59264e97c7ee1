//! Per-connection frame loop

use crate::capture::{hex_string, CaptureSink};
use crate::dispatch::{Dispatcher, MessageHandler};
use crate::error::Result;
use smartap_core::handshake::Handshake;
use smartap_core::wire::{self, opcode};
use smartap_core::{frame, Error};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Drive one upgraded connection until the peer closes it.
///
/// Performs the handshake, then loops on frames. A protocol decode failure
/// is logged with the offending bytes and the connection stays up; the
/// device keeps broadcasting regardless, and dropping it would only cost a
/// reconnect cycle.
pub async fn serve_connection<S, H>(
    mut stream: S,
    peer: &str,
    dispatcher: &Dispatcher<H>,
    capture: Option<&CaptureSink>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: MessageHandler,
{
    let mut handshake = Handshake::new();
    let request = handshake.run(&mut stream).await?;
    info!(%peer, target = %request.target, "websocket upgraded");

    loop {
        let ws = match wire::read_frame(&mut stream).await {
            Ok(ws) => ws,
            // Device closed the TCP stream without a close frame; normal
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                info!(%peer, "connection closed by peer");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(sink) = capture {
            sink.record_inbound(peer, &ws)?;
        }

        match ws.opcode {
            opcode::BINARY => {
                if let Err(e) = dispatcher.dispatch(peer, &ws.payload) {
                    warn!(
                        %peer,
                        error = %e,
                        payload = %hex_string(&ws.payload),
                        "failed to decode payload"
                    );
                }
            }
            opcode::TEXT => {
                // Never observed from this firmware; log and move on
                debug!(%peer, len = ws.payload.len(), "unexpected text frame");
            }
            opcode::PING => {
                let pong = wire::pong_frame(&ws.payload)?;
                stream.write_all(&pong).await?;
                stream.flush().await?;
            }
            opcode::CLOSE => {
                info!(%peer, "close frame received");
                return Ok(());
            }
            other => {
                debug!(%peer, opcode = other, "ignoring frame");
            }
        }
    }
}

/// Send a prebuilt device frame to the peer inside a binary WebSocket frame.
///
/// The frame is self-checked before it goes out; a frame that fails the
/// strict validation would be silently ignored by the device, which is much
/// harder to diagnose than an error here.
pub async fn send_message<S>(
    stream: &mut S,
    peer: &str,
    capture: Option<&CaptureSink>,
    device_frame: &[u8],
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    frame::validate_frame(device_frame)?;
    let ws = wire::binary_frame(device_frame)?;

    stream.write_all(&ws).await?;
    stream.flush().await?;

    if let Some(sink) = capture {
        sink.record_outbound(peer, device_frame, &ws)?;
    }

    debug!(%peer, len = device_frame.len(), "frame sent");
    Ok(())
}
