// Multipart JPEG stream channel
//
// A request whose first line carries the stream path is upgraded into a
// persistent multipart response; anything else is closed with no body. One
// viewer at a time, and the loop holds the process until the viewer goes
// away or the camera fails.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::camera::CameraSource;
use crate::config::{FRAME_INTERVAL, STREAM_BOUNDARY, STREAM_PATH};

/// Serve one accepted stream connection to completion. Returns `Ok` for a
/// rejected request or a camera failure; a viewer disconnect surfaces as the
/// write error that ended the loop.
pub async fn serve_connection<S>(
    stream: S,
    camera: &mut dyn CameraSource,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut request_line = String::new();
    BufReader::new(read_half).read_line(&mut request_line).await?;

    if !request_line.contains(STREAM_PATH) {
        info!("Rejecting request: {:?}", request_line.trim_end());
        return Ok(());
    }

    write_half
        .write_all(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={}\r\n\r\n",
                STREAM_BOUNDARY
            )
            .as_bytes(),
        )
        .await?;
    info!("Stream started");

    loop {
        let frame = match camera.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame acquisition failed, ending stream: {}", e);
                return Ok(());
            }
        };

        let part_header = format!(
            "\r\n--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            STREAM_BOUNDARY,
            frame.len()
        );
        write_half.write_all(part_header.as_bytes()).await?;
        write_half.write_all(frame.as_bytes()).await?;
        write_half.flush().await?;
        // Frame buffer goes back to the peripheral here, before the pacing
        // delay.
        drop(frame);

        sleep(FRAME_INTERVAL).await;
    }
}
