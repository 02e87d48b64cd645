// Line-oriented command channel
//
// One connection at a time. Lines are read until EOF or an I/O error with no
// read timeout and no length cap beyond the newline, so a silent client holds
// the whole loop. That matches the scheduling model in `runtime`.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

use crate::runtime::Runtime;

/// Serve one accepted command connection to completion: read a line, trim,
/// skip empties, hand the rest to the dispatcher. Returns when the client
/// disconnects or transport fails.
pub async fn serve_connection<S>(stream: S, runtime: &mut Runtime) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        runtime.handle_line(line, &mut write_half).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::HostLink;
    use crate::motor::{MotorDriver, SimBridge};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    fn sim_runtime() -> Runtime {
        let driver = MotorDriver::new(Box::new(SimBridge::new()));
        let link = Box::new(HostLink::new("192.168.1.100".parse().unwrap()));
        Runtime::new(driver, link)
    }

    #[tokio::test]
    async fn serves_a_session_of_mixed_lines() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, mut client_write) = tokio::io::split(client);
        let mut runtime = sim_runtime();

        client_write
            .write_all(
                concat!(
                    "not json\n",
                    "\n",
                    "   \n",
                    "{\"action\":\"move\",\"left_motor\":200,\"right_motor\":-100,\"duration\":0}\n",
                    "{\"action\":\"get_status\"}\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        serve_connection(server, &mut runtime).await.unwrap();

        // The malformed line was discarded, the movement applied.
        let state = runtime.actuator_state();
        assert_eq!(state.left_speed, 200);
        assert_eq!(state.right_speed, -100);
        assert!(state.motors_enabled);

        // The status reply came back on the same connection as one JSON line.
        let mut reply = String::new();
        BufReader::new(client_read)
            .read_line(&mut reply)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(reply.trim_end()).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["motors_enabled"], true);
    }

    #[tokio::test]
    async fn eof_without_any_line_is_a_clean_exit() {
        let (client, server) = tokio::io::duplex(1024);
        let mut runtime = sim_runtime();
        drop(client);

        serve_connection(server, &mut runtime).await.unwrap();
        assert_eq!(runtime.actuator_state(), Default::default());
    }

    #[tokio::test]
    async fn lines_with_surrounding_whitespace_still_dispatch() {
        let (client, server) = tokio::io::duplex(4096);
        let (_client_read, mut client_write) = tokio::io::split(client);
        let mut runtime = sim_runtime();

        client_write
            .write_all(b"  {\"action\":\"move\",\"left_motor\":50,\"duration\":0}  \r\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        serve_connection(server, &mut runtime).await.unwrap();
        assert_eq!(runtime.actuator_state().left_speed, 50);
    }
}
