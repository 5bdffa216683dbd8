//! Scripted module task
//!
//! Serves a [`ScriptedModule`] over an async stream until the driver side
//! closes it.

use std::io;

use sara_protocol::LineCodec;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::module::{ScriptedModule, SimReport};

/// Run the module until the stream closes, then report what it saw
pub async fn run_scripted_module<S>(mut stream: S, mut module: ScriptedModule) -> io::Result<SimReport>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = LineCodec::new();
    let mut buf = [0u8; 1024];

    info!("Starting scripted module {}", module.name());

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            debug!("Scripted module stream closed for {}", module.name());
            break;
        }

        codec.push_bytes(&buf[..n]);
        while let Some(command) = codec.next_line() {
            if command.is_empty() {
                continue;
            }
            let reply = module.handle(&command);
            if !reply.is_empty() {
                stream.write_all(&reply).await?;
                stream.flush().await?;
            }
        }
    }

    Ok(module.report())
}

/// Spawn the module on a fresh duplex stream and return the driver's end
pub fn spawn_scripted_module(module: ScriptedModule) -> (DuplexStream, JoinHandle<io::Result<SimReport>>) {
    let (driver, device) = duplex(4096);
    let handle = tokio::spawn(run_scripted_module(device, module));
    (driver, handle)
}

#[cfg(test)]
mod tests {
    use sara_protocol::ModuleVariant;

    use super::*;

    #[tokio::test]
    async fn test_task_answers_commands() {
        let module = ScriptedModule::new(ModuleVariant::SaraN211)
            .expect("AT+CGPADDR", &["+CGPADDR: 0,\"10.0.0.7\"", "OK"]);
        let (mut driver, handle) = spawn_scripted_module(module);

        driver.write_all(b"AT+CGPADDR\r\n").await.unwrap();

        let expected = b"\r\n+CGPADDR: 0,\"10.0.0.7\"\r\n\r\nOK\r\n";
        let mut reply = vec![0u8; expected.len()];
        driver.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, expected.to_vec());

        drop(driver);
        let report = handle.await.unwrap().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.received, vec!["AT+CGPADDR"]);
    }
}
