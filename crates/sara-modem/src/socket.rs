//! Logical socket multiplexer
//!
//! The module owns the real sockets; the driver only keeps a table of the ids
//! it handed out, the local port each was created on and whether the socket
//! may receive yet. All traffic goes through the command engine.

use std::collections::BTreeMap;

use rand::Rng;
use sara_protocol::{parse_socket_id, AtCommand, ModuleVariant, ParseError, ReadReply, SocketProtocol};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::ModemError;
use crate::modem::Modem;
use crate::state::descriptor_socket;
use crate::variant::{ReceiveStrategy, SocketIdSource};

/// Local ports picked when the caller does not name one
const DEFAULT_PORT_RANGE: std::ops::Range<u16> = 100..65534;

/// One open socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub id: u8,
    pub protocol: SocketProtocol,
    pub port: Option<u16>,
    /// Set by the first send or bind; receiving requires it
    pub ready: bool,
}

/// Open sockets keyed by module-assigned id
#[derive(Debug, Clone, Default)]
pub struct SocketTable {
    entries: BTreeMap<u8, SocketEntry>,
}

impl SocketTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u8) -> Option<&SocketEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids currently open, ascending
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.keys().copied()
    }

    /// Register a socket; an id still in the table is never reused
    pub fn insert(&mut self, entry: SocketEntry) -> Result<(), ModemError> {
        if self.entries.contains_key(&entry.id) {
            return Err(ModemError::SocketInUse(entry.id));
        }
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    pub fn remove(&mut self, id: u8) -> Option<SocketEntry> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry_mut(&mut self, id: u8) -> Result<&mut SocketEntry, ModemError> {
        self.entries.get_mut(&id).ok_or(ModemError::SocketNotFound(id))
    }
}

/// A datagram received from the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub host: String,
    pub port: u16,
}

impl From<ReadReply> for Datagram {
    fn from(reply: ReadReply) -> Self {
        Self {
            payload: reply.payload,
            host: reply.host,
            port: reply.port,
        }
    }
}

impl<T> Modem<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a socket and return its module-assigned id
    pub async fn create_socket(
        &mut self,
        protocol: SocketProtocol,
        port: Option<u16>,
    ) -> Result<u8, ModemError> {
        self.require(
            self.profile.supports_protocol(protocol),
            &format!("{} sockets", protocol.name()),
        )?;

        let port = match self.profile.variant {
            ModuleVariant::SaraN211 => {
                Some(port.unwrap_or_else(|| rand::thread_rng().gen_range(DEFAULT_PORT_RANGE)))
            }
            ModuleVariant::SaraR4 => port,
        };
        info!("Creating {} socket on port {:?}", protocol.name(), port);

        let command = self.profile.create_socket_command(protocol, port);
        let ircs = match self.profile.socket_id_source {
            SocketIdSource::Irc => self.at(&command).await?,
            SocketIdSource::CapturedUrc => self.at_capture(&command, &["+USOCR:"]).await?,
        };

        let id = ircs
            .iter()
            .find_map(|line| parse_socket_id(line).ok())
            .ok_or_else(|| ParseError::InvalidSocketId(ircs.join(" ")))?;

        self.sockets.insert(SocketEntry {
            id,
            protocol,
            port,
            ready: false,
        })?;
        info!("Socket created with id: {}", id);
        Ok(id)
    }

    /// Close a socket
    ///
    /// The table entry is removed before the close command is sent, so it is
    /// gone even if the module rejects the command.
    pub async fn close_socket(&mut self, id: u8) -> Result<(), ModemError> {
        self.sockets
            .remove(id)
            .ok_or(ModemError::SocketNotFound(id))?;

        info!("Closing socket {}", id);
        let command = self.profile.close_socket_command(id);
        self.at(&command).await?;
        Ok(())
    }

    /// Send `payload` to `host:port`
    pub async fn send_to(
        &mut self,
        id: u8,
        host: &str,
        port: u16,
        payload: &[u8],
    ) -> Result<(), ModemError> {
        if !self.sockets.contains(id) {
            return Err(ModemError::SocketNotFound(id));
        }

        debug!("Sending {} bytes to {}:{} on socket {}", payload.len(), host, port, id);
        let command = self.profile.send_command(id, host, port, payload);
        self.at(&command).await?;

        self.sockets.entry_mut(id)?.ready = true;
        Ok(())
    }

    /// Bind a socket to a local port so it can receive before sending
    ///
    /// The N211 has no listen command; its sockets are bound at creation and
    /// can only be bound to that port.
    pub async fn bind(&mut self, id: u8, port: u16) -> Result<(), ModemError> {
        let created_on = self
            .sockets
            .get(id)
            .ok_or(ModemError::SocketNotFound(id))?
            .port;

        if self.profile.capabilities.listen {
            self.at(&AtCommand::Listen { id, port }).await?;
        } else if created_on != Some(port) {
            self.require(false, "binding to a port other than the creation port")?;
        }

        let entry = self.sockets.entry_mut(id)?;
        entry.port = Some(port);
        entry.ready = true;
        info!("Socket {} bound to port {}", id, port);
        Ok(())
    }

    /// Receive one datagram of at most `bufsize` bytes
    ///
    /// On the N211 this waits for an incoming message indicator and fails
    /// with a timeout if none arrives. Bytes beyond `bufsize` stay queued for
    /// the next receive. On the R4 the socket is polled and
    /// `None` is returned when the receive timeout elapses.
    pub async fn recv_from(
        &mut self,
        id: u8,
        bufsize: usize,
    ) -> Result<Option<Datagram>, ModemError> {
        let entry = self.sockets.get(id).ok_or(ModemError::SocketNotFound(id))?;
        if !entry.ready {
            return Err(ModemError::SocketNotReady(id));
        }

        match self.profile.receive_strategy {
            ReceiveStrategy::Indicator => self.recv_indicated(id, bufsize).await,
            ReceiveStrategy::Polling => self.recv_polled(id, bufsize).await,
        }
    }

    async fn recv_indicated(
        &mut self,
        id: u8,
        bufsize: usize,
    ) -> Result<Option<Datagram>, ModemError> {
        let timeout = self.config.indicator_timeout();
        let deadline = Instant::now() + timeout;

        let operation = format!("message on socket {}", id);

        let descriptor = loop {
            if let Some(descriptor) = self.state.take_message_for(id) {
                break descriptor;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ModemError::Timeout {
                    operation,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            self.read_until("+NSONMI:", &operation, remaining).await?;
        };

        let descriptor = read_descriptor(&descriptor, bufsize).unwrap_or(descriptor);
        debug!("Reading message {}", descriptor);

        for line in self.at(&AtCommand::ReadDatagram { descriptor }).await? {
            if let Some(reply) = ReadReply::parse(&line)? {
                // No new indicator follows for what the read left behind
                if reply.remaining > 0 {
                    self.state
                        .requeue_message(format!("{},{}", reply.socket, reply.remaining));
                }
                return Ok(Some(reply.into()));
            }
        }
        Ok(None)
    }

    async fn recv_polled(
        &mut self,
        id: u8,
        bufsize: usize,
    ) -> Result<Option<Datagram>, ModemError> {
        let interval = self.config.receive_poll_interval();
        let deadline = Instant::now() + self.config.receive_timeout();
        let command = AtCommand::ReceiveFrom { id, length: bufsize };

        loop {
            for line in self.at_capture(&command, &["+USORF:"]).await? {
                if let Some(reply) = ReadReply::parse(&line)? {
                    return Ok(Some(reply.into()));
                }
            }

            if Instant::now() + interval > deadline {
                debug!("No data on socket {} before the receive timeout", id);
                return Ok(None);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Borrow an open socket
    pub fn socket(&mut self, id: u8) -> Result<Socket<'_, T>, ModemError> {
        if !self.sockets.contains(id) {
            return Err(ModemError::SocketNotFound(id));
        }
        Ok(Socket { modem: self, id })
    }

    /// Create a socket and borrow it
    pub async fn open_socket(
        &mut self,
        protocol: SocketProtocol,
        port: Option<u16>,
    ) -> Result<Socket<'_, T>, ModemError> {
        let id = self.create_socket(protocol, port).await?;
        Ok(Socket { modem: self, id })
    }
}

/// Rewrite `<socket>,<length>` with the length capped at `bufsize`
fn read_descriptor(descriptor: &str, bufsize: usize) -> Option<String> {
    let socket = descriptor_socket(descriptor)?;
    let length = descriptor.split(',').nth(1)?.trim().parse::<usize>().ok()?;
    Some(format!("{},{}", socket, length.min(bufsize)))
}

/// A socket borrowed from its [`Modem`]
pub struct Socket<'a, T> {
    modem: &'a mut Modem<T>,
    id: u8,
}

impl<T> Socket<'_, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn id(&self) -> u8 {
        self.id
    }

    pub async fn send_to(&mut self, payload: &[u8], host: &str, port: u16) -> Result<(), ModemError> {
        self.modem.send_to(self.id, host, port, payload).await
    }

    pub async fn recv_from(&mut self, bufsize: usize) -> Result<Option<Datagram>, ModemError> {
        self.modem.recv_from(self.id, bufsize).await
    }

    pub async fn bind(&mut self, port: u16) -> Result<(), ModemError> {
        self.modem.bind(self.id, port).await
    }

    pub async fn close(self) -> Result<(), ModemError> {
        self.modem.close_socket(self.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u8) -> SocketEntry {
        SocketEntry {
            id,
            protocol: SocketProtocol::Udp,
            port: Some(5683),
            ready: false,
        }
    }

    #[test]
    fn test_table_rejects_live_id() {
        let mut table = SocketTable::new();
        table.insert(entry(0)).unwrap();

        assert!(matches!(
            table.insert(entry(0)),
            Err(ModemError::SocketInUse(0))
        ));
        assert_eq!(table.len(), 1);

        table.remove(0);
        table.insert(entry(0)).unwrap();
    }

    #[test]
    fn test_table_ids_sorted() {
        let mut table = SocketTable::new();
        table.insert(entry(3)).unwrap();
        table.insert(entry(1)).unwrap();
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_read_descriptor_caps_length() {
        assert_eq!(read_descriptor("0,512", 256).as_deref(), Some("0,256"));
        assert_eq!(read_descriptor("1,4", 256).as_deref(), Some("1,4"));
        assert_eq!(read_descriptor("garbage", 256), None);
    }
}
