//! SARA Modem Engine
//!
//! This crate drives u-blox SARA cellular modules (SARA-N211 and SARA-R4)
//! over any async byte stream: usually a serial port, or an in-memory duplex
//! stream in tests.
//!
//! # Architecture
//!
//! - **Transport**: CR-LF line framing with deadline-based reads
//! - **Correlator**: sends one command at a time and collects its intermediate
//!   responses until `OK`, failing on `ERROR` or `+CME ERROR`
//! - **Dispatcher**: applies URCs arriving mid-exchange to the module state
//! - **Connection**: operator selection and registration await
//! - **Sockets**: a table of module-assigned socket ids with send, receive,
//!   bind and close
//!
//! The two module generations share all of this; a [`VariantProfile`]
//! carries the differences.
//!
//! # Example
//!
//! ```rust,no_run
//! use sara_modem::{Modem, ModemConfig, SetupOptions};
//! use sara_protocol::{ModuleVariant, SocketProtocol};
//!
//! # async fn run() -> Result<(), sara_modem::ModemError> {
//! let mut modem = Modem::open("/dev/ttyUSB0", ModuleVariant::SaraN211, ModemConfig::default())?;
//! modem.setup(&SetupOptions::default()).await?;
//! modem.connect("24001", false).await?;
//!
//! let mut socket = modem.open_socket(SocketProtocol::Udp, Some(5683)).await?;
//! socket.send_to(b"hello", "192.0.2.10", 5683).await?;
//! let reply = socket.recv_from(512).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod modem;
pub mod serial;
pub mod socket;
pub mod state;
pub mod transport;
pub mod variant;

pub use config::ModemConfig;
pub use connection::{ConnectionFailure, ConnectionState};
pub use error::ModemError;
pub use modem::{Modem, SetupOptions};
pub use serial::{available_ports, SerialPortInfo};
pub use socket::{Datagram, Socket, SocketEntry, SocketTable};
pub use state::{ModuleState, RadioStatistics};
pub use tokio_serial::SerialStream;
pub use variant::{AwaitStrategy, Capabilities, ReceiveStrategy, SocketIdSource, VariantProfile};
