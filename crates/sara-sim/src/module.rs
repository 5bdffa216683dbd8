//! Scripted virtual module
//!
//! Answers each received command with the next scripted reply, framing lines
//! the way the hardware does: every line is sent as `\r\nLINE\r\n`, preceded
//! by the echoed command and a lone CR when echo is on.

use std::collections::VecDeque;

use sara_protocol::ModuleVariant;
use tracing::{debug, warn};

/// One expected command and the bytes sent back for it
#[derive(Debug, Clone)]
struct Exchange {
    command: String,
    reply: Vec<u8>,
    /// Whether the echo (if enabled) precedes the reply
    echoed: bool,
    /// Match any command starting with `command`
    prefix: bool,
}

impl Exchange {
    fn matches(&self, command: &str) -> bool {
        if self.prefix {
            command.starts_with(&self.command)
        } else {
            command == self.command
        }
    }
}

/// What a scripted module saw during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimReport {
    /// Every command received, in order
    pub received: Vec<String>,
    /// Commands that matched neither the script nor a standing reply
    pub unexpected: Vec<String>,
    /// Scripted commands that were never received
    pub unmet: Vec<String>,
}

impl SimReport {
    pub fn is_clean(&self) -> bool {
        self.unexpected.is_empty() && self.unmet.is_empty()
    }
}

/// A virtual module that follows a fixed script
#[derive(Debug)]
pub struct ScriptedModule {
    name: String,
    echo: bool,
    script: VecDeque<Exchange>,
    standing: Vec<Exchange>,
    received: Vec<String>,
    unexpected: Vec<String>,
}

/// Frame response lines as the module sends them
pub fn frame_lines(lines: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

impl ScriptedModule {
    /// A module with the echo behaviour of the given generation
    pub fn new(variant: ModuleVariant) -> Self {
        let echo = matches!(variant, ModuleVariant::SaraR4);
        Self {
            name: variant.name().to_string(),
            echo,
            script: VecDeque::new(),
            standing: Vec::new(),
            received: Vec::new(),
            unexpected: Vec::new(),
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Answer `command` with the given lines (include the final `OK`)
    pub fn expect(self, command: &str, reply: &[&str]) -> Self {
        self.expect_raw(command, frame_lines(reply))
    }

    /// Answer `command`, then emit `after` as if it arrived later
    pub fn expect_then(self, command: &str, reply: &[&str], after: &[&str]) -> Self {
        let mut bytes = frame_lines(reply);
        bytes.extend(frame_lines(after));
        self.expect_raw(command, bytes)
    }

    /// Answer `command` with exact bytes after the echo
    pub fn expect_raw(mut self, command: &str, reply: impl Into<Vec<u8>>) -> Self {
        self.script.push_back(Exchange {
            command: command.to_string(),
            reply: reply.into(),
            echoed: true,
            prefix: false,
        });
        self
    }

    /// Answer the next command if it starts with `prefix`
    pub fn expect_prefix(mut self, prefix: &str, reply: &[&str]) -> Self {
        self.script.push_back(Exchange {
            command: prefix.to_string(),
            reply: frame_lines(reply),
            echoed: true,
            prefix: true,
        });
        self
    }

    /// Accept `command` and never answer it, not even with an echo
    pub fn expect_silence(mut self, command: &str) -> Self {
        self.script.push_back(Exchange {
            command: command.to_string(),
            reply: Vec::new(),
            echoed: false,
            prefix: false,
        });
        self
    }

    /// Answer `command` this way whenever it is not next in the script
    pub fn always(mut self, command: &str, reply: &[&str]) -> Self {
        self.standing.push(Exchange {
            command: command.to_string(),
            reply: frame_lines(reply),
            echoed: true,
            prefix: false,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes to send back for one received command line
    pub fn handle(&mut self, command: &str) -> Vec<u8> {
        debug!("{} received {:?}", self.name, command);
        self.received.push(command.to_string());

        let exchange = if self.script.front().is_some_and(|e| e.matches(command)) {
            self.script.pop_front()
        } else {
            self.standing.iter().find(|e| e.matches(command)).cloned()
        };

        let exchange = exchange.unwrap_or_else(|| {
            warn!("{} got unexpected command {:?}", self.name, command);
            self.unexpected.push(command.to_string());
            Exchange {
                command: command.to_string(),
                reply: frame_lines(&["ERROR"]),
                echoed: true,
                prefix: false,
            }
        });

        let mut out = Vec::new();
        if self.echo && exchange.echoed {
            out.extend_from_slice(command.as_bytes());
            out.push(b'\r');
        }
        out.extend(exchange.reply);
        out
    }

    /// Summary of the run so far
    pub fn report(&self) -> SimReport {
        SimReport {
            received: self.received.clone(),
            unexpected: self.unexpected.clone(),
            unmet: self.script.iter().map(|e| e.command.clone()).collect(),
        }
    }
}
