//! Message descriptors: one mail-ready bundle per group.
//!
//! [`assemble`] is the pure step from a [`Group`] and its subject to a
//! [`MessageDescriptor`]: text and HTML bodies from [`crate::report`], the
//! member paths as attachments. Addressing (sender, recipients, server,
//! credentials) is supplied by the caller through [`Addressing`].
//!
//! Delivery goes through the [`Transport`] trait. The crate ships
//! [`OutboxTransport`], which writes each descriptor as JSON into a
//! directory for a separate sender to pick up.
//!
//! ## JSON form
//!
//! `from`, `subject`, `text`, `html` and `mode` are always present. Empty
//! recipient and attachment lists and unset optional fields are omitted.
//! The password is never serialized.

use crate::group::Group;
use crate::report::{render_html, render_text};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Strings longer than this are cut in [`MessageDescriptor::summary`].
const SUMMARY_WIDTH: usize = 80;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid mailbox {0:?}")]
    Mailbox(String),
    #[error("invalid server {0:?} (expected host or host:port)")]
    Server(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("message has no sender")]
    MissingSender,
    #[error("message has no recipients")]
    NoRecipients,
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `Name <address>` or a bare `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: String,
}

impl Mailbox {
    pub fn domain(&self) -> &str {
        self.address.rsplit('@').next().unwrap_or(&self.address)
    }
}

impl FromStr for Mailbox {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AddressError::Mailbox(s.to_string());
        let (name, address) = match s.split_once('<') {
            Some((name, rest)) => {
                let address = rest.strip_suffix('>').ok_or_else(invalid)?;
                let name = name.trim().trim_matches('"');
                ((!name.is_empty()).then(|| name.to_string()), address.trim())
            }
            None => (None, s),
        };
        if address.is_empty() || address.contains(['<', '>', ' ']) {
            return Err(invalid());
        }
        Ok(Self {
            name,
            address: address.to_string(),
        })
    }
}

impl TryFrom<String> for Mailbox {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Mailbox> for String {
    fn from(m: Mailbox) -> Self {
        m.to_string()
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Submission server; the port defaults to 25 on [`MessageDescriptor::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SmtpServer {
    pub host: String,
    pub port: Option<u16>,
}

impl FromStr for SmtpServer {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AddressError::Server(s.to_string());
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, Some(port.parse().map_err(|_| invalid())?)),
            None => (s, None),
        };
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl TryFrom<String> for SmtpServer {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SmtpServer> for String {
    fn from(s: SmtpServer) -> Self {
        s.to_string()
    }
}

impl fmt::Display for SmtpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// Connection security for the submission server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    Ssl,
    #[default]
    Tls,
}

/// Caller-supplied sender, recipients, server and credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Addressing {
    pub from: Option<Mailbox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Mailbox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Mailbox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Mailbox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    pub mode: Mode,
}

/// Everything needed to compose and send one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDescriptor {
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_paths"
    )]
    pub attachments: Vec<PathBuf>,
    #[serde(flatten)]
    pub addressing: Addressing,
}

fn serialize_paths<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

/// Build the descriptor for one group. No I/O.
pub fn assemble(group: &Group<'_>, subject: &str) -> MessageDescriptor {
    MessageDescriptor {
        subject: subject.to_string(),
        text: render_text(group),
        html: render_html(group),
        attachments: group.paths().map(Path::to_path_buf).collect(),
        addressing: Addressing::default(),
    }
}

impl MessageDescriptor {
    pub fn with_addressing(mut self, addressing: Addressing) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn sender_address(&self) -> Option<&str> {
        self.addressing.from.as_ref().map(|m| m.address.as_str())
    }

    /// Envelope recipients: to, then cc, then bcc.
    pub fn envelope_recipients(&self) -> Vec<&str> {
        let a = &self.addressing;
        a.to.iter()
            .chain(&a.cc)
            .chain(&a.bcc)
            .map(|m| m.address.as_str())
            .collect()
    }

    /// Fill in guessable addressing defaults.
    ///
    /// - no server but a sender: `smtp.<sender domain>` on port 25
    /// - a server without a port: port 25
    /// - a password but no user name: the sender address
    pub fn normalize(&mut self) {
        let a = &mut self.addressing;
        if let Some(server) = a.smtp.as_mut() {
            server.port.get_or_insert(DEFAULT_SMTP_PORT);
        }
        if a.smtp.is_none() {
            a.smtp = a.from.as_ref().map(|from| SmtpServer {
                host: format!("smtp.{}", from.domain()),
                port: Some(DEFAULT_SMTP_PORT),
            });
        }
        if a.user_name.is_none() && a.password.is_some() {
            a.user_name = a.from.as_ref().map(|m| m.address.clone());
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The JSON form with long strings cut, for display.
    pub fn summary(&self) -> String {
        // Every field serializes infallibly; Null only guards the signature.
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(fields) = &mut value {
            for field in fields.values_mut() {
                if let Value::String(s) = field
                    && s.chars().count() > SUMMARY_WIDTH
                {
                    let head: String = s.chars().take(SUMMARY_WIDTH).collect();
                    *s = format!("{head} ... ");
                }
            }
        }
        format!("{value:#}")
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Hands descriptors to whatever actually delivers them.
pub trait Transport {
    /// Where the message went (a file, a queue id, ...).
    type Receipt;

    fn send(&mut self, message: &MessageDescriptor) -> Result<Self::Receipt, TransportError>;
}

/// Writes descriptors as `001.json`, `002.json`, ... into a directory.
///
/// Existing files are never replaced; numbering skips past names already
/// taken, so a second run appends after the first.
#[derive(Debug)]
pub struct OutboxTransport {
    dir: PathBuf,
    next: usize,
}

impl OutboxTransport {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| TransportError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, next: 1 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Claim the lowest free number at or after `next`.
    fn create_next(&mut self) -> Result<(PathBuf, File), TransportError> {
        loop {
            let path = self.dir.join(format!("{:03}.json", self.next));
            self.next += 1;
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "outbox slot taken");
                }
                Err(source) => return Err(TransportError::Io { path, source }),
            }
        }
    }
}

impl Transport for OutboxTransport {
    type Receipt = PathBuf;

    fn send(&mut self, message: &MessageDescriptor) -> Result<PathBuf, TransportError> {
        if message.addressing.from.is_none() {
            return Err(TransportError::MissingSender);
        }
        if message.envelope_recipients().is_empty() {
            return Err(TransportError::NoRecipients);
        }

        let mut message = message.clone();
        message.normalize();
        let json = message.to_json()?;
        let (path, mut file) = self.create_next()?;
        file.write_all(json.as_bytes())
            .map_err(|source| TransportError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), subject = %message.subject, "queued message");
        Ok(path)
    }
}
