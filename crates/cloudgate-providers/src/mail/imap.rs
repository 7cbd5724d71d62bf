//! Blocking IMAP session over implicit TLS.
//!
//! Every call runs on a blocking thread and opens its own connection; the
//! session is logged out when the call finishes.

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};

use imap::types::{Fetch, Flag, NameAttribute};
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, trace};

use crate::adapter::MessageQuery;
use crate::connect::Credentials;
use crate::error::{ProviderError, ProviderResult};
use crate::raw::{RawMailbox, RawMessage, RawMessageFlags};

use super::config::MailConfig;

type Stream = TlsStream<TcpStream>;

pub struct ImapSession {
    inner: imap::Session<Stream>,
}

impl ImapSession {
    /// Connects and logs in.
    pub fn open(config: &MailConfig, credentials: &Credentials) -> ProviderResult<Self> {
        let stream = connect_tls(config)?;
        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(imap_error)?;

        let inner = client
            .login(&credentials.identifier, &credentials.secret)
            .map_err(|(e, _)| match e {
                imap::Error::No(_) => {
                    ProviderError::authentication_rejected("mail server rejected the credentials")
                }
                other => imap_error(other),
            })?;
        debug!(host = %config.imap_host, "IMAP login succeeded");
        Ok(Self { inner })
    }

    pub fn list_mailboxes(&mut self) -> ProviderResult<Vec<RawMailbox>> {
        let names = self
            .inner
            .list(Some(""), Some("*"))
            .map_err(imap_error)?;

        let selectable: Vec<String> = names
            .iter()
            .filter(|n| !n.attributes().contains(&NameAttribute::NoSelect))
            .map(|n| n.name().to_string())
            .collect();

        Ok(selectable
            .into_iter()
            .map(|name| match self.inner.status(&name, "(MESSAGES UNSEEN)") {
                Ok(status) => RawMailbox {
                    name,
                    unseen: status.unseen,
                    messages: Some(status.exists),
                },
                Err(e) => {
                    trace!(mailbox = %name, error = %e, "STATUS failed, omitting counts");
                    RawMailbox {
                        name,
                        unseen: None,
                        messages: None,
                    }
                }
            })
            .collect())
    }

    /// Header-only fetch of the newest `query.limit` matching messages.
    pub fn list_messages(&mut self, query: &MessageQuery) -> ProviderResult<Vec<RawMessage>> {
        self.examine(&query.mailbox)?;

        let criteria = if query.unread_only { "UNSEEN" } else { "ALL" };
        let mut uids: Vec<u32> = self
            .inner
            .uid_search(criteria)
            .map_err(imap_error)?
            .into_iter()
            .collect();
        uids.sort_unstable_by(|a, b| b.cmp(a));
        uids.truncate(query.limit);
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let set = uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fetches = self
            .inner
            .uid_fetch(&set, "(UID FLAGS RFC822.HEADER)")
            .map_err(imap_error)?;

        let mut messages: Vec<RawMessage> = fetches
            .iter()
            .filter_map(|f| {
                Some(RawMessage {
                    uid: f.uid?,
                    flags: flags_of(f),
                    content: f.header().unwrap_or_default().to_vec(),
                })
            })
            .collect();
        messages.sort_by(|a, b| b.uid.cmp(&a.uid));
        Ok(messages)
    }

    /// Full fetch without setting `\Seen`.
    pub fn fetch_message(&mut self, mailbox: &str, uid: u32) -> ProviderResult<Option<RawMessage>> {
        self.examine(mailbox)?;
        let fetches = self
            .inner
            .uid_fetch(uid.to_string(), "(UID FLAGS BODY.PEEK[])")
            .map_err(imap_error)?;

        Ok(fetches
            .iter()
            .find(|f| f.uid == Some(uid))
            .map(|f| RawMessage {
                uid,
                flags: flags_of(f),
                content: f.body().unwrap_or_default().to_vec(),
            }))
    }

    pub fn logout(mut self) {
        if let Err(e) = self.inner.logout() {
            trace!(error = %e, "IMAP logout failed");
        }
    }

    fn examine(&mut self, mailbox: &str) -> ProviderResult<()> {
        match self.inner.examine(mailbox) {
            Ok(status) => {
                trace!(mailbox = %mailbox, exists = status.exists, uid_validity = ?status.uid_validity, "Examined mailbox");
                Ok(())
            }
            Err(imap::Error::No(_)) => Err(ProviderError::not_found(format!(
                "mailbox '{}' does not exist",
                mailbox
            ))),
            Err(e) => Err(imap_error(e)),
        }
    }
}

fn connect_tls(config: &MailConfig) -> ProviderResult<Stream> {
    let address = (config.imap_host.as_str(), config.imap_port)
        .to_socket_addrs()
        .map_err(|e| io_error(e, "cannot resolve mail server"))?
        .next()
        .ok_or_else(|| {
            ProviderError::network(format!("no address found for {}", config.imap_host))
        })?;

    let tcp = TcpStream::connect_timeout(&address, config.timeout)
        .map_err(|e| io_error(e, "cannot reach mail server"))?;
    tcp.set_read_timeout(Some(config.timeout))
        .and_then(|_| tcp.set_write_timeout(Some(config.timeout)))
        .map_err(|e| io_error(e, "cannot configure mail connection"))?;

    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| ProviderError::internal(format!("TLS setup failed: {}", e)).with_source(e))?;

    connector
        .connect(&config.imap_host, tcp)
        .map_err(|e| ProviderError::network(format!("TLS handshake with mail server failed: {}", e)))
}

fn flags_of(fetch: &Fetch) -> RawMessageFlags {
    let flags = fetch.flags();
    RawMessageFlags {
        seen: flags.contains(&Flag::Seen),
        flagged: flags.contains(&Flag::Flagged),
    }
}

fn io_error(e: std::io::Error, context: &str) -> ProviderError {
    if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
        ProviderError::timeout("mail server did not respond in time").with_source(e)
    } else {
        ProviderError::network(format!("{}: {}", context, e)).with_source(e)
    }
}

fn imap_error(e: imap::Error) -> ProviderError {
    match e {
        imap::Error::Io(io) => io_error(io, "mail server connection failed"),
        imap::Error::Bad(msg) | imap::Error::No(msg) => {
            ProviderError::invalid_response(format!("mail server refused the command: {}", msg))
        }
        imap::Error::ConnectionLost => {
            ProviderError::network("mail server closed the connection")
        }
        imap::Error::Parse(parse) => {
            ProviderError::invalid_response(format!("unreadable mail server response: {}", parse))
        }
        other => ProviderError::network(format!("mail server error: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    #[test]
    fn io_timeouts_are_timeouts() {
        let e = io_error(std::io::Error::from(ErrorKind::TimedOut), "x");
        assert_eq!(e.code(), ProviderErrorCode::Timeout);
        let e = io_error(std::io::Error::from(ErrorKind::WouldBlock), "x");
        assert_eq!(e.code(), ProviderErrorCode::Timeout);
    }

    #[test]
    fn io_failures_are_network_errors() {
        let e = io_error(std::io::Error::from(ErrorKind::ConnectionRefused), "cannot reach");
        assert_eq!(e.code(), ProviderErrorCode::Network);
        assert!(e.message().starts_with("cannot reach"));
    }

    #[test]
    fn imap_errors_map_to_codes() {
        assert_eq!(
            imap_error(imap::Error::ConnectionLost).code(),
            ProviderErrorCode::Network
        );
        assert_eq!(
            imap_error(imap::Error::Bad("nope".into())).code(),
            ProviderErrorCode::InvalidResponse
        );
    }
}
