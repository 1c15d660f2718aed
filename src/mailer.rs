use std::time::Duration;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;
use crate::error::{Error, Result};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Mail dispatch boundary: one opaque send per run.
pub trait Mailer {
    fn send(&self, subject: &str, html: &str, text: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if config.username.is_empty() || config.password.is_empty() {
            return Err(Error::Config("SMTP credentials are not configured".into()));
        }

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::Config(format!("invalid EMAIL_FROM: {}", e)))?;

        let to = config
            .to
            .split(',')
            .map(|addr| {
                addr.trim()
                    .parse()
                    .map_err(|e| Error::Config(format!("invalid EMAIL_TO entry '{}': {}", addr, e)))
            })
            .collect::<Result<Vec<Mailbox>>>()?;

        if to.is_empty() {
            return Err(Error::Config("EMAIL_TO has no recipients".into()));
        }

        // Port 465 speaks TLS from the first byte; everything else upgrades
        // via STARTTLS (587 and friends).
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.server)
        } else {
            SmtpTransport::starttls_relay(&config.server)
        }
        .map_err(|e| Error::Mail(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    /// Connect and authenticate without sending anything.
    pub fn check(&self) -> Result<()> {
        let ok = self
            .transport
            .test_connection()
            .map_err(|e| Error::Mail(e.to_string()))?;
        if !ok {
            return Err(Error::Mail("SMTP server rejected the connection".into()));
        }
        Ok(())
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, subject: &str, html: &str, text: &str) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))
            .map_err(|e| Error::Mail(format!("cannot build message: {}", e)))?;

        self.transport
            .send(&message)
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Stand-in for dry runs, where dispatch never happens.
pub struct NullMailer;

impl Mailer for NullMailer {
    fn send(&self, _subject: &str, _html: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records sends instead of dispatching, or fails every call.
    pub struct FakeMailer {
        pub sent: RefCell<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    impl FakeMailer {
        pub fn new() -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        pub fn unreachable() -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl Mailer for FakeMailer {
        fn send(&self, subject: &str, html: &str, text: &str) -> Result<()> {
            if self.fail {
                return Err(Error::Mail("connection refused".into()));
            }
            self.sent
                .borrow_mut()
                .push((subject.to_string(), html.to_string(), text.to_string()));
            Ok(())
        }
    }
}
