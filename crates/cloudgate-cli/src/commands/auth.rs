//! Credential store commands.

use std::io::{BufRead, Write};

use tracing::{info, warn};

use cloudgate_gateway::{ACCOUNT_KEY, KeyringCredentials, SECRET_KEY, SessionRegistry};
use cloudgate_providers::{CalendarAdapter, Credentials, MailAdapter, ProviderResult};

use crate::commands::server::build_sessions;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Saves the account identifier and secret under the configured service.
///
/// Values missing from the flags are asked for on stderr and read from
/// stdin, one line each.
pub fn store(
    account: Option<String>,
    secret: Option<String>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut prompt = std::io::stderr();

    let account = match account {
        Some(account) => account,
        None => ask("Account identifier", &mut input, &mut prompt)?,
    };
    let secret = match secret {
        Some(reference) => secret::resolve(&reference).map_err(ClientError::Input)?,
        None => ask("App-specific password", &mut input, &mut prompt)?,
    };
    let credentials = credentials_from(&account, &secret)?;

    warn_if_overridden(config);
    let keyring = KeyringCredentials::new(&config.credentials.service);
    keyring.store(&credentials)?;

    info!(service = keyring.service(), "Credentials stored");
    println!(
        "Stored '{ACCOUNT_KEY}' and '{SECRET_KEY}' for service '{}'.",
        keyring.service()
    );
    Ok(())
}

/// Connects to each remote backend and reports which ones accept the
/// credentials.
pub async fn verify(config: &ClientConfig) -> ClientResult<()> {
    let sessions = build_sessions(config)?;
    let checks = [
        ("calendar", check_calendar(&sessions).await),
        ("mail", check_mail(&sessions).await),
    ];

    let mut failed = Vec::new();
    for (name, outcome) in &checks {
        match outcome {
            Ok(detail) => println!("✓ {name}: {detail}"),
            Err(e) => {
                println!("✗ {name}: {}", e.envelope_message());
                failed.push(*name);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(ClientError::Verification(failed.join(", ")))
    }
}

/// Deletes both entries. Entries that do not exist are not an error.
pub fn clear(config: &ClientConfig) -> ClientResult<()> {
    warn_if_overridden(config);
    let keyring = KeyringCredentials::new(&config.credentials.service);
    keyring.clear()?;
    println!("Cleared credentials for service '{}'.", keyring.service());
    Ok(())
}

async fn check_calendar(sessions: &SessionRegistry) -> ProviderResult<String> {
    let calendar = sessions.calendar().ensure().await?;
    let calendars = calendar.list_calendars().await?;
    Ok(format!("{} calendar(s) found", calendars.len()))
}

async fn check_mail(sessions: &SessionRegistry) -> ProviderResult<String> {
    let mail = sessions.mail().ensure().await?;
    let mailboxes = mail.list_mailboxes().await?;
    Ok(format!("{} mailbox(es) found", mailboxes.len()))
}

fn warn_if_overridden(config: &ClientConfig) {
    if config.credentials.identifier.is_some() || config.credentials.secret.is_some() {
        warn!("[credentials] in the config file takes precedence over the keyring");
    }
}

fn credentials_from(account: &str, secret: &str) -> ClientResult<Credentials> {
    let account = account.trim();
    if account.is_empty() {
        return Err(ClientError::Input("account identifier must not be empty".into()));
    }
    if secret.trim().is_empty() {
        return Err(ClientError::Input("secret must not be empty".into()));
    }
    Ok(Credentials::new(account, secret.trim()))
}

fn ask(label: &str, input: &mut impl BufRead, prompt: &mut impl Write) -> ClientResult<String> {
    write!(prompt, "{label}: ")?;
    prompt.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(ClientError::Input(format!("no {} given", label.to_lowercase())));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ask_reads_one_line() {
        let mut input = Cursor::new("me@example.com\nsecond\n");
        let mut prompt = Vec::new();
        let value = ask("Account identifier", &mut input, &mut prompt).unwrap();
        assert_eq!(value, "me@example.com");
        assert_eq!(String::from_utf8(prompt).unwrap(), "Account identifier: ");
    }

    #[test]
    fn ask_fails_on_closed_input() {
        let mut input = Cursor::new("");
        let err = ask("App-specific password", &mut input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("app-specific password"));
    }

    #[test]
    fn empty_values_are_refused() {
        assert!(credentials_from("  ", "secret").is_err());
        assert!(credentials_from("me@example.com", "").is_err());
        assert_eq!(
            credentials_from(" me@example.com ", "abcd-efgh").unwrap(),
            Credentials::new("me@example.com", "abcd-efgh")
        );
    }
}
