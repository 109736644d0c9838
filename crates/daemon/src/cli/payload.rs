//! Plaintext shapes the CLI seals into objects and items.
//!
//! The server only ever sees these as ciphertext; their layout is a contract
//! between clients.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use common::crypto::{PasswordProof, Secret, SecretError, ShareLinkError};
use common::model::{ItemRole, ModelError};
use common::settlement::{Amount, Entry, SettlementError};

use ephemera_daemon::http_server::api::client::ApiError;
use ephemera_daemon::http_server::api::v0::objects::{ItemView, SnapshotResponse};

/// Decrypted object structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Poll slots or quiz settings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Expense group members
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// Decrypted payload of list entries, votes, questions and answers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
}

/// Decrypted payload of a group expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub description: String,
    pub entry: Entry<String>,
}

/// Errors shared by every operation that opens a share link
#[derive(Debug, thiserror::Error)]
pub enum ObjectOpError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("invalid share link: {0}")]
    Link(#[from] ShareLinkError),
    #[error("invalid or corrupted link: {0}")]
    Secret(#[from] SecretError),
    #[error("{0}")]
    Model(#[from] ModelError),
    #[error("expense rejected: {0}")]
    Settlement(#[from] SettlementError),
    #[error("item {0} not found")]
    ItemNotFound(String),
    #[error("gave up after {0} conflicting writes")]
    TooManyConflicts(u32),
    #[error("{0}")]
    Invalid(String),
}

pub fn password_hash(password: Option<&String>) -> Option<String> {
    password.map(|p| PasswordProof::derive(p).as_str().to_string())
}

/// Parse `12`, `12.5` or `12.50` into minor units.
///
/// Amounts are never negative; a sign of either kind is rejected.
pub fn parse_amount(raw: &str) -> Result<Amount, ObjectOpError> {
    let invalid = || ObjectOpError::Invalid(format!("invalid amount '{}'", raw));
    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || fraction.len() > 2 || !digits(whole) || !digits(fraction) {
        return Err(invalid());
    }

    let whole: Amount = whole.parse().map_err(|_| invalid())?;
    let cents: Amount = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<Amount>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };
    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(invalid)
}

pub fn format_amount(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Decrypt every expense item of a group snapshot
pub fn expenses(
    secret: &Secret,
    snapshot: &SnapshotResponse,
) -> Result<Vec<Expense>, ObjectOpError> {
    snapshot
        .items
        .iter()
        .filter(|item| item.role == ItemRole::Expense)
        .map(|item| Ok(secret.decrypt_json::<Expense>(&item.encrypted_payload)?))
        .collect()
}

fn render_item(secret: &Secret, item: &ItemView) -> Result<String, ObjectOpError> {
    let body = match item.role {
        ItemRole::Expense => {
            let expense: Expense = secret.decrypt_json(&item.encrypted_payload)?;
            format!(
                "{} paid {} for {}",
                expense.entry.payer,
                format_amount(expense.entry.total),
                expense.description
            )
        }
        _ => secret.decrypt_json::<TextItem>(&item.encrypted_payload)?.text,
    };

    let mut flags = Vec::new();
    if let Some(position) = item.fields.position {
        flags.push(format!("#{}", position));
    }
    if item.fields.completed == Some(true) {
        flags.push("done".to_string());
    }
    if item.fields.claimed == Some(true) {
        flags.push("claimed".to_string());
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };

    Ok(format!(
        "  - {} {} (v{}){}: {}",
        item.role, item.id, item.version, flags, body
    ))
}

/// Human-readable view of a decrypted snapshot
pub fn render_snapshot(
    secret: &Secret,
    snapshot: &SnapshotResponse,
) -> Result<String, ObjectOpError> {
    let structure: Structure = secret.decrypt_json(&snapshot.object.encrypted_structure)?;
    let object = &snapshot.object;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} (version {}, expires {})",
        object.kind.name(),
        object.id,
        object.version,
        object.expires_at
    );
    if let Some(title) = &structure.title {
        let _ = writeln!(out, "title: {}", title);
    }
    if let Some(text) = &structure.text {
        let _ = writeln!(out, "{}", text);
    }
    if !structure.options.is_empty() {
        let _ = writeln!(out, "options: {}", structure.options.join(", "));
    }
    if !structure.members.is_empty() {
        let _ = writeln!(out, "members: {}", structure.members.join(", "));
    }
    if !snapshot.items.is_empty() {
        let _ = writeln!(out, "items:");
        for item in &snapshot.items {
            let _ = writeln!(out, "{}", render_item(secret, item)?);
        }
    }
    if snapshot.destroyed {
        let _ = writeln!(out, "(this note has been destroyed and cannot be opened again)");
    }

    Ok(out.trim_end().to_string())
}
