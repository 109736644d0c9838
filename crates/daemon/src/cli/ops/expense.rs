use clap::{Args, ValueEnum};

use common::crypto::ShareLink;
use common::model::{ItemFields, ItemRole};
use common::settlement::{Entry, Split};
use ephemera_daemon::http_server::api::v0::objects::items::{ItemMutation, MutateItemRequest};
use ephemera_daemon::http_server::api::v0::objects::read::ReadRequest;

use crate::cli::payload::{
    format_amount, parse_amount, password_hash, Expense as ExpensePayload, ObjectOpError,
    Structure,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitArg {
    Equal,
    Exact,
    Percentage,
}

/// Record an expense in a group
#[derive(Args, Debug, Clone)]
pub struct Expense {
    pub link: ShareLink,

    #[arg(long)]
    pub payer: String,

    /// Total, e.g. 42.50
    #[arg(long)]
    pub amount: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, value_enum, default_value = "equal")]
    pub split: SplitArg,

    /// Member sharing an equal split (repeatable; defaults to every group member)
    #[arg(long = "member")]
    pub members: Vec<String>,

    /// `name=value` for exact (an amount) or percentage splits (repeatable)
    #[arg(long = "share")]
    pub shares: Vec<String>,

    #[arg(long)]
    pub password: Option<String>,
}

fn parse_share(raw: &str) -> Result<(String, &str), ObjectOpError> {
    raw.split_once('=')
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| (name.to_string(), value))
        .ok_or_else(|| ObjectOpError::Invalid(format!("expected name=value, got '{}'", raw)))
}

impl Expense {
    fn split(&self, group_members: &[String]) -> Result<Split<String>, ObjectOpError> {
        match self.split {
            SplitArg::Equal => {
                let members = if self.members.is_empty() {
                    group_members.to_vec()
                } else {
                    self.members.clone()
                };
                Ok(Split::Equal { members })
            }
            SplitArg::Exact => {
                let shares = self
                    .shares
                    .iter()
                    .map(|raw| {
                        let (name, value) = parse_share(raw)?;
                        Ok((name, parse_amount(value)?))
                    })
                    .collect::<Result<_, ObjectOpError>>()?;
                Ok(Split::Exact { shares })
            }
            SplitArg::Percentage => {
                let shares = self
                    .shares
                    .iter()
                    .map(|raw| {
                        let (name, value) = parse_share(raw)?;
                        let pct = value.parse::<f64>().map_err(|_| {
                            ObjectOpError::Invalid(format!("invalid percentage '{}'", value))
                        })?;
                        Ok((name, pct))
                    })
                    .collect::<Result<_, ObjectOpError>>()?;
                Ok(Split::Percentage { shares })
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Expense {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let secret = &self.link.secret;

        let snapshot = client
            .call(ReadRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                known_version: None,
            })
            .await?;
        let structure: Structure = secret.decrypt_json(&snapshot.object.encrypted_structure)?;

        let entry = Entry {
            payer: self.payer.clone(),
            total: parse_amount(&self.amount)?,
            split: self.split(&structure.members)?,
        };
        // reject bad splits before they are sealed
        let shares = entry.split.shares(entry.total)?;

        let payload = secret.encrypt_json(&ExpensePayload {
            description: self.description.clone(),
            entry: entry.clone(),
        })?;
        let response = client
            .call(MutateItemRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                admin_token: None,
                mutation: ItemMutation::Append {
                    role: ItemRole::Expense,
                    encrypted_payload: payload,
                    fields: ItemFields::default(),
                },
            })
            .await?;

        let breakdown = shares
            .iter()
            .map(|(member, amount)| format!("{} {}", member, format_amount(*amount)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "Recorded {} paid by {} ({}) as {}",
            format_amount(entry.total),
            entry.payer,
            breakdown,
            response.item_id
        ))
    }
}
