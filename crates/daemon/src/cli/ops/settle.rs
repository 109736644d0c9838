use std::fmt::Write;

use clap::Args;

use common::crypto::ShareLink;
use common::settlement::Ledger;
use ephemera_daemon::http_server::api::v0::objects::read::ReadRequest;

use crate::cli::payload::{expenses, format_amount, password_hash, ObjectOpError};

/// Decrypt a group's expenses and print who pays whom
#[derive(Args, Debug, Clone)]
pub struct Settle {
    pub link: ShareLink,

    #[arg(long)]
    pub password: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Settle {
    type Error = ObjectOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let snapshot = client
            .call(ReadRequest {
                id: self.link.id.clone(),
                password_hash: password_hash(self.password.as_ref()),
                known_version: None,
            })
            .await?;

        let mut ledger = Ledger::new();
        for expense in expenses(&self.link.secret, &snapshot)? {
            ledger.record(expense.entry)?;
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} expenses, {} spent",
            ledger.entries().len(),
            format_amount(ledger.total_spent())
        );

        let balances = ledger.balances();
        let _ = writeln!(out, "balances:");
        for (member, net) in balances.iter() {
            let _ = writeln!(out, "  {:<12} {:>10}", member, format_amount(*net));
        }

        let transfers = ledger.settle();
        if transfers.is_empty() {
            let _ = writeln!(out, "everyone is settled up");
        } else {
            let _ = writeln!(out, "to settle:");
            for transfer in &transfers {
                let _ = writeln!(
                    out,
                    "  {} pays {} {}",
                    transfer.from,
                    transfer.to,
                    format_amount(transfer.amount)
                );
            }
        }

        Ok(out.trim_end().to_string())
    }
}
