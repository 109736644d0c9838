// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op};
use cli::{
    AddItem, Create, Daemon, Delete, DeleteItem, EditItem, Exists, Expense, Health, Init, Read,
    Settle, Version, Watch,
};

command_enum! {
    (Init, Init),
    (Daemon, Daemon),
    (Health, Health),
    (Version, Version),
    (Create, Create),
    (Read, Read),
    (Exists, Exists),
    (AddItem, AddItem),
    (EditItem, EditItem),
    (DeleteItem, DeleteItem),
    (Delete, Delete),
    (Watch, Watch),
    (Expense, Expense),
    (Settle, Settle),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config api_port > default 5080
    let remote = match cli::op::resolve_remote(args.remote, args.config_path.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: invalid remote URL: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
