//! SCIM command-line client
//!
//! Talks to any SCIM 2.0 server, including this one.
//!
//! # Usage
//!
//! ```bash
//! # Active users whose name starts with "b"
//! cargo run --bin scim-client -- list-users --filter 'userName sw "b" and active eq true'
//!
//! # One user, two attributes
//! cargo run --bin scim-client -- get-user <id> --attributes userName,emails
//!
//! # Deactivate a user
//! cargo run --bin scim-client -- set-active <id> --active false
//!
//! # Create 10 users and a group holding them
//! cargo run --bin scim-client -- seed --users 10
//! ```

use clap::{ArgAction, Parser, Subcommand};
use scim_sync::client::{ListParams, ScimClient};
use scim_types::schema::{GROUP_SCHEMA, USER_SCHEMA};
use scim_types::{PatchOp, ResourceType};
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scim-client")]
#[command(about = "SCIM 2.0 command-line client")]
struct Cli {
    /// SCIM base URL
    #[arg(long, default_value = "http://localhost:8080/scim/v2", env = "SCIM_URL")]
    url: String,

    /// Bearer token
    #[arg(long, env = "SCIM_TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List users
    ListUsers {
        #[arg(short, long)]
        filter: Option<String>,

        /// Comma-separated attributes to return
        #[arg(short, long)]
        attributes: Option<String>,

        /// Comma-separated attributes to leave out
        #[arg(short, long)]
        excluded: Option<String>,

        #[arg(long)]
        sort_by: Option<String>,

        #[arg(long)]
        descending: bool,

        #[arg(long)]
        start_index: Option<usize>,

        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Fetch one user
    GetUser {
        id: String,

        #[arg(short, long)]
        attributes: Option<String>,
    },

    /// List groups
    ListGroups {
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Activate or deactivate a user
    SetActive {
        id: String,

        #[arg(long, action = ArgAction::Set)]
        active: bool,
    },

    /// Create sample users and a group containing them
    Seed {
        #[arg(short, long, default_value = "5")]
        users: usize,

        #[arg(long, default_value = "user")]
        prefix: String,
    },
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn seed(client: &ScimClient, count: usize, prefix: &str) -> anyhow::Result<()> {
    let mut members = Vec::with_capacity(count);
    for n in 1..=count {
        let user_name = format!("{}{:03}", prefix, n);
        let created = client
            .create(
                ResourceType::User,
                &json!({
                    "schemas": [USER_SCHEMA],
                    "userName": user_name,
                    "displayName": format!("Sample User {}", n),
                    "emails": [{"value": format!("{}@example.com", user_name), "type": "work", "primary": true}]
                }),
            )
            .await?;
        let id = created.get("id").and_then(Value::as_str).unwrap_or_default();
        println!("[INFO] Created user {} ({})", user_name, id);
        members.push(json!({ "value": id, "display": user_name }));
    }

    let group = client
        .create(
            ResourceType::Group,
            &json!({
                "schemas": [GROUP_SCHEMA],
                "displayName": format!("{} seed group", prefix),
                "members": members
            }),
        )
        .await?;
    println!(
        "[INFO] Created group {} with {} members",
        group.get("id").and_then(Value::as_str).unwrap_or_default(),
        count
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = ScimClient::new(&cli.url, cli.token, Duration::from_secs(cli.timeout))?;

    match cli.command {
        Commands::ListUsers {
            filter,
            attributes,
            excluded,
            sort_by,
            descending,
            start_index,
            count,
        } => {
            let params = ListParams {
                filter,
                attributes,
                excluded_attributes: excluded,
                sort_order: sort_by
                    .as_ref()
                    .map(|_| if descending { "descending" } else { "ascending" }.to_string()),
                sort_by,
                start_index,
                count,
            };
            print_json(&client.list(ResourceType::User, &params).await?)?;
        }
        Commands::GetUser { id, attributes } => {
            print_json(&client.get(ResourceType::User, &id, attributes.as_deref()).await?)?;
        }
        Commands::ListGroups { filter } => {
            let params = ListParams {
                filter,
                ..Default::default()
            };
            print_json(&client.list(ResourceType::Group, &params).await?)?;
        }
        Commands::SetActive { id, active } => {
            let patch = PatchOp::replace("active", json!(active));
            print_json(&client.patch(ResourceType::User, &id, &patch).await?)?;
        }
        Commands::Seed { users, prefix } => seed(&client, users, &prefix).await?,
    }

    Ok(())
}
