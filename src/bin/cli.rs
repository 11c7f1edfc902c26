use chrono::Utc;
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Map, Value};
use std::fs;

const TOKEN_FILE: &str = ".ck_token";

#[derive(Parser)]
#[command(name = "ck-cli")]
#[command(about = "CLI for the Context Keeper API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:3001")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an access token issued by the identity service
    Login {
        #[arg(short, long)]
        token: String,
    },
    Logout,
    Health,
    /// Save a workspace; tabs keep the order of the --url flags
    Save {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short = 'u', long = "url", required = true)]
        urls: Vec<String>,
        /// Titles, matched to urls by position
        #[arg(short = 't', long = "title")]
        titles: Vec<String>,
    },
    List,
    Get {
        #[arg(short, long)]
        id: i64,
    },
    Update {
        #[arg(short, long)]
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Mark the workspace as opened now
        #[arg(long)]
        touch: bool,
    },
    Delete {
        #[arg(short, long)]
        id: i64,
    },
    GroupCreate {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        color: Option<String>,
    },
    Groups,
    GroupDelete {
        #[arg(short, long)]
        id: i64,
    },
}

fn authed(req: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    req.bearer_auth(token.trim())
}

async fn print_response(res: Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(text);
    println!("{status}\n{body}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Login { token } => {
            fs::write(TOKEN_FILE, token)?;
            println!("Token saved to {TOKEN_FILE}");
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Save { name, description, urls, titles } => {
            let tabs: Vec<Value> = urls
                .into_iter()
                .enumerate()
                .map(|(position, url)| {
                    json!({
                        "url": url,
                        "title": titles.get(position),
                        "position": position,
                    })
                })
                .collect();
            let res = authed(client.post(format!("{base}/api/workspaces")))
                .json(&json!({ "name": name, "description": description, "tabs": tabs }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::List => {
            let res = authed(client.get(format!("{base}/api/workspaces"))).send().await?;
            print_response(res).await?;
        }
        Commands::Get { id } => {
            let res = authed(client.get(format!("{base}/api/workspaces/{id}")))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Update { id, name, description, touch } => {
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".into(), json!(name));
            }
            if let Some(description) = description {
                body.insert("description".into(), json!(description));
            }
            if touch {
                body.insert("last_accessed_at".into(), json!(Utc::now()));
            }
            let res = authed(client.put(format!("{base}/api/workspaces/{id}")))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = authed(client.delete(format!("{base}/api/workspaces/{id}")))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::GroupCreate { name, color } => {
            let res = authed(client.post(format!("{base}/api/groups")))
                .json(&json!({ "name": name, "color": color }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Groups => {
            let res = authed(client.get(format!("{base}/api/groups"))).send().await?;
            print_response(res).await?;
        }
        Commands::GroupDelete { id } => {
            let res = authed(client.delete(format!("{base}/api/groups/{id}")))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}
