use anyhow::Context;
use messagevault_core::{MessageType, OAuthClient};
use messagevault_host::archive::{ArchiveFilter, load_messages};
use messagevault_host::config::HostConfig;
use messagevault_host::host::Host;
use messagevault_host::logging::{init_cli_logging, init_host_logging};
use messagevault_host::oauth_flow::LoginFlow;
use messagevault_host::token_storage::TokenStorage;
use serde_json::json;
use time::Date;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Run,
    Login,
    Logout,
    List(ArchiveFilter),
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    let mut mode = CliMode::Run;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--login" => mode = CliMode::Login,
            "--logout" => mode = CliMode::Logout,
            "--help" | "-h" => mode = CliMode::Help,
            "--list" => mode = CliMode::List(ArchiveFilter::default()),
            "--from" | "--to" | "--type" | "--search" => {
                let CliMode::List(filter) = &mut mode else {
                    anyhow::bail!("{arg} requires --list");
                };
                let value = args
                    .next()
                    .with_context(|| format!("{arg} requires a value"))?;
                match arg.as_str() {
                    "--from" => filter.from = Some(parse_date(&value)?),
                    "--to" => filter.to = Some(parse_date(&value)?),
                    "--type" => filter.message_type = parse_type(&value)?,
                    _ => filter.keyword = Some(value),
                }
            }
            // The browser passes the calling extension's origin.
            origin if origin.starts_with("chrome-extension://") => {}
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn parse_date(value: &str) -> anyhow::Result<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {value}"))
}

fn parse_type(value: &str) -> anyhow::Result<Option<MessageType>> {
    match value {
        "all" => Ok(None),
        "sent" => Ok(Some(MessageType::Sent)),
        "received" => Ok(Some(MessageType::Received)),
        other => anyhow::bail!("invalid message type: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mode = parse_cli_mode(std::env::args())?;
    if mode == CliMode::Help {
        println!("Usage: messagevault-host [--login | --logout | --list [OPTIONS]]");
        println!("  (no arguments)       Serve native messages from the browser");
        println!("  --login              Connect Google Drive and store the refresh token");
        println!("  --logout             Remove the stored refresh token");
        println!("  --list               Print archived messages as JSON");
        println!("    --from YYYY-MM-DD  Only messages on or after this date");
        println!("    --to YYYY-MM-DD    Only messages on or before this date");
        println!("    --type TYPE        all, sent or received");
        println!("    --search TEXT      Case-insensitive content match");
        return Ok(());
    }

    let config = HostConfig::from_env()?;
    match mode {
        CliMode::Run => {
            init_host_logging(&config.log_file);
            let host = Host::from_config(&config)?;
            host.run(tokio::io::stdin(), tokio::io::stdout()).await?;
        }
        CliMode::Login => {
            init_cli_logging();
            let (client_id, client_secret) = config.oauth_credentials()?;
            let client = match &config.oauth_base {
                Some(base) => OAuthClient::with_base_url(base, client_id, client_secret),
                None => OAuthClient::new(client_id, client_secret),
            }?;
            let token = LoginFlow::new(client, config.oauth_timeout)
                .authenticate()
                .await?;
            if let Some(refresh_token) = token.refresh_token.as_deref() {
                TokenStorage::new()?.save_refresh_token(refresh_token)?;
            }
            eprintln!("[messagevault-host] Google Drive connected");
        }
        CliMode::Logout => {
            init_cli_logging();
            TokenStorage::new()?.delete_refresh_token()?;
            eprintln!("[messagevault-host] saved refresh token removed");
        }
        CliMode::List(filter) => {
            init_cli_logging();
            let messages = load_messages(&config.archive_root);
            let listed: Vec<_> = filter
                .apply(&messages)
                .into_iter()
                .map(|message| {
                    json!({
                        "prisoner": message.prisoner,
                        "messageType": message.message_type,
                        "receivedAt": message.received_at.format(&Rfc3339).ok(),
                        "snippet": message.snippet(),
                        "path": message.path,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
        CliMode::Help => {}
    }
    Ok(())
}
