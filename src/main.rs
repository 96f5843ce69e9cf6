use color_eyre::eyre::{Result, bail};
use idin_client::{IdinClient, StatusParameters, config::Config, telemetry, transport::HttpTransport};
use serde::Serialize;

const USAGE: &str = "usage: idin-client directory | transaction <issuer-id> <transaction-id> | status <transaction-id>";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let config = Config::load()?;
    tracing::info!(
        merchant = %config.merchant.id,
        endpoint = %config.routing.endpoint,
        "Loaded configuration"
    );

    let mut transport = HttpTransport::default();
    if let Some(timeout) = config.timeout() {
        transport = transport.with_timeout(timeout);
    }
    let client = IdinClient::with_transport(config.general_parameters()?, transport);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] | ["directory"] => print(&client.get_directory().await?),
        ["transaction", issuer_id, transaction_id] => {
            let params = config.transaction_params(issuer_id, transaction_id)?;
            print(&client.get_transaction(&params).await?)
        }
        ["status", transaction_id] => {
            let params = StatusParameters {
                transaction_id: transaction_id.to_string(),
            };
            print(&client.get_status(&params).await?)
        }
        _ => bail!(USAGE),
    }
}

fn print<T: Serialize>(outcome: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
