//! Command-line client for the Dinner service
//!
//! Sends one request and prints the planned dinner. Defaults match a
//! four-person autumn dinner with children.

use std::time::Duration;

use clap::Parser;
use tonic::Request;

use dmn_gateway_server::proto::dinner::v1::{dinner_client::DinnerClient, DinnerInput};
use dmn_gateway_server::server::WARNING_METADATA_KEY;

#[derive(Debug, Parser)]
#[command(name = "dinner-client", about = "Ask the DMN gateway to plan a dinner")]
struct Args {
    /// Gateway address
    #[arg(long, env = "DMN_GATEWAY_URL", default_value = "http://localhost:50051")]
    addr: String,

    #[arg(long, default_value = "Fall")]
    season: String,

    #[arg(long, default_value_t = 4)]
    guests: i32,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    children: bool,

    #[arg(long, default_value_t = 25.0)]
    temp: f64,

    #[arg(long, default_value_t = 30.0)]
    rain: f64,

    /// Call deadline in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Print the response as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();

    let mut client = DinnerClient::connect(args.addr.clone()).await?;

    let mut request = Request::new(DinnerInput {
        guests_with_children: args.children,
        season: args.season,
        number_of_guests: args.guests,
        temp: args.temp,
        rain_probability: args.rain,
    });
    request.set_timeout(Duration::from_millis(args.timeout_ms));

    let response = client.process(request).await?;

    for warning in response.metadata().get_all(WARNING_METADATA_KEY).iter() {
        if let Ok(text) = warning.to_str() {
            tracing::warn!("{text}");
        }
    }

    let output = response.into_inner();

    if args.json {
        let json = serde_json::json!({
            "dish": output.dish,
            "drinks": output.drinks,
            "where_to_eat": output.where_to_eat,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("        Dish: {}", output.dish);
        println!("      Drinks: {}", output.drinks.join(", "));
        println!("Where to eat: {}", output.where_to_eat);
    }

    Ok(())
}
