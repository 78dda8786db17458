//! ECDH Exchange Client
//!
//! Command-line initiator for the exchange server, plus an in-process demo.

mod channel;
mod demo;

use clap::{Parser, Subcommand};
use tracing::info;

use channel::ChannelClient;

#[derive(Debug, Parser)]
#[command(name = "exchange-client", version, about = "ECDH exchange client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exchange keys with a server and send each message over the channel
    Connect {
        /// WebSocket endpoint of the exchange server
        #[arg(long, env = "EXCHANGE_URL", default_value = "ws://127.0.0.1:3000/ws")]
        url: String,
        /// Messages to seal and send
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Run both parties in this process
    Demo {
        #[arg(default_values = ["hello", "world"])]
        messages: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exchange_client=info".parse()?)
                .add_directive("crypto_session=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Connect { url, messages } => {
            let client = ChannelClient::new(url);
            let mut channel = client.connect().await?;

            for message in &messages {
                let echoed = channel.round_trip(message.as_bytes()).await?;
                println!("{}", String::from_utf8_lossy(&echoed));
            }

            channel.close("done").await?;
            info!("Sent {} messages", messages.len());
        }
        Command::Demo { messages } => {
            for delivery in demo::run(&messages)? {
                println!(
                    "iv={} ciphertext={} -> {}",
                    delivery.wire.iv,
                    delivery.wire.ciphertext,
                    String::from_utf8_lossy(&delivery.recovered)
                );
            }
        }
    }

    Ok(())
}
