use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use wayfarer::config::Config;
use wayfarer::mcp::HttpConnector;
use wayfarer::model::ChatHistory;
use wayfarer::options::ModelOptions;
use wayfarer::providers::{Groq, Provider};
use wayfarer::status::TerminalStatus;
use wayfarer::Agent;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let model_options = ModelOptions::new(config.model.clone()).with_temperature(config.temperature);
    let mut client =
        Groq::create_with_options(config.api_key()?.to_string(), model_options, config.llm_transport());
    if let Some(base_url) = &config.llm_base_url {
        client = client.with_base_url(base_url.clone());
    }

    let connector =
        HttpConnector::new(config.server_url.clone()).with_transport_options(config.mcp_transport());
    let agent = Agent::new(client, connector)
        .with_policy(config.grounding_policy()?)
        .with_options(config.agent_options())
        .with_status(TerminalStatus::new());

    let mut history = ChatHistory::new();

    if let Some(query) = &config.query {
        return match agent.respond(&mut history, query).await {
            Some(answer) => {
                println!("{}", answer);
                Ok(())
            }
            None => Err("the request did not produce an answer".into()),
        };
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nWhere do you want to go? > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        if let Some(answer) = agent.respond(&mut history, query).await {
            stdout.write_all(format!("\n{}\n", answer).as_bytes()).await?;
        }
    }

    Ok(())
}
