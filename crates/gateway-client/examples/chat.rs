//! Simple smoke test for the gateway client.
//!
//! Run with: cargo run -p gateway-client --example chat
//! Or with a custom message: cargo run -p gateway-client --example chat -- "Your message here"
//!
//! Make sure to set environment variables in .env:
//!   LLM_GATEWAY_API_KEY - gateway API key

use gateway_client::{ChatClient, ChatMessage, CompletionRequest, GatewayClient};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let message_text = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        "Hello! Please respond with a short greeting.".to_string()
    };

    let client = GatewayClient::from_env()?;

    println!("Client initialized: {}", client.name());
    println!("API URL: {}", client.config().api_url);
    println!("Model: {}", client.config().model);
    println!();

    let request = CompletionRequest::new(
        "You are a warm, brief emotional-wellness companion.",
        vec![ChatMessage::user(&message_text)],
    );

    println!("Sending: \"{}\"", message_text);
    println!("Waiting for response...\n");

    let completion = client.complete(request).await?;

    println!("=== Response ===");
    println!("{}", completion.text_or_empty());
    for call in &completion.tool_calls {
        println!("[tool call] {} {}", call.function.name, call.function.arguments);
    }
    println!("================");

    Ok(())
}
