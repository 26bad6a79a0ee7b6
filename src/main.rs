mod board;
mod commands;
mod config;
mod db;
mod error;
mod gate;
mod handlers;
mod models;
mod tags;
mod voting;

use async_trait::async_trait;
use board::Board;
use config::Config;
use log::{error, info};
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

struct Bot {
    board: Arc<Board>,
}

#[async_trait]
impl EventHandler for Bot {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let board = Arc::clone(&self.board);

        // Spawn a task to handle the interaction concurrently
        tokio::spawn(async move {
            handlers::handle_interaction(&board, &ctx, interaction).await;
        });
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        match commands::register_commands(&ctx).await {
            Ok(registered) => info!("Registered {} global slash commands.", registered.len()),
            Err(why) => error!("Failed to register slash commands: {:?}", why),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let board = match Board::open(&config).await {
        Ok(board) => Arc::new(board),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    info!(
        "Poll roster has {} teams; new polls start as '{}'",
        board.poll_defaults.teams.len(),
        board.poll_defaults.title
    );

    // Slash commands and components only
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_INTEGRATIONS;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Bot { board })
        .await
    {
        Ok(client) => client,
        Err(why) => {
            error!("Error creating client: {:?}", why);
            return;
        }
    };

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
