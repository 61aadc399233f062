use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::Engine;
use migration::MigratorTrait;
use sea_orm::Database;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "botfair_admin")]
#[command(about = "Admin utilities for Botfair (channels and promotions)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./botfair.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Channel(Channel),
    Promotion(Promotion),
}

#[derive(Args, Debug)]
struct Channel {
    #[command(subcommand)]
    command: ChannelCommand,
}

#[derive(Subcommand, Debug)]
enum ChannelCommand {
    /// Register a channel discovered by the marketplace.
    Register(ChannelRegisterArgs),
    /// Turn the revenue opt-in on (on the owner's behalf).
    Enable(ChannelIdArgs),
    /// Turn the revenue opt-in off.
    Disable(ChannelIdArgs),
    /// List every registered channel.
    List,
}

#[derive(Args, Debug)]
struct ChannelRegisterArgs {
    #[arg(long)]
    chat_id: i64,
    #[arg(long)]
    title: String,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, default_value_t = 0)]
    members: i32,
}

#[derive(Args, Debug)]
struct ChannelIdArgs {
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct Promotion {
    #[command(subcommand)]
    command: PromotionCommand,
}

#[derive(Subcommand, Debug)]
enum PromotionCommand {
    /// Create a promotion in the pending state.
    Create(PromotionCreateArgs),
    /// Start broadcasting a pending promotion.
    Launch(PromotionIdArgs),
    /// Abort a sending promotion (marks it failed).
    Cancel(PromotionIdArgs),
    /// List every promotion, newest first.
    List,
}

#[derive(Args, Debug)]
struct PromotionCreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    body: String,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    button_label: Option<String>,
    #[arg(long)]
    button_url: Option<String>,
}

#[derive(Args, Debug)]
struct PromotionIdArgs {
    #[arg(long)]
    id: Uuid,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Channel(channel) => match channel.command {
            ChannelCommand::Register(args) => {
                let id = engine
                    .register_channel(
                        args.chat_id,
                        &args.title,
                        args.username.as_deref(),
                        args.members,
                    )
                    .await?;
                println!("registered channel {id}");
            }
            ChannelCommand::Enable(args) => {
                engine.set_channel_revenue(args.id, true).await?;
                println!("channel {} enabled", args.id);
            }
            ChannelCommand::Disable(args) => {
                engine.set_channel_revenue(args.id, false).await?;
                println!("channel {} disabled", args.id);
            }
            ChannelCommand::List => {
                for channel in engine.channels().await? {
                    println!(
                        "{}  chat_id={}  members={}  revenue={}  {}",
                        channel.id,
                        channel.chat_id,
                        channel.member_count,
                        channel.revenue_enabled,
                        channel.title
                    );
                }
            }
        },
        Command::Promotion(promotion) => match promotion.command {
            PromotionCommand::Create(args) => {
                let id = engine
                    .create_promotion(
                        &args.title,
                        &args.body,
                        args.image_url.as_deref(),
                        args.button_label.as_deref(),
                        args.button_url.as_deref(),
                    )
                    .await?;
                println!("created promotion {id}");
            }
            PromotionCommand::Launch(args) => {
                engine.launch_promotion(args.id).await?;
                println!("promotion {} is now sending", args.id);
            }
            PromotionCommand::Cancel(args) => {
                engine.cancel_promotion(args.id).await?;
                println!("promotion {} cancelled", args.id);
            }
            PromotionCommand::List => {
                for promotion in engine.promotions().await? {
                    println!(
                        "{}  {}  channels={}  reach={}  clicks={}  {}",
                        promotion.id,
                        promotion.status.as_str(),
                        promotion.channel_count,
                        promotion.total_reach,
                        promotion.click_count,
                        promotion.title
                    );
                }
            }
        },
    }

    Ok(())
}
