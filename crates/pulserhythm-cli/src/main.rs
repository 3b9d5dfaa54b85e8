use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pulserhythm-cli", version, about = "PulseRhythm CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guided breathing session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Breathing technique catalog
    Technique {
        #[command(subcommand)]
        action: commands::technique::TechniqueAction,
    },
    /// Session history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Achievement progress
    Achievements {
        #[command(subcommand)]
        action: commands::achievements::AchievementsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Technique { action } => commands::technique::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Achievements { action } => commands::achievements::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
