use clap::Subcommand;
use pulserhythm_core::achievements::AchievementBook;
use pulserhythm_core::storage::Database;

#[derive(Subcommand)]
pub enum AchievementsAction {
    /// List achievements and their progress
    List {
        /// Only unlocked achievements
        #[arg(long)]
        unlocked: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: AchievementsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let book = AchievementBook::load(&db)?;

    match action {
        AchievementsAction::List { unlocked, json } => {
            let achievements: Vec<_> = if unlocked {
                book.unlocked()
            } else {
                book.all().iter().collect()
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&achievements)?);
            } else {
                for a in achievements {
                    let mark = if a.is_unlocked { "[x]" } else { "[ ]" };
                    println!(
                        "{mark} {}  {} ({:.0}%)",
                        a.title,
                        a.description,
                        a.progress_percentage()
                    );
                }
            }
        }
    }
    Ok(())
}
