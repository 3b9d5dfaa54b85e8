use clap::Subcommand;
use pulserhythm_core::catalog::TechniqueCatalog;
use pulserhythm_core::storage::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded sessions, newest first
    List {
        /// Filter to one technique by name or id
        #[arg(long)]
        technique: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate statistics
    Stats,
    /// Delete all session history
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List {
            technique,
            limit,
            json,
        } => {
            let technique_id = match technique {
                Some(query) => {
                    let catalog = TechniqueCatalog::load(&db)?;
                    Some(catalog.find(&query)?.id)
                }
                None => None,
            };
            let sessions = db.list_sessions(technique_id, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else {
                for s in sessions {
                    println!(
                        "{}  {}  {} cycles  {:.1}s  stability {:.0}%",
                        s.session_date.format("%Y-%m-%d %H:%M"),
                        s.technique_name,
                        s.completed_cycles,
                        s.total_time_secs,
                        s.rhythm_stability,
                    );
                }
            }
        }
        HistoryAction::Stats => {
            let stats = db.history_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Clear => {
            let n = db.delete_all_sessions()?;
            println!("Deleted {n} sessions");
        }
    }
    Ok(())
}
