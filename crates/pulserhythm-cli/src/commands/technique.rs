use clap::Subcommand;
use pulserhythm_core::catalog::TechniqueCatalog;
use pulserhythm_core::storage::Database;
use pulserhythm_core::Technique;

#[derive(Subcommand)]
pub enum TechniqueAction {
    /// List built-in and custom techniques
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one technique by name or id
    Show {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Add a custom technique
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        inhale: u32,
        #[arg(long, default_value = "0")]
        hold1: u32,
        #[arg(long)]
        exhale: u32,
        #[arg(long, default_value = "0")]
        hold2: u32,
    },
    /// Remove a custom technique by name or id
    Remove { query: String },
}

pub fn run(action: TechniqueAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut catalog = TechniqueCatalog::load(&db)?;

    match action {
        TechniqueAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog.all())?);
            } else {
                for t in catalog.all() {
                    print_technique(t);
                }
            }
        }
        TechniqueAction::Show { query, json } => {
            let t = catalog.find(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(t)?);
            } else {
                print_technique(t);
            }
        }
        TechniqueAction::Add {
            name,
            description,
            inhale,
            hold1,
            exhale,
            hold2,
        } => {
            let t = Technique::new(name, description, inhale, hold1, exhale, hold2)?;
            println!("Technique created: {} ({})", t.name, t.id);
            catalog.add(&db, t)?;
        }
        TechniqueAction::Remove { query } => {
            let id = catalog.find(&query)?.id;
            catalog.remove(&db, id)?;
            println!("Removed {query}");
        }
    }
    Ok(())
}

fn print_technique(t: &Technique) {
    println!(
        "{}  {}-{}-{}-{}  {}",
        t.name, t.inhale_secs, t.hold1_secs, t.exhale_secs, t.hold2_secs, t.description
    );
}
