use crate::cli::opts::*;
use crate::config::AppConfig;

use anyhow::{anyhow, bail, Result};
use convodeck_core::{
    normalize_package_name, CardSet, CardSetImporter, CardSetRepository, ImportReport, KeyValueStore,
    KvCardSetRepo, KvProgressRepo, ProgressSummary, ProgressTracker, SystemClock,
};
use convodeck_json::JsonKvStore;
use convodeck_sqlite::SqliteKvStore;
use std::collections::HashMap;
use std::io::{stdin, stdout, Write};
use std::sync::Arc;
use tracing::warn;

/// Everything a command needs, wired over one key-value store.
pub struct Services {
    pub card_sets: Arc<dyn CardSetRepository>,
    pub tracker: ProgressTracker,
    pub importer: CardSetImporter,
}

impl Services {
    pub fn over(store: Arc<dyn KeyValueStore>) -> Self {
        let card_sets: Arc<dyn CardSetRepository> = Arc::new(KvCardSetRepo::new(store.clone()));
        let tracker = ProgressTracker::new(Arc::new(KvProgressRepo::new(store)), Arc::new(SystemClock));
        let importer = CardSetImporter::new(card_sets.clone());
        Self { card_sets, tracker, importer }
    }
}

pub async fn open_store(cfg: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    std::fs::create_dir_all(&cfg.data_dir)?;
    match cfg.store {
        StoreKind::Json => {
            let s = JsonKvStore::open_in(&cfg.data_dir, cfg.max_backups).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let s = SqliteKvStore::open_file(cfg.sqlite_path()).await?;
            Ok(Arc::new(s))
        }
    }
}

pub async fn run_cli(args: Cli) -> Result<()> {
    let cfg = AppConfig::from_cli(&args);
    let svc = Services::over(open_store(&cfg).await?);
    match args.cmd {
        Command::Import(cmd) => import_cmd(&svc, cmd).await,
        Command::Sets(cmd) => sets_cmd(&svc, cmd).await,
        Command::View { set, card_id } => view_cmd(&svc, &set, &card_id).await,
        Command::Progress(cmd) => progress_cmd(&svc, cmd).await,
        Command::Study(cmd) => study_cmd(&svc, cmd).await,
    }
}

async fn import_cmd(svc: &Services, cmd: ImportCmd) -> Result<()> {
    let result = svc.importer.import_from_path(&cmd.path).await;
    if cmd.json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string_pretty(&ImportReport::from(result))?);
        if failed {
            bail!("import failed");
        }
        return Ok(());
    }
    match result {
        Ok(set) => {
            println!("imported {} ({} cards)", set.package_name, set.cards.len());
            Ok(())
        }
        Err(e) => Err(anyhow!("{}: {}", e.code(), e.message())),
    }
}

async fn sets_cmd(svc: &Services, cmd: SetsCmd) -> Result<()> {
    match cmd {
        SetsCmd::List => {
            for s in svc.card_sets.get_all_card_sets().await? {
                let desc = if s.description.is_empty() { "-" } else { s.description.as_str() };
                println!("{}\t{}\t{}", s.package_name, s.cards.len(), desc);
            }
        }
        SetsCmd::Show { name } => {
            let set = require_set(svc, &name).await?;
            println!("{}", set.package_name);
            if !set.description.is_empty() {
                println!("{}", set.description);
            }
            if !set.image.is_empty() {
                println!("image: {}", set.image);
            }
            for c in &set.cards {
                println!("{}\t[{}]\tdifficulty={}\t{}", c.id, c.category, c.difficulty.as_level(), c.question);
                for f in &c.follow_ups {
                    println!("\t  - {f}");
                }
            }
        }
        SetsCmd::Rm { name } => {
            let set = require_set(svc, &name).await?;
            svc.card_sets.delete_card_set(&set.package_name).await?;
            println!("ok");
        }
        SetsCmd::Export { name, path } => {
            let set = require_set(svc, &name).await?;
            std::fs::write(&path, serde_json::to_string_pretty(&set)?)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

async fn view_cmd(svc: &Services, set: &str, card_id: &str) -> Result<()> {
    let set_id = normalize_package_name(set);
    match svc.card_sets.get_card_set(&set_id).await? {
        Some(s) if s.card(card_id).is_none() => warn!(set = %set_id, card_id, "card is not part of the stored set"),
        None => warn!(set = %set_id, "no stored card set with this name"),
        _ => {}
    }
    let p = svc.tracker.track_card_view(&set_id, card_id).await?;
    println!("seen {} card(s)", p.seen_cards.len());
    Ok(())
}

async fn progress_cmd(svc: &Services, cmd: ProgressCmd) -> Result<()> {
    match cmd {
        ProgressCmd::Show { set, total } => {
            let set_id = normalize_package_name(&set);
            let total = match total {
                Some(t) => t,
                None => svc.card_sets.get_card_set(&set_id).await?.map(|s| s.cards.len()).unwrap_or(0),
            };
            let summary = svc.tracker.get_set_progress(&set_id, total).await?;
            print_summary(&set_id, &summary);
        }
        ProgressCmd::All => {
            let sizes: HashMap<String, usize> = svc
                .card_sets
                .get_all_card_sets()
                .await?
                .into_iter()
                .map(|s| (s.key(), s.cards.len()))
                .collect();
            let all = svc.tracker.get_all_progress(&sizes).await?;
            let mut ids: Vec<&String> = all.keys().collect();
            ids.sort();
            for id in ids {
                print_summary(id, &all[id]);
            }
        }
        ProgressCmd::Reset { set } => {
            svc.tracker.reset_progress(&normalize_package_name(&set)).await?;
            println!("ok");
        }
    }
    Ok(())
}

async fn study_cmd(svc: &Services, cmd: StudyCmd) -> Result<()> {
    let set = require_set(svc, &cmd.set).await?;
    let set_id = set.key();
    let total = set.cards.len();

    let seen = svc.tracker.get_set_progress(&set_id, total).await?.seen_cards;
    let pool: Vec<_> = set
        .cards
        .iter()
        .filter(|c| !cmd.unseen || !seen.contains(&c.id))
        .filter(|c| cmd.category.as_ref().map(|k| c.category.eq_ignore_ascii_case(k)).unwrap_or(true))
        .collect();
    if pool.is_empty() {
        println!("no cards to study");
        return Ok(());
    }

    let mut shown = 0usize;
    for card in &pool {
        shown += 1;
        println!("\n[{}/{}] {} ({})", shown, pool.len(), card.question, card.category);
        for f in &card.follow_ups {
            println!("  - {f}");
        }
        svc.tracker.track_card_view(&set_id, &card.id).await?;
        let summary = svc.tracker.get_set_progress(&set_id, total).await?;
        println!("→ {}% of {}", summary.percentage, set.package_name);

        let line = read_line("[enter=next, q=quit] ")?;
        if matches!(line.trim().to_lowercase().as_str(), "q" | "quit") {
            break;
        }
    }

    println!("\nviewed {shown}");
    Ok(())
}

// ===== Helpers =====
async fn require_set(svc: &Services, name: &str) -> Result<CardSet> {
    svc.card_sets
        .get_card_set(name)
        .await?
        .ok_or_else(|| anyhow!("card set not found: {name}"))
}

fn print_summary(set_id: &str, s: &ProgressSummary) {
    let last = s.last_viewed_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into());
    let done = s.completed_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into());
    println!("{set_id}\t{}%\tseen={}\tlast_viewed={last}\tcompleted={done}", s.percentage, s.seen_cards.len());
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    stdout().flush().ok();
    let mut s = String::new();
    stdin().read_line(&mut s)?;
    Ok(s)
}
