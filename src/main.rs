//! Terminal harness around the session engine: start a focus session and
//! watch it tick, print history stats, or reset the store.

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use log::debug;
use tokio::signal;

use itz::{
    stats::{calculate_stats, format_duration, format_duration_human, group_sessions_by_day},
    JsonFileStore, LocalScheduler, SessionController, SessionStore, SettingsStore, TimerStatus,
};

fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "itz", "itz")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("start") => {
            let task_name = args
                .get(1)
                .filter(|name| !name.trim().is_empty())
                .context("usage: itz start <task-name> [goal-minutes]")?
                .clone();
            let goal_minutes = args
                .get(2)
                .map(|raw| {
                    raw.parse::<u32>()
                        .ok()
                        .filter(|&minutes| minutes > 0)
                        .with_context(|| format!("invalid goal minutes: {raw}"))
                })
                .transpose()?;
            run_session(task_name, goal_minutes).await
        }
        Some("stats") => print_stats().await,
        Some("reset") => reset().await,
        _ => {
            eprintln!("usage: itz <start|stats|reset> ...");
            std::process::exit(2);
        }
    }
}

async fn run_session(task_name: String, goal_minutes: Option<u32>) -> Result<()> {
    let dir = data_dir();
    let settings = SettingsStore::new(dir.join("settings.json"))?;
    let goal_minutes = goal_minutes.unwrap_or_else(|| settings.default_goal_minutes());

    let store = Arc::new(JsonFileStore::new(dir.join("sessions.json"))?);
    let (scheduler, mut fired) = LocalScheduler::new(settings.reminder().enabled);
    let controller = SessionController::new(store, Arc::new(scheduler));

    controller
        .start_session(task_name.as_str(), goal_minutes)
        .await?;
    println!("focusing on {task_name:?} (goal {goal_minutes}m) — Ctrl-C to end");

    let mut snapshots = controller.subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    bail!("timer feed closed unexpectedly");
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.status != TimerStatus::Active {
                    continue;
                }
                let marker = if snapshot.goal_reached { "  [goal reached]" } else { "" };
                print!("\r  {}{marker}   ", format_duration(snapshot.elapsed_secs));
                io::stdout().flush().ok();
            }
            reminder = fired.recv() => {
                if let Some(content) = reminder {
                    println!("\n{}: {}", content.title, content.body);
                }
            }
            _ = signal::ctrl_c() => break,
        }
    }

    // Outcome inferred from elapsed vs goal at this moment.
    let session = controller.finish_session().await?;
    println!(
        "\n{} {:?} after {}",
        if session.completed { "completed" } else { "cancelled" },
        session.task_name,
        format_duration_human(session.duration),
    );
    debug!("session {} recorded", session.id);

    Ok(())
}

async fn print_stats() -> Result<()> {
    let store = JsonFileStore::new(data_dir().join("sessions.json"))?;
    let sessions = store.get_all().await;
    let stats = calculate_stats(&sessions);

    println!("today      {}", format_duration_human(stats.today_total));
    println!("last 7d    {}", format_duration_human(stats.week_total));
    println!("last 30d   {}", format_duration_human(stats.month_total));
    println!("all time   {}", format_duration_human(stats.all_time_total));
    println!(
        "sessions   {} ({} completed, {} cancelled)",
        stats.total_sessions, stats.completed_sessions, stats.cancelled_sessions
    );

    for day in group_sessions_by_day(&sessions) {
        println!("\n{}  {}", day.date, format_duration_human(day.total_duration));
        for session in &day.sessions {
            println!(
                "  {}  {:?}  {}",
                if session.completed { "+" } else { "-" },
                session.task_name,
                format_duration(session.duration),
            );
        }
    }

    Ok(())
}

async fn reset() -> Result<()> {
    let store = JsonFileStore::new(data_dir().join("sessions.json"))?;
    store.clear().await?;
    println!("session history cleared");
    Ok(())
}
