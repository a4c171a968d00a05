use crate::{
    actions::{ActionReport, KeywordSource},
    session::{Account, Session},
    tasks::TaskDescriptor,
};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

const COLUMNS: [(&str, usize); 6] = [
    ("ID", 5),
    ("USERNAME", 20),
    ("BALANCE", 15),
    ("TRIBE", 20),
    ("PLAY CHANCES", 15),
    ("WALLET CONNECTED", 20),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CheckIn,
    ClaimFarm,
    StartFarm,
    AutoTasks,
    KeywordTasks,
    PlayGames,
    ClaimReferral,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        Some(match input.trim() {
            "1" => MenuChoice::CheckIn,
            "2" => MenuChoice::ClaimFarm,
            "3" => MenuChoice::StartFarm,
            "4" => MenuChoice::AutoTasks,
            "5" => MenuChoice::KeywordTasks,
            "6" => MenuChoice::PlayGames,
            "7" => MenuChoice::ClaimReferral,
            "8" => MenuChoice::Exit,
            _ => return None,
        })
    }
}

pub fn print_banner() {
    println!("BLUM BOT");
    println!("Multi-account check-in, farming and task automation");
    println!();
}

fn print_menu() {
    println!();
    println!("1. Make Check In");
    println!("2. Claim Farming Rewards");
    println!("3. Start Farming");
    println!("4. Auto Complete Tasks");
    println!("5. Complete Manual Tasks");
    println!("6. Play Games");
    println!("7. Claim Referral Rewards");
    println!("8. Exit");
    println!();
}

fn cell(text: &str, width: usize) -> String {
    let shown: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{:<width$}", shown, width = width)
}

fn row(values: &[String]) -> String {
    values
        .iter()
        .zip(COLUMNS.iter())
        .map(|(value, (_, width))| cell(value, *width))
        .collect::<Vec<_>>()
        .join("|")
}

pub fn render_table(accounts: &[Account]) -> String {
    let header: Vec<String> = COLUMNS.iter().map(|(name, _)| name.to_string()).collect();
    let rule = COLUMNS
        .iter()
        .map(|(_, width)| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("+");

    let mut lines = vec![row(&header), rule];
    for (index, account) in accounts.iter().enumerate() {
        let snapshot = &account.snapshot;
        let unknown = || "N/A".to_string();
        lines.push(row(&[
            (index + 1).to_string(),
            snapshot.username.clone().unwrap_or_else(unknown),
            snapshot.points.clone().unwrap_or_else(unknown),
            snapshot.group.clone().unwrap_or_else(unknown),
            snapshot
                .play_passes
                .map_or_else(unknown, |passes| passes.to_string()),
            match snapshot.wallet_linked {
                Some(true) => "YES".to_string(),
                Some(false) => "NO".to_string(),
                None => unknown(),
            },
        ]));
    }
    lines.join("\n")
}

/// Prints `prompt` and reads one line. `None` on end of input.
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| "Error reading from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub struct StdinKeywords;

impl KeywordSource for StdinKeywords {
    fn keyword_for(&mut self, task: &TaskDescriptor) -> String {
        println!("\nTask: \"{}\"", task.title);
        match read_line(&format!("Enter keyword for task \"{}\": ", task.title)) {
            Ok(Some(keyword)) => keyword,
            Ok(None) => String::new(),
            Err(err) => {
                log::warn!("{:#}", err);
                String::new()
            }
        }
    }
}

fn dispatch(session: &Session<'_>, choice: MenuChoice) -> Option<ActionReport> {
    match choice {
        MenuChoice::CheckIn => Some(session.check_in_all()),
        MenuChoice::ClaimFarm => Some(session.claim_farm_all()),
        MenuChoice::StartFarm => Some(session.start_farm_all()),
        MenuChoice::AutoTasks => Some(session.auto_complete_tasks_all()),
        MenuChoice::KeywordTasks => Some(session.run_keyword_tasks(&mut StdinKeywords)),
        MenuChoice::ClaimReferral => Some(session.claim_referral_all()),
        MenuChoice::PlayGames => {
            println!("Play Games feature is coming soon.");
            None
        }
        MenuChoice::Exit => None,
    }
}

/// Menu loop: run the chosen action for every account, then rotate bearers
/// and refresh the table.
pub fn run_interactive(session: &mut Session<'_>) -> Result<()> {
    loop {
        println!("{}", render_table(session.accounts()));
        print_menu();
        let input = match read_line("Select an option: ")? {
            Some(input) => input,
            None => break,
        };
        let choice = match MenuChoice::parse(&input) {
            Some(MenuChoice::Exit) => break,
            Some(choice) => choice,
            None => {
                println!("Invalid option. Please try again.");
                continue;
            }
        };

        if let Some(report) = dispatch(session, choice) {
            log::info!("{}", report.summary());
        }
        session.pause(session.pacing().menu_pause);
        if read_line("Press Enter to see main menu again...")?.is_none() {
            break;
        }

        session.rotate_tokens();
        session.rebuild_snapshots();
    }
    println!("All accounts have been processed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AccountSnapshot;

    #[test]
    fn parses_every_menu_entry() {
        assert_eq!(MenuChoice::parse(" 1 "), Some(MenuChoice::CheckIn));
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::PlayGames));
        assert_eq!(MenuChoice::parse("8"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("9"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[test]
    fn table_shows_unknown_fields_as_na() {
        let accounts = vec![
            Account {
                seed: "A".to_string(),
                token: Some("tok-A".to_string()),
                snapshot: AccountSnapshot {
                    username: Some("alice".to_string()),
                    points: Some("10.5".to_string()),
                    group: None,
                    play_passes: Some(2),
                    wallet_linked: Some(true),
                },
            },
            Account {
                seed: "B".to_string(),
                token: None,
                snapshot: AccountSnapshot::default(),
            },
        ];

        let table = render_table(&accounts);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID   |USERNAME"));
        assert!(lines[2].contains("alice") && lines[2].contains("YES"));
        assert_eq!(lines[3].matches("N/A").count(), 5);
    }
}
