use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use pollvote::client::api::DEFAULT_API_URL;
use pollvote::client::{ApiClient, PollBoard, SessionStore, tally};
use pollvote::dto::PollDto;
use pollvote::models::poll::PollStatus;
use pollvote::models::user::Role;

#[derive(Parser)]
#[command(name = "pollctl", version, about = "Poll voting client")]
struct Cli {
    /// API base URL
    #[arg(long, env = "POLLVOTE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Where the signed-in session is kept
    #[arg(long, env = "POLLVOTE_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Seconds between background reloads while watching
    #[arg(long, env = "POLLVOTE_REFRESH_SECS", default_value = "30")]
    refresh_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "POLLVOTE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "POLLVOTE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List polls with results
    List,
    /// Show one poll
    Show { poll: i64 },
    /// Vote for an option (by option id)
    Vote { poll: i64, option: i64 },
    /// Create a poll (admin)
    Create {
        #[arg(long)]
        question: String,
        /// Repeat for each option
        #[arg(long = "option", required = true)]
        options: Vec<String>,
        /// Hours until the poll closes
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    /// Replace a poll's question and options (admin)
    Edit {
        poll: i64,
        #[arg(long)]
        question: Option<String>,
        #[arg(long = "option")]
        options: Vec<String>,
    },
    /// Close a poll now (admin)
    Close {
        poll: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Delete a poll and its votes (admin)
    Delete {
        poll: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Keep reloading and reprint the list until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let store = SessionStore::new(cli.session_file.clone().unwrap_or_else(SessionStore::default_path));
    let mut board = PollBoard::new(
        ApiClient::new(&cli.api_url),
        store,
        Duration::from_secs(cli.refresh_secs.max(1)),
    );

    let result = run(&mut board, cli.command).await;
    board.shutdown().await;
    result
}

async fn run(board: &mut PollBoard, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            board.auth_form.email = email;
            board.auth_form.password = password;
            board.login().await?;
            print_signed_in(board);
        }
        Commands::Signup { name, email, password } => {
            board.show_signup();
            board.auth_form.name = name;
            board.auth_form.email = email;
            board.auth_form.password = password;
            println!("Signing up as {}", board.auth_form.detected_role());
            board.signup().await?;
            print_signed_in(board);
        }
        Commands::Logout => {
            board.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            require_session(board).await?;
            print_signed_in(board);
        }
        Commands::List => {
            let role = require_session(board).await?;
            print_polls(&board.polls(), role);
        }
        Commands::Show { poll } => {
            let role = require_session(board).await?;
            let poll = find_poll(board, poll)?;
            print_poll(&poll, role);
        }
        Commands::Vote { poll, option } => {
            let role = require_session(board).await?;
            board.vote(poll, option).await?;
            let poll = find_poll(board, poll)?;
            if let Some(chosen) = tally::chosen_option(&poll) {
                println!("Voted for '{}'", chosen.text);
            }
            print_poll(&poll, role);
        }
        Commands::Create { question, options, hours } => {
            let role = require_session(board).await?;
            board.show_create();
            board.poll_form.question = question;
            board.poll_form.set_options(options);
            board.poll_form.duration_hours = hours;
            board.create_poll().await?;
            println!("Poll created");
            print_polls(&board.polls(), role);
        }
        Commands::Edit { poll, question, options } => {
            let role = require_session(board).await?;
            board.begin_edit(poll)?;
            if let Some(question) = question {
                board.poll_form.question = question;
            }
            if !options.is_empty() {
                board.poll_form.set_options(options);
            }
            board.update_poll().await?;
            println!("Poll {poll} updated");
            print_poll(&find_poll(board, poll)?, role);
        }
        Commands::Close { poll, yes } => {
            require_session(board).await?;
            let target = find_poll(board, poll)?;
            if !yes && !confirm(&format!("Close poll '{}'?", target.question))? {
                println!("Aborted");
                return Ok(());
            }
            board.close_poll(poll).await?;
            println!("Poll {poll} closed");
        }
        Commands::Delete { poll, yes } => {
            require_session(board).await?;
            let target = find_poll(board, poll)?;
            if !yes && !confirm(&format!("Delete poll '{}' and all its votes?", target.question))? {
                println!("Aborted");
                return Ok(());
            }
            board.delete_poll(poll).await?;
            println!("Poll {poll} deleted");
        }
        Commands::Watch => {
            let role = require_session(board).await?;
            watch(board, role).await?;
        }
    }
    Ok(())
}

/// Resume the stored session or fail with a hint to sign in.
async fn require_session(board: &mut PollBoard) -> Result<Role> {
    if !board.restore().await? {
        bail!("Not signed in; run `pollctl login` first");
    }
    board
        .session()
        .map(|s| s.user.role)
        .context("Session disappeared after restore")
}

fn find_poll(board: &PollBoard, poll_id: i64) -> Result<PollDto> {
    board
        .poll(poll_id)
        .with_context(|| format!("Poll {poll_id} not found"))
}

async fn watch(board: &mut PollBoard, role: Role) -> Result<()> {
    let mut rx = board.subscribe();
    print_polls(&rx.borrow_and_update(), role);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                println!("--- {} ---", chrono::Local::now().format("%H:%M:%S"));
                print_polls(&rx.borrow_and_update(), role);
            }
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read answer")?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_signed_in(board: &PollBoard) {
    if let Some(session) = board.session() {
        println!(
            "Signed in as {} <{}> ({})",
            session.user.name, session.user.email, session.user.role
        );
    }
}

fn print_polls(polls: &[PollDto], role: Role) {
    if polls.is_empty() {
        println!("No polls yet");
        return;
    }
    for poll in polls {
        print_poll(poll, role);
        println!();
    }
}

fn print_poll(poll: &PollDto, role: Role) {
    let status = match poll.status {
        PollStatus::Open => format!("open until {}", poll.closes_at.format("%Y-%m-%d %H:%M UTC")),
        PollStatus::Closed => "closed".to_string(),
    };
    println!("[{}] {} ({status})", poll.id, poll.question);

    let show_results = tally::shows_results(poll, role);
    let total = tally::total_votes(poll);
    for option in &poll.options {
        let mark = if poll.user_vote == Some(option.id) { "*" } else { " " };
        if show_results {
            let pct = tally::percentage(option.votes, total);
            println!(
                "  {mark} {:>4}  {:<23} {} {:>3} votes ({pct:.1}%)",
                option.id,
                tally::short_label(&option.text),
                tally::bar(pct, 20),
                option.votes,
            );
        } else {
            println!("  {mark} {:>4}  {}", option.id, option.text);
        }
    }
    if tally::can_vote(poll, role) {
        println!("  vote with: pollctl vote {} <option id>", poll.id);
    }
}
