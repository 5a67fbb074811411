use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{Result, anyhow};
use cantolearn::{Modal, ModalStatus, Session, View, render};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cantolearn",
    version,
    about = "Break Chinese text into Cantonese vocabulary with Jyutping"
)]
struct Cli {
    /// Text to translate (reads stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// API key (overrides GEMINI_API_KEY / GOOGLE_API_KEY / API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Show colloquial alternatives for a word and exit
    #[arg(long = "suggest", value_name = "WORD")]
    suggest: Option<String>,

    /// Show translation histories and exit
    #[arg(long = "show-histories")]
    show_histories: bool,

    /// Filter histories by original text or date
    #[arg(long = "search", value_name = "QUERY")]
    search: Option<String>,

    /// Delete a history record by id and exit
    #[arg(long = "delete-history", value_name = "ID")]
    delete_history: Option<String>,

    /// Delete all history records and exit
    #[arg(long = "clear-histories")]
    clear_histories: bool,

    /// Pronounce text with the system speech command and exit
    #[arg(long = "speak", value_name = "TEXT")]
    speak: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> cantolearn::Config {
        cantolearn::Config {
            key: self.key.clone(),
            settings_path: self.read_settings.clone(),
            suggest: self.suggest.clone(),
            show_histories: self.show_histories,
            search: self.search.clone(),
            delete_history: self.delete_history.clone(),
            clear_histories: self.clear_histories,
            speak: self.speak.clone(),
        }
    }

    fn needs_input(&self) -> bool {
        !(self.suggest.is_some()
            || self.show_histories
            || self.search.is_some()
            || self.delete_history.is_some()
            || self.clear_histories
            || self.speak.is_some())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cantolearn::logging::init(cli.verbose)?;
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let input = if !cli.text.is_empty() {
        Some(cli.text.join(" "))
    } else if cli.needs_input() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let output = cantolearn::run(cli.config(), input).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let mut session = cantolearn::open_session(&cli.config())?;
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type /help to see available commands.");
    if !session.has_key() {
        eprintln!("warning: no API key found; translation and suggestions are unavailable");
    }

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("{}> ", prompt_label(&session));
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let outcome = if input.starts_with('/') {
            handle_interactive_command(input, &mut session).await
        } else {
            translate_line(input, &mut session).await.map(|_| false)
        };
        match outcome {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
    Ok(())
}

fn prompt_label(session: &Session) -> &'static str {
    match session.app.modal() {
        Modal::Open { .. } => "suggestions",
        Modal::Closed => session.app.view().as_str(),
    }
}

async fn translate_line(text: &str, session: &mut Session) -> Result<()> {
    session.require_key()?;
    session.app.set_view(View::Translate);
    session.app.set_input(text);
    session.app.translate().await?;
    if let Some(message) = session.app.error() {
        eprintln!("{}", message);
        return Ok(());
    }
    print_current_results(session);
    Ok(())
}

async fn handle_interactive_command(input: &str, session: &mut Session) -> Result<bool> {
    let trimmed = input.trim();
    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (trimmed, ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(true),
        "/help" => print_interactive_help(),
        "/translate" => {
            if arg.is_empty() {
                session.app.set_view(View::Translate);
                print_current_results(session);
            } else {
                translate_line(arg, session).await?;
            }
        }
        "/history" => {
            session.app.set_view(View::History);
            if !arg.is_empty() {
                session.app.set_search(arg);
            }
            print_history(session);
        }
        "/search" => {
            if session.app.view() != View::History {
                session.app.set_view(View::History);
            }
            session.app.set_search(arg);
            print_history(session);
        }
        "/delete" => {
            let id = history_record_id(session, arg)?;
            session.app.delete_history(&id)?;
            print_history(session);
        }
        "/clear-histories" => {
            session.app.clear_history()?;
            println!("history cleared");
        }
        "/suggest" => {
            session.require_key()?;
            let (word, target) = suggestion_target(session, arg)?;
            println!("Looking up colloquial alternatives for {} ...", word);
            session.app.open_suggestions(&word, target.as_deref()).await;
            println!(
                "{}",
                render::format_suggestions(session.app.suggestions().unwrap_or_default())
            );
        }
        "/add" => {
            let Some(suggestions) = session.app.suggestions() else {
                return Err(anyhow!("no suggestions are open (use /suggest first)"));
            };
            let index = parse_index(arg, suggestions.len())?;
            let chosen = suggestions[index].clone();
            session.app.add_suggestion(&chosen)?;
            match session.app.view() {
                View::Translate => print_current_results(session),
                View::History => print_history(session),
            }
        }
        "/close" => {
            if let Modal::Open {
                status: ModalStatus::Ready(_),
                ..
            } = session.app.modal()
            {
                session.app.close_modal();
            }
        }
        "/speak" => {
            let text = speech_text(session, arg)?;
            session.speaker.speak(&text)?;
        }
        _ => eprintln!("unknown command: {}", trimmed),
    }
    Ok(false)
}

/// `/suggest <item#>` in the translate view, `/suggest <record#> <item#>` in
/// the history view.
fn suggestion_target(session: &Session, arg: &str) -> Result<(String, Option<String>)> {
    let parts = arg.split_whitespace().collect::<Vec<_>>();
    match session.app.view() {
        View::Translate => {
            let results = session
                .app
                .current_results()
                .ok_or_else(|| anyhow!("nothing translated yet"))?;
            let index = parse_index(parts.first().copied().unwrap_or(""), results.len())?;
            Ok((results[index].text.clone(), None))
        }
        View::History => {
            let records = session.app.filtered_history();
            let record = &records[parse_index(parts.first().copied().unwrap_or(""), records.len())?];
            let index = parse_index(parts.get(1).copied().unwrap_or(""), record.results.len())?;
            Ok((record.results[index].text.clone(), Some(record.id.clone())))
        }
    }
}

fn history_record_id(session: &Session, arg: &str) -> Result<String> {
    if session.app.view() != View::History {
        return Err(anyhow!("open the history view first (/history)"));
    }
    let records = session.app.filtered_history();
    let index = parse_index(arg, records.len())?;
    Ok(records[index].id.clone())
}

fn speech_text(session: &Session, arg: &str) -> Result<String> {
    if arg.is_empty() {
        return Err(anyhow!("usage: /speak <item#|text>"));
    }
    if let (View::Translate, Some(results)) = (session.app.view(), session.app.current_results()) {
        if let Ok(index) = parse_index(arg, results.len()) {
            return Ok(results[index].text.clone());
        }
    }
    Ok(arg.to_string())
}

fn parse_index(arg: &str, len: usize) -> Result<usize> {
    let value = arg
        .trim()
        .parse::<usize>()
        .map_err(|_| anyhow!("expected a number between 1 and {}", len))?;
    if value == 0 || value > len {
        return Err(anyhow!("expected a number between 1 and {}", len));
    }
    Ok(value - 1)
}

fn print_current_results(session: &Session) {
    match session.app.current_results() {
        Some(results) => println!("{}", render::format_items(results)),
        None => println!("(nothing translated yet)"),
    }
}

fn print_history(session: &Session) {
    println!(
        "{}",
        render::format_history(&session.app.filtered_history(), session.app.utc_offset())
    );
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  <text>                         Translate text");
    println!("  /translate [text]              Switch to the translate view (or translate text)");
    println!("  /history [query]               Show history, optionally filtered");
    println!("  /search <query>                Filter history by text or date");
    println!("  /delete <record#>              Delete a history record");
    println!("  /clear-histories               Delete all history records");
    println!("  /suggest <item#>               Colloquial alternatives (translate view)");
    println!("  /suggest <record#> <item#>     Colloquial alternatives (history view)");
    println!("  /add <suggestion#>             Keep a suggestion");
    println!("  /close                         Close the suggestions");
    println!("  /speak <item#|text>            Pronounce an item or text");
    println!("  /quit, /exit                   Exit interactive mode");
}

#[cfg(test)]
mod tests {
    use super::parse_index;

    #[test]
    fn parse_index_is_one_based() {
        assert_eq!(parse_index("1", 3).unwrap(), 0);
        assert_eq!(parse_index(" 3 ", 3).unwrap(), 2);
        assert!(parse_index("0", 3).is_err());
        assert!(parse_index("4", 3).is_err());
        assert!(parse_index("x", 3).is_err());
    }
}
