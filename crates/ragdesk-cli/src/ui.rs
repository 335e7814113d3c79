//! UI utilities for the chat interface

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use ragdesk_core::{Result, Role, SearchResult, Transcript};
use ragdesk_rag::IngestReport;

const PROMPT: &str = "ragdesk>";

/// Most excerpts listed under an answer
const MAX_REFERENCES: usize = 2;

/// Display startup banner
pub fn display_banner(strategy: &str, indexed: usize) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(60, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let status = format!("{} chunks indexed • {} answers", indexed, strategy);
    let lines = [
        "ragdesk - company document assistant".to_string(),
        String::new(),
        "Ask about accounts, Wi-Fi, printers and more".to_string(),
        status,
    ];

    for line in lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let padding = (banner_width - 4).saturating_sub(line.chars().count());
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: Ask a question in any language, or type 'help' for commands".dimmed()
    );
    println!();
}

fn redraw(input: &str) -> io::Result<()> {
    print!("\r{} {}  \r{} {}", PROMPT.green().bold(), " ".repeat(50), PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Read one line with ↑/↓ history navigation
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<String> {
    // Piped input: read a plain line
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok("exit".to_string());
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    enable_raw_mode()?;
    let result = read_raw_line(history);
    disable_raw_mode()?;
    println!();
    result
}

fn read_raw_line(history: &mut Vec<String>) -> Result<String> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    print!("{} ", PROMPT.green().bold());
    io::stdout().flush()?;

    loop {
        if let Event::Key(key_event) = event::read()? {
            match key_event.code {
                KeyCode::Enter => {
                    if !input.is_empty() {
                        history.push(input.clone());
                    }
                    return Ok(input);
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    redraw(&input)?;
                }
                KeyCode::Backspace => {
                    if input.pop().is_some() {
                        redraw(&input)?;
                    }
                }
                KeyCode::Up => {
                    if !history.is_empty() {
                        let new_index = match history_index {
                            None => history.len() - 1,
                            Some(idx) if idx > 0 => idx - 1,
                            Some(idx) => idx,
                        };
                        history_index = Some(new_index);
                        input = history[new_index].clone();
                        redraw(&input)?;
                    }
                }
                KeyCode::Down => {
                    if let Some(idx) = history_index {
                        if idx + 1 < history.len() {
                            history_index = Some(idx + 1);
                            input = history[idx + 1].clone();
                        } else {
                            history_index = None;
                            input.clear();
                        }
                        redraw(&input)?;
                    }
                }
                KeyCode::Esc => return Ok(String::new()),
                _ => {}
            }
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about the loaded documents", "<question>".green());
    println!("  {} - Replace the indexed documents with a file", "load <file>".green());
    println!("  {} - Show this conversation", "history".green());
    println!("  {} - Clear this conversation", "reset".green());
    println!("  {} - Show index statistics", "stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit/종료".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  what is the wifi password");
    println!("  구글 계정 알려줘");
    println!("  load docs/it-handbook.docx");
}

/// Excerpts listed under an answer: only when more than one hit was used
pub fn references(sources: &SearchResult) -> Vec<String> {
    if sources.len() < 2 {
        return Vec::new();
    }
    sources
        .hits
        .iter()
        .take(MAX_REFERENCES)
        .map(|hit| {
            let excerpt: String = hit.text.chars().take(100).collect();
            let ellipsis = if hit.text.chars().count() > 100 { "..." } else { "" };
            format!("[{}] {}{} ({:.2})", hit.metadata.source_filename, excerpt, ellipsis, hit.score)
        })
        .collect()
}

/// Print an answer and its supporting excerpts
pub fn print_answer(text: &str, sources: &SearchResult) {
    println!();
    println!("{}", text);

    let references = references(sources);
    if !references.is_empty() {
        println!();
        println!("{}", "📚 References:".dimmed());
        for reference in references {
            println!("  {}", reference.dimmed());
        }
    }
    println!();
}

/// Print what an ingestion batch did
pub fn print_ingest_report(report: &IngestReport) {
    if report.documents_indexed > 0 {
        println!(
            "{} Indexed {} document(s) into {} chunks (collection '{}')",
            "✅".green(),
            report.documents_indexed,
            report.chunks_indexed,
            report.index.collection
        );
    }
    for error in &report.errors {
        println!("{} {}", "❌".red(), error);
    }
    if report.documents_indexed == 0 {
        println!(
            "{} No document could be read; keeping the current {} chunks",
            "⚠️".yellow(),
            report.index.entries
        );
    }
}

/// Print the transcript, oldest first
pub fn print_history(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for message in transcript.messages() {
        let speaker = match message.role {
            Role::User => "you".cyan().bold(),
            Role::Assistant => "ragdesk".green().bold(),
        };
        println!(
            "{} {} {}",
            message.timestamp.format("%H:%M:%S").to_string().dimmed(),
            speaker,
            message.content
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_core::{ChunkKind, ChunkMetadata, SearchHit};

    fn hit(text: &str, score: f32) -> SearchHit {
        SearchHit {
            id: "x".to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_filename: "it.txt".to_string(),
                section_title: None,
                kind: ChunkKind::Fragment,
                sequence_index: 0,
            },
            score,
        }
    }

    #[test]
    fn test_single_hit_has_no_references() {
        let sources = SearchResult {
            hits: vec![hit("Printer IP: 192.168.1.50", 0.8)],
        };
        assert!(references(&sources).is_empty());
    }

    #[test]
    fn test_references_are_capped() {
        let long = "x".repeat(150);
        let sources = SearchResult {
            hits: vec![hit("first", 0.9), hit(&long, 0.5), hit("third", 0.2)],
        };

        let refs = references(&sources);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], "[it.txt] first (0.90)");
        assert!(refs[1].ends_with("... (0.50)"));
    }
}
