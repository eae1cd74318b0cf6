// Interactive loop over a Chat session

use anyhow::{Context, Result};
use converse_llm::{Chat, Content, MediaType, Message, Role};
use futures::StreamExt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::ChatConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    /// `None` clears the prompt
    System(Option<String>),
    Image(PathBuf),
    History,
    Reset,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "system" if arg.is_empty() => Self::System(None),
            "system" => Self::System(Some(arg.to_string())),
            "image" if !arg.is_empty() => Self::Image(PathBuf::from(arg)),
            "history" => Self::History,
            "reset" => Self::Reset,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Read an image file into attachable content
pub fn load_image(path: &Path) -> Result<Content> {
    let media_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaType::from_extension)
        .with_context(|| format!("{} is not a png or jpeg file", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(Content::image(media_type, &bytes))
}

/// User turn from typed text plus any pending attachments
pub fn build_turn(text: String, attachments: &mut Vec<Content>) -> Result<Message> {
    let mut content = std::mem::take(attachments);
    content.push(Content::text(text));
    Ok(Message::new(Role::User, content)?)
}

fn print_help() {
    println!("Commands:");
    println!("  /system <text>   set the system prompt (no text clears it)");
    println!("  /image <path>    attach a png/jpeg to the next message");
    println!("  /history         print the conversation as JSON");
    println!("  /reset           start a new conversation");
    println!("  /quit            leave");
}

pub async fn run(chat: &mut Chat, settings: &ChatConfig) -> Result<()> {
    println!("Converse ({}) - type /help for commands", chat.adapter_name());
    if let Some(prompt) = chat.system_prompt() {
        println!("System prompt: {prompt}");
    }

    let mut attachments: Vec<Content> = Vec::new();

    loop {
        print!("\n\x1b[1;36mYou:\x1b[0m ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        match Command::parse(&input) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Unknown(line) => println!("Unknown command: {line} (try /help)"),
            Command::System(prompt) => {
                match &prompt {
                    Some(prompt) => println!("System prompt set: {prompt}"),
                    None => println!("System prompt cleared"),
                }
                chat.set_system_prompt(prompt);
            }
            Command::Image(path) => match load_image(&path) {
                Ok(image) => {
                    attachments.push(image);
                    println!("Attached {} ({} pending)", path.display(), attachments.len());
                }
                Err(e) => println!("\x1b[1;31m{e:#}\x1b[0m"),
            },
            Command::History => {
                println!("{}", serde_json::to_string_pretty(&chat.snapshot())?);
            }
            Command::Reset => {
                chat.reset();
                attachments.clear();
                println!("Conversation reset");
            }
            Command::Say(text) => {
                let turn = build_turn(text, &mut attachments)?;
                print!("\n\x1b[1;32mAssistant:\x1b[0m ");
                io::stdout().flush()?;

                if settings.stream {
                    let mut fragments = chat.submit(turn);
                    while let Some(fragment) = fragments.next().await {
                        match fragment {
                            Ok(fragment) => {
                                print!("{fragment}");
                                io::stdout().flush()?;
                            }
                            Err(e) => println!("\n\x1b[1;31mError: {e}\x1b[0m"),
                        }
                    }
                    println!();
                } else {
                    match chat.generate(turn).await {
                        Ok(text) => println!("{text}"),
                        Err(e) => println!("\x1b[1;31mError: {e}\x1b[0m"),
                    }
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
