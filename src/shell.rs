//! Interactive shell: prompt, read a line, execute, repeat.
//!
//! Lines come from a [`LineSource`], normally the rustyline-backed [`Editor`]
//! which adds history and tab-completion. Completion offers command names for
//! the first word and full movie titles after `detail` / `play`, matching the
//! text typed so far case-insensitively against the session's movie index.

use std::io::{self, Write};

use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing::debug;

use crate::client::Transport;
use crate::session::{Flow, Session};

/// Printed once when the interactive shell starts.
pub const INTRO: &str = "Type `help` or `?` for command list";

/// Commands whose argument is a movie title.
const TITLE_COMMANDS: &[&str] = &["detail", "play"];

/// Result of asking a [`LineSource`] for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// Ctrl-C: discard the line and prompt again.
    Interrupted,
    /// End of input.
    Eof,
}

/// Where the shell reads its lines from.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadLine>;

    /// Update what tab-completion can offer.
    fn set_completions(&mut self, _commands: &[&'static str], _titles: &[String]) {}
}

/// Completion data shared with rustyline.
#[derive(Default)]
pub struct ShellHelper {
    commands: Vec<&'static str>,
    titles: Vec<String>,
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(complete_line(line, pos, &self.commands, &self.titles))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// Completion candidates for `line` with the cursor at `pos`.
///
/// Returns the byte offset where the replacement starts and the candidates.
pub fn complete_line(
    line: &str,
    pos: usize,
    commands: &[&'static str],
    titles: &[String],
) -> (usize, Vec<String>) {
    let head = line.get(..pos).unwrap_or(line);

    match head.split_once(' ') {
        None => {
            let matches = commands
                .iter()
                .filter(|c| c.starts_with(head))
                .map(|c| (*c).to_string())
                .collect();
            (0, matches)
        }
        Some((command, rest)) if TITLE_COMMANDS.contains(&command) => {
            let rest = rest.trim_start();
            let start = head.len() - rest.len();
            let prefix = rest.to_lowercase();
            let matches = titles
                .iter()
                .filter(|t| t.to_lowercase().starts_with(&prefix))
                .cloned()
                .collect();
            (start, matches)
        }
        Some(_) => (pos, Vec::new()),
    }
}

/// rustyline editor as a [`LineSource`].
pub struct Editor {
    inner: rustyline::Editor<ShellHelper, DefaultHistory>,
}

impl Editor {
    pub fn new() -> rustyline::Result<Self> {
        let mut inner = rustyline::Editor::new()?;
        inner.set_helper(Some(ShellHelper::default()));
        Ok(Self { inner })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadLine> {
        match self.inner.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.inner.add_history_entry(line.as_str()) {
                        debug!(error = %e, "history entry not added");
                    }
                }
                Ok(ReadLine::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn set_completions(&mut self, commands: &[&'static str], titles: &[String]) {
        if let Some(helper) = self.inner.helper_mut() {
            helper.commands = commands.to_vec();
            helper.titles = titles.to_vec();
        }
    }
}

/// Run the read-execute loop until `quit` or end of input.
pub async fn run<T, L, W>(
    session: &mut Session<T>,
    source: &mut L,
    prompt: &str,
    out: &mut W,
) -> io::Result<()>
where
    T: Transport,
    L: LineSource,
    W: Write,
{
    writeln!(out, "{INTRO}")?;
    let commands: Vec<&'static str> = session.command_names().collect();

    loop {
        let titles: Vec<String> = session.index().titles().map(String::from).collect();
        source.set_completions(&commands, &titles);

        match source.read_line(prompt)? {
            ReadLine::Line(line) => {
                if session.execute(&line, out).await? == Flow::Quit {
                    break;
                }
            }
            ReadLine::Interrupted => continue,
            ReadLine::Eof => {
                writeln!(out)?;
                break;
            }
        }
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeTransport, Reply};
    use crate::movies::MovieIndex;
    use serde_json::json;
    use std::collections::VecDeque;

    struct Script {
        lines: VecDeque<ReadLine>,
        prompts: usize,
        titles: Vec<String>,
    }

    impl Script {
        fn new(lines: impl IntoIterator<Item = ReadLine>) -> Self {
            Self {
                lines: lines.into_iter().collect(),
                prompts: 0,
                titles: Vec::new(),
            }
        }
    }

    impl LineSource for Script {
        fn read_line(&mut self, _prompt: &str) -> io::Result<ReadLine> {
            self.prompts += 1;
            Ok(self.lines.pop_front().unwrap_or(ReadLine::Eof))
        }

        fn set_completions(&mut self, _commands: &[&'static str], titles: &[String]) {
            self.titles = titles.to_vec();
        }
    }

    fn line(s: &str) -> ReadLine {
        ReadLine::Line(s.to_string())
    }

    fn titles() -> Vec<String> {
        vec!["Alien".into(), "Inception".into(), "Interstellar".into()]
    }

    const COMMANDS: &[&str] = &["detail", "movies", "play", "quit"];

    #[test]
    fn completes_titles_after_detail() {
        let (start, found) = complete_line("detail in", 9, COMMANDS, &titles());
        assert_eq!(start, 7);
        assert_eq!(found, vec!["Inception", "Interstellar"]);
    }

    #[test]
    fn completes_titles_after_play_with_spaces_in_prefix() {
        let titles = vec!["The Matrix".to_string(), "The Thing".to_string()];
        let (start, found) = complete_line("play the m", 10, COMMANDS, &titles);
        assert_eq!(start, 5);
        assert_eq!(found, vec!["The Matrix"]);
    }

    #[test]
    fn extra_spaces_before_title_are_skipped() {
        let (start, found) = complete_line("detail  in", 10, COMMANDS, &titles());
        assert_eq!(start, 8);
        assert_eq!(found, vec!["Inception", "Interstellar"]);
    }

    #[test]
    fn completes_command_names() {
        let (start, found) = complete_line("mo", 2, COMMANDS, &titles());
        assert_eq!(start, 0);
        assert_eq!(found, vec!["movies"]);
    }

    #[test]
    fn no_title_completion_for_other_commands() {
        let (_, found) = complete_line("stop in", 7, COMMANDS, &titles());
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn loop_survives_errors_and_quits() {
        let fake = FakeTransport::new()
            .reply("VideoLibrary.Scan", Reply::HttpStatus(500))
            .reply("Player.Stop", Reply::Result(json!("OK")));
        let mut session = Session::new(fake);
        let mut index = MovieIndex::new();
        index.insert("Alien", 3);
        session.set_index(index);

        let mut script = Script::new([
            line("scan"),
            line("detail nothing"),
            ReadLine::Interrupted,
            line("stop"),
            line("quit"),
            line("movies"),
        ]);
        let mut out = Vec::new();
        run(&mut session, &mut script, "XBMC> ", &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(INTRO));
        assert!(out.contains("Transport error"));
        assert!(out.contains("Bad input"));
        assert!(out.ends_with("OK\n\n"), "{out:?}");
        assert_eq!(script.prompts, 5);
        assert_eq!(script.titles, vec!["Alien"]);
        assert_eq!(
            session.transport().sent_methods(),
            vec!["VideoLibrary.Scan", "Player.Stop"]
        );
    }

    #[tokio::test]
    async fn eof_ends_with_newline() {
        let mut session = Session::new(FakeTransport::new());
        let mut script = Script::new([]);
        let mut out = Vec::new();
        run(&mut session, &mut script, "XBMC> ", &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{INTRO}\n\n"));
    }
}
