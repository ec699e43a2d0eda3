//! Command dispatcher: one session per run, owning the transport, the
//! command table and the cached movie index.
//!
//! [`Session::dispatch`] maps the first word of a line to a handler through a
//! registry built once in [`Session::new`]. Lines whose first word is not a
//! registered command but looks like a JSON-RPC method name
//! (`Namespace.Method`) are sent to the server literally.
//!
//! ## Error reporting
//!
//! Handlers return [`CommandError`]. [`Session::execute`] prints every error
//! with [`report`] and keeps the session going; only failures to write to the
//! output stream escape it.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde_json::Value;
use tracing::{error, info};

use crate::client::{Transport, TransportError};
use crate::commands::{BuildError, CommandTable};
use crate::movies::{parse_movie_list, Movie, MovieDetails, MovieIndex};
use crate::rpc::{RpcErrorData, RpcRequest};

/// What the shell should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum Handler {
    Movies,
    Detail,
    Play,
    Pause,
    /// Fire a command-table entry and acknowledge it.
    Ack,
    Refresh,
    Help,
    Quit,
}

struct Entry {
    handler: Handler,
    usage: &'static str,
    about: &'static str,
}

/// An interactive session against one media server.
pub struct Session<T> {
    transport: T,
    commands: CommandTable,
    handlers: BTreeMap<&'static str, Entry>,
    index: MovieIndex,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        let mut handlers = BTreeMap::new();
        let mut register = |name, handler, usage, about| {
            handlers.insert(
                name,
                Entry {
                    handler,
                    usage,
                    about,
                },
            );
        };
        register("movies", Handler::Movies, "movies", "List all movies");
        register(
            "detail",
            Handler::Detail,
            "detail <id|title>",
            "Show details for a movie (title prefix is enough)",
        );
        register("play", Handler::Play, "play <id|title>", "Start playing a movie");
        register("stop", Handler::Ack, "stop", "Stop playback");
        register("pause", Handler::Pause, "pause", "Toggle pause");
        register("scan", Handler::Ack, "scan", "Scan sources for new videos");
        register(
            "clean",
            Handler::Ack,
            "clean",
            "Remove missing videos from the library",
        );
        register("terminate", Handler::Ack, "terminate", "Shut down the media server");
        register("refresh", Handler::Refresh, "refresh", "Reload the cached movie list");
        register("help", Handler::Help, "help", "Show this list");
        register("quit", Handler::Quit, "quit", "Leave the shell (also Ctrl-D)");

        Self {
            transport,
            commands: CommandTable::standard(),
            handlers,
            index: MovieIndex::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn index(&self) -> &MovieIndex {
        &self.index
    }

    #[cfg(test)]
    pub(crate) fn set_index(&mut self, index: MovieIndex) {
        self.index = index;
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Build and send a command-table entry, returning its `result`.
    pub async fn call<S: AsRef<str>>(
        &self,
        name: &str,
        args: &[S],
    ) -> Result<Value, CommandError> {
        let request = self.commands.build(name, args)?;
        Ok(self.transport.send(&request).await?.into_result()?)
    }

    async fn fetch_movies(&self) -> Result<Vec<Movie>, CommandError> {
        let result = self.call::<&str>("movies", &[]).await?;
        parse_movie_list(&result)
            .map_err(|e| CommandError::Response(format!("movie list: {e}")))
    }

    /// Load the movie index before the first command. This doubles as the
    /// connectivity check, so a failure here is fatal to the caller.
    pub async fn handshake(&mut self) -> Result<usize, CommandError> {
        self.refresh_index().await.inspect_err(|e| {
            error!(error = %e, "startup handshake failed");
        })
    }

    /// Re-fetch the movie index from the server. Returns the entry count.
    pub async fn refresh_index(&mut self) -> Result<usize, CommandError> {
        let movies = self.fetch_movies().await?;
        self.index.replace(&movies);
        info!(movies = self.index.len(), "movie index loaded");
        Ok(self.index.len())
    }

    /// Resolve a movie id or title prefix, loading the index first if it is
    /// still empty.
    pub async fn resolve(&mut self, token: &str) -> Result<i64, CommandError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(
                InputError::MissingArgument("movie name (or prefix) or movie id").into(),
            );
        }
        if self.index.is_empty() {
            self.refresh_index().await?;
        }
        self.index
            .resolve(token)
            .ok_or_else(|| InputError::UnknownMovie(token.to_string()).into())
    }

    /// Run one line and report any error to `out`.
    pub async fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        match self.dispatch(line, out).await {
            Ok(flow) => Ok(flow),
            Err(CommandError::Io(e)) => Err(e),
            Err(err) => {
                report(&err, out)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Run a single command outside the shell, reporting any error to `out`.
    ///
    /// Returns whether the command succeeded.
    pub async fn run_once<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        match self.dispatch(line, out).await {
            Ok(_) => Ok(true),
            Err(CommandError::Io(e)) => Err(e),
            Err(err) => {
                report(&err, out)?;
                Ok(false)
            }
        }
    }

    /// Run one line, returning handler errors to the caller.
    pub async fn dispatch<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> Result<Flow, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        let word = if word == "?" { "help" } else { word };

        let Some(handler) = self.handlers.get(word).map(|e| e.handler) else {
            self.passthrough(word, rest, out).await?;
            return Ok(Flow::Continue);
        };

        match handler {
            Handler::Movies => self.list_movies(out).await?,
            Handler::Detail => self.show_detail(rest, out).await?,
            Handler::Play => {
                let id = self.resolve(rest).await?;
                self.call("play", &[id.to_string()]).await?;
                writeln!(out, "OK")?;
            }
            Handler::Pause => {
                let result = self.call("pause", &split_args(rest)?).await?;
                match result.get("speed").and_then(Value::as_i64) {
                    Some(0) => writeln!(out, "OK (paused)")?,
                    Some(_) => writeln!(out, "OK (playing)")?,
                    None => writeln!(out, "OK")?,
                }
            }
            Handler::Ack => {
                self.call(word, &split_args(rest)?).await?;
                writeln!(out, "OK")?;
            }
            Handler::Refresh => {
                let count = self.refresh_index().await?;
                writeln!(out, "{count} movies")?;
            }
            Handler::Help => self.write_help(out)?,
            Handler::Quit => {
                writeln!(out)?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    async fn list_movies<W: Write>(&self, out: &mut W) -> Result<(), CommandError> {
        for movie in self.fetch_movies().await? {
            let year = movie.year.map_or_else(|| "?".to_string(), |y| y.to_string());
            writeln!(out, "{:>5}: {} ({})", movie.id, movie.label, year)?;
        }
        Ok(())
    }

    async fn show_detail<W: Write>(
        &mut self,
        token: &str,
        out: &mut W,
    ) -> Result<(), CommandError> {
        let id = self.resolve(token).await?;
        let mut result = self.call("detail", &[id.to_string()]).await?;
        let details = result
            .get_mut("moviedetails")
            .map(Value::take)
            .ok_or_else(|| CommandError::Response("missing moviedetails".into()))?;
        let details: MovieDetails = serde_json::from_value(details)
            .map_err(|e| CommandError::Response(format!("movie details: {e}")))?;
        write_details(out, &details)?;
        Ok(())
    }

    /// Send a raw `Namespace.Method [json-object]` line.
    async fn passthrough<W: Write>(
        &self,
        word: &str,
        rest: &str,
        out: &mut W,
    ) -> Result<(), CommandError> {
        if !looks_like_method(word) {
            return Err(InputError::UnknownCommand(word.to_string()).into());
        }
        let params = if rest.is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(rest) {
                Ok(Value::Object(map)) => Some(map),
                Ok(_) => {
                    return Err(InputError::BadParams("params must be a JSON object".into()).into())
                }
                Err(e) => return Err(InputError::BadParams(format!("invalid JSON: {e}")).into()),
            }
        };
        let result = self
            .transport
            .send(&RpcRequest::new(word, params))
            .await?
            .into_result()?;
        let pretty = serde_json::to_string_pretty(&result)
            .map_err(|e| CommandError::Response(e.to_string()))?;
        writeln!(out, "{pretty}")?;
        Ok(())
    }

    fn write_help<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Commands:")?;
        for entry in self.handlers.values() {
            writeln!(out, "  {:<20} {}", entry.usage, entry.about)?;
        }
        writeln!(
            out,
            "  {:<20} {}",
            "<Namespace.Method> [params]", "Send a raw JSON-RPC call (params: JSON object)"
        )
    }
}

fn split_args(rest: &str) -> Result<Vec<String>, InputError> {
    shlex::split(rest).ok_or_else(|| InputError::BadParams("unbalanced quotes".into()))
}

fn looks_like_method(word: &str) -> bool {
    let valid = |s: &str| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    matches!(word.split_once('.'), Some((ns, m)) if valid(ns) && valid(m))
}

fn write_details<W: Write>(out: &mut W, d: &MovieDetails) -> io::Result<()> {
    fn or_dash(s: &str) -> &str {
        if s.trim().is_empty() {
            "-"
        } else {
            s
        }
    }

    match d.year {
        Some(year) if year > 0 => writeln!(out, "{} ({})", d.label, year)?,
        _ => writeln!(out, "{}", d.label)?,
    }
    let imdb = d.imdb_link();
    let rows = [
        ("ID", d.id.to_string()),
        ("Path", or_dash(&d.file).to_string()),
        ("Trailer", or_dash(&d.trailer).to_string()),
        ("IMDb", imdb.unwrap_or_else(|| "-".to_string())),
        ("Added", or_dash(&d.date_added).to_string()),
    ];
    for (label, value) in rows {
        writeln!(out, "{label:>7}: {value}")?;
    }
    for video in &d.stream_details.video {
        writeln!(out, "{:>7}: {}x{}", "Video", video.width, video.height)?;
    }
    Ok(())
}

/// Print an error the way the shell shows it, logging server-side failures.
pub fn report<W: Write>(err: &CommandError, out: &mut W) -> io::Result<()> {
    match err {
        CommandError::Input(InputError::UnknownCommand(word)) => {
            writeln!(out, "Unknown command: {word}")
        }
        CommandError::Input(e) => writeln!(out, "Bad input: {e}"),
        CommandError::Build(e) => writeln!(out, "Bad input: {e}"),
        CommandError::Rpc(e) => {
            error!(code = e.code, message = %e.message, "RPC error");
            writeln!(out, "RPC error {}: {}", e.code, e.message)
        }
        CommandError::Transport(e) => {
            error!(error = %e, "transport error");
            writeln!(out, "Transport error: {e}")
        }
        CommandError::Response(m) => writeln!(out, "Unexpected response: {m}"),
        CommandError::Io(e) => writeln!(out, "I/O error: {e}"),
    }
}

/// Problems with what the user typed.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("no movie matches {0:?}")]
    UnknownMovie(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}")]
    BadParams(String),
}

/// Anything a command handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcErrorData),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected response: {0}")]
    Response(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
