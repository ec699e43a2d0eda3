//! Request builder: static per-command schemas turned into JSON-RPC requests.
//!
//! Each [`CommandSpec`] names the RPC method, an ordered list of positional
//! parameters and a set of fixed parameters. [`CommandTable::build`] walks the
//! positional schema, consuming one argument per scalar, recursing into
//! [`ParamSpec::Nested`] entries to build sub-objects, then overlays the fixed
//! parameters.
//!
//! ## Commands
//!
//! | Command     | Method                         | Positional            |
//! |-------------|--------------------------------|-----------------------|
//! | `movies`    | `VideoLibrary.GetMovies`       | -                     |
//! | `detail`    | `VideoLibrary.GetMovieDetails` | `movieid`             |
//! | `play`      | `Player.Open`                  | `item.movieid`        |
//! | `stop`      | `Player.Stop`                  | -                     |
//! | `pause`     | `Player.PlayPause`             | -                     |
//! | `scan`      | `VideoLibrary.Scan`            | -                     |
//! | `clean`     | `VideoLibrary.Clean`           | -                     |
//! | `terminate` | `Application.Quit`             | -                     |

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::rpc::RpcRequest;

/// Player id of the video player on the media server.
pub const VIDEO_PLAYER_ID: i64 = 1;

/// Properties requested for every movie in a `movies` listing.
pub const MOVIE_LIST_PROPERTIES: &[&str] = &["year"];

/// Properties requested for a single movie in `detail`.
pub const MOVIE_DETAIL_PROPERTIES: &[&str] = &[
    "trailer",
    "year",
    "streamdetails",
    "file",
    "imdbnumber",
    "dateadded",
];

/// How a positional argument is turned into a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Parse as a signed integer.
    Integer,
    /// Pass the argument through as a string.
    Text,
}

impl Coercion {
    fn apply(self, param: &str, raw: &str) -> Result<Value, BuildError> {
        match self {
            Coercion::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| BuildError::InvalidInteger {
                    param: param.to_string(),
                    value: raw.to_string(),
                }),
            Coercion::Text => Ok(Value::from(raw)),
        }
    }
}

/// Shape of one positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    /// Consumes one argument.
    Scalar(Coercion),
    /// Consumes one argument per leaf and yields an object.
    Nested(Vec<(&'static str, ParamSpec)>),
}

/// Static description of a single command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub method: &'static str,
    pub params: Vec<(&'static str, ParamSpec)>,
    pub fixed: Map<String, Value>,
}

impl CommandSpec {
    fn new(name: &'static str, method: &'static str) -> Self {
        Self {
            name,
            method,
            params: Vec::new(),
            fixed: Map::new(),
        }
    }

    fn param(mut self, name: &'static str, spec: ParamSpec) -> Self {
        self.params.push((name, spec));
        self
    }

    fn fixed(mut self, name: &str, value: Value) -> Self {
        self.fixed.insert(name.to_string(), value);
        self
    }

    /// Build the request for this command from positional arguments.
    pub fn build<S: AsRef<str>>(&self, args: &[S]) -> Result<RpcRequest, BuildError> {
        let mut remaining = args.iter().map(AsRef::as_ref);

        let mut params = if self.params.is_empty() {
            None
        } else {
            Some(fill(self.name, &self.params, &mut remaining)?)
        };

        let extra = remaining.count();
        if extra > 0 {
            warn!(command = self.name, extra, "ignoring extra arguments");
        }

        if !self.fixed.is_empty() {
            let map = params.get_or_insert_with(Map::new);
            for (key, value) in &self.fixed {
                map.insert(key.clone(), value.clone());
            }
        }

        Ok(RpcRequest::new(self.method, params))
    }
}

fn fill<'a>(
    command: &str,
    fields: &[(&'static str, ParamSpec)],
    args: &mut impl Iterator<Item = &'a str>,
) -> Result<Map<String, Value>, BuildError> {
    let mut out = Map::new();
    for (name, spec) in fields {
        let value = match spec {
            ParamSpec::Scalar(coercion) => {
                let raw = args.next().ok_or_else(|| BuildError::MissingArgument {
                    command: command.to_string(),
                    param: (*name).to_string(),
                })?;
                coercion.apply(name, raw)?
            }
            ParamSpec::Nested(inner) => Value::Object(fill(command, inner, args)?),
        };
        out.insert((*name).to_string(), value);
    }
    Ok(out)
}

/// Registry of every command the builder knows, keyed by name.
#[derive(Debug, Clone)]
pub struct CommandTable {
    specs: HashMap<&'static str, CommandSpec>,
}

impl CommandTable {
    /// The media-center commands.
    pub fn standard() -> Self {
        let specs = [
            CommandSpec::new("movies", "VideoLibrary.GetMovies")
                .fixed("properties", json!(MOVIE_LIST_PROPERTIES))
                .fixed("sort", json!({ "method": "label" })),
            CommandSpec::new("detail", "VideoLibrary.GetMovieDetails")
                .param("movieid", ParamSpec::Scalar(Coercion::Integer))
                .fixed("properties", json!(MOVIE_DETAIL_PROPERTIES)),
            CommandSpec::new("play", "Player.Open").param(
                "item",
                ParamSpec::Nested(vec![("movieid", ParamSpec::Scalar(Coercion::Integer))]),
            ),
            CommandSpec::new("stop", "Player.Stop").fixed("playerid", json!(VIDEO_PLAYER_ID)),
            CommandSpec::new("pause", "Player.PlayPause")
                .fixed("playerid", json!(VIDEO_PLAYER_ID)),
            CommandSpec::new("scan", "VideoLibrary.Scan"),
            CommandSpec::new("clean", "VideoLibrary.Clean"),
            CommandSpec::new("terminate", "Application.Quit"),
        ];
        Self::from_specs(specs)
    }

    pub fn from_specs(specs: impl IntoIterator<Item = CommandSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.name, s)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.specs.get(name)
    }

    /// Build the request for `name` from positional arguments.
    pub fn build<S: AsRef<str>>(&self, name: &str, args: &[S]) -> Result<RpcRequest, BuildError> {
        self.get(name)
            .ok_or_else(|| BuildError::UnknownCommand(name.to_string()))?
            .build(args)
    }
}

/// Errors raised while turning arguments into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("no such command: {0}")]
    UnknownCommand(String),
    #[error("{command}: missing argument <{param}>")]
    MissingArgument { command: String, param: String },
    #[error("{param} must be an integer, got {value:?}")]
    InvalidInteger { param: String, value: String },
}
