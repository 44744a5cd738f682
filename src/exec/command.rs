//! Command layout and request-to-environment translation shared by the
//! CGI executor and the hijack bridge.

use std::path::{Path, PathBuf};

use axum::http::{header, HeaderMap, Uri};

/// Search path used when the gateway itself runs without `PATH`.
pub const FALLBACK_PATH: &str = "/usr/local/sbin:/usr/sbin:/sbin:/usr/local/bin:/usr/bin:/bin";

/// A configured command: executable, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandSpec {
    /// Build from a non-empty `cmd` list.
    ///
    /// The working directory is the directory part of the executable path,
    /// or the current directory for a bare name (resolved through `PATH`).
    pub fn new(cmd: &[String]) -> Self {
        let (program, args) = match cmd.split_first() {
            Some((program, args)) => (program.as_str(), args.to_vec()),
            None => ("", Vec::new()),
        };
        let program = Path::new(program);

        let working_dir = match program.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // A relative path with a directory part must not be re-resolved
        // against the child's working directory.
        let program = if program.is_relative() && program.components().count() > 1 {
            std::path::absolute(program).unwrap_or_else(|_| program.to_path_buf())
        } else {
            program.to_path_buf()
        };

        Self {
            program,
            args,
            working_dir,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// A `tokio::process::Command` with program, args, cwd and a cleared
    /// environment. Stdio wiring is left to the caller.
    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env_clear();
        command
    }
}

/// `PATH` for spawned processes: inherited, or [`FALLBACK_PATH`].
pub fn search_path() -> String {
    std::env::var("PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| FALLBACK_PATH.to_string())
}

/// Environment variable name for a header: `HTTP_` plus the name with ASCII
/// letters upper-cased, digits kept, everything else replaced by `_`.
pub fn header_env_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 5);
    out.push_str("HTTP_");
    out.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    out
}

/// One `HTTP_<NAME>` variable per header name.
///
/// Multiple values are joined with `", "`, except `Cookie` which uses `"; "`.
/// `Host` is skipped; callers set `HTTP_HOST` from the request authority.
pub fn header_env(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .filter(|name| *name != header::HOST)
        .map(|name| {
            let key = header_env_name(name.as_str());
            let separator = if key == "HTTP_COOKIE" { "; " } else { ", " };
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(separator);
            (key, value)
        })
        .collect()
}

/// Host the client addressed: the `Host` header, else the URI authority.
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Path and query as sent by the client.
pub fn request_uri(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
