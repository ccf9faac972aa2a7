//! Wildcard expansion for pipesh
//!
//! Arguments containing `*` or `?` are matched against the filesystem with
//! shell rules: `/` and a leading `.` must be matched literally, and a
//! leading `~` is expanded first. A pattern that matches nothing is kept
//! as the literal word. The command word itself is never expanded.
//!
//! Matched paths are returned as `OsString`. Directory entries whose names
//! are not valid UTF-8 are never matched by a pattern and never stop the
//! expansion of the entries around them.

use glob::{glob_with, MatchOptions};
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path};

// Hidden entries are dropped by `reveals_hidden`; glob's own leading-dot
// check panics on names that are not UTF-8.
const SHELL_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub fn has_wildcard(word: &str) -> bool {
    word.contains(|c: char| c == '*' || c == '?')
}

fn starts_with_dot(component: &OsStr) -> bool {
    component.as_bytes().first() == Some(&b'.')
}

/// True when `path` has a dot-named component that its pattern component
/// did not spell out
fn reveals_hidden(pattern: &Path, path: &Path) -> bool {
    pattern
        .components()
        .zip(path.components())
        .any(|pair| match pair {
            (Component::Normal(want), Component::Normal(got)) => {
                starts_with_dot(got) && !starts_with_dot(want)
            }
            _ => false,
        })
}

/// Expand one word against the filesystem.
///
/// Returns `None` when the word has no wildcard, is not a valid pattern,
/// or matches nothing, so callers fall back to the literal word.
pub fn expand_word(word: &str) -> Option<Vec<OsString>> {
    if !has_wildcard(word) {
        return None;
    }

    let pattern = shellexpand::tilde(word);
    let paths = match glob_with(&pattern, SHELL_MATCH) {
        Ok(paths) => paths,
        Err(e) => {
            log::debug!("not expanding {}: {}", word, e);
            return None;
        }
    };

    let spelled = Path::new(&*pattern);
    let matches: Vec<OsString> = paths
        .filter_map(Result::ok)
        .filter(|path| !reveals_hidden(spelled, path))
        .map(|path| path.into_os_string())
        .collect();
    log::debug!("{} matched {} path(s)", word, matches.len());

    if matches.is_empty() {
        None
    } else {
        Some(matches)
    }
}

/// Expand wildcards into a sequence of separate invocations.
///
/// Each matched path becomes one invocation: the command word and every
/// non-matching argument stay in place, and the path takes the position of
/// the pattern it matched. Without any match the argument list comes back
/// unchanged as the only invocation.
pub fn invocations(argv: &[String]) -> Vec<Vec<OsString>> {
    let Some((command, args)) = argv.split_first() else {
        return Vec::new();
    };

    let expanded: Vec<Option<Vec<OsString>>> = args.iter().map(|a| expand_word(a)).collect();
    if expanded.iter().all(Option::is_none) {
        return vec![argv.iter().map(OsString::from).collect()];
    }

    let mut result = Vec::new();
    for (k, matches) in expanded.iter().enumerate() {
        let Some(matches) = matches else {
            continue;
        };
        for path in matches {
            let mut invocation = Vec::with_capacity(args.len() + 1);
            invocation.push(OsString::from(command));
            for (j, arg) in args.iter().enumerate() {
                match &expanded[j] {
                    None => invocation.push(OsString::from(arg)),
                    Some(_) if j == k => invocation.push(path.clone()),
                    Some(_) => {}
                }
            }
            result.push(invocation);
        }
    }
    result
}

/// Expand wildcards in place, splicing every match into one argument list
pub fn splice(argv: &[String]) -> Vec<OsString> {
    let Some((command, args)) = argv.split_first() else {
        return Vec::new();
    };

    let mut result = vec![OsString::from(command)];
    for arg in args {
        match expand_word(arg) {
            Some(matches) => result.extend(matches),
            None => result.push(OsString::from(arg)),
        }
    }
    result
}
