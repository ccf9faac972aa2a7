//! Segmenter for pipesh
//!
//! Splits a token stream into stages bounded by control operators and
//! validates operator placement. Each stage's own token range is handed to
//! the redirection resolver, so `<`, `>` and `2>` bind to the stage they
//! appear in and never leak into a neighbour.

use crate::lexer::{lex, Control, Token};
use crate::redirect::{self, Redirections};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("syntax error near unexpected token `{0}'")]
    LeadingSeparator(String),
    #[error("syntax error: empty command before `{0}'")]
    DoubledSeparator(String),
    #[error("syntax error: pipeline ends with `|'")]
    DanglingPipe,
    #[error("syntax error: missing command in stage {stage}")]
    MissingCommand { stage: usize },
}

/// Outcome of segmenting a line, as reported to callers that only need
/// to know whether and how a line splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentCode {
    Ok(usize),
    EmptyLine,
    LeadingSeparator,
    DoubledSeparator,
    DanglingPipe,
}

/// One command to run as one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments, redirections removed
    pub argv: Vec<String>,
    pub redirections: Redirections,
    /// The operator that ended this stage (implicit `;` at end of line)
    pub terminator: Control,
    /// Last stage of a group launched with `&`
    pub ends_background: bool,
}

impl Stage {
    fn resolve(tokens: &[Token], terminator: Control, index: usize) -> Result<Stage, SyntaxError> {
        let (argv, redirections) = redirect::resolve(tokens);
        if argv.is_empty() {
            return Err(SyntaxError::MissingCommand { stage: index + 1 });
        }
        Ok(Stage {
            argv,
            redirections,
            terminator,
            ends_background: terminator == Control::Background,
        })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))?;
        if !self.redirections.is_empty() {
            write!(f, " {}", self.redirections)?;
        }
        Ok(())
    }
}

/// Stages joined by `|` and run together, ended by `;` or `&`
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    pub stages: &'a [Stage],
}

impl<'a> Group<'a> {
    pub fn is_background(&self) -> bool {
        self.stages.last().map_or(false, |s| s.ends_background)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", stage)?;
        }
        Ok(())
    }
}

/// All stages parsed from one input line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Groups in execution order
    pub fn groups(&self) -> impl Iterator<Item = Group<'_>> {
        self.stages
            .split_inclusive(|s| s.terminator != Control::Pipe)
            .map(|stages| Group { stages })
    }
}

/// Split tokens at control operators into (range, terminator) pairs
fn split(tokens: &[Token]) -> Result<Vec<(&[Token], Control)>, SyntaxError> {
    let Some(first) = tokens.first() else {
        return Ok(Vec::new());
    };
    if let Token::Control(op) = first {
        return Err(SyntaxError::LeadingSeparator(op.as_str().to_string()));
    }

    // A line without a trailing operator runs sequentially
    let implicit = [Token::Control(Control::Sequence)];
    let tail: &[Token] = if tokens.last().map_or(false, Token::is_control) {
        &[]
    } else {
        &implicit
    };

    let mut segments = Vec::new();
    let mut start = 0;
    for (i, token) in tokens.iter().chain(tail).enumerate() {
        let Some(op) = token.control() else {
            continue;
        };
        if i == start {
            return Err(SyntaxError::DoubledSeparator(op.as_str().to_string()));
        }
        segments.push((&tokens[start..i], op));
        start = i + 1;
    }

    if let Some((_, Control::Pipe)) = segments.last() {
        return Err(SyntaxError::DanglingPipe);
    }
    Ok(segments)
}

/// Segment a token stream into resolved stages
pub fn segment(tokens: &[Token]) -> Result<Pipeline, SyntaxError> {
    let stages = split(tokens)?
        .into_iter()
        .enumerate()
        .map(|(i, (range, op))| Stage::resolve(range, op, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline { stages })
}

/// Tokenize and segment a line
pub fn parse(line: &str) -> Result<Pipeline, SyntaxError> {
    segment(&lex(line))
}

/// Segment a line and report only the result code
pub fn segment_code(line: &str) -> SegmentCode {
    match split(&lex(line)) {
        Ok(segments) if segments.is_empty() => SegmentCode::EmptyLine,
        Ok(segments) => SegmentCode::Ok(segments.len()),
        Err(SyntaxError::LeadingSeparator(_)) => SegmentCode::LeadingSeparator,
        Err(SyntaxError::DoubledSeparator(_)) => SegmentCode::DoubledSeparator,
        Err(SyntaxError::DanglingPipe) => SegmentCode::DanglingPipe,
        Err(SyntaxError::MissingCommand { .. }) => unreachable!("split never resolves stages"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn argvs(p: &Pipeline) -> Vec<Vec<&str>> {
        p.stages()
            .iter()
            .map(|s| s.argv.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn empty_line_has_no_stages() {
        assert!(parse("").unwrap().is_empty());
        assert_eq!(segment_code("   "), SegmentCode::EmptyLine);
    }

    #[test]
    fn single_command_gets_implicit_sequence() {
        let p = parse("ls -l").unwrap();
        assert_eq!(argvs(&p), vec![vec!["ls", "-l"]]);
        assert_eq!(p.stages()[0].terminator, Control::Sequence);
        assert!(!p.stages()[0].ends_background);
    }

    #[test]
    fn implicit_and_explicit_sequence_agree() {
        assert_eq!(parse("echo a ; echo b").unwrap(), parse("echo a ; echo b ;").unwrap());
    }

    #[test]
    fn leading_separator_rejected() {
        for line in ["| ls", "; ls", "& ls", ";"] {
            assert!(
                matches!(parse(line), Err(SyntaxError::LeadingSeparator(_))),
                "{line}"
            );
            assert_eq!(segment_code(line), SegmentCode::LeadingSeparator, "{line}");
        }
    }

    #[test]
    fn doubled_separator_rejected() {
        for (line, op) in [
            ("ls | | wc", "|"),
            ("ls ; ; pwd", ";"),
            ("ls & ;", ";"),
            ("a ; |", "|"),
        ] {
            assert_eq!(
                parse(line),
                Err(SyntaxError::DoubledSeparator(op.to_string())),
                "{line}"
            );
            assert_eq!(segment_code(line), SegmentCode::DoubledSeparator, "{line}");
        }
    }

    #[test]
    fn dangling_pipe_rejected() {
        assert_eq!(parse("a | b |"), Err(SyntaxError::DanglingPipe));
        assert_eq!(segment_code("ls |"), SegmentCode::DanglingPipe);
    }

    #[test]
    fn stage_count_reported() {
        assert_eq!(segment_code("a | b | c & d ;"), SegmentCode::Ok(4));
    }

    #[test]
    fn groups_split_on_sequence_and_background() {
        let p = parse("a | b & c ; d | e").unwrap();
        let groups: Vec<(usize, bool)> = p.groups().map(|g| (g.len(), g.is_background())).collect();
        assert_eq!(groups, vec![(2, true), (1, false), (2, false)]);
    }

    #[test]
    fn background_flag_marks_group_tail() {
        let p = parse("sleep 1 | cat &").unwrap();
        assert!(!p.stages()[0].ends_background);
        assert!(p.stages()[1].ends_background);
    }

    #[test]
    fn redirection_binds_to_its_own_stage() {
        let p = parse("cat < in.txt | sort > out.txt").unwrap();
        let first = &p.stages()[0];
        let second = &p.stages()[1];
        assert_eq!(first.argv, vec!["cat"]);
        assert_eq!(first.redirections.input, Some(PathBuf::from("in.txt")));
        assert_eq!(first.redirections.output, None);
        assert_eq!(second.argv, vec!["sort"]);
        assert_eq!(second.redirections.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn redirection_only_stage_is_missing_command() {
        assert_eq!(parse("> out.txt"), Err(SyntaxError::MissingCommand { stage: 1 }));
        assert_eq!(parse("ls ; < in"), Err(SyntaxError::MissingCommand { stage: 2 }));
        // Segmentation itself still succeeds
        assert_eq!(segment_code("> out.txt"), SegmentCode::Ok(1));
    }

    #[test]
    fn group_display_rebuilds_command() {
        let p = parse("cat < a | grep x > b &").unwrap();
        let group = p.groups().next().unwrap();
        assert_eq!(group.to_string(), "cat < a | grep x > b");
    }
}
