//! `.scn` script parser.
//!
//! ```text
//! # comment
//! file main.c <<EOF
//! int main(void) {
//!   return 0;
//! }
//! EOF
//! flush
//! expect 0
//! edit main.c 2 "0" "1"
//! flush
//! expect 1
//! ```

use crate::{ScenarioBuilder, ScenarioError, Scenario};

const HEREDOC: &str = "<<";

/// Parse a script into a resolved scenario. `name` appears in diagnostics.
pub fn parse(name: &str, source: &str) -> Result<Scenario, ScenarioError> {
    let mut builder = ScenarioBuilder::new(name);
    let mut lines = source.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut last_line = 0;

    while let Some((number, line)) = lines.next() {
        last_line = number;
        let syntax = |message: String| ScenarioError::Syntax {
            script: name.to_string(),
            line: number,
            message,
        };
        let step = |source| ScenarioError::Step {
            script: name.to_string(),
            line: number,
            source,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let words = split_words(trimmed).map_err(syntax)?;
        let (command, args) = match words.split_first() {
            Some((command, args)) => (command.as_str(), args),
            None => continue,
        };

        builder = match command {
            "file" => {
                let [path, tag] = expect_args::<2>(command, args).map_err(syntax)?;
                let tag = heredoc_tag(tag).map_err(syntax)?;
                let body = read_heredoc(&mut lines, tag).map_err(syntax)?;
                builder.file(path.as_str(), body).map_err(step)?
            }
            "host" => {
                let [tag] = expect_args::<1>(command, args).map_err(syntax)?;
                let tag = heredoc_tag(tag).map_err(syntax)?;
                let body = read_heredoc(&mut lines, tag).map_err(syntax)?;
                builder.host_code(body)
            }
            "include" => {
                let [path] = expect_args::<1>(command, args).map_err(syntax)?;
                builder.include_path(path.as_str())
            }
            "host-helper" => {
                if args.is_empty() {
                    return Err(syntax("host-helper needs at least one name".to_string()));
                }
                args.iter().fold(builder, |b, name| b.host_helper(name.as_str()))
            }
            "entry" => {
                let [entry] = expect_args::<1>(command, args).map_err(syntax)?;
                builder.entry(entry.as_str())
            }
            "edit" => {
                let [file, line, find, replace] = expect_args::<4>(command, args).map_err(syntax)?;
                let line: usize = line
                    .parse()
                    .map_err(|_| syntax(format!("invalid line number {:?}", line)))?;
                builder.edit(file, line, find, replace).map_err(step)?
            }
            "flush" => {
                expect_args::<0>(command, args).map_err(syntax)?;
                builder.flush()
            }
            "expect" => {
                let [value] = expect_args::<1>(command, args).map_err(syntax)?;
                let value: i32 = value
                    .parse()
                    .map_err(|_| syntax(format!("invalid expected value {:?}", value)))?;
                builder.expect(value, number)
            }
            other => return Err(syntax(format!("unknown command {:?}", other))),
        };
    }

    builder.build().map_err(|source| ScenarioError::Step {
        script: name.to_string(),
        line: last_line,
        source,
    })
}

fn expect_args<'a, const N: usize>(
    command: &str,
    args: &'a [String],
) -> Result<&'a [String; N], String> {
    args.try_into().map_err(|_| {
        format!(
            "{} takes {} argument(s), got {}",
            command,
            N,
            args.len()
        )
    })
}

fn heredoc_tag(word: &str) -> Result<&str, String> {
    match word.strip_prefix(HEREDOC) {
        Some(tag) if !tag.is_empty() => Ok(tag),
        _ => Err(format!("expected {}TAG, got {:?}", HEREDOC, word)),
    }
}

/// Collect lines up to the terminator, each with its trailing newline
fn read_heredoc<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    tag: &str,
) -> Result<String, String> {
    let mut body = String::new();
    for (_, line) in lines.by_ref() {
        if line.trim_end() == tag {
            return Ok(body);
        }
        body.push_str(line);
        body.push('\n');
    }
    Err(format!("unterminated heredoc, expected {}", tag))
}

/// Split a line into whitespace-separated words. Double-quoted words may
/// contain spaces and the escapes `\"`, `\\`, `\n` and `\t`.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut word = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('"') => word.push('"'),
                        Some('\\') => word.push('\\'),
                        Some('n') => word.push('\n'),
                        Some('t') => word.push('\t'),
                        Some(other) => return Err(format!("unknown escape \\{}", other)),
                        None => return Err("unterminated string".to_string()),
                    },
                    Some(c) => word.push(c),
                    None => return Err("unterminated string".to_string()),
                }
            }
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return Err("expected whitespace after closing quote".to_string());
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                word.push(c);
            }
        }
        words.push(word);
    }

    Ok(words)
}
