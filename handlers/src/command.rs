//! Chat-text command parser.
//!
//! The first whitespace-delimited token selects the command; the rest are its arguments:
//!
//! | Command | Arguments |
//! |---|---|
//! | `!add` | `<term[,term...]> <response...>` |
//! | `!editKeyword` | `<id> <term>` |
//! | `!editResponse` | `<id> <response...>` |
//! | `!remove` | `<id> [term]` (no term deletes the rule) |
//! | `!respond` | `[#id] <response...>` |
//!
//! Anything else is a [`Command::PlainInquiry`].

use crate::error::ResolveError;
use storage::KeywordGroup;

/// Tagged administrator intent (or an ordinary inquiry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddRule { group: KeywordGroup, response: String },
    EditKeyword { id: i64, term: String },
    EditResponse { id: i64, response: String },
    RemoveRule { id: i64, term: Option<String> },
    /// `target` is the cited inquiry id, if any.
    Respond { target: Option<i64>, text: String },
    PlainInquiry,
}

impl Command {
    /// True for the keyword-store mutations.
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            Command::AddRule { .. }
                | Command::EditKeyword { .. }
                | Command::EditResponse { .. }
                | Command::RemoveRule { .. }
        )
    }
}

/// Command words recognised in chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSyntax {
    pub add: String,
    pub edit_keyword: String,
    pub edit_response: String,
    pub remove: String,
    pub respond: String,
}

impl Default for CommandSyntax {
    fn default() -> Self {
        Self {
            add: "!add".to_string(),
            edit_keyword: "!editKeyword".to_string(),
            edit_response: "!editResponse".to_string(),
            remove: "!remove".to_string(),
            respond: "!respond".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
    Add,
    EditKeyword,
    EditResponse,
    Remove,
    Respond,
}

impl CommandSyntax {
    fn word(&self, token: &str) -> Option<Word> {
        [
            (&self.add, Word::Add),
            (&self.edit_keyword, Word::EditKeyword),
            (&self.edit_response, Word::EditResponse),
            (&self.remove, Word::Remove),
            (&self.respond, Word::Respond),
        ]
        .into_iter()
        .find_map(|(w, kind)| (w.as_str() == token).then_some(kind))
    }

    /// True if `text` starts with one of the rule-management command words.
    pub fn is_management(&self, text: &str) -> bool {
        matches!(
            self.word(split_token(text).0),
            Some(Word::Add | Word::EditKeyword | Word::EditResponse | Word::Remove)
        )
    }

    /// True if `text` starts with the respond command word.
    pub fn is_respond(&self, text: &str) -> bool {
        self.word(split_token(text).0) == Some(Word::Respond)
    }

    /// Parses `text` into a [`Command`].
    ///
    /// Text that does not start with a command word is `PlainInquiry`. A command word with
    /// missing or malformed arguments is a `Validation` error.
    pub fn parse(&self, text: &str) -> Result<Command, ResolveError> {
        let (token, rest) = split_token(text);
        let Some(word) = self.word(token) else {
            return Ok(Command::PlainInquiry);
        };

        match word {
            Word::Add => {
                let (terms, response) = split_token(rest);
                let group = KeywordGroup::parse(terms);
                if group.is_empty() || response.is_empty() {
                    return Err(invalid(token, "expected <keywords> <response>"));
                }
                Ok(Command::AddRule {
                    group,
                    response: response.to_string(),
                })
            }
            Word::EditKeyword => {
                let (id, term) = parse_id(token, rest)?;
                if term.is_empty() {
                    return Err(invalid(token, "expected <id> <keyword>"));
                }
                Ok(Command::EditKeyword {
                    id,
                    term: term.to_string(),
                })
            }
            Word::EditResponse => {
                let (id, response) = parse_id(token, rest)?;
                if response.is_empty() {
                    return Err(invalid(token, "expected <id> <response>"));
                }
                Ok(Command::EditResponse {
                    id,
                    response: response.to_string(),
                })
            }
            Word::Remove => {
                let (id, term) = parse_id(token, rest)?;
                Ok(Command::RemoveRule {
                    id,
                    term: (!term.is_empty()).then(|| term.to_string()),
                })
            }
            Word::Respond => {
                let (target, text) = match split_token(rest) {
                    (cite, remainder) if cite.starts_with('#') => {
                        let id = cite[1..]
                            .parse::<i64>()
                            .map_err(|_| invalid(token, &format!("bad inquiry id '{cite}'")))?;
                        (Some(id), remainder)
                    }
                    _ => (None, rest),
                };
                if text.is_empty() {
                    return Err(invalid(token, "expected a response text"));
                }
                Ok(Command::Respond {
                    target,
                    text: text.to_string(),
                })
            }
        }
    }
}

/// Splits off the first whitespace-delimited token; both parts are trimmed.
fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim()),
        None => (text, ""),
    }
}

fn parse_id<'a>(command: &str, rest: &'a str) -> Result<(i64, &'a str), ResolveError> {
    let (id, remainder) = split_token(rest);
    if id.is_empty() {
        return Err(invalid(command, "missing rule id"));
    }
    let id = id
        .parse::<i64>()
        .map_err(|_| invalid(command, &format!("bad rule id '{id}'")))?;
    Ok((id, remainder))
}

fn invalid(command: &str, detail: &str) -> ResolveError {
    ResolveError::Validation(format!("{command}: {detail}"))
}
