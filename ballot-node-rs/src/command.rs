//! Line-oriented command language for the interactive node.

use ballot_core::{BallotIndex, OptionIndex, VoterId};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  create <start_in_secs> <duration> <question> | <option> | <option> ...
                              - Create a ballot opening <start_in_secs> from now
  as <voter>                  - Switch the current voter identity
  cast <ballot> <option>      - Vote as the current voter
  voted <ballot> [voter]      - Has the voter cast on this ballot?
  tally <ballot> <option>     - Votes for one option
  results <ballot>            - Votes for every option
  winners <ballot>            - Options with the most votes (ties included)
  show <ballot>               - Question, options and schedule
  phase <ballot>              - pending / open / closed
  list                        - All ballots
  help                        - This text
  quit                        - Exit
";

/// Parsed user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        start_in: u64,
        duration: u64,
        question: String,
        options: Vec<String>,
    },
    As { voter: VoterId },
    Cast { ballot: BallotIndex, option: OptionIndex },
    Voted { ballot: BallotIndex, voter: Option<VoterId> },
    Tally { ballot: BallotIndex, option: OptionIndex },
    Results { ballot: BallotIndex },
    Winners { ballot: BallotIndex },
    Show { ballot: BallotIndex },
    Phase { ballot: BallotIndex },
    List,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

fn number<T: std::str::FromStr>(s: &str) -> Result<T, ParseError> {
    s.parse().map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match word {
            "" => Err(ParseError::Empty),
            "create" => Self::parse_create(rest),
            "as" => match args.as_slice() {
                [voter] => Ok(Command::As {
                    voter: voter.to_string(),
                }),
                _ => Err(ParseError::Usage("as <voter>")),
            },
            "cast" => match args.as_slice() {
                [ballot, option] => Ok(Command::Cast {
                    ballot: number(ballot)?,
                    option: number(option)?,
                }),
                _ => Err(ParseError::Usage("cast <ballot> <option>")),
            },
            "voted" => match args.as_slice() {
                [ballot] => Ok(Command::Voted {
                    ballot: number(ballot)?,
                    voter: None,
                }),
                [ballot, voter] => Ok(Command::Voted {
                    ballot: number(ballot)?,
                    voter: Some(voter.to_string()),
                }),
                _ => Err(ParseError::Usage("voted <ballot> [voter]")),
            },
            "tally" => match args.as_slice() {
                [ballot, option] => Ok(Command::Tally {
                    ballot: number(ballot)?,
                    option: number(option)?,
                }),
                _ => Err(ParseError::Usage("tally <ballot> <option>")),
            },
            "results" | "winners" | "show" | "phase" => {
                let ballot = match args.as_slice() {
                    [ballot] => number(ballot)?,
                    _ => return Err(ParseError::Usage("<command> <ballot>")),
                };
                Ok(match word {
                    "results" => Command::Results { ballot },
                    "winners" => Command::Winners { ballot },
                    "show" => Command::Show { ballot },
                    _ => Command::Phase { ballot },
                })
            }
            "list" => Ok(Command::List),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }

    fn parse_create(rest: &str) -> Result<Self, ParseError> {
        const USAGE: &str = "create <start_in_secs> <duration> <question> | <option> | <option> ...";

        let (start_in, rest) = rest
            .split_once(char::is_whitespace)
            .ok_or(ParseError::Usage(USAGE))?;
        let (duration, text) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or(ParseError::Usage(USAGE))?;
        let start_in: u64 = number(start_in)?;
        let duration: u64 = number(duration)?;

        let mut pieces = text.split('|').map(|p| p.trim().to_string());
        let question = pieces.next().ok_or(ParseError::Usage(USAGE))?;
        let options = pieces.collect();

        Ok(Command::Create {
            start_in,
            duration,
            question,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cmd = Command::parse("create 60 300 Who is the greatest? | Tupac | Biggie | Eminem").unwrap();
        assert_eq!(
            cmd,
            Command::Create {
                start_in: 60,
                duration: 300,
                question: "Who is the greatest?".to_string(),
                options: vec!["Tupac".to_string(), "Biggie".to_string(), "Eminem".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_create_without_options() {
        // Validation is the registry's job
        let cmd = Command::parse("create 1 1 Lonely question").unwrap();
        assert!(matches!(cmd, Command::Create { ref options, .. } if options.is_empty()));

        assert_eq!(
            Command::parse("create 1 x Q | a | b"),
            Err(ParseError::InvalidNumber("x".to_string()))
        );
        assert!(matches!(Command::parse("create 1"), Err(ParseError::Usage(_))));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            Command::parse("  cast 0 2 "),
            Ok(Command::Cast { ballot: 0, option: 2 })
        );
        assert_eq!(
            Command::parse("voted 1 bob"),
            Ok(Command::Voted {
                ballot: 1,
                voter: Some("bob".to_string())
            })
        );
        assert_eq!(Command::parse("winners 3"), Ok(Command::Winners { ballot: 3 }));
        assert_eq!(Command::parse("phase 0"), Ok(Command::Phase { ballot: 0 }));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
        assert_eq!(
            Command::parse("as alice"),
            Ok(Command::As {
                voter: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("delete 0"),
            Err(ParseError::Unknown("delete".to_string()))
        );
        assert!(matches!(Command::parse("cast 0"), Err(ParseError::Usage(_))));
        assert_eq!(
            Command::parse("results -1"),
            Err(ParseError::InvalidNumber("-1".to_string()))
        );
    }
}
