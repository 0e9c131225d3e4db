//! Executes parsed commands against a registry on behalf of one operator.

use crate::command::{Command, HELP};
use ballot_core::{BallotRegistry, Result, Timestamp, VoterId};
use chrono::{DateTime, Utc};

/// Interactive session: a registry plus the identity votes are cast as
pub struct Session {
    registry: BallotRegistry,
    voter: VoterId,
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

impl Session {
    pub fn new(registry: BallotRegistry, voter: VoterId) -> Self {
        Self { registry, voter }
    }

    /// Run one command and render its outcome. Errors are rendered too;
    /// they never end the session.
    pub fn execute(&mut self, command: Command) -> String {
        match self.run(command) {
            Ok(output) => output,
            Err(e) => format!("error: {}", e),
        }
    }

    fn run(&mut self, command: Command) -> Result<String> {
        let out = match command {
            Command::Create {
                start_in,
                duration,
                question,
                options,
            } => {
                let start = self.registry.now().saturating_add(start_in);
                let index = self
                    .registry
                    .create_ballot(question, options, start, duration)?;
                format!("created ballot {} (opens {})", index, format_time(start))
            }
            Command::As { voter } => {
                self.voter = voter;
                format!("voting as {}", self.voter)
            }
            Command::Cast { ballot, option } => {
                self.registry.cast(ballot, self.voter.clone(), option)?;
                format!("{} voted for option {} on ballot {}", self.voter, option, ballot)
            }
            Command::Voted { ballot, voter } => {
                let voter = voter.unwrap_or_else(|| self.voter.clone());
                let voted = self.registry.has_voted(ballot, &voter)?;
                format!("{}: {}", voter, voted)
            }
            Command::Tally { ballot, option } => {
                self.registry.get_tally(ballot, option)?.to_string()
            }
            Command::Results { ballot } => {
                let options = self.registry.get_ballot_by_index(ballot)?.options;
                let results = self.registry.results(ballot)?;
                options
                    .iter()
                    .zip(results.iter())
                    .enumerate()
                    .map(|(i, (name, count))| format!("  [{}] {}: {}", i, name, count))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Command::Winners { ballot } => {
                let options = self.registry.get_ballot_by_index(ballot)?.options;
                let winners = self.registry.winners(ballot)?;
                let names: Vec<&str> = options
                    .iter()
                    .zip(winners.iter())
                    .filter(|(_, won)| **won)
                    .map(|(name, _)| name.as_str())
                    .collect();
                format!("winners: {}", names.join(", "))
            }
            Command::Show { ballot } => {
                let snapshot = self.registry.get_ballot_by_index(ballot)?;
                let mut lines = vec![
                    format!("ballot {}: {}", ballot, snapshot.question),
                    format!(
                        "  window: {} + {}s ({})",
                        format_time(snapshot.start_time),
                        snapshot.duration,
                        self.registry.phase(ballot)?
                    ),
                    format!("  votes: {}", self.registry.ballot(ballot)?.vote_count()),
                ];
                for (i, option) in snapshot.options.iter().enumerate() {
                    lines.push(format!("  [{}] {}", i, option));
                }
                lines.join("\n")
            }
            Command::Phase { ballot } => self.registry.phase(ballot)?.to_string(),
            Command::List => {
                let count = self.registry.ballot_count();
                if count == 0 {
                    "no ballots".to_string()
                } else {
                    let mut lines = Vec::with_capacity(count);
                    for index in 0..count {
                        let snapshot = self.registry.get_ballot_by_index(index)?;
                        let phase = self.registry.phase(index)?;
                        lines.push(format!("  {} [{}] {}", index, phase, snapshot.question));
                    }
                    lines.join("\n")
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        };
        Ok(out)
    }
}
