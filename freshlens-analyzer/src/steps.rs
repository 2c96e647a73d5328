//! Run-step classification
//!
//! A run's steps mix workload commands (`dbt run`, `dbt build`) with setup
//! and housekeeping. Only workload steps produce result artifacts worth
//! merging.
//!
//! Matching is case-sensitive after collapsing whitespace. A workload verb
//! must stand as its own token, so `dbt run-operation` or `dbt runner` do not
//! count. A workload match always wins over the auxiliary vocabulary.

use freshlens_core::domain::run::RunStep;
use serde::{Deserialize, Serialize};

/// Commands that execute models
pub const WORKLOAD_VERBS: &[&str] = &["dbt run", "dbt build"];

/// Kinds of non-workload steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuxiliaryKind {
    Deps,
    Compile,
    Docs,
    SourceFreshness,
    Clone,
    Profile,
}

/// Auxiliary vocabulary in match order
const AUXILIARY_PATTERNS: &[(&str, AuxiliaryKind)] = &[
    ("dbt deps", AuxiliaryKind::Deps),
    ("dbt compile", AuxiliaryKind::Compile),
    ("dbt docs", AuxiliaryKind::Docs),
    ("dbt source freshness", AuxiliaryKind::SourceFreshness),
    ("freshness", AuxiliaryKind::SourceFreshness),
    ("git clone", AuxiliaryKind::Clone),
    ("Clone git repository", AuxiliaryKind::Clone),
    ("Create profile", AuxiliaryKind::Profile),
    ("profile", AuxiliaryKind::Profile),
];

/// Diagnostic classification of one step command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Executes models; carries the matched verb
    Workload(&'static str),
    Auxiliary(AuxiliaryKind),
    Unrecognized,
}

impl StepKind {
    pub fn is_workload(&self) -> bool {
        matches!(self, StepKind::Workload(_))
    }
}

/// Collapses runs of whitespace into single spaces
fn normalize(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Whether `verb` occurs in `command` as a standalone token sequence
fn contains_token(command: &str, verb: &str) -> bool {
    command.match_indices(verb).any(|(start, _)| {
        let before = command[..start].chars().next_back();
        let after = command[start + verb.len()..].chars().next();
        !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
    })
}

/// Classifies a single step command
pub fn classify_command(command: &str) -> StepKind {
    let command = normalize(command);

    if let Some(verb) = WORKLOAD_VERBS
        .iter()
        .find(|verb| contains_token(&command, verb))
    {
        return StepKind::Workload(*verb);
    }

    AUXILIARY_PATTERNS
        .iter()
        .find(|(pattern, _)| command.contains(pattern))
        .map(|(_, kind)| StepKind::Auxiliary(*kind))
        .unwrap_or(StepKind::Unrecognized)
}

/// Indices of the workload steps, in step order
pub fn classify_run_steps(steps: &[RunStep]) -> Vec<u32> {
    let mut meaningful: Vec<u32> = steps
        .iter()
        .filter(|step| classify_command(&step.command).is_workload())
        .map(|step| step.index)
        .collect();
    meaningful.sort_unstable();
    meaningful.dedup();
    meaningful
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(commands: &[&str]) -> Vec<RunStep> {
        commands
            .iter()
            .enumerate()
            .map(|(i, c)| RunStep::new(i as u32 + 1, *c))
            .collect()
    }

    #[test]
    fn test_typical_run() {
        let run = steps(&[
            "Clone git repository",
            "Create profile from connection Snowflake",
            "Invoke dbt with `dbt deps`",
            "Invoke dbt with `dbt source freshness`",
            "Invoke dbt with `dbt build --select state:modified+`",
            "Invoke dbt with `dbt run --select tag:hourly`",
            "Invoke dbt with `dbt docs generate`",
        ]);
        assert_eq!(classify_run_steps(&run), vec![5, 6]);
    }

    #[test]
    fn test_auxiliary_kinds() {
        assert_eq!(
            classify_command("Invoke dbt with `dbt deps`"),
            StepKind::Auxiliary(AuxiliaryKind::Deps)
        );
        assert_eq!(
            classify_command("Clone git repository"),
            StepKind::Auxiliary(AuxiliaryKind::Clone)
        );
        assert_eq!(
            classify_command("Create profile from connection BigQuery"),
            StepKind::Auxiliary(AuxiliaryKind::Profile)
        );
        assert_eq!(classify_command("dbt test"), StepKind::Unrecognized);
    }

    #[test]
    fn test_run_operation_is_not_a_workload() {
        assert!(!classify_command("Invoke dbt with `dbt run-operation stage_external_sources`").is_workload());
        assert!(!classify_command("dbt runner").is_workload());
        assert!(!classify_command("mydbt run").is_workload());
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(classify_command("dbt   run\t--full-refresh"), StepKind::Workload("dbt run"));
        assert_eq!(classify_command("dbt\nbuild"), StepKind::Workload("dbt build"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!classify_command("DBT RUN").is_workload());
        assert!(!classify_command("Dbt Build").is_workload());
    }

    #[test]
    fn test_workload_wins_over_auxiliary_words() {
        // Selector mentions freshness and profile, but the verb is a build
        let kind = classify_command("dbt build --select source_status:fresher+ --profile prod --exclude freshness_checks");
        assert_eq!(kind, StepKind::Workload("dbt build"));
        assert_eq!(classify_command("dbt deps && dbt run"), StepKind::Workload("dbt run"));
    }

    #[test]
    fn test_verb_followed_by_punctuation() {
        assert!(classify_command("Invoke dbt with `dbt run`").is_workload());
        assert!(classify_command("dbt build;").is_workload());
    }

    #[test]
    fn test_no_workload_steps() {
        let run = steps(&["Clone git repository", "Invoke dbt with `dbt source freshness`"]);
        assert!(classify_run_steps(&run).is_empty());
        assert!(classify_run_steps(&[]).is_empty());
    }
}
