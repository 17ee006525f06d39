//! Session command for factdrill.
//!
//! Composes the next practice session for a learner. Nothing is persisted;
//! answers come back through the answer command.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{compose, session_rng, QuestionCandidate, QuestionKind, Tier};
use crate::error::Result;
use crate::storage::{validate_learner_id, LedgerStore};

/// Options for the session command.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tier override (default: config `learner.default_tier`).
    pub tier: Option<Tier>,
    /// Number of questions (default: configured length for the tier).
    pub length: Option<usize>,
    /// RNG seed (default: config `session.seed`, else random).
    pub seed: Option<u64>,
}

/// One question in the composed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub table: u32,
    pub multiplier: u32,
    pub kind: QuestionKind,
    pub prompt: String,
    pub answer: u32,
    pub weight: f64,
}

impl From<&QuestionCandidate> for QuestionInfo {
    fn from(q: &QuestionCandidate) -> Self {
        Self {
            table: q.table,
            multiplier: q.multiplier,
            kind: q.kind,
            prompt: q.prompt(),
            answer: q.expected_answer(),
            weight: q.weight,
        }
    }
}

/// Output format for the session command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutput {
    pub success: bool,
    pub learner_id: String,
    pub tier: Option<Tier>,
    pub current_stage: u32,
    pub count: usize,
    pub questions: Vec<QuestionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionOutput {
    /// Create a failed output.
    pub fn failure(learner_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.into(),
            tier: None,
            current_stage: 0,
            count: 0,
            questions: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The session command implementation.
pub struct SessionCommand<S: LedgerStore> {
    store: S,
    config: Config,
}

impl<S: LedgerStore> SessionCommand<S> {
    /// Create a new session command.
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Run the session command.
    pub fn run(&self, learner_id: &str, options: &SessionOptions) -> SessionOutput {
        match self.try_run(learner_id, options) {
            Ok(output) => output,
            Err(e) => SessionOutput::failure(learner_id, e.to_string()),
        }
    }

    fn try_run(&self, learner_id: &str, options: &SessionOptions) -> Result<SessionOutput> {
        validate_learner_id(learner_id)?;
        let tier = options.tier.unwrap_or(self.config.learner.default_tier);
        let length = options
            .length
            .unwrap_or_else(|| self.config.session_length_for(tier));
        let seed = options.seed.or(self.config.session.seed);

        let ledger = self.store.get_or(learner_id, self.config.fresh_ledger())?;
        let mut rng = session_rng(seed);
        let questions: Vec<QuestionInfo> = compose(&ledger, tier, length, &mut rng)
            .iter()
            .map(QuestionInfo::from)
            .collect();

        tracing::debug!(
            learner = learner_id,
            stage = ledger.current_stage,
            count = questions.len(),
            "composed session"
        );

        Ok(SessionOutput {
            success: true,
            learner_id: learner_id.to_string(),
            tier: Some(tier),
            current_stage: ledger.current_stage,
            count: questions.len(),
            questions,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SessionOutput, options: &SessionOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &SessionOutput) -> String {
        if !output.success {
            return format!(
                "Session failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = format!(
            "Session for {} (stage {}, {} questions)\n\n",
            output.learner_id, output.current_stage, output.count
        );
        for (i, q) in output.questions.iter().enumerate() {
            out.push_str(&format!("{:>3}. {}\n", i + 1, q.prompt));
        }
        out
    }
}
