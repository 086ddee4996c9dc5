// src/feedback.rs
//
// Corrective feedback per pose. Keys are canonical lowercase pose names;
// lookups are case-insensitive and always return at least one entry.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const FALLBACK_FEEDBACK: &str = "Good attempt, keep practicing form.";

const BUILTIN_FEEDBACK: &[(&str, &[&str])] = &[
    (
        "tadasana",
        &["Bring your feet together", "Keep your spine straight"],
    ),
    (
        "bhujangasana",
        &["Lift your chest higher", "Place hands under shoulders"],
    ),
    (
        "trikonasana",
        &[
            "Raise your left arm",
            "Lower your right hand towards your foot",
        ],
    ),
    ("padmasana", &["Keep your back straight"]),
    ("vrikshasana", &["Balance on one leg", "Keep hands together"]),
    ("shavasana", &["Relax fully, no muscle tension."]),
];

/// Immutable label → feedback lookup, built once at startup
#[derive(Debug, Clone)]
pub struct FeedbackResolver {
    entries: HashMap<String, Vec<String>>,
    fallback: Vec<String>,
}

impl FeedbackResolver {
    pub fn new() -> Self {
        let entries = BUILTIN_FEEDBACK
            .iter()
            .map(|(pose, lines)| {
                (
                    pose.to_string(),
                    lines.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect();

        Self {
            entries,
            fallback: vec![FALLBACK_FEEDBACK.to_string()],
        }
    }

    /// Built-in entries with configured ones layered on top.
    /// An override with no lines is ignored rather than producing empty feedback.
    pub fn with_overrides(overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut resolver = Self::new();
        for (pose, lines) in overrides {
            if lines.is_empty() {
                debug!("Ignoring empty feedback override for {}", pose);
                continue;
            }
            resolver.entries.insert(canonical(pose), lines.clone());
        }
        resolver
    }

    pub fn resolve(&self, label: &str) -> Vec<String> {
        self.entries
            .get(&canonical(label))
            .unwrap_or(&self.fallback)
            .clone()
    }

    pub fn is_known(&self, label: &str) -> bool {
        self.entries.contains_key(&canonical(label))
    }
}

impl Default for FeedbackResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(label: &str) -> String {
    label.trim().to_lowercase()
}
