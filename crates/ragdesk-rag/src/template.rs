//! Template answer assembly
//!
//! An ordered rule table maps question keywords to a category. The first
//! matching rule wins and its template wraps the best excerpt from the hits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragdesk_core::{AnswerAssembler, AnswerStrategy, ChunkKind, SearchHit, SearchResult};

/// Answer returned whenever retrieval found nothing
pub const NO_MATCH_ANSWER: &str =
    "❌ No relevant information found. Try asking with different keywords.";

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Lines that carry account details
const CREDENTIAL_MARKERS: &[&str] = &["id:", "id :", "pw:", "pw :", "password", "@", "1)", "2)"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    DesignSuiteAccount,
    AccountCredentials,
    NetworkCredentials,
    Password,
    Login,
    Troubleshooting,
    General,
}

impl TemplateCategory {
    pub fn header(&self) -> &'static str {
        match self {
            TemplateCategory::DesignSuiteAccount => "🎨 **Adobe account**",
            TemplateCategory::AccountCredentials => "📧 **Google account**",
            TemplateCategory::NetworkCredentials => "📶 **Wi-Fi access**",
            TemplateCategory::Password => "🔑 **Password**",
            TemplateCategory::Login => "👤 **Login details**",
            TemplateCategory::Troubleshooting => "🛠️ **Troubleshooting**",
            TemplateCategory::General => "📋 **Most relevant excerpt**",
        }
    }

    pub fn footer(&self) -> &'static str {
        match self {
            TemplateCategory::DesignSuiteAccount => {
                "💡 Sign in to Adobe Creative Cloud with the details above."
            }
            TemplateCategory::AccountCredentials => {
                "💡 Use these details for Gmail and the other Google services.\n🔐 Keep the password somewhere safe."
            }
            TemplateCategory::NetworkCredentials => {
                "💡 Connect to the wireless network with the details above."
            }
            TemplateCategory::Password => "⚠️ Do not share passwords outside the team.",
            TemplateCategory::Login => "💻 Use these details when signing in.",
            TemplateCategory::Troubleshooting => "📞 Contact the IT team if the problem persists.",
            TemplateCategory::General => {
                "💡 A more specific question gets a more precise answer."
            }
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct TemplateRule {
    pub category: TemplateCategory,
    /// Question keywords that select this rule
    pub keywords: &'static [&'static str],
    /// Content markers that make a hit the preferred excerpt
    pub markers: &'static [&'static str],
    /// Keep only credential lines of the excerpt when it has any
    pub credential_lines: bool,
}

impl TemplateRule {
    pub fn matches(&self, question: &str) -> bool {
        let lowered = question.to_lowercase();
        self.keywords.iter().any(|keyword| keyword_matches(&lowered, keyword))
    }
}

/// ASCII keywords must stand alone; other scripts attach particles to nouns,
/// so those match anywhere
fn keyword_matches(lowered: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return lowered.contains(keyword);
    }

    lowered.match_indices(keyword).any(|(start, matched)| {
        let before = lowered[..start].chars().next_back();
        let after = lowered[start + matched.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

pub fn default_rules() -> Vec<TemplateRule> {
    vec![
        TemplateRule {
            category: TemplateCategory::DesignSuiteAccount,
            keywords: &["adobe", "어도비"],
            markers: &["adobe", "어도비"],
            credential_lines: true,
        },
        TemplateRule {
            category: TemplateCategory::AccountCredentials,
            keywords: &["gmail", "google", "구글", "지메일"],
            markers: &["@gmail", "gmail", "google", "구글"],
            credential_lines: true,
        },
        TemplateRule {
            category: TemplateCategory::NetworkCredentials,
            keywords: &["wifi", "wi-fi", "wireless", "와이파이", "무선", "인터넷"],
            markers: &["wifi", "wi-fi", "ssid", "와이파이", "무선"],
            credential_lines: false,
        },
        TemplateRule {
            category: TemplateCategory::Password,
            keywords: &["password", "passwd", "pw", "비밀번호", "비번", "패스워드"],
            markers: &["password", "pw", "비밀번호", "비번"],
            credential_lines: false,
        },
        TemplateRule {
            category: TemplateCategory::Login,
            keywords: &["login", "account", "id", "아이디", "로그인", "계정"],
            markers: &["id", "login", "아이디", "로그인", "계정"],
            credential_lines: false,
        },
        TemplateRule {
            category: TemplateCategory::Troubleshooting,
            keywords: &["error", "problem", "broken", "문제", "오류", "안됨", "고장", "에러"],
            markers: &["error", "restart", "오류", "문제", "재시작"],
            credential_lines: false,
        },
    ]
}

/// Template strategy
pub struct TemplateAssembler {
    rules: Vec<TemplateRule>,
}

impl TemplateAssembler {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<TemplateRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TemplateRule] {
        &self.rules
    }

    fn rule_for(&self, question: &str) -> Option<&TemplateRule> {
        self.rules.iter().find(|rule| rule.matches(question))
    }

    /// Category the first matching rule selects
    pub fn classify(&self, question: &str) -> TemplateCategory {
        self.rule_for(question)
            .map(|rule| rule.category)
            .unwrap_or(TemplateCategory::General)
    }

    /// Pick the excerpt a rule wraps: complete sections first, then a hit
    /// carrying one of the rule's markers, then the best hit
    fn select_hit<'a>(&self, rule: Option<&TemplateRule>, results: &'a SearchResult) -> Option<&'a SearchHit> {
        let complete: Vec<&SearchHit> = results
            .hits
            .iter()
            .filter(|hit| hit.kind() == ChunkKind::CompleteSection)
            .collect();
        let candidates: Vec<&SearchHit> = if complete.is_empty() {
            results.hits.iter().collect()
        } else {
            complete
        };

        let markers = rule.map(|r| r.markers).unwrap_or_default();
        candidates
            .iter()
            .find(|hit| {
                let lowered = hit.text.to_lowercase();
                markers.iter().any(|marker| lowered.contains(marker))
            })
            .or_else(|| candidates.first())
            .copied()
    }

    /// Render the answer text for a question
    pub fn render(&self, question: &str, results: &SearchResult) -> String {
        let rule = self.rule_for(question);
        let Some(hit) = self.select_hit(rule, results) else {
            return NO_MATCH_ANSWER.to_string();
        };

        let excerpt = match rule {
            Some(rule) if rule.credential_lines => credential_lines(&hit.text),
            _ => hit.text.trim().to_string(),
        };
        let category = rule.map(|r| r.category).unwrap_or(TemplateCategory::General);
        debug!(?category, hit = %hit.id, "rendering template answer");

        format!(
            "{}\n{}\n{}\n\n{}",
            category.header(),
            DIVIDER,
            excerpt,
            category.footer()
        )
    }
}

impl Default for TemplateAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Credential lines of a text, or the whole text when it has none
pub fn credential_lines(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            let lowered = line.to_lowercase();
            CREDENTIAL_MARKERS.iter().any(|marker| lowered.contains(marker))
        })
        .collect();

    if lines.is_empty() {
        text.trim().to_string()
    } else {
        lines.join("\n")
    }
}

#[async_trait]
impl AnswerAssembler for TemplateAssembler {
    fn strategy(&self) -> AnswerStrategy {
        AnswerStrategy::Template
    }

    async fn assemble(&self, question: &str, results: &SearchResult) -> String {
        if results.is_empty() {
            return NO_MATCH_ANSWER.to_string();
        }
        self.render(question, results)
    }
}
