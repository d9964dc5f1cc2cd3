//! Knowledge base lookup.
//!
//! A lookup either finds an article or returns the [`NO_ARTICLE_FOUND`]
//! sentinel. Transport problems are errors, never a miss.

use anyhow::{bail, Result};
use async_trait::async_trait;
use coordination::KnowledgeLookupResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result text of a lookup that found nothing.
pub const NO_ARTICLE_FOUND: &str = "No relevant knowledge base article found.";

/// Whether a lookup result carries an article. Blank text counts as a miss.
pub fn is_hit(result: &KnowledgeLookupResult) -> bool {
    let text = result.result.trim();
    !text.is_empty() && text != NO_ARTICLE_FOUND
}

/// Knowledge base backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Search for an article answering `query`.
    async fn lookup(&self, query: &str) -> Result<KnowledgeLookupResult>;
}

/// A knowledge base article matched by keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Article {
    pub topic: String,
    pub keywords: Vec<String>,
    pub body: String,
}

impl Article {
    pub fn new(topic: &str, keywords: &[&str], body: &str) -> Self {
        Self {
            topic: topic.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            body: body.to_string(),
        }
    }
}

/// Built-in articles.
pub fn default_articles() -> Vec<Article> {
    vec![
        Article::new(
            "password reset",
            &["password", "forgot", "reset", "login", "log in", "sign in"],
            "To reset your password, click 'Forgot Password' on the login page and follow \
the link we email you. The link expires after 30 minutes.",
        ),
        Article::new(
            "invoice copy",
            &["invoice", "receipt", "billing statement"],
            "Invoices are available under Account > Billing > Invoices. Select a billing \
period and choose 'Download PDF' to get a copy.",
        ),
    ]
}

#[derive(Debug)]
struct CompiledArticle {
    article: Article,
    patterns: Vec<Regex>,
}

/// In-memory knowledge base.
///
/// An article matches when the query contains its topic or any of its
/// keywords as whole words (case-insensitive). The article with the most
/// matching keywords wins; ties go to the earlier article.
#[derive(Debug)]
pub struct StaticKnowledgeBase {
    articles: Vec<CompiledArticle>,
}

impl StaticKnowledgeBase {
    pub fn new(articles: Vec<Article>) -> Result<Self> {
        let articles = articles
            .into_iter()
            .map(|article| {
                if article.topic.trim().is_empty() {
                    bail!("knowledge base article has an empty topic");
                }
                if article.body.trim().is_empty() {
                    bail!("knowledge base article `{}` has an empty body", article.topic);
                }
                if article.keywords.iter().any(|k| k.trim().is_empty()) {
                    bail!("knowledge base article `{}` has an empty keyword", article.topic);
                }
                let patterns = std::iter::once(&article.topic)
                    .chain(article.keywords.iter())
                    .map(|term| word_pattern(term))
                    .collect::<Result<Vec<_>>>()?;
                Ok(CompiledArticle { article, patterns })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { articles })
    }

    /// Knowledge base holding [`default_articles`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_articles())
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    fn best_match(&self, query: &str) -> Option<&Article> {
        let mut best: Option<(&Article, usize)> = None;
        for compiled in &self.articles {
            let score = compiled.patterns.iter().filter(|p| p.is_match(query)).count();
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((&compiled.article, score));
            }
        }
        best.map(|(article, _)| article)
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn lookup(&self, query: &str) -> Result<KnowledgeLookupResult> {
        let result = match self.best_match(query) {
            Some(article) => {
                debug!(topic = %article.topic, "Knowledge base hit");
                article.body.clone()
            }
            None => {
                debug!("Knowledge base miss");
                NO_ARTICLE_FOUND.to_string()
            }
        };
        Ok(KnowledgeLookupResult { result })
    }
}

/// Case-insensitive whole-word pattern for a term; inner whitespace matches
/// any run of whitespace.
pub(crate) fn word_pattern(term: &str) -> Result<Regex> {
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
    Ok(Regex::new(&pattern)?)
}
