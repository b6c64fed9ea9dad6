//! Command dispatcher - maps free text to a part type
//!
//! Keywords are matched as substrings, so surrounding words do not matter:
//! "请画个正齿轮给我" selects `gear`. Longer phrases are tried first so that a
//! specific keyword wins over a generic one it contains; phrases of equal
//! length keep their catalog order.

use std::fmt;
use thiserror::Error;

use crate::catalog::PartCatalog;

/// Part type selected by a command
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Intent(pub String);

impl Intent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Command is empty")]
    Empty,
    #[error("No part keyword found in {0:?}")]
    NoMatch(String),
}

/// A command that matched a keyword and should be sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub intent: Intent,
    /// The trimmed input text, sent to the backend unchanged
    pub command: String,
}

#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    /// (lowercased phrase, intent), longest phrase first
    keywords: Vec<(String, Intent)>,
}

impl CommandDispatcher {
    pub fn from_catalog(catalog: &PartCatalog) -> Self {
        Self::new(
            catalog
                .keyword
                .iter()
                .map(|k| (k.phrase.as_str(), k.part.as_str())),
        )
    }

    pub fn new<'a, I>(keywords: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut keywords: Vec<(String, Intent)> = keywords
            .into_iter()
            .filter(|(phrase, _)| !phrase.trim().is_empty())
            .map(|(phrase, part)| (phrase.to_lowercase(), Intent(part.to_string())))
            .collect();
        // Stable sort keeps catalog order among equal lengths
        keywords.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { keywords }
    }

    /// Return the intent of the first keyword contained in `text`
    pub fn match_intent(&self, text: &str) -> Option<&Intent> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.keywords
            .iter()
            .find(|(phrase, _)| text.contains(phrase.as_str()))
            .map(|(_, intent)| intent)
    }

    /// Match a command and package it for submission
    pub fn dispatch(&self, text: &str) -> Result<Dispatch, DispatchError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(DispatchError::Empty);
        }
        let intent = self
            .match_intent(command)
            .ok_or_else(|| DispatchError::NoMatch(command.to_string()))?;
        Ok(Dispatch {
            intent: intent.clone(),
            command: command.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::from_catalog(&PartCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_inside_sentence() {
        let dispatcher = CommandDispatcher::default();
        let intent = dispatcher.match_intent("请画个正齿轮给我").unwrap();
        assert_eq!(intent.as_str(), "gear");

        assert_eq!(dispatcher.match_intent("画一个20齿的齿轮").unwrap().as_str(), "gear");
        assert_eq!(dispatcher.match_intent("来个10毫米立方体").unwrap().as_str(), "cube");
        assert_eq!(dispatcher.match_intent("半径5高20的圆柱").unwrap().as_str(), "cylinder");
    }

    #[test]
    fn test_english_keywords_ignore_case() {
        let dispatcher = CommandDispatcher::default();
        assert_eq!(dispatcher.match_intent("Make me a Spur GEAR").unwrap().as_str(), "gear");
    }

    #[test]
    fn test_no_match() {
        let dispatcher = CommandDispatcher::default();
        assert!(dispatcher.match_intent("画一个链轮").is_none());
        assert_eq!(
            dispatcher.dispatch("画一个链轮"),
            Err(DispatchError::NoMatch("画一个链轮".to_string()))
        );
    }

    #[test]
    fn test_empty_command() {
        let dispatcher = CommandDispatcher::default();
        assert!(dispatcher.match_intent("   ").is_none());
        assert_eq!(dispatcher.dispatch("  \n"), Err(DispatchError::Empty));
    }

    #[test]
    fn test_dispatch_keeps_raw_text() {
        let dispatcher = CommandDispatcher::default();
        let dispatch = dispatcher.dispatch("  齿数30模数2的齿轮 ").unwrap();
        assert_eq!(dispatch.intent, Intent("gear".to_string()));
        assert_eq!(dispatch.command, "齿数30模数2的齿轮");
    }

    #[test]
    fn test_longest_keyword_wins() {
        let dispatcher = CommandDispatcher::new([("齿轮", "gear"), ("摆线齿轮", "cycloid_gear")]);
        assert_eq!(dispatcher.match_intent("画个摆线齿轮").unwrap().as_str(), "cycloid_gear");
        assert_eq!(dispatcher.match_intent("画个齿轮").unwrap().as_str(), "gear");
    }
}
