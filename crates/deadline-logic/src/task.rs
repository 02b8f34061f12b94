//! Task model and target-body resolution.
//!
//! Tasks belong to the host; the engine reads their kind, title,
//! description and target, and writes only `deadline`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bodies::BodyCatalog;
use crate::error::{DeadlineError, Result};

/// An offered, time-bounded unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    /// Kind identifier, e.g. `"SurveyContract"`.
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Target body as declared by the host, if it could read one.
    #[serde(default)]
    pub target_body: Option<String>,
    /// Time allowed to complete the task, in seconds.
    pub deadline: f64,
}

impl Task {
    pub fn new(id: u64, kind: &str, title: &str, deadline: f64) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            title: title.to_string(),
            description: String::new(),
            target_body: None,
            deadline,
        }
    }

    pub fn with_target(mut self, body: &str) -> Self {
        self.target_body = Some(body.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Finds which catalog body a task sends the player to.
///
/// `Ok(None)` means the task has no destination (no travel needed).
pub trait TargetResolver {
    fn resolve(&self, task: &Task, catalog: &BodyCatalog) -> Result<Option<String>>;
}

/// Trusts the host-declared target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredTarget;

impl TargetResolver for DeclaredTarget {
    fn resolve(&self, task: &Task, catalog: &BodyCatalog) -> Result<Option<String>> {
        declared(task, catalog)
    }
}

fn declared(task: &Task, catalog: &BodyCatalog) -> Result<Option<String>> {
    match &task.target_body {
        Some(name) if catalog.contains(name) => Ok(Some(name.clone())),
        Some(name) => Err(DeadlineError::UnknownBody(name.clone())),
        None => Ok(None),
    }
}

/// Declared target first; otherwise the first catalog body whose name
/// appears as a whole word in the title, then in the description.
#[derive(Debug, Clone)]
pub struct TitleSearch {
    patterns: Vec<(String, Regex)>,
}

impl TitleSearch {
    pub fn new(catalog: &BodyCatalog) -> Result<Self> {
        let patterns = catalog
            .bodies()
            .iter()
            .map(|b| {
                let pattern = format!(r"\b{}\b", regex::escape(&b.name));
                Regex::new(&pattern)
                    .map(|re| (b.name.clone(), re))
                    .map_err(|source| DeadlineError::InvalidPattern { pattern, source })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn search(&self, text: &str) -> Option<String> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.clone())
    }
}

impl TargetResolver for TitleSearch {
    fn resolve(&self, task: &Task, catalog: &BodyCatalog) -> Result<Option<String>> {
        if task.target_body.is_some() {
            return declared(task, catalog);
        }
        Ok(self
            .search(&task.title)
            .or_else(|| self.search(&task.description)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::Body;

    fn catalog() -> BodyCatalog {
        BodyCatalog::new(vec![
            Body::star("Sun"),
            Body::new("Home", Some("Sun"), 9_203_545.0, 13_599_840_256.0).with_home(),
            Body::new("Mun", Some("Home"), 138_984.0, 12_000_000.0),
            Body::new("Duna", Some("Sun"), 17_315_400.0, 20_726_155_264.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_declared_target() {
        let cat = catalog();
        let task = Task::new(1, "Survey", "Survey", 100.0).with_target("Duna");
        assert_eq!(DeclaredTarget.resolve(&task, &cat).unwrap().as_deref(), Some("Duna"));
    }

    #[test]
    fn test_declared_absent() {
        let cat = catalog();
        let task = Task::new(1, "Tourism", "Fly tourists", 100.0);
        assert_eq!(DeclaredTarget.resolve(&task, &cat).unwrap(), None);
    }

    #[test]
    fn test_declared_unknown_is_error() {
        let cat = catalog();
        let task = Task::new(1, "Survey", "Survey", 100.0).with_target("Pluto");
        assert!(DeclaredTarget.resolve(&task, &cat).is_err());
    }

    #[test]
    fn test_title_search_whole_word() {
        let cat = catalog();
        let resolver = TitleSearch::new(&cat).unwrap();
        let task = Task::new(1, "Explore", "Explore the Mun", 100.0);
        assert_eq!(resolver.resolve(&task, &cat).unwrap().as_deref(), Some("Mun"));

        // "Mundane" must not match "Mun"
        let task = Task::new(2, "Explore", "A Mundane task", 100.0);
        assert_eq!(resolver.resolve(&task, &cat).unwrap(), None);
    }

    #[test]
    fn test_title_search_falls_back_to_description() {
        let cat = catalog();
        let resolver = TitleSearch::new(&cat).unwrap();
        let task = Task::new(1, "Explore", "Plant a flag", 100.0)
            .with_description("Land on Duna and plant a flag.");
        assert_eq!(resolver.resolve(&task, &cat).unwrap().as_deref(), Some("Duna"));
    }

    #[test]
    fn test_title_search_prefers_declared() {
        let cat = catalog();
        let resolver = TitleSearch::new(&cat).unwrap();
        let task = Task::new(1, "Explore", "Explore the Mun", 100.0).with_target("Duna");
        assert_eq!(resolver.resolve(&task, &cat).unwrap().as_deref(), Some("Duna"));
    }

    #[test]
    fn test_task_from_json_defaults() {
        let task: Task =
            serde_json::from_str(r#"{"id": 7, "kind": "PartTest", "title": "Test", "deadline": 10.0}"#)
                .unwrap();
        assert_eq!(task.description, "");
        assert!(task.target_body.is_none());
    }
}
