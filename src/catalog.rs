//! Quiz launcher: the collaborator that hands quiz payloads to a new session.

use std::collections::BTreeMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::quiz::Quiz;

pub trait RetrieveQuiz: Send + Sync {
    fn retrieve_quiz(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<Quiz>, CatalogError>> + Send;

    fn retrieve_all_quiz_names(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, CatalogError>> + Send;
}

/// Quizzes loaded from `*.json` payload files in one directory, keyed by title.
#[derive(Debug, Default)]
pub struct DirectoryCatalog {
    quizzes: BTreeMap<String, Quiz>,
}

impl DirectoryCatalog {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut quizzes = BTreeMap::new();
        for path in paths {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };

            match Quiz::from_json(&contents) {
                Ok(quiz) => {
                    debug!("Loaded quiz '{}' from {}", quiz.title(), path.display());
                    if let Some(previous) = quizzes.insert(quiz.title().to_owned(), quiz) {
                        warn!(
                            "Quiz '{}' defined twice, keeping {}",
                            previous.title(),
                            path.display()
                        );
                    }
                }
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
        }

        info!("Loaded {} quizzes from {}", quizzes.len(), dir.display());
        Ok(Self { quizzes })
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

impl RetrieveQuiz for DirectoryCatalog {
    async fn retrieve_quiz(&self, title: &str) -> Result<Option<Quiz>, CatalogError> {
        Ok(self.quizzes.get(title).cloned())
    }

    async fn retrieve_all_quiz_names(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.quizzes.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn payload(title: &str) -> String {
        format!(
            r#"{{"id": 1, "title": "{title}", "quizzes": [
                {{"question": "Q", "mark": 2, "answers": [{{"text": "A", "is_right": 1}}]}}
            ]}}"#
        )
    }

    #[tokio::test]
    async fn loads_valid_payloads_and_skips_the_rest() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.json"), payload("Sparkling")).unwrap();
        fs::write(temp_dir.path().join("a.json"), payload("Fortified")).unwrap();
        fs::write(
            temp_dir.path().join("empty.json"),
            r#"{"id": 2, "title": "Empty", "quizzes": []}"#,
        )
        .unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), payload("Ignored")).unwrap();

        let catalog = DirectoryCatalog::load(temp_dir.path()).unwrap();

        assert_eq!(
            catalog.retrieve_all_quiz_names().await.unwrap(),
            vec!["Fortified".to_owned(), "Sparkling".to_owned()]
        );
        let quiz = catalog.retrieve_quiz("Sparkling").await.unwrap().unwrap();
        assert_eq!(quiz.questions()[0].mark(), 2);
        assert!(catalog.retrieve_quiz("Empty").await.unwrap().is_none());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn directory_without_playable_quizzes_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();

        let catalog = DirectoryCatalog::load(temp_dir.path()).unwrap();

        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = DirectoryCatalog::load(temp_dir.path().join("nope"));
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
