use super::{Analyzer, AnalyzerError};

/// Stand-in for the AI service. Always succeeds with a fixed message built
/// around the submitted code.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockAnalyzer;

#[async_trait::async_trait]
impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, code: &str) -> Result<String, AnalyzerError> {
        Ok(format!("AI feedback: Your code is {}!", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn formats_feedback_around_code() {
        let feedback = MockAnalyzer.analyze("good").await.unwrap();
        assert_eq!(feedback, "AI feedback: Your code is good!");
    }

    #[tokio::test]
    async fn empty_code_is_accepted() {
        let feedback = MockAnalyzer.analyze("").await.unwrap();
        assert_eq!(feedback, "AI feedback: Your code is !");
    }
}
