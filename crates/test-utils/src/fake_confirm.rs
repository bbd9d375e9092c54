use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use minipipe::errors::Result;
use minipipe::prompt::Confirm;

/// A `Confirm` that replays scripted answers and records the questions.
///
/// Once the script runs out every answer is "no".
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirm {
    answers: Arc<Mutex<VecDeque<bool>>>,
    questions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConfirm {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.iter().copied().collect())),
            questions: Arc::default(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}
