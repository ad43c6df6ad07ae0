//! Prompt construction for a whole exam in one request.

use std::fmt::Write;

use crate::types::Question;

/// Rendered in place of the correct answer when `correctIndex` is missing or out of range.
pub const UNKNOWN_ANSWER: &str = "(not provided)";

/// Build one prompt covering every question. Each question carries the
/// correct option's text rather than its index, so the model never has to
/// resolve positions.
pub fn build_prompt(exam_title: &str, questions: &[Question]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are an expert tutor. For the exam \"{}\", write a short, clear explanation \
         for each question of why the correct answer is right.",
        exam_title
    );
    prompt.push_str(
        "Respond with ONLY a JSON object that maps each question id to its explanation string, \
         for example {\"q1\": \"...\", \"q2\": \"...\"}. Do not add any other text.\n\n",
    );

    for question in questions {
        let _ = writeln!(prompt, "Question id: {}", question.id);
        let _ = writeln!(prompt, "Question: {}", question.text);
        prompt.push_str("Options:\n");
        for option in &question.options {
            let _ = writeln!(prompt, "- {}", option);
        }
        let _ = writeln!(
            prompt,
            "Correct answer: {}\n",
            question.correct_option().unwrap_or(UNKNOWN_ANSWER)
        );
    }
    prompt
}
