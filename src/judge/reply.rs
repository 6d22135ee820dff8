//! Parsing of the strict-JSON replies requested by the prompts.

use serde::Deserialize;
use tracing::warn;

use super::{JudgeError, QuestionDraft, Verdict, VerdictStatus};

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: Option<String>,
    intended_answer: Option<String>,
    difficulty_assessment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    status: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Drop an optional ```` ```json ```` / ```` ``` ```` fence around the payload.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn malformed(reason: impl Into<String>, raw: &str) -> JudgeError {
    JudgeError::MalformedReply {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

fn required(field: Option<String>, name: &str, raw: &str) -> Result<String, JudgeError> {
    match field.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(malformed(format!("missing `{name}`"), raw)),
    }
}

pub fn parse_question(content: &str) -> Result<QuestionDraft, JudgeError> {
    let raw: RawQuestion = serde_json::from_str(strip_code_fence(content))
        .map_err(|err| malformed(err.to_string(), content))?;

    Ok(QuestionDraft {
        question: required(raw.question, "question", content)?,
        intended_answer: required(raw.intended_answer, "intended_answer", content)?,
        difficulty_assessment: required(
            raw.difficulty_assessment,
            "difficulty_assessment",
            content,
        )?,
    })
}

pub fn parse_verdict(content: &str) -> Result<Verdict, JudgeError> {
    let raw: RawVerdict = serde_json::from_str(strip_code_fence(content))
        .map_err(|err| malformed(err.to_string(), content))?;
    let status = required(raw.status, "status", content)?;

    let status = match status.to_ascii_lowercase().as_str() {
        "correct" => VerdictStatus::Correct,
        "partially correct" => VerdictStatus::PartiallyCorrect,
        "incorrect" => VerdictStatus::Incorrect,
        _ => {
            warn!(%status, "unknown verdict status; treating as incorrect");
            VerdictStatus::Incorrect
        }
    };

    Ok(Verdict {
        status,
        explanation: raw
            .explanation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_optional() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn parses_fenced_question() {
        let draft = parse_question(
            "```json\n{\"question\":\"Smallest unit of Bitcoin?\",\"intended_answer\":\"satoshi\",\"difficulty_assessment\":\"basic knowledge\"}\n```",
        )
        .unwrap();
        assert_eq!(draft.intended_answer, "satoshi");
        assert_eq!(draft.difficulty_assessment, "basic knowledge");
    }

    #[test]
    fn missing_question_field_is_malformed() {
        let err = parse_question(r#"{"question":"Q?","intended_answer":""}"#).unwrap_err();
        assert!(matches!(err, JudgeError::MalformedReply { .. }));
    }

    #[test]
    fn non_json_reply_is_malformed() {
        let err = parse_verdict("Sure! The answer is correct.").unwrap_err();
        assert!(matches!(err, JudgeError::MalformedReply { .. }));
    }

    #[test]
    fn verdict_status_is_case_insensitive() {
        let verdict =
            parse_verdict(r#"{"status":"Partially Correct","explanation":"missed PoS"}"#).unwrap();
        assert_eq!(verdict.status, VerdictStatus::PartiallyCorrect);
        assert_eq!(verdict.explanation.as_deref(), Some("missed PoS"));
    }

    #[test]
    fn unknown_status_defaults_to_incorrect() {
        let verdict = parse_verdict(r#"{"status":"Maybe","explanation":null}"#).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Incorrect);
        assert_eq!(verdict.explanation, None);
    }
}
