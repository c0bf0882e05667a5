use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::types::SectionFindings;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not a JSON object: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("response has no JSON object")]
    NoObject,
}

#[derive(Deserialize)]
struct RawFindings {
    summary: Option<String>,
    findings: Vec<Value>,
    #[serde(default)]
    strengths: Vec<Value>,
    #[serde(default)]
    recommendations: Vec<Value>,
    #[serde(default)]
    score: Option<Value>,
}

/// Parse a model answer into section findings.
///
/// Models often wrap the JSON in a code fence or a sentence of preamble, so
/// the outermost `{ ... }` span is extracted before parsing. `findings` is
/// required; list items may be plain strings or objects carrying a
/// `message`, `description`, `text` or `title` field.
pub fn parse_findings(raw: &str) -> Result<SectionFindings, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoObject)?;
    let end = raw.rfind('}').ok_or(ParseError::NoObject)?;
    if end < start {
        return Err(ParseError::NoObject);
    }

    let parsed: RawFindings = serde_json::from_str(&raw[start..=end])?;
    Ok(SectionFindings {
        summary: parsed
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        findings: items(parsed.findings),
        strengths: items(parsed.strengths),
        recommendations: items(parsed.recommendations),
        raw_score: parsed.score.and_then(|score| match score {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s),
            _ => None,
        }),
    })
}

fn items(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            Value::Object(map) => ["message", "description", "text", "title"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"summary": "Adds login", "findings": ["Missing test"], "strengths": ["Small diff"], "recommendations": ["Add a test"], "score": 7}"#;
        let findings = parse_findings(raw).unwrap();
        assert_eq!(findings.summary.as_deref(), Some("Adds login"));
        assert_eq!(findings.findings, vec!["Missing test"]);
        assert_eq!(findings.strengths, vec!["Small diff"]);
        assert_eq!(findings.recommendations, vec!["Add a test"]);
        assert_eq!(findings.score(), Some(7));
    }

    #[test]
    fn test_parse_fenced_json_with_preamble() {
        let raw = "Here is the review:\n```json\n{\"findings\": [], \"score\": \"8/10\"}\n```\n";
        let findings = parse_findings(raw).unwrap();
        assert!(findings.findings.is_empty());
        assert!(findings.summary.is_none());
        assert_eq!(findings.score(), Some(8));
    }

    #[test]
    fn test_object_items_are_flattened() {
        let raw = r#"{"findings": [{"severity": "high", "message": "SQL built by concatenation"}, {"title": "Unbounded loop"}, null, "  "]}"#;
        let findings = parse_findings(raw).unwrap();
        assert_eq!(
            findings.findings,
            vec!["SQL built by concatenation", "Unbounded loop"]
        );
    }

    #[test]
    fn test_missing_findings_is_error() {
        assert!(parse_findings(r#"{"summary": "ok"}"#).is_err());
    }

    #[test]
    fn test_non_json_is_error() {
        assert!(matches!(
            parse_findings("The code looks fine."),
            Err(ParseError::NoObject)
        ));
        assert!(matches!(
            parse_findings("{not json}"),
            Err(ParseError::NotJson(_))
        ));
        assert!(parse_findings("} {").is_err());
    }
}
