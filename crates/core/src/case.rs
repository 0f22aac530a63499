use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid difficulty '{0}': must be one of easy, medium, or hard")]
pub struct InvalidDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = InvalidDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(InvalidDifficulty(s.to_string())),
        }
    }
}

/// Raw arguments of a `set_case_metadata` tool call, exactly as the LLM sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaseArgs {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl CaseArgs {
    pub fn new(question: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            difficulty: Some(difficulty.into()),
        }
    }
}

/// The case the interviewer is currently running. Either field may still be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseMetadata {
    pub question: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl CaseMetadata {
    /// Normalizes tool arguments. A blank question or an unrecognised difficulty
    /// is stored as absent.
    pub fn from_args(args: &CaseArgs) -> Self {
        let question = args
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        let difficulty = args.difficulty.as_deref().and_then(|d| d.parse().ok());
        Self {
            question,
            difficulty,
        }
    }

    /// The publishable record, or `None` while either field is missing.
    pub fn record(&self) -> Option<RoomMetadataRecord> {
        match (&self.question, self.difficulty) {
            (Some(question), Some(difficulty)) => Some(RoomMetadataRecord {
                case_question: question.clone(),
                difficulty,
            }),
            _ => None,
        }
    }
}

/// Room metadata as other participants see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMetadataRecord {
    #[serde(rename = "caseQuestion")]
    pub case_question: String,
    pub difficulty: Difficulty,
}

impl RoomMetadataRecord {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

/// What the tool returns to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolAck {
    pub status: AckStatus,
    pub message: String,
}

impl ToolAck {
    pub fn for_args(args: &CaseArgs) -> Self {
        let question_missing = args
            .question
            .as_deref()
            .is_none_or(|q| q.trim().is_empty());
        if question_missing {
            return Self::error("Case question is required".to_string());
        }

        match args.difficulty.as_deref() {
            None => Self::error(
                "Difficulty is required: must be one of easy, medium, or hard".to_string(),
            ),
            Some(raw) => match raw.parse::<Difficulty>() {
                Ok(difficulty) => Self {
                    status: AckStatus::Success,
                    message: format!("Case metadata set: {difficulty} difficulty"),
                },
                Err(e) => Self::error(capitalize(&e.to_string())),
            },
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: AckStatus::Error,
            message,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOOTERS: &str = "What is the market size for electric scooters in the US?";

    #[test]
    fn test_record_serializes_to_room_layout() {
        let metadata = CaseMetadata::from_args(&CaseArgs::new(SCOOTERS, "medium"));
        let json = metadata.record().unwrap().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"caseQuestion":"What is the market size for electric scooters in the US?","difficulty":"medium"}"#
        );
    }

    #[test]
    fn test_invalid_difficulty_leaves_metadata_incomplete() {
        let metadata = CaseMetadata::from_args(&CaseArgs::new(SCOOTERS, "impossible"));
        assert_eq!(metadata.question.as_deref(), Some(SCOOTERS));
        assert_eq!(metadata.difficulty, None);
        assert!(metadata.record().is_none());
    }

    #[test]
    fn test_blank_question_is_absent() {
        let metadata = CaseMetadata::from_args(&CaseArgs::new("   ", "hard"));
        assert_eq!(metadata.question, None);
        assert!(metadata.record().is_none());
    }

    #[test]
    fn test_difficulty_parsing_is_lenient_about_case() {
        assert_eq!(" Hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_ack_messages() {
        let ok = ToolAck::for_args(&CaseArgs::new(SCOOTERS, "easy"));
        assert_eq!(ok.status, AckStatus::Success);
        assert_eq!(ok.message, "Case metadata set: easy difficulty");

        let bad = ToolAck::for_args(&CaseArgs::new(SCOOTERS, "extreme"));
        assert_eq!(bad.status, AckStatus::Error);
        assert!(bad.message.starts_with("Invalid difficulty 'extreme'"));

        let missing = ToolAck::for_args(&CaseArgs {
            question: Some(SCOOTERS.to_string()),
            difficulty: None,
        });
        assert_eq!(missing.status, AckStatus::Error);
    }

    #[test]
    fn test_ack_serializes_status_lowercase() {
        let ack = ToolAck::for_args(&CaseArgs::new(SCOOTERS, "medium"));
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Case metadata set: medium difficulty");
    }
}
