use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::config::Features;
use crate::error::ValidationError;

pub const FIELD_TITLE: &str = "影片標題";
pub const FIELD_LINK: &str = "影片連結";
pub const FIELD_CATEGORIES: &str = "主題分類";
pub const FIELD_TAGS: &str = "次要標籤";
pub const FIELD_DURATION: &str = "時長(分鐘)";
pub const FIELD_GRADES: &str = "適用年級";
pub const FIELD_SUMMARY: &str = "內容摘要";
pub const FIELD_TEACHING_POINTS: &str = "教學重點";
pub const FIELD_DISCUSSION: &str = "討論問題";
pub const FIELD_RATING: &str = "評分";

/// Separators accepted in multi-value spreadsheet cells.
pub const SEPARATORS: [char; 3] = [',', '、', ';'];

/// Separator written back when a multi-value field is serialized.
pub const CANONICAL_SEPARATOR: &str = "、";

/// An ordered set of trimmed, non-empty strings stored upstream as a single
/// delimited cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValue(Vec<String>);

impl MultiValue {
    pub fn parse(raw: &str) -> Self {
        let mut values: Vec<String> = Vec::new();
        for piece in raw.split(&SEPARATORS[..]) {
            let piece = piece.trim();
            if !piece.is_empty() && !values.iter().any(|v| v == piece) {
                values.push(piece.to_string());
            }
        }
        Self(values)
    }

    pub fn contains(&self, value: &str) -> bool {
        let value = value.trim();
        self.0.iter().any(|v| v == value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_field_string(&self) -> String {
        self.0.join(CANONICAL_SEPARATOR)
    }
}

impl fmt::Display for MultiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field_string())
    }
}

impl<S: AsRef<str>> FromIterator<S> for MultiValue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let joined: Vec<String> = iter.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse(&joined.join(CANONICAL_SEPARATOR))
    }
}

impl Serialize for MultiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_field_string())
    }
}

impl<'de> Deserialize<'de> for MultiValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Self::default(),
            Some(Value::String(s)) => Self::parse(&s),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(other) => Self::parse(&other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Featured,
}

impl ModerationStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "待審",
            ModerationStatus::Approved => "通過",
            ModerationStatus::Featured => "精選",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim() {
            "待審" => Some(ModerationStatus::Pending),
            "通過" => Some(ModerationStatus::Approved),
            "精選" => Some(ModerationStatus::Featured),
            _ => None,
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = Self::from_wire(s) {
            return Ok(status);
        }
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "featured" => Ok(ModerationStatus::Featured),
            other => Err(format!(
                "Unknown status '{}'. Use pending, approved or featured",
                other
            )),
        }
    }
}

impl Serialize for ModerationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ModerationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from_wire(&raw).unwrap_or_else(|| {
            if !raw.trim().is_empty() {
                tracing::warn!(status = %raw, "unknown moderation status, treating as pending");
            }
            ModerationStatus::Pending
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoContent {
    #[serde(rename = "影片標題", default, deserialize_with = "lenient::string")]
    pub title: String,

    #[serde(rename = "影片連結", default, deserialize_with = "lenient::string")]
    pub link: String,

    /// Older sheets stored the primary link under this column.
    #[serde(
        rename = "YouTube連結",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing
    )]
    pub legacy_link: Option<String>,

    #[serde(
        rename = "Drive備份連結",
        default,
        deserialize_with = "lenient::opt_string",
        serialize_with = "lenient::blank_if_none"
    )]
    pub backup_link: Option<String>,

    #[serde(rename = "主題分類", default)]
    pub categories: MultiValue,

    #[serde(rename = "次要標籤", default)]
    pub tags: MultiValue,

    #[serde(
        rename = "時長(分鐘)",
        default,
        deserialize_with = "lenient::opt_u32",
        serialize_with = "lenient::blank_if_none"
    )]
    pub duration_minutes: Option<u32>,

    #[serde(rename = "適用年級", default)]
    pub grades: MultiValue,

    #[serde(rename = "內容摘要", default, deserialize_with = "lenient::string")]
    pub summary: String,

    #[serde(rename = "教學重點", default, deserialize_with = "lenient::string")]
    pub teaching_points: String,

    #[serde(rename = "討論問題", default, deserialize_with = "lenient::string")]
    pub discussion_questions: String,

    #[serde(
        rename = "推薦老師",
        default,
        deserialize_with = "lenient::opt_string",
        serialize_with = "lenient::blank_if_none"
    )]
    pub recommender: Option<String>,

    #[serde(
        rename = "評分",
        default,
        deserialize_with = "lenient::opt_rating",
        serialize_with = "lenient::blank_if_none"
    )]
    pub rating: Option<u8>,

    #[serde(
        rename = "備註",
        default,
        deserialize_with = "lenient::opt_string",
        serialize_with = "lenient::blank_if_none"
    )]
    pub notes: Option<String>,
}

impl VideoContent {
    /// Primary link, falling back to the legacy column.
    pub fn watch_link(&self) -> &str {
        if !self.link.trim().is_empty() {
            return &self.link;
        }
        self.legacy_link.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "編號", deserialize_with = "lenient::id")]
    pub id: i64,

    #[serde(flatten)]
    pub content: VideoContent,

    #[serde(
        rename = "上傳者Email",
        default,
        deserialize_with = "lenient::opt_string",
        serialize_with = "lenient::blank_if_none"
    )]
    pub uploader_email: Option<String>,

    #[serde(rename = "審核狀態", default)]
    pub status: ModerationStatus,
}

/// A record about to be created; carries no identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVideo {
    #[serde(flatten)]
    pub content: VideoContent,

    #[serde(rename = "上傳者Email")]
    pub uploader_email: String,

    #[serde(rename = "審核狀態")]
    pub status: ModerationStatus,
}

/// Raw add/edit form input. Every field is free text until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoForm {
    pub title: String,
    pub link: String,
    pub backup_link: String,
    pub categories: String,
    pub tags: String,
    pub duration_minutes: String,
    pub grades: String,
    pub summary: String,
    pub teaching_points: String,
    pub discussion_questions: String,
    pub recommender: String,
    pub rating: String,
    pub notes: String,
}

impl VideoForm {
    pub fn from_video(video: &Video) -> Self {
        let c = &video.content;
        Self {
            title: c.title.clone(),
            link: c.watch_link().to_string(),
            backup_link: c.backup_link.clone().unwrap_or_default(),
            categories: c.categories.to_field_string(),
            tags: c.tags.to_field_string(),
            duration_minutes: c.duration_minutes.map(|d| d.to_string()).unwrap_or_default(),
            grades: c.grades.to_field_string(),
            summary: c.summary.clone(),
            teaching_points: c.teaching_points.clone(),
            discussion_questions: c.discussion_questions.clone(),
            recommender: c.recommender.clone().unwrap_or_default(),
            rating: c.rating.map(|r| r.to_string()).unwrap_or_default(),
            notes: c.notes.clone().unwrap_or_default(),
        }
    }

    /// Checks required fields in form order and converts to typed content.
    pub fn validate(&self, features: &Features) -> Result<VideoContent, ValidationError> {
        let required = [
            (FIELD_TITLE, &self.title),
            (FIELD_LINK, &self.link),
            (FIELD_CATEGORIES, &self.categories),
            (FIELD_DURATION, &self.duration_minutes),
            (FIELD_GRADES, &self.grades),
            (FIELD_SUMMARY, &self.summary),
            (FIELD_TEACHING_POINTS, &self.teaching_points),
            (FIELD_DISCUSSION, &self.discussion_questions),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        let duration_minutes = match self.duration_minutes.trim().parse::<u32>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => return Err(ValidationError::InvalidDuration { field: FIELD_DURATION }),
        };

        let rating = match self.rating.trim() {
            "" => None,
            raw => match raw.parse::<u8>() {
                Ok(r) if (1..=5).contains(&r) => Some(r),
                _ => return Err(ValidationError::InvalidRating { field: FIELD_RATING }),
            },
        };

        let categories = MultiValue::parse(&self.categories);
        if categories.is_empty() {
            return Err(ValidationError::MissingField(FIELD_CATEGORIES));
        }
        let tags = MultiValue::parse(&self.tags);
        let grades = MultiValue::parse(&self.grades);
        if grades.is_empty() {
            return Err(ValidationError::MissingField(FIELD_GRADES));
        }

        if !features.multi_select_taxonomy {
            if categories.len() > 1 {
                return Err(ValidationError::SingleValueOnly(FIELD_CATEGORIES));
            }
            if tags.len() > 1 {
                return Err(ValidationError::SingleValueOnly(FIELD_TAGS));
            }
        }

        Ok(VideoContent {
            title: self.title.trim().to_string(),
            link: self.link.trim().to_string(),
            legacy_link: None,
            backup_link: non_blank(&self.backup_link),
            categories,
            tags,
            duration_minutes: Some(duration_minutes),
            grades,
            summary: self.summary.trim().to_string(),
            teaching_points: self.teaching_points.trim().to_string(),
            discussion_questions: self.discussion_questions.trim().to_string(),
            recommender: non_blank(&self.recommender),
            rating,
            notes: non_blank(&self.notes),
        })
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Spreadsheet-backed services return numbers as strings and empty cells as
/// `""`. These helpers accept either.
pub(crate) mod lenient {
    use serde::de::{Deserializer, Error as _};
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    fn text(value: Option<Value>) -> Option<String> {
        match value? {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(Option::<Value>::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(text(Option::<Value>::deserialize(deserializer)?)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(whole_number))
                .ok_or_else(|| D::Error::custom(format!("invalid video id {}", n))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("invalid video id '{}'", s))),
            _ => Err(D::Error::custom("invalid video id")),
        }
    }

    // Sheets may send `12.0` for an integer cell.
    fn whole_number(f: f64) -> Option<i64> {
        let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
        (f.is_finite() && f.fract() == 0.0 && in_range).then(|| f as i64)
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            _ => None,
        })
    }

    pub fn opt_rating<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u8>, D::Error> {
        let rating = opt_u32(deserializer)?;
        Ok(rating
            .filter(|r| (1..=5).contains(r))
            .map(|r| r as u8))
    }

    pub fn blank_if_none<S: Serializer, T: Serialize>(
        value: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_form() -> VideoForm {
        VideoForm {
            title: "網路交友停看聽".into(),
            link: "https://www.youtube.com/watch?v=abc".into(),
            categories: "網路交友、街頭訪問".into(),
            duration_minutes: "8".into(),
            grades: "國中、高中".into(),
            summary: "街訪青少年的交友經驗".into(),
            teaching_points: "辨識網路詐騙".into(),
            discussion_questions: "你會和網友見面嗎？".into(),
            ..Default::default()
        }
    }

    #[test]
    fn multi_value_splits_on_every_separator() {
        let value = MultiValue::parse(" 網路交友、街頭訪問, 假訊息;  ;網路交友");
        let items: Vec<&str> = value.iter().collect();
        assert_eq!(items, vec!["網路交友", "街頭訪問", "假訊息"]);
        assert_eq!(value.to_field_string(), "網路交友、街頭訪問、假訊息");
    }

    #[test]
    fn multi_value_contains_is_exact_after_trim() {
        let value = MultiValue::parse("網路交友、街頭訪問");
        assert!(value.contains("網路交友"));
        assert!(value.contains(" 街頭訪問 "));
        assert!(!value.contains("網路"));
    }

    #[test]
    fn multi_value_accepts_null_and_arrays() {
        let empty: MultiValue = serde_json::from_value(Value::Null).unwrap();
        assert!(empty.is_empty());
        let listed: MultiValue = serde_json::from_value(json!(["國中", "高中"])).unwrap();
        assert_eq!(listed.to_field_string(), "國中、高中");
    }

    #[test]
    fn video_decodes_spreadsheet_row() {
        let row = json!({
            "編號": "12",
            "影片標題": "假新聞大解密",
            "影片連結": "",
            "YouTube連結": "https://youtu.be/xyz",
            "Drive備份連結": "",
            "主題分類": "假訊息;新聞識讀",
            "時長(分鐘)": "15",
            "適用年級": "高中",
            "評分": "",
            "審核狀態": "精選"
        });
        let video: Video = serde_json::from_value(row).unwrap();
        assert_eq!(video.id, 12);
        assert_eq!(video.content.watch_link(), "https://youtu.be/xyz");
        assert_eq!(video.content.backup_link, None);
        assert_eq!(video.content.duration_minutes, Some(15));
        assert_eq!(video.content.rating, None);
        assert_eq!(video.status, ModerationStatus::Featured);
        assert!(video.content.categories.contains("新聞識讀"));
    }

    #[test]
    fn id_accepts_whole_floats_only() {
        let video: Video = serde_json::from_value(json!({"編號": 12.0})).unwrap();
        assert_eq!(video.id, 12);
        assert!(serde_json::from_value::<Video>(json!({"編號": 12.7})).is_err());
        assert!(serde_json::from_value::<Video>(json!({"編號": 1e300})).is_err());
        assert!(serde_json::from_value::<Video>(json!({"編號": ""})).is_err());
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        let video: Video = serde_json::from_value(json!({"編號": 3, "審核狀態": "草稿"})).unwrap();
        assert_eq!(video.status, ModerationStatus::Pending);
    }

    #[test]
    fn new_video_serializes_wire_field_names() {
        let content = complete_form().validate(&Features::default()).unwrap();
        let body = serde_json::to_value(NewVideo {
            content,
            uploader_email: "a@x.com".into(),
            status: ModerationStatus::Pending,
        })
        .unwrap();
        assert_eq!(body["影片標題"], "網路交友停看聽");
        assert_eq!(body["主題分類"], "網路交友、街頭訪問");
        assert_eq!(body["時長(分鐘)"], 8);
        assert_eq!(body["評分"], "");
        assert_eq!(body["上傳者Email"], "a@x.com");
        assert_eq!(body["審核狀態"], "待審");
        assert!(body.get("YouTube連結").is_none());
    }

    #[test]
    fn missing_discussion_questions_is_named() {
        let mut form = complete_form();
        form.discussion_questions = "  ".into();
        let err = form.validate(&Features::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField(FIELD_DISCUSSION));
        assert!(err.to_string().contains("討論問題"));
    }

    #[test]
    fn duration_and_rating_are_range_checked() {
        let mut form = complete_form();
        form.duration_minutes = "0".into();
        assert!(matches!(
            form.validate(&Features::default()),
            Err(ValidationError::InvalidDuration { .. })
        ));

        let mut form = complete_form();
        form.rating = "6".into();
        assert!(matches!(
            form.validate(&Features::default()),
            Err(ValidationError::InvalidRating { .. })
        ));

        form.rating = "4".into();
        assert_eq!(form.validate(&Features::default()).unwrap().rating, Some(4));
    }

    #[test]
    fn single_select_taxonomy_rejects_multiple_categories() {
        let features = Features {
            multi_select_taxonomy: false,
            ..Features::default()
        };
        assert_eq!(
            complete_form().validate(&features).unwrap_err(),
            ValidationError::SingleValueOnly(FIELD_CATEGORIES)
        );
    }

    #[test]
    fn status_parses_english_and_wire_names() {
        assert_eq!("approved".parse::<ModerationStatus>().unwrap(), ModerationStatus::Approved);
        assert_eq!("精選".parse::<ModerationStatus>().unwrap(), ModerationStatus::Featured);
        assert!("archived".parse::<ModerationStatus>().is_err());
    }
}
