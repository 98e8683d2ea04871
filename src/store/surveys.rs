use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Channel, Question, Sentiment, Survey, SurveyResponse, SurveyStatus, SurveyType};

use super::{next_id, StoreError};

const MAX_NAME_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSurvey {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: SurveyType,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<SurveyType>,
    pub status: Option<SurveyStatus>,
    // present-but-null and absent must stay distinguishable, so the end
    // date can be cleared again
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub completion_rate: Option<f64>,
    pub questions: Option<Vec<Question>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResponse {
    pub respondent: Option<String>,
    pub rating: Option<f64>,
    pub feedback: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub channel: Option<Channel>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStats {
    pub total_responses: u64,
    pub avg_rating: f64,
    pub by_sentiment: SentimentBuckets,
    pub by_channel: ChannelBuckets,
}

#[derive(Debug, Default, Serialize)]
pub struct SentimentBuckets {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct ChannelBuckets {
    pub web: u64,
    pub email: u64,
    pub sms: u64,
    pub qr: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_surveys: u64,
    pub active_surveys: u64,
    pub total_responses: u64,
    pub avg_completion_rate: f64,
    pub avg_rating: f64,
    pub by_sentiment: SentimentBuckets,
}

#[derive(Default)]
struct Tables {
    surveys: Vec<Survey>,
    responses: Vec<SurveyResponse>,
}

/// Surveys and their responses share one lock: cascade deletes and the
/// responses/avgRating counters stay consistent without cross-lock games.
#[derive(Default)]
pub struct SurveyStore {
    inner: RwLock<Tables>,
}

impl SurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Survey> {
        self.inner.read().surveys.clone()
    }

    pub fn get(&self, id: u64) -> Result<Survey, StoreError> {
        self.inner
            .read()
            .surveys
            .iter()
            .find(|survey| survey.id == id)
            .cloned()
            .ok_or(StoreError::NotFound("survey"))
    }

    pub fn create(&self, new: NewSurvey) -> Result<Survey, StoreError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(StoreError::InvalidInput(format!(
                "name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        let description = new.description.trim();
        if description.is_empty() {
            return Err(StoreError::InvalidInput(
                "description is required".to_string(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(StoreError::InvalidInput(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }

        let mut tables = self.inner.write();
        let survey = Survey {
            id: next_id(tables.surveys.iter().map(|survey| survey.id)),
            name: name.to_string(),
            description: description.to_string(),
            kind: new.kind,
            status: SurveyStatus::Draft,
            responses: 0,
            completion_rate: 0.0,
            avg_rating: 0.0,
            created_at: Utc::now().date_naive(),
            end_date: None,
            launched_at: None,
            closed_at: None,
            questions: new.questions.unwrap_or_default(),
        };
        tables.surveys.push(survey.clone());
        Ok(survey)
    }

    pub fn update(&self, id: u64, patch: SurveyPatch) -> Result<Survey, StoreError> {
        let mut tables = self.inner.write();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|survey| survey.id == id)
            .ok_or(StoreError::NotFound("survey"))?;
        if let Some(name) = patch.name {
            survey.name = name;
        }
        if let Some(description) = patch.description {
            survey.description = description;
        }
        if let Some(kind) = patch.kind {
            survey.kind = kind;
        }
        if let Some(status) = patch.status {
            survey.status = status;
        }
        if let Some(end_date) = patch.end_date {
            survey.end_date = end_date;
        }
        if let Some(completion_rate) = patch.completion_rate {
            survey.completion_rate = completion_rate;
        }
        if let Some(questions) = patch.questions {
            survey.questions = questions;
        }
        Ok(survey.clone())
    }

    pub fn delete(&self, id: u64) -> Result<Survey, StoreError> {
        let mut tables = self.inner.write();
        let position = tables
            .surveys
            .iter()
            .position(|survey| survey.id == id)
            .ok_or(StoreError::NotFound("survey"))?;
        let survey = tables.surveys.remove(position);
        tables.responses.retain(|response| response.survey_id != id);
        Ok(survey)
    }

    /// Repeated launches stay in `active` but refresh the timestamp.
    pub fn launch(&self, id: u64) -> Result<Survey, StoreError> {
        let mut tables = self.inner.write();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|survey| survey.id == id)
            .ok_or(StoreError::NotFound("survey"))?;
        survey.status = SurveyStatus::Active;
        survey.launched_at = Some(Utc::now());
        Ok(survey.clone())
    }

    pub fn close(&self, id: u64) -> Result<Survey, StoreError> {
        let mut tables = self.inner.write();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|survey| survey.id == id)
            .ok_or(StoreError::NotFound("survey"))?;
        survey.status = SurveyStatus::Closed;
        survey.closed_at = Some(Utc::now());
        Ok(survey.clone())
    }

    pub fn submit_response(
        &self,
        survey_id: u64,
        new: NewResponse,
    ) -> Result<SurveyResponse, StoreError> {
        let tables = &mut *self.inner.write();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|survey| survey.id == survey_id)
            .ok_or(StoreError::NotFound("survey"))?;
        let response = SurveyResponse {
            id: next_id(tables.responses.iter().map(|response| response.id)),
            survey_id,
            respondent: new.respondent.unwrap_or_else(|| "Anonymous".to_string()),
            rating: new.rating.unwrap_or(0.0),
            feedback: new.feedback.unwrap_or_default(),
            sentiment: new.sentiment.unwrap_or(Sentiment::Neutral),
            channel: new.channel.unwrap_or(Channel::Web),
            created_at: Utc::now(),
        };
        tables.responses.push(response.clone());
        recompute(survey, &tables.responses);
        Ok(response)
    }

    pub fn responses_for(&self, survey_id: u64) -> Vec<SurveyResponse> {
        self.inner
            .read()
            .responses
            .iter()
            .filter(|response| response.survey_id == survey_id)
            .cloned()
            .collect()
    }

    pub fn all_responses(&self) -> Vec<SurveyResponse> {
        self.inner.read().responses.clone()
    }

    /// Per-survey rollup. An unknown id yields all-zero buckets rather
    /// than an error.
    pub fn stats(&self, survey_id: u64) -> SurveyStats {
        let tables = self.inner.read();
        let mut stats = SurveyStats {
            total_responses: 0,
            avg_rating: 0.0,
            by_sentiment: SentimentBuckets::default(),
            by_channel: ChannelBuckets::default(),
        };
        let mut rating_sum = 0.0;
        for response in tables
            .responses
            .iter()
            .filter(|response| response.survey_id == survey_id)
        {
            stats.total_responses += 1;
            rating_sum += response.rating;
            bump_sentiment(&mut stats.by_sentiment, response.sentiment);
            match response.channel {
                Channel::Web => stats.by_channel.web += 1,
                Channel::Email => stats.by_channel.email += 1,
                Channel::Sms => stats.by_channel.sms += 1,
                Channel::Qr => stats.by_channel.qr += 1,
            }
        }
        if stats.total_responses > 0 {
            stats.avg_rating = round1(rating_sum / stats.total_responses as f64);
        }
        stats
    }

    pub fn search(&self, query: &str) -> Vec<Survey> {
        let needle = query.to_lowercase();
        self.inner
            .read()
            .surveys
            .iter()
            .filter(|survey| {
                survey.name.to_lowercase().contains(&needle)
                    || survey.description.to_lowercase().contains(&needle)
                    || survey.kind.as_str().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn dashboard_stats(&self) -> DashboardStats {
        let tables = self.inner.read();
        let survey_count = tables.surveys.len();
        let (avg_completion_rate, avg_rating) = if survey_count == 0 {
            (0.0, 0.0)
        } else {
            let n = survey_count as f64;
            (
                round1(tables.surveys.iter().map(|s| s.completion_rate).sum::<f64>() / n),
                round1(tables.surveys.iter().map(|s| s.avg_rating).sum::<f64>() / n),
            )
        };
        let mut by_sentiment = SentimentBuckets::default();
        for response in &tables.responses {
            bump_sentiment(&mut by_sentiment, response.sentiment);
        }
        DashboardStats {
            total_surveys: survey_count as u64,
            active_surveys: tables
                .surveys
                .iter()
                .filter(|survey| survey.status == SurveyStatus::Active)
                .count() as u64,
            total_responses: tables.responses.len() as u64,
            avg_completion_rate,
            avg_rating,
            by_sentiment,
        }
    }

    /// CSV export: one summary record for the survey, a blank line, then
    /// one record per response.
    pub fn export(&self, survey_id: u64) -> Result<String, StoreError> {
        let tables = self.inner.read();
        let survey = tables
            .surveys
            .iter()
            .find(|survey| survey.id == survey_id)
            .ok_or(StoreError::NotFound("survey"))?;

        let mut out = String::new();
        out.push_str("Survey ID,Name,Type,Status,Responses,Average Rating\n");
        out.push_str(&format!(
            "{},{},{},{},{},{}\n\n",
            survey.id,
            csv_field(&survey.name),
            survey.kind.as_str(),
            survey.status.as_str(),
            survey.responses,
            survey.avg_rating,
        ));
        out.push_str("Response ID,Respondent,Rating,Feedback,Sentiment,Channel,Submitted At\n");
        for response in tables
            .responses
            .iter()
            .filter(|response| response.survey_id == survey_id)
        {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                response.id,
                csv_field(&response.respondent),
                response.rating,
                csv_field(&response.feedback),
                response.sentiment.as_str(),
                response.channel.as_str(),
                response.created_at.to_rfc3339(),
            ));
        }
        Ok(out)
    }
}

fn recompute(survey: &mut Survey, responses: &[SurveyResponse]) {
    let ratings: Vec<f64> = responses
        .iter()
        .filter(|response| response.survey_id == survey.id)
        .map(|response| response.rating)
        .collect();
    survey.responses = ratings.len() as u64;
    survey.avg_rating = if ratings.is_empty() {
        0.0
    } else {
        round1(ratings.iter().sum::<f64>() / ratings.len() as f64)
    };
}

fn bump_sentiment(buckets: &mut SentimentBuckets, sentiment: Sentiment) {
    match sentiment {
        Sentiment::Positive => buckets.positive += 1,
        Sentiment::Neutral => buckets.neutral += 1,
        Sentiment::Negative => buckets.negative += 1,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
