//! Wire payload types matching the calendar client's contracts.
//!
//! Field names are the exact Portuguese keys the front-end sends
//! (`cliente_id`, `data_visita`, `recorrencia`, ...). Conversion into the
//! typed domain model happens here, once, at the boundary: a malformed
//! recurrence payload is rejected before anything is stored or expanded.

use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::mutation::MutationScope;
use crate::schedule::types::{
    Frequency, RecurrenceEnd, RecurrenceRule, Tag, Visit, VisitStatus,
};

/// Visit creation payload, as posted by the event form.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VisitPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente_id: Option<i64>,
    /// Zone-less local start, `YYYY-MM-DDTHH:mm`.
    pub data_visita: String,
    pub preco: f64,
    #[serde(default)]
    pub descricao: String,
    /// Status wire string (`pendente_visita`, `pendente_recebimento`,
    /// `pago`, `cancelado`).
    pub status: String,
    /// Attachment references.
    #[serde(default)]
    pub anexos: Vec<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Legacy recurrence flag (0/1); the rule itself is authoritative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recorrente: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorrencia: Option<RecurrencePayload>,
}

impl VisitPayload {
    /// Convert into a validated domain visit. The id is left for the store
    /// to assign.
    pub fn into_visit(self) -> Result<Visit, ValidationError> {
        let start = parse_local_datetime(&self.data_visita)?;
        let status = VisitStatus::parse(&self.status)?;

        let recurrence = match self.recorrencia {
            Some(payload) => Some(payload.into_rule(start.date())?),
            None => None,
        };

        let mut visit = Visit::new(start)
            .with_price(self.preco)
            .with_description(self.descricao)
            .with_status(status);
        if let Some(cliente_id) = self.cliente_id {
            visit = visit.with_client(cliente_id);
        }
        if let Some(rule) = recurrence {
            visit = visit.with_recurrence(rule);
        }
        visit.tags = self.tags;
        visit.attachments = self.anexos;
        Ok(visit)
    }
}

/// Recurrence form state, as posted inside `recorrencia`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecurrencePayload {
    /// Frequency token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervalo: Option<u32>,
    /// Weekday indices as strings, "0" (Sunday) through "6" (Saturday).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dias_semana: Option<Vec<String>>,
    /// Termination type: `nunca`, `data`, or `quantidade`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fim_tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fim_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fim_qtd: Option<u32>,
}

impl RecurrencePayload {
    /// Convert into a validated rule, anchored on the series start date.
    pub fn into_rule(self, series_start: NaiveDate) -> Result<RecurrenceRule, ValidationError> {
        let freq = self
            .freq
            .ok_or_else(|| ValidationError::MissingField("recorrencia.freq".to_string()))?;
        let frequency = parse_frequency(&freq)?;

        let weekdays = match self.dias_semana {
            Some(days) => days
                .iter()
                .map(|d| {
                    d.parse::<u8>()
                        .map_err(|_| ValidationError::InvalidWeekday(d.clone()))
                })
                .collect::<Result<Vec<u8>, _>>()?,
            None => Vec::new(),
        };

        let end = match self.fim_tipo.as_deref() {
            None | Some("nunca") => RecurrenceEnd::Never,
            Some("data") => {
                let raw = self
                    .fim_data
                    .ok_or_else(|| ValidationError::MissingField("recorrencia.fim_data".to_string()))?;
                let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDate(raw))?;
                RecurrenceEnd::Until { date }
            }
            Some("quantidade") => {
                let count = self.fim_qtd.ok_or_else(|| {
                    ValidationError::MissingField("recorrencia.fim_qtd".to_string())
                })?;
                RecurrenceEnd::Count { count }
            }
            Some(other) => return Err(ValidationError::UnknownEndType(other.to_string())),
        };

        let rule = RecurrenceRule {
            frequency,
            interval: self.intervalo.unwrap_or(1),
            weekdays,
            end,
        };
        rule.validate(series_start)?;
        Ok(rule)
    }
}

/// Deletion request, as sent against `DELETE /visita/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteVisitRequest {
    #[serde(rename = "visitaId")]
    pub visita_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<MutationScope>,
    /// Occurrence date, required when `scope = single` on a recurring
    /// series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_instancia: Option<NaiveDate>,
}

/// Parse the calendar client's zone-less local datetime
/// (`YYYY-MM-DDTHH:mm`, seconds tolerated).
pub fn parse_local_datetime(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// The frequency tokens the form may send. Both the Portuguese labels and
/// the English rule names are accepted.
fn parse_frequency(token: &str) -> Result<Frequency, ValidationError> {
    match token {
        "daily" | "diaria" => Ok(Frequency::Daily),
        "weekly" | "semanal" => Ok(Frequency::Weekly),
        "monthly" | "mensal" => Ok(Frequency::Monthly),
        "yearly" | "anual" => Ok(Frequency::Yearly),
        other => Err(ValidationError::UnknownFrequency(other.to_string())),
    }
}
