use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};
use wisestudy_contracts::analysis::AnalysisResult;
use wisestudy_contracts::events::EventWriter;
use wisestudy_contracts::state::{AppState, InvalidTransition, StateEvent};
use wisestudy_contracts::upload::{check_media_type, media_type_for_path, UploadRejected, UploadedFile};

use crate::client::AnalysisClient;
use crate::error::AnalysisError;
use crate::normalize::normalize_upload;

/// Owns the single [`AppState`] and drives one analysis at a time.
///
/// Pipeline per submission: accept → read → normalize → request → validate.
pub struct AnalysisSession {
    state: AppState,
    client: AnalysisClient,
    events: Option<EventWriter>,
}

impl AnalysisSession {
    pub fn new(client: AnalysisClient) -> Self {
        Self {
            state: AppState::Idle,
            client,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Submits a local file. The media type comes from the extension and is
    /// checked before the file is read.
    pub fn submit_path(&mut self, path: &Path) -> Result<&AppState, UploadRejected> {
        let media_type = media_type_for_path(path);
        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.accept(&name, media_type)?;
        self.begin(&name, media_type);

        let outcome = fs::read(path)
            .map_err(|source| AnalysisError::InputRead {
                path: path.display().to_string(),
                source,
            })
            .and_then(|bytes| self.run_pipeline(&UploadedFile::new(name, media_type, bytes)));
        self.settle(outcome);
        Ok(&self.state)
    }

    /// Submits an in-memory upload.
    pub fn submit(&mut self, file: UploadedFile) -> Result<&AppState, UploadRejected> {
        self.accept(&file.name, &file.media_type)?;
        self.begin(&file.name, &file.media_type);
        let outcome = self.run_pipeline(&file);
        self.settle(outcome);
        Ok(&self.state)
    }

    /// Clears the current result or error. Refused while analyzing.
    pub fn reset(&mut self) -> Result<(), InvalidTransition> {
        let previous = self.state.name();
        self.state.apply(StateEvent::Reset)?;
        self.emit("session_reset", json!({ "previous_state": previous }));
        Ok(())
    }

    fn accept(&self, name: &str, media_type: &str) -> Result<(), UploadRejected> {
        let checked = if self.state.is_analyzing() {
            Err(UploadRejected::Busy)
        } else {
            check_media_type(media_type).map(|_| ())
        };
        if let Err(rejection) = &checked {
            tracing::warn!(name, media_type, "upload rejected: {rejection}");
            self.emit(
                "upload_rejected",
                json!({ "name": name, "media_type": media_type, "reason": rejection.kind() }),
            );
        }
        checked
    }

    fn begin(&mut self, name: &str, media_type: &str) {
        // `accept` already refused the only invalid source state.
        if let Err(err) = self.state.apply(StateEvent::Submit) {
            tracing::error!("{err}");
            return;
        }
        self.emit(
            "analysis_started",
            json!({ "name": name, "media_type": media_type }),
        );
    }

    fn run_pipeline(&self, file: &UploadedFile) -> Result<AnalysisResult, AnalysisError> {
        let payload = normalize_upload(file);
        self.emit(
            "payload_normalized",
            json!({
                "outcome": payload.outcome.as_str(),
                "mime_type": payload.mime_type,
                "original_bytes": file.bytes.len(),
                "payload_bytes": payload.byte_len(),
                "width": payload.dimensions.map(|(width, _)| width),
                "height": payload.dimensions.map(|(_, height)| height),
            }),
        );
        self.client.analyze(&payload)
    }

    fn settle(&mut self, outcome: Result<AnalysisResult, AnalysisError>) {
        let (event, log_type, log_payload) = match outcome {
            Ok(result) => {
                let payload = json!({
                    "weaknesses": result.weaknesses.len(),
                    "plan_items": result.plan.len(),
                    "mistakes": result.mistakes.len(),
                });
                (StateEvent::Succeed(result), "analysis_succeeded", payload)
            }
            Err(err) => {
                tracing::error!(kind = err.kind(), "analysis failed: {err}");
                let message = err.user_message();
                let payload = json!({ "kind": err.kind(), "message": message });
                (StateEvent::Fail(message), "analysis_failed", payload)
            }
        };
        if let Err(err) = self.state.apply(event) {
            tracing::error!("{err}");
            return;
        }
        self.emit(log_type, log_payload);
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: Map<String, Value> = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Err(err) = events.emit(event_type, payload) {
            tracing::warn!("failed writing {event_type} event: {err:#}");
        }
    }

    #[cfg(test)]
    fn force_state(&mut self, state: AppState) {
        self.state = state;
    }
}
