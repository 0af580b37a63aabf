//! The generation workflow: Upload → Style → Generate → Edit → Download.
//!
//! [`WorkflowController`] owns the [`WorkflowSession`] and is the only thing
//! that writes to it. Every operation first asks the transition table
//! ([`transition`]) whether the current [`Stage`] permits the [`Action`];
//! if not, it returns [`WorkflowError::InvalidTransition`] without touching
//! anything.
//!
//! ## Backward moves keep forward data
//!
//! [`WorkflowController::go_back`] re-enters the previous stage but leaves
//! later-stage data alone, so Download → Edit → Download comes back to the
//! same selection. Data is only discarded when it is replaced:
//!
//! - a different upload (or removing a source image) clears artifacts and
//!   everything derived from them;
//! - submitting a style starts a new job, so the previous run's artifacts
//!   are dropped until it completes;
//! - a generation result different from the stored artifacts resets the
//!   edit state and download selection;
//! - [`WorkflowController::request_regeneration`] clears all of it outright.
//!
//! ## Jobs
//!
//! Entering Generate through [`submit_style`](WorkflowController::submit_style)
//! or [`request_regeneration`](WorkflowController::request_regeneration)
//! starts a job on the [`JobSource`]. Any live job is cancelled first, so a
//! session never has more than one. Backing out of Generate cancels it too.

use crate::adjust::{self, Adjustments, RenderDescriptor};
use crate::job::{GenerationRequest, JobError, JobHandle, JobSource, JobStatus};
use crate::selection::SelectionSet;
use crate::style::{Facet, StyleChoice};
use crate::types::{
    ArtifactRef, ExportFormat, ExportRequest, Resolution, SourceImage, UploadedImage,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {action} during the {stage} stage")]
    InvalidTransition { stage: Stage, action: Action },
    #[error("style is incomplete, missing: {}", join_facets(.0))]
    IncompleteSelection(Vec<Facet>),
    #[error("nothing is selected")]
    EmptySelection,
    #[error("upload contains no images")]
    EmptyUpload,
    #[error("generation produced no artifacts")]
    NoArtifacts,
    #[error("artifact index {index} out of range (have {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("no source image with id {0}")]
    UnknownImage(String),
}

fn join_facets(facets: &[Facet]) -> String {
    facets
        .iter()
        .map(Facet::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One discrete phase of the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Upload,
    Style,
    Generate,
    Edit,
    Download,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Upload,
        Stage::Style,
        Stage::Generate,
        Stage::Edit,
        Stage::Download,
    ];

    /// The stage before this one, `None` for Upload.
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Upload => None,
            Stage::Style => Some(Stage::Upload),
            Stage::Generate => Some(Stage::Style),
            Stage::Edit => Some(Stage::Generate),
            Stage::Download => Some(Stage::Edit),
        }
    }

    /// 1-based position in the pipeline.
    pub fn position(self) -> usize {
        match self {
            Stage::Upload => 1,
            Stage::Style => 2,
            Stage::Generate => 3,
            Stage::Edit => 4,
            Stage::Download => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Upload => "upload",
            Stage::Style => "style",
            Stage::Generate => "generate",
            Stage::Edit => "edit",
            Stage::Download => "download",
        })
    }
}

/// Everything a caller can ask the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SubmitUpload,
    RemoveImage,
    SubmitStyle,
    CompleteGeneration,
    CompleteEditing,
    GoBack,
    RequestRegeneration,
    Adjust,
    SelectDownloads,
    Export,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::SubmitUpload => "submit an upload",
            Action::RemoveImage => "remove an image",
            Action::SubmitStyle => "submit a style",
            Action::CompleteGeneration => "complete generation",
            Action::CompleteEditing => "complete editing",
            Action::GoBack => "go back",
            Action::RequestRegeneration => "regenerate",
            Action::Adjust => "edit artifacts",
            Action::SelectDownloads => "change the download selection",
            Action::Export => "export",
        })
    }
}

/// The transition table: the stage `action` leads to from `stage`, if allowed.
pub fn transition(stage: Stage, action: Action) -> Option<Stage> {
    use Action::*;
    match (stage, action) {
        (Stage::Upload, SubmitUpload) => Some(Stage::Style),
        (Stage::Upload, RemoveImage) => Some(Stage::Upload),
        (Stage::Style, SubmitStyle) => Some(Stage::Generate),
        (Stage::Generate, CompleteGeneration) => Some(Stage::Edit),
        (Stage::Edit, CompleteEditing) => Some(Stage::Download),
        (Stage::Edit, Adjust) => Some(Stage::Edit),
        (Stage::Edit | Stage::Download, RequestRegeneration) => Some(Stage::Generate),
        (Stage::Download, SelectDownloads | Export) => Some(Stage::Download),
        (_, GoBack) => stage.previous(),
        _ => None,
    }
}

/// Per-artifact adjustments plus the editor's favorites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditState {
    pub adjustments: Vec<Adjustments>,
    pub favorites: SelectionSet,
}

impl EditState {
    fn for_artifacts(count: usize) -> Self {
        Self {
            adjustments: vec![Adjustments::default(); count],
            favorites: SelectionSet::new(count),
        }
    }
}

/// The session's authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub session_id: Uuid,
    pub current_stage: Stage,
    pub source_images: Vec<SourceImage>,
    pub style_choice: StyleChoice,
    pub artifacts: Vec<ArtifactRef>,
    pub edit_state: EditState,
    pub download_selection: SelectionSet,
}

impl WorkflowSession {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            current_stage: Stage::Upload,
            source_images: Vec::new(),
            style_choice: StyleChoice::default(),
            artifacts: Vec::new(),
            edit_state: EditState::default(),
            download_selection: SelectionSet::default(),
        }
    }

    fn clear_generated(&mut self) {
        self.artifacts.clear();
        self.edit_state = EditState::default();
        self.download_selection = SelectionSet::default();
    }
}

/// Token binding an uploaded image to the session that owns it.
///
/// First 16 hex digits of `SHA-256("{session_id}:{image_id}")`.
pub fn ownership_token(session_id: Uuid, image_id: &str) -> String {
    let digest = Sha256::digest(format!("{session_id}:{image_id}").as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(16);
    hex
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generation {
    Idle,
    Running(JobHandle),
    /// A job finished and its artifacts were accepted.
    Finished,
}

/// Drives a [`WorkflowSession`] through the pipeline.
#[derive(Debug)]
pub struct WorkflowController<J: JobSource> {
    session: WorkflowSession,
    jobs: J,
    generation: Generation,
}

impl<J: JobSource> WorkflowController<J> {
    pub fn new(jobs: J) -> Self {
        Self::with_session_id(Uuid::new_v4(), jobs)
    }

    pub fn with_session_id(session_id: Uuid, jobs: J) -> Self {
        Self {
            session: WorkflowSession::new(session_id),
            jobs,
            generation: Generation::Idle,
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn stage(&self) -> Stage {
        self.session.current_stage
    }

    pub fn job_source(&self) -> &J {
        &self.jobs
    }

    /// Handle of the running generation job, if any.
    pub fn active_job(&self) -> Option<JobHandle> {
        match self.generation {
            Generation::Running(handle) => Some(handle),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Stage transitions
    // ------------------------------------------------------------------

    /// Store the uploaded images and move on to style selection.
    pub fn submit_upload(&mut self, images: Vec<UploadedImage>) -> Result<(), WorkflowError> {
        let next = self.check(Action::SubmitUpload)?;
        if images.is_empty() {
            return Err(WorkflowError::EmptyUpload);
        }
        let session_id = self.session.session_id;
        let sources: Vec<SourceImage> = images
            .into_iter()
            .map(|img| SourceImage {
                ownership_token: ownership_token(session_id, &img.id),
                id: img.id,
                display_url: img.display_url,
            })
            .collect();

        if sources != self.session.source_images {
            self.session.clear_generated();
            self.generation = Generation::Idle;
        }
        self.session.source_images = sources;
        self.enter(next);
        Ok(())
    }

    /// Drop one source image. Only allowed while uploading.
    pub fn remove_source_image(&mut self, id: &str) -> Result<SourceImage, WorkflowError> {
        self.check(Action::RemoveImage)?;
        let pos = self
            .session
            .source_images
            .iter()
            .position(|img| img.id == id)
            .ok_or_else(|| WorkflowError::UnknownImage(id.to_string()))?;
        let removed = self.session.source_images.remove(pos);
        self.session.clear_generated();
        self.generation = Generation::Idle;
        tracing::debug!(image = %removed.id, "source image removed");
        Ok(removed)
    }

    /// Store a complete style choice and start generating.
    ///
    /// Submitting again (after going back) replaces the previous choice and
    /// discards artifacts from the earlier run; the new job supplies them.
    pub fn submit_style(&mut self, choice: StyleChoice) -> Result<JobHandle, WorkflowError> {
        let next = self.check(Action::SubmitStyle)?;
        let missing = choice.missing_facets();
        if !missing.is_empty() {
            return Err(WorkflowError::IncompleteSelection(missing));
        }
        self.session.clear_generated();
        self.session.style_choice = choice;
        self.enter(next);
        Ok(self.start_job())
    }

    /// Status of the running generation job.
    ///
    /// Returns `None` when no job is running, including when the job
    /// source no longer knows the handle.
    pub fn poll_generation(&mut self) -> Option<JobStatus> {
        let handle = self.active_job()?;
        match self.jobs.poll(handle) {
            Ok(status) => Some(status),
            Err(JobError::StaleJob(stale)) => {
                tracing::debug!(job = %stale, "ignoring stale job");
                None
            }
        }
    }

    /// Accept the finished job's artifacts and move on to editing.
    ///
    /// `artifacts` must be exactly what the running job reported on
    /// completion, or, when re-entering from Edit, the artifacts already
    /// held by the session. Anything else is an invalid transition.
    pub fn complete_generation(&mut self, artifacts: Vec<ArtifactRef>) -> Result<(), WorkflowError> {
        let next = self.check(Action::CompleteGeneration)?;
        let produced = match self.generation {
            Generation::Finished => Some(self.session.artifacts.clone()),
            Generation::Running(handle) => match self.jobs.poll(handle) {
                Ok(status) if status.complete => Some(status.artifacts.unwrap_or_default()),
                Ok(_) | Err(JobError::StaleJob(_)) => None,
            },
            Generation::Idle => None,
        };
        let Some(produced) = produced else {
            return Err(self.rejected(Action::CompleteGeneration));
        };
        if artifacts.is_empty() {
            return Err(WorkflowError::NoArtifacts);
        }
        if artifacts != produced {
            tracing::warn!(
                offered = artifacts.len(),
                produced = produced.len(),
                "artifacts do not match the generation result"
            );
            return Err(self.rejected(Action::CompleteGeneration));
        }

        if let Generation::Running(handle) = self.generation {
            self.jobs.cancel(handle);
        }
        self.generation = Generation::Finished;

        if artifacts != self.session.artifacts {
            let count = artifacts.len();
            self.session.artifacts = artifacts;
            self.session.edit_state = EditState::for_artifacts(count);
            self.session.download_selection = SelectionSet::first_of(count);
        }
        self.enter(next);
        Ok(())
    }

    /// Finish editing. Artifacts are left exactly as generated.
    pub fn complete_editing(&mut self) -> Result<(), WorkflowError> {
        let next = self.check(Action::CompleteEditing)?;
        self.enter(next);
        Ok(())
    }

    /// Return to the previous stage, keeping forward data.
    pub fn go_back(&mut self) -> Result<Stage, WorkflowError> {
        let next = self.check(Action::GoBack)?;
        if self.stage() == Stage::Generate {
            self.cancel_job();
        }
        self.enter(next);
        Ok(next)
    }

    /// Throw away the generated artifacts and start a fresh job.
    pub fn request_regeneration(&mut self) -> Result<JobHandle, WorkflowError> {
        let next = self.check(Action::RequestRegeneration)?;
        self.cancel_job();
        self.session.clear_generated();
        self.enter(next);
        Ok(self.start_job())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn adjustments(&self, index: usize) -> Result<Adjustments, WorkflowError> {
        self.check_index(index)?;
        Ok(self.session.edit_state.adjustments[index])
    }

    pub fn set_adjustments(&mut self, index: usize, params: Adjustments) -> Result<(), WorkflowError> {
        self.check(Action::Adjust)?;
        self.check_index(index)?;
        self.session.edit_state.adjustments[index] = params;
        Ok(())
    }

    pub fn reset_adjustments(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.check(Action::Adjust)?;
        self.check_index(index)?;
        let slot = &mut self.session.edit_state.adjustments[index];
        *slot = slot.reset_adjustments();
        Ok(())
    }

    /// Flip whether artifact `index` is a favorite. Returns the new state.
    pub fn toggle_favorite(&mut self, index: usize) -> Result<bool, WorkflowError> {
        self.check(Action::Adjust)?;
        self.check_index(index)?;
        let favorites = &mut self.session.edit_state.favorites;
        favorites.toggle(index);
        Ok(favorites.contains(index))
    }

    /// Mark or unmark artifact `index` as a favorite. Repeating a call is a no-op.
    pub fn set_favorite(&mut self, index: usize, favorite: bool) -> Result<(), WorkflowError> {
        if self.session.edit_state.favorites.contains(index) != favorite {
            self.toggle_favorite(index)?;
        } else {
            self.check(Action::Adjust)?;
            self.check_index(index)?;
        }
        Ok(())
    }

    /// How artifact `index` should be displayed with its current adjustments.
    pub fn render(&self, index: usize) -> Result<RenderDescriptor, WorkflowError> {
        self.check_index(index)?;
        Ok(adjust::render(
            &self.session.artifacts[index],
            &self.session.edit_state.adjustments[index],
        ))
    }

    // ------------------------------------------------------------------
    // Download
    // ------------------------------------------------------------------

    /// Flip whether artifact `index` is in the download batch.
    pub fn toggle_download(&mut self, index: usize) -> Result<bool, WorkflowError> {
        self.check(Action::SelectDownloads)?;
        self.check_index(index)?;
        let selection = &mut self.session.download_selection;
        selection.toggle(index);
        Ok(selection.contains(index))
    }

    pub fn select_all_downloads(&mut self) -> Result<(), WorkflowError> {
        self.check(Action::SelectDownloads)?;
        let count = self.session.artifacts.len();
        self.session.download_selection.select_all(count);
        Ok(())
    }

    pub fn clear_downloads(&mut self) -> Result<(), WorkflowError> {
        self.check(Action::SelectDownloads)?;
        self.session.download_selection.clear();
        Ok(())
    }

    /// Replace the download batch with the editor's favorites.
    pub fn download_favorites(&mut self) -> Result<usize, WorkflowError> {
        self.check(Action::SelectDownloads)?;
        let favorites = &self.session.edit_state.favorites;
        if favorites.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        self.session.download_selection = favorites.clone();
        Ok(self.session.download_selection.count())
    }

    /// Package the download batch for the export collaborator.
    pub fn plan_export(
        &self,
        format: ExportFormat,
        resolution: Resolution,
    ) -> Result<Vec<ExportRequest>, WorkflowError> {
        self.check(Action::Export)?;
        let selection = &self.session.download_selection;
        if selection.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        selection
            .indices()
            .map(|index| {
                Ok(ExportRequest {
                    index,
                    artifact: self.session.artifacts[index].clone(),
                    format,
                    resolution,
                    render: self.render(index)?,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check(&self, action: Action) -> Result<Stage, WorkflowError> {
        transition(self.stage(), action).ok_or_else(|| self.rejected(action))
    }

    fn rejected(&self, action: Action) -> WorkflowError {
        let stage = self.stage();
        tracing::warn!(%stage, ?action, "transition rejected");
        WorkflowError::InvalidTransition { stage, action }
    }

    fn check_index(&self, index: usize) -> Result<(), WorkflowError> {
        let len = self.session.artifacts.len();
        if index >= len {
            return Err(WorkflowError::InvalidIndex { index, len });
        }
        Ok(())
    }

    fn enter(&mut self, next: Stage) {
        let from = self.session.current_stage;
        self.session.current_stage = next;
        if from != next {
            tracing::info!(%from, to = %next, "stage changed");
        }
    }

    fn cancel_job(&mut self) {
        if let Generation::Running(handle) = self.generation {
            self.jobs.cancel(handle);
            self.generation = Generation::Idle;
        }
    }

    fn start_job(&mut self) -> JobHandle {
        self.cancel_job();
        let request = GenerationRequest {
            sources: self.session.source_images.clone(),
            style: self.session.style_choice.clone(),
        };
        let handle = self.jobs.start(&request);
        self.generation = Generation::Running(handle);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::{MockJobSource, RecordedOp};

    fn uploads(n: usize) -> Vec<UploadedImage> {
        (0..n)
            .map(|i| UploadedImage::new(format!("img-{i}"), format!("blob:img-{i}")))
            .collect()
    }

    fn style() -> StyleChoice {
        StyleChoice::complete("female", "studio-white", "minimal", "soft")
    }

    fn controller() -> WorkflowController<MockJobSource> {
        WorkflowController::with_session_id(Uuid::nil(), MockJobSource::with_artifacts(3))
    }

    fn artifacts(n: usize) -> Vec<ArtifactRef> {
        (0..n)
            .map(|i| ArtifactRef::new(format!("mock://artifact/{i}")))
            .collect()
    }

    /// Controller sitting in Edit with three artifacts.
    fn in_edit() -> WorkflowController<MockJobSource> {
        let mut c = controller();
        c.submit_upload(uploads(2)).unwrap();
        c.submit_style(style()).unwrap();
        c.jobs.finish_all();
        c.complete_generation(artifacts(3)).unwrap();
        c
    }

    fn in_download() -> WorkflowController<MockJobSource> {
        let mut c = in_edit();
        c.complete_editing().unwrap();
        c
    }

    // =========================================================================
    // Transition table
    // =========================================================================

    #[test]
    fn table_allows_only_forward_chain_and_back() {
        assert_eq!(transition(Stage::Upload, Action::SubmitUpload), Some(Stage::Style));
        assert_eq!(transition(Stage::Style, Action::SubmitStyle), Some(Stage::Generate));
        assert_eq!(transition(Stage::Generate, Action::CompleteGeneration), Some(Stage::Edit));
        assert_eq!(transition(Stage::Edit, Action::CompleteEditing), Some(Stage::Download));
        assert_eq!(transition(Stage::Upload, Action::GoBack), None);
        assert_eq!(transition(Stage::Style, Action::SubmitUpload), None);
        assert_eq!(transition(Stage::Generate, Action::RequestRegeneration), None);
    }

    #[test]
    fn go_back_follows_previous_for_every_stage() {
        for stage in Stage::ALL {
            assert_eq!(transition(stage, Action::GoBack), stage.previous());
        }
    }

    #[test]
    fn stage_positions_are_sequential() {
        let positions: Vec<usize> = Stage::ALL.iter().map(|s| s.position()).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    // =========================================================================
    // Forward path
    // =========================================================================

    #[test]
    fn new_session_starts_at_upload() {
        let c = controller();
        assert_eq!(c.stage(), Stage::Upload);
        assert!(c.session().artifacts.is_empty());
        assert!(c.active_job().is_none());
    }

    #[test]
    fn upload_moves_to_style_and_assigns_tokens() {
        let mut c = controller();
        c.submit_upload(uploads(3)).unwrap();
        assert_eq!(c.stage(), Stage::Style);
        let sources = &c.session().source_images;
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[1].id, "img-1");
        assert_eq!(sources[1].ownership_token, ownership_token(Uuid::nil(), "img-1"));
        assert_eq!(sources[1].ownership_token.len(), 16);
    }

    #[test]
    fn empty_upload_is_rejected() {
        let mut c = controller();
        assert_eq!(c.submit_upload(Vec::new()), Err(WorkflowError::EmptyUpload));
        assert_eq!(c.stage(), Stage::Upload);
    }

    #[test]
    fn incomplete_style_is_rejected_with_missing_facets() {
        let mut c = controller();
        c.submit_upload(uploads(1)).unwrap();
        let mut choice = style();
        choice.background = None;
        assert_eq!(
            c.submit_style(choice),
            Err(WorkflowError::IncompleteSelection(vec![Facet::Background]))
        );
        assert_eq!(c.stage(), Stage::Style);
        assert_eq!(c.job_source().starts(), 0);
    }

    #[test]
    fn style_starts_a_job() {
        let mut c = controller();
        c.submit_upload(uploads(2)).unwrap();
        let handle = c.submit_style(style()).unwrap();
        assert_eq!(c.stage(), Stage::Generate);
        assert_eq!(c.active_job(), Some(handle));
        assert_eq!(
            c.job_source().operations[0],
            RecordedOp::Start {
                sources: 2,
                style: style()
            }
        );
    }

    #[test]
    fn completing_unfinished_job_is_invalid() {
        let mut c = controller();
        c.submit_upload(uploads(2)).unwrap();
        c.submit_style(style()).unwrap();
        let err = c.complete_generation(artifacts(3)).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { stage: Stage::Generate, .. }));
        assert_eq!(c.stage(), Stage::Generate);
        assert!(c.session().artifacts.is_empty());
    }

    #[test]
    fn completing_with_no_artifacts_is_rejected() {
        let mut c = controller();
        c.submit_upload(uploads(2)).unwrap();
        c.submit_style(style()).unwrap();
        c.jobs.finish_all();
        assert_eq!(c.complete_generation(Vec::new()), Err(WorkflowError::NoArtifacts));
        assert_eq!(c.stage(), Stage::Generate);
    }

    #[test]
    fn completing_generation_sets_up_edit_state() {
        let c = in_edit();
        let session = c.session();
        assert_eq!(session.current_stage, Stage::Edit);
        assert_eq!(session.artifacts.len(), 3);
        assert_eq!(session.edit_state.adjustments.len(), 3);
        assert!(session.edit_state.favorites.is_empty());
        assert_eq!(session.download_selection.indices().collect::<Vec<_>>(), vec![0]);
        assert!(c.active_job().is_none());
        assert!(c.job_source().live_jobs().is_empty());
    }

    #[test]
    fn complete_editing_keeps_artifacts() {
        let mut c = in_edit();
        c.set_adjustments(1, Adjustments::new(10, 0, 0, 0)).unwrap();
        let before = c.session().artifacts.clone();
        c.complete_editing().unwrap();
        assert_eq!(c.stage(), Stage::Download);
        assert_eq!(c.session().artifacts, before);
    }

    #[test]
    fn operations_out_of_stage_are_noops() {
        let mut c = controller();
        let before = c.session().clone();
        assert!(c.submit_style(style()).is_err());
        assert!(c.complete_editing().is_err());
        assert!(c.request_regeneration().is_err());
        assert!(c.go_back().is_err());
        assert!(c.toggle_download(0).is_err());
        assert_eq!(c.session(), &before);
    }

    // =========================================================================
    // Going back
    // =========================================================================

    #[test]
    fn back_from_generate_cancels_job() {
        let mut c = controller();
        c.submit_upload(uploads(1)).unwrap();
        let handle = c.submit_style(style()).unwrap();
        assert_eq!(c.go_back(), Ok(Stage::Style));
        assert!(c.active_job().is_none());
        assert!(c.job_source().operations.contains(&RecordedOp::Cancel(handle)));
        assert!(c.poll_generation().is_none());
    }

    #[test]
    fn back_then_forward_from_download_preserves_selection() {
        let mut c = in_download();
        c.toggle_download(2).unwrap();
        let before = c.session().clone();
        c.go_back().unwrap();
        assert_eq!(c.stage(), Stage::Edit);
        c.complete_editing().unwrap();
        assert_eq!(c.session(), &before);
    }

    #[test]
    fn back_then_forward_from_edit_preserves_edits() {
        let mut c = in_edit();
        c.set_adjustments(0, Adjustments::new(-20, 5, 5, 0)).unwrap();
        c.toggle_favorite(2).unwrap();
        let before = c.session().clone();
        c.go_back().unwrap();
        assert_eq!(c.stage(), Stage::Generate);
        c.complete_generation(artifacts(3)).unwrap();
        assert_eq!(c.session(), &before);
    }

    #[test]
    fn artifacts_must_match_job_output() {
        let mut c = controller();
        c.submit_upload(uploads(2)).unwrap();
        c.submit_style(style()).unwrap();
        c.jobs.finish_all();
        let err = c
            .complete_generation(vec![ArtifactRef::new("other://y")])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { stage: Stage::Generate, .. }));
        assert!(c.session().artifacts.is_empty());
        assert_eq!(c.stage(), Stage::Generate);

        // A partial subset is no better.
        assert!(c.complete_generation(artifacts(2)).is_err());
        c.complete_generation(artifacts(3)).unwrap();
        assert_eq!(c.session().artifacts, artifacts(3));
    }

    #[test]
    fn artifacts_cannot_be_replaced_after_edit() {
        let mut c = in_edit();
        c.toggle_favorite(0).unwrap();
        let before = c.session().clone();
        c.go_back().unwrap();
        let err = c
            .complete_generation(vec![ArtifactRef::new("other://x")])
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { stage: Stage::Generate, .. }));
        assert_eq!(c.session().artifacts, before.artifacts);
        assert!(c.session().edit_state.favorites.contains(0));

        c.complete_generation(artifacts(3)).unwrap();
        let mut expected = before;
        expected.current_stage = Stage::Edit;
        assert_eq!(c.session(), &expected);
    }

    #[test]
    fn different_style_discards_previous_artifacts() {
        let mut c = in_edit();
        c.go_back().unwrap(); // generate
        c.go_back().unwrap(); // style
        let other = StyleChoice::complete("male", "urban", "editorial", "dramatic");
        c.submit_style(other).unwrap();
        assert!(c.session().artifacts.is_empty());
        assert!(c.session().edit_state.adjustments.is_empty());
        assert!(c.session().download_selection.is_empty());
    }

    #[test]
    fn resubmitted_style_waits_for_new_artifacts() {
        let mut c = in_edit();
        c.go_back().unwrap();
        c.go_back().unwrap();
        c.submit_style(style()).unwrap();
        assert!(c.session().artifacts.is_empty());
        assert!(c.active_job().is_some());
        c.jobs.finish_all();
        c.complete_generation(artifacts(3)).unwrap();
        assert_eq!(c.session().artifacts, artifacts(3));
    }

    #[test]
    fn back_then_same_upload_preserves_downstream() {
        let mut c = in_edit();
        c.go_back().unwrap(); // generate
        c.go_back().unwrap(); // style
        c.go_back().unwrap(); // upload
        let before = c.session().clone();
        c.submit_upload(uploads(2)).unwrap();
        assert_eq!(c.session().artifacts, before.artifacts);
        assert_eq!(c.stage(), Stage::Style);
    }

    #[test]
    fn different_upload_clears_generated_data() {
        let mut c = in_edit();
        c.go_back().unwrap();
        c.go_back().unwrap();
        c.go_back().unwrap();
        c.submit_upload(uploads(4)).unwrap();
        assert!(c.session().artifacts.is_empty());
        assert!(c.session().edit_state.adjustments.is_empty());
        assert!(c.session().download_selection.is_empty());
    }

    #[test]
    fn remove_image_only_while_uploading() {
        let mut c = controller();
        c.submit_upload(uploads(3)).unwrap();
        assert!(matches!(
            c.remove_source_image("img-1"),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        c.go_back().unwrap();
        let removed = c.remove_source_image("img-1").unwrap();
        assert_eq!(removed.id, "img-1");
        let ids: Vec<&str> = c.session().source_images.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["img-0", "img-2"]);
        assert_eq!(
            c.remove_source_image("nope"),
            Err(WorkflowError::UnknownImage("nope".into()))
        );
    }

    #[test]
    fn resubmitting_style_replaces_choice_only() {
        let mut c = controller();
        c.submit_upload(uploads(3)).unwrap();
        c.submit_style(style()).unwrap();
        let sources = c.session().source_images.clone();
        c.go_back().unwrap();
        let other = StyleChoice::complete("male", "urban", "editorial", "dramatic");
        c.submit_style(other.clone()).unwrap();
        assert_eq!(c.session().style_choice, other);
        assert_eq!(c.session().source_images, sources);
        assert_eq!(c.job_source().live_jobs().len(), 1);
    }

    // =========================================================================
    // Regeneration
    // =========================================================================

    #[test]
    fn regeneration_from_download_clears_everything() {
        let mut c = in_download();
        let handle = c.request_regeneration().unwrap();
        let session = c.session();
        assert_eq!(session.current_stage, Stage::Generate);
        assert!(session.artifacts.is_empty());
        assert!(session.download_selection.is_empty());
        assert!(session.edit_state.favorites.is_empty());
        assert_eq!(c.active_job(), Some(handle));
        assert_eq!(c.job_source().starts(), 2);
    }

    #[test]
    fn regeneration_keeps_at_most_one_live_job() {
        let mut c = in_edit();
        c.request_regeneration().unwrap();
        c.go_back().unwrap();
        c.submit_style(style()).unwrap();
        assert_eq!(c.job_source().live_jobs().len(), 1);
    }

    #[test]
    fn stale_poll_is_swallowed() {
        let mut c = controller();
        c.submit_upload(uploads(1)).unwrap();
        let handle = c.submit_style(style()).unwrap();
        // The backend drops the job behind the controller's back.
        c.jobs.cancel(handle);
        assert!(c.poll_generation().is_none());
        assert!(c.complete_generation(artifacts(1)).is_err());
    }

    // =========================================================================
    // Editing and download
    // =========================================================================

    #[test]
    fn adjustments_are_per_artifact_and_resettable() {
        let mut c = in_edit();
        c.set_adjustments(1, Adjustments::new(30, 0, -10, 5)).unwrap();
        assert!(c.adjustments(0).unwrap().is_neutral());
        let rendered = c.render(1).unwrap();
        assert!((rendered.brightness_factor - 1.3).abs() < 1e-12);
        assert_eq!(rendered.source, artifacts(3)[1]);
        c.reset_adjustments(1).unwrap();
        assert!(c.adjustments(1).unwrap().is_neutral());
    }

    #[test]
    fn editing_rejects_bad_index() {
        let mut c = in_edit();
        assert_eq!(
            c.set_adjustments(3, Adjustments::default()),
            Err(WorkflowError::InvalidIndex { index: 3, len: 3 })
        );
        assert!(c.toggle_favorite(7).is_err());
    }

    #[test]
    fn adjustments_locked_outside_edit() {
        let mut c = in_download();
        assert!(matches!(
            c.set_adjustments(0, Adjustments::new(1, 1, 1, 1)),
            Err(WorkflowError::InvalidTransition { stage: Stage::Download, action: Action::Adjust })
        ));
    }

    #[test]
    fn favorites_feed_download_selection() {
        let mut c = in_edit();
        assert_eq!(c.toggle_favorite(1), Ok(true));
        assert_eq!(c.toggle_favorite(2), Ok(true));
        c.complete_editing().unwrap();
        assert_eq!(c.download_favorites(), Ok(2));
        let picked: Vec<usize> = c.session().download_selection.indices().collect();
        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn set_favorite_is_idempotent() {
        let mut c = in_edit();
        c.set_favorite(2, true).unwrap();
        c.set_favorite(2, true).unwrap();
        assert!(c.session().edit_state.favorites.contains(2));
        c.complete_editing().unwrap();
        assert_eq!(c.download_favorites(), Ok(1));
        assert!(c.set_favorite(0, true).is_err());
    }

    #[test]
    fn set_favorite_checks_index_and_can_unmark() {
        let mut c = in_edit();
        assert_eq!(
            c.set_favorite(3, false),
            Err(WorkflowError::InvalidIndex { index: 3, len: 3 })
        );
        c.set_favorite(1, true).unwrap();
        c.set_favorite(1, false).unwrap();
        c.set_favorite(1, false).unwrap();
        assert!(c.session().edit_state.favorites.is_empty());
    }

    #[test]
    fn download_favorites_without_favorites_is_empty_selection() {
        let mut c = in_download();
        assert_eq!(c.download_favorites(), Err(WorkflowError::EmptySelection));
        assert_eq!(c.session().download_selection.count(), 1);
    }

    #[test]
    fn export_plan_covers_selection_in_order() {
        let mut c = in_edit();
        c.set_adjustments(2, Adjustments::new(0, 0, 0, 25)).unwrap();
        c.complete_editing().unwrap();
        c.select_all_downloads().unwrap();
        c.toggle_download(1).unwrap();
        let plan = c.plan_export(ExportFormat::Webp, Resolution::FourK).unwrap();
        let indices: Vec<usize> = plan.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(plan[1].artifact, artifacts(3)[2]);
        assert_eq!(plan[1].render.sharpness, 25);
        assert!(plan.iter().all(|r| r.format == ExportFormat::Webp));
    }

    #[test]
    fn export_with_empty_selection_fails() {
        let mut c = in_download();
        c.clear_downloads().unwrap();
        assert_eq!(
            c.plan_export(ExportFormat::Png, Resolution::Original),
            Err(WorkflowError::EmptySelection)
        );
    }

    #[test]
    fn error_messages_read_naturally() {
        let err = WorkflowError::InvalidTransition {
            stage: Stage::Upload,
            action: Action::GoBack,
        };
        assert_eq!(err.to_string(), "cannot go back during the upload stage");
        let err = WorkflowError::IncompleteSelection(vec![Facet::ModelType, Facet::Lighting]);
        assert_eq!(err.to_string(), "style is incomplete, missing: model type, lighting");
    }

    #[test]
    fn ownership_token_is_stable_per_session() {
        let a = ownership_token(Uuid::nil(), "img-0");
        assert_eq!(a, ownership_token(Uuid::nil(), "img-0"));
        assert_ne!(a, ownership_token(Uuid::nil(), "img-1"));
        assert_ne!(a, ownership_token(Uuid::from_u128(1), "img-0"));
    }
}
