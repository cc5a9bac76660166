//! Workflow execution implementation.

use super::guard::{ArtifactGuard, CleanupReport};
use super::types::{BracketOutcome, BracketReport, CancellationToken, RunReport};
use super::workarea::WorkArea;
use crate::core::bracket::{BracketDetector, Stack, StackCollection};
use crate::core::conflict::{ConflictAction, ConflictPolicy, ConflictResolver};
use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::naming::{self, ArtifactKind};
use crate::core::photo::Photo;
use crate::core::scanner::{PhotoScanner, ScanConfig, ScanResult, WalkDirScanner};
use crate::core::stages::{
    AlignPlan, AlignStage, CommandRunner, ConvertStage, DarktableConverter, DryRunRunner,
    EnfuseFuser, FuseStage, HuginAligner, SystemCommandRunner, ToolConfig, MIN_FUSE_INPUTS,
};
use crate::error::{HdrError, StageError};
use crate::events::{
    null_sender, BracketEvent, BracketStage, Event, EventSender, PipelineEvent, PipelinePhase,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Configuration for a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Directory holding the RAW photos
    pub base_path: PathBuf,
    /// RAW extension to collect, without the dot
    pub raw_extension: String,
    /// Applied to the HDR output and to every intermediate
    pub policy: ConflictPolicy,
    /// Log external commands and deletions instead of performing them
    pub dry_run: bool,
    /// Brackets processed at the same time
    pub workers: usize,
    /// Smallest run of exposures treated as a bracket
    pub min_stack_size: usize,
    pub include_hidden: bool,
    pub tools: ToolConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::new(),
            raw_extension: "arw".to_string(),
            policy: ConflictPolicy::default(),
            dry_run: false,
            workers: 1,
            min_stack_size: 2,
            include_hidden: false,
            tools: ToolConfig::default(),
        }
    }
}

/// Builder for workflow configuration
pub struct HdrWorkflowBuilder {
    config: WorkflowConfig,
    runner: Option<Arc<dyn CommandRunner>>,
    reader: Option<Arc<dyn MetadataReader>>,
    cancel: Option<CancellationToken>,
}

impl HdrWorkflowBuilder {
    pub fn new() -> Self {
        Self {
            config: WorkflowConfig::default(),
            runner: None,
            reader: None,
            cancel: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_path = path.into();
        self
    }

    pub fn raw_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.raw_extension = extension.into();
        self
    }

    pub fn policy(mut self, policy: ConflictPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn min_stack_size(mut self, size: usize) -> Self {
        self.config.min_stack_size = size;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    pub fn tools(mut self, tools: ToolConfig) -> Self {
        self.config.tools = tools;
        self
    }

    /// Run external programs through `runner` instead of spawning them.
    /// Ignored in dry-run mode, where nothing is executed.
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Read photo metadata through `reader` instead of EXIF
    pub fn metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the configuration and build the workflow
    pub fn build(self) -> Result<HdrWorkflow, HdrError> {
        let mut config = self.config;

        if config.base_path.as_os_str().is_empty() {
            return Err(HdrError::Config("a base directory is required".to_string()));
        }
        if config.workers == 0 {
            return Err(HdrError::Config("worker count must be at least 1".to_string()));
        }
        if config.min_stack_size < MIN_FUSE_INPUTS {
            return Err(HdrError::Config(format!(
                "minimum stack size must be at least {}",
                MIN_FUSE_INPUTS
            )));
        }
        config.raw_extension = config.raw_extension.trim_start_matches('.').to_string();
        if config.raw_extension.is_empty() {
            return Err(HdrError::Config("RAW extension must not be empty".to_string()));
        }

        let runner: Arc<dyn CommandRunner> = if config.dry_run {
            Arc::new(DryRunRunner)
        } else {
            self.runner.unwrap_or_else(|| Arc::new(SystemCommandRunner))
        };
        let reader = self.reader.unwrap_or_else(|| Arc::new(ExifMetadataReader));

        let scanner = WalkDirScanner::with_reader(
            ScanConfig {
                raw_extension: config.raw_extension.clone(),
                include_hidden: config.include_hidden,
            },
            reader,
        );

        Ok(HdrWorkflow {
            work_area: WorkArea::new(&config.base_path, config.dry_run),
            resolver: ConflictResolver::new(config.policy).dry_run(config.dry_run),
            detector: BracketDetector::new(config.min_stack_size),
            scanner,
            converter: Box::new(
                DarktableConverter::new(runner.clone(), &config.tools).dry_run(config.dry_run),
            ),
            aligner: Box::new(
                HuginAligner::new(runner.clone(), &config.tools).dry_run(config.dry_run),
            ),
            fuser: Box::new(EnfuseFuser::new(runner, &config.tools).dry_run(config.dry_run)),
            cancel: self.cancel.unwrap_or_default(),
            config,
        })
    }
}

impl Default for HdrWorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns every exposure bracket in a directory into one HDR image
pub struct HdrWorkflow {
    config: WorkflowConfig,
    work_area: WorkArea,
    resolver: ConflictResolver,
    detector: BracketDetector,
    scanner: WalkDirScanner,
    converter: Box<dyn ConvertStage>,
    aligner: Box<dyn AlignStage>,
    fuser: Box<dyn FuseStage>,
    cancel: CancellationToken,
}

impl HdrWorkflow {
    pub fn builder() -> HdrWorkflowBuilder {
        HdrWorkflowBuilder::new()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// `<base>/hdr`, where HDR images are written
    pub fn hdr_path(&self) -> &Path {
        self.work_area.hdr_dir()
    }

    pub fn tiff_path(&self) -> &Path {
        self.work_area.tiff_dir()
    }

    pub fn aligned_path(&self) -> &Path {
        self.work_area.aligned_dir()
    }

    /// A token that stops this workflow between brackets
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// List the RAW photos of the base directory
    pub fn scan(&self, events: &EventSender) -> Result<ScanResult, HdrError> {
        Ok(self.scanner.scan_with_events(&self.config.base_path, events)?)
    }

    pub fn find_brackets(&self, photos: &[Photo]) -> StackCollection {
        self.detector.find_brackets(photos)
    }

    /// Run without events
    pub fn run(&self) -> Result<RunReport, HdrError> {
        self.run_with_events(&null_sender())
    }

    /// Scan, detect, and process every bracket.
    ///
    /// Only a missing base directory or an unusable working folder is an
    /// `Err`; bracket failures are reported in the [`RunReport`].
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunReport, HdrError> {
        let start = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        phase(events, PipelinePhase::Scanning);
        let scan = self.scan(events)?;

        phase(events, PipelinePhase::Detecting);
        let stacks = self.find_brackets(&scan.photos);
        events.send(Event::Bracket(BracketEvent::Detected {
            total_brackets: stacks.len(),
            total_photos: stacks.total_photos(),
        }));
        tracing::info!(
            photos = scan.photos.len(),
            brackets = stacks.len(),
            "Bracket detection finished"
        );

        let mut report = RunReport {
            photos_scanned: scan.photos.len(),
            brackets_found: stacks.len(),
            scan_errors: scan.errors.iter().map(ToString::to_string).collect(),
            ..Default::default()
        };

        if stacks.is_empty() {
            tracing::warn!(path = %self.config.base_path.display(), "No brackets found");
        } else {
            phase(events, PipelinePhase::Processing);
            self.work_area.prepare()?;

            report.brackets = self.process_all(&stacks, events)?;
            report.cancelled = report.brackets.len() < stacks.len();
            report.hdrs = report
                .brackets
                .iter()
                .filter_map(|b| b.hdr().cloned())
                .collect();

            phase(events, PipelinePhase::Tidying);
            report.kept_dirs = self.work_area.tidy();
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        if report.cancelled {
            tracing::warn!(
                attempted = report.attempted(),
                found = report.brackets_found,
                "Run cancelled"
            );
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: report.summary(),
        }));

        Ok(report)
    }

    fn process_all(
        &self,
        stacks: &StackCollection,
        events: &EventSender,
    ) -> Result<Vec<BracketReport>, HdrError> {
        if self.config.workers == 1 {
            return Ok(stacks
                .iter()
                .enumerate()
                .filter_map(|(i, stack)| self.process_unless_cancelled(i + 1, stack, events))
                .collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| HdrError::Config(format!("could not start worker pool: {}", e)))?;

        let reports: Vec<Option<BracketReport>> = pool.install(|| {
            stacks
                .as_slice()
                .par_iter()
                .enumerate()
                .map(|(i, stack)| self.process_unless_cancelled(i + 1, stack, events))
                .collect()
        });

        Ok(reports.into_iter().flatten().collect())
    }

    fn process_unless_cancelled(
        &self,
        index: usize,
        stack: &Stack,
        events: &EventSender,
    ) -> Option<BracketReport> {
        if self.cancel.is_cancelled() {
            tracing::debug!(bracket = index, "Not starting bracket after cancellation");
            return None;
        }
        Some(self.process_bracket_with_events(index, stack, events))
    }

    /// Process one bracket without events
    pub fn process_bracket(&self, index: usize, stack: &Stack) -> BracketReport {
        self.process_bracket_with_events(index, stack, &null_sender())
    }

    /// Name, convert, align and fuse one bracket, then delete its
    /// intermediates whatever happened.
    ///
    /// `index` is 1-based and keeps the aligner's temporary files of
    /// concurrent brackets apart.
    pub fn process_bracket_with_events(
        &self,
        index: usize,
        stack: &Stack,
        events: &EventSender,
    ) -> BracketReport {
        let first = stack.first().filename();
        events.send(Event::Bracket(BracketEvent::Started {
            index,
            size: stack.len(),
            name: first.clone(),
        }));

        let mut cleanup = CleanupReport::default();
        let outcome = match self.resolve_output(index, stack, events) {
            Err(e) => BracketOutcome::Failed {
                reason: e.to_string(),
            },
            Ok((existing, ConflictAction::Skip)) => {
                BracketOutcome::Existing(Photo::derived(existing, stack.first()))
            }
            Ok((_, ConflictAction::ProceedAt(output))) => {
                let mut guard = ArtifactGuard::new(index, self.config.dry_run);
                let result = self.run_stages(index, stack, &output, &mut guard, events);

                stage(events, index, BracketStage::CleaningUp);
                cleanup = guard.finish();

                match result {
                    Ok(hdr) => BracketOutcome::Created(hdr),
                    Err(e) => BracketOutcome::Failed {
                        reason: e.to_string(),
                    },
                }
            }
        };

        match &outcome {
            BracketOutcome::Created(hdr) => {
                tracing::info!(bracket = index, output = %hdr.path().display(), "Created HDR");
                events.send(Event::Bracket(BracketEvent::Completed {
                    index,
                    output: hdr.path().to_path_buf(),
                }));
            }
            BracketOutcome::Existing(hdr) => {
                tracing::info!(bracket = index, existing = %hdr.path().display(), "HDR exists, skipping");
                events.send(Event::Bracket(BracketEvent::Skipped {
                    index,
                    existing: hdr.path().to_path_buf(),
                }));
            }
            BracketOutcome::Failed { reason } => {
                tracing::error!(bracket = index, first = %first, reason = %reason, "Bracket failed");
                events.send(Event::Bracket(BracketEvent::Failed {
                    index,
                    reason: reason.clone(),
                }));
            }
        }

        BracketReport {
            index,
            size: stack.len(),
            first,
            outcome,
            cleanup,
        }
    }

    /// Name the HDR before any work so conflicts surface early
    fn resolve_output(
        &self,
        index: usize,
        stack: &Stack,
        events: &EventSender,
    ) -> Result<(PathBuf, ConflictAction), HdrError> {
        stage(events, index, BracketStage::Named);
        let desired = self
            .hdr_path()
            .join(naming::name_hdr(stack.photos(), self.hdr_path())?);
        tracing::info!(
            bracket = index,
            size = stack.len(),
            output = %desired.display(),
            "Processing bracket"
        );
        let action = self.resolver.resolve(&desired)?;

        // A `_NN` suffix can push a long name past the limit name_hdr checked
        if let ConflictAction::ProceedAt(path) = &action {
            if path.as_os_str().len() > naming::MAX_PATH_LENGTH {
                let short = self
                    .hdr_path()
                    .join(naming::short_hdr_name(stack.photos())?);
                tracing::info!(
                    bracket = index,
                    renamed = %path.display(),
                    output = %short.display(),
                    "Renamed HDR path too long, using short form"
                );
                let action = self.resolver.resolve(&short)?;
                return Ok((short, action));
            }
        }
        Ok((desired, action))
    }

    fn run_stages(
        &self,
        index: usize,
        stack: &Stack,
        output: &Path,
        guard: &mut ArtifactGuard,
        events: &EventSender,
    ) -> Result<Photo, HdrError> {
        let tiff_dir = self.work_area.tiff_dir();
        let aligned_dir = self.work_area.aligned_dir();

        stage(events, index, BracketStage::Converting);
        let mut converted = Vec::with_capacity(stack.len());
        for photo in stack {
            let path = match self.resolver.resolve(&naming::converted_path(tiff_dir, photo))? {
                ConflictAction::ProceedAt(path) => path,
                ConflictAction::Skip => {
                    tracing::info!(bracket = index, photo = %photo.filename(), "Converted file exists, leaving photo out");
                    continue;
                }
            };
            guard.register(&path, ArtifactKind::Converted, tiff_dir);
            converted.push((photo, self.converter.convert(photo, &path)?));
        }

        stage(events, index, BracketStage::Aligning);
        let mut inputs = Vec::with_capacity(converted.len());
        let mut targets = Vec::with_capacity(converted.len());
        for (raw, tiff) in converted {
            match self.resolver.resolve(&naming::aligned_path(aligned_dir, raw))? {
                ConflictAction::ProceedAt(path) => {
                    inputs.push(tiff);
                    targets.push(path);
                }
                ConflictAction::Skip => {
                    tracing::info!(bracket = index, photo = %raw.filename(), "Aligned file exists, leaving photo out");
                }
            }
        }
        if inputs.len() < MIN_FUSE_INPUTS {
            return Err(StageError::NotEnoughInputs {
                stage: "align",
                found: inputs.len(),
                required: MIN_FUSE_INPUTS,
            }
            .into());
        }

        let plan = AlignPlan::new(naming::aligner_prefix(aligned_dir, index), targets);
        for path in plan.tool_outputs() {
            guard.register(&path, ArtifactKind::AlignerOutput, aligned_dir);
        }
        for path in &plan.targets {
            guard.register(path, ArtifactKind::Aligned, aligned_dir);
        }

        let aligned = self.aligner.align(&inputs, &plan)?;
        if aligned.is_empty() {
            return Err(StageError::NoOutput { stage: "align" }.into());
        }

        stage(events, index, BracketStage::Fusing);
        self.fuser
            .fuse(&aligned, output)?
            .ok_or_else(|| StageError::NoOutput { stage: "fuse" }.into())
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

fn stage(events: &EventSender, index: usize, stage: BracketStage) {
    events.send(Event::Bracket(BracketEvent::StageChanged { index, stage }));
}
