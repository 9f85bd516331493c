// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The static stage table the controller wires a pipeline from.
//!
//! A topology is built once, either from a loaded [`Config`] or in code
//! with [`TopologyBuilder`], and never changes while the pipeline runs.
//! Enabling or disabling a stage is a data change here, not a code path.

use std::path::PathBuf;

use crate::config::consts::{DEFAULT_OUTPUT_SOURCE, ORCHESTRATION_SOURCE, STORAGE_SOURCE};
use crate::config::{Config, StageConfig, StageTuning};
use crate::engine::WorkerOptions;
use crate::events::payload::keys;
use crate::events::DetailType;
use crate::queue::QueueOptions;
use crate::routing::{EventPattern, Matcher};

/// Everything needed to run one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDefinition {
    pub name: String,
    pub enabled: bool,
    /// Name the handler is registered under in the `HandlerMap`
    pub handler: String,
    pub output_detail_type: DetailType,
    pub inputs: Vec<EventPattern>,
    pub queue_name: String,
    pub queue: QueueOptions,
    pub worker: WorkerOptions,
    pub secrets: Vec<String>,
}

impl StageDefinition {
    /// An enabled stage whose handler and queue share its name.
    pub fn new(name: impl Into<String>, output_detail_type: impl Into<DetailType>) -> Self {
        let name = name.into();
        Self {
            handler: name.clone(),
            queue_name: name.clone(),
            name,
            enabled: true,
            output_detail_type: output_detail_type.into(),
            inputs: Vec::new(),
            queue: QueueOptions::default(),
            worker: WorkerOptions::default(),
            secrets: Vec::new(),
        }
    }

    pub fn from_config(stage: &StageConfig, defaults: &StageTuning, queue_name: String) -> Self {
        let tuning = stage.overrides.or(defaults);
        Self {
            name: stage.name.clone(),
            enabled: stage.enabled,
            handler: stage.get_handler().to_string(),
            output_detail_type: stage.output_detail_type.clone(),
            inputs: stage.inputs.clone(),
            queue_name,
            queue: QueueOptions {
                retention: tuning.get_retention(),
                max_receive_count: tuning.get_max_receive_count(),
            },
            worker: WorkerOptions {
                workers: tuning.get_workers(),
                visibility_timeout: tuning.get_visibility_timeout(),
                handler_timeout: tuning.get_handler_timeout(),
                poll_interval: tuning.get_poll_interval(),
                max_poll_interval: tuning.get_max_poll_interval(),
            },
            secrets: stage.secrets.clone(),
        }
    }

    pub fn input(mut self, pattern: EventPattern) -> Self {
        self.inputs.push(pattern);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = handler.into();
        self
    }

    pub fn queue_name(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = queue_name.into();
        self
    }

    pub fn queue_options(mut self, options: QueueOptions) -> Self {
        self.queue = options;
        self
    }

    pub fn worker_options(mut self, options: WorkerOptions) -> Self {
        self.worker = options;
        self
    }

    pub fn secrets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets = names.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    output_source: String,
    dead_letter_path: Option<PathBuf>,
    stages: Vec<StageDefinition>,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    pub fn from_config(cfg: &Config) -> Self {
        let stages = cfg
            .stages
            .iter()
            .map(|stage| {
                StageDefinition::from_config(stage, &cfg.defaults, cfg.naming.queue_name(&stage.name))
            })
            .collect();
        Self {
            output_source: cfg.get_output_source().to_string(),
            dead_letter_path: cfg.dead_letter.path.clone(),
            stages,
        }
    }

    /// The six-stage document pipeline, watching `bucket` for keys under
    /// `key_prefix`.
    ///
    /// Standardization fans out to summary always, and to seed questions or
    /// feature extraction only when the document asked for them.
    pub fn standard(bucket: &str, key_prefix: &str) -> Self {
        let completed = |kind: DetailType| {
            EventPattern::new()
                .source([DEFAULT_OUTPUT_SOURCE])
                .detail_type([kind])
        };

        Topology::builder()
            .stage(
                StageDefinition::new("document_extraction", DetailType::DocumentExtractionCompleted)
                    .input(
                        EventPattern::new()
                            .source([STORAGE_SOURCE])
                            .detail_type([DetailType::ObjectCreated])
                            .with("detail.bucket.name", vec![Matcher::exact(bucket)])
                            .with("detail.object.key", vec![Matcher::prefix(key_prefix)]),
                    )
                    .input(
                        EventPattern::new()
                            .source([ORCHESTRATION_SOURCE])
                            .detail_type([DetailType::StartOrchestration]),
                    ),
            )
            .stage(
                StageDefinition::new(
                    "block_standardization",
                    DetailType::BlockStandardizationCompleted,
                )
                .input(completed(DetailType::DocumentExtractionCompleted)),
            )
            .stage(
                StageDefinition::new("document_summary", DetailType::DocumentSummaryGenerated)
                    .input(completed(DetailType::BlockStandardizationCompleted)),
            )
            .stage(
                StageDefinition::new("block_refinement", DetailType::BlockRefinementCompleted)
                    .input(completed(DetailType::DocumentSummaryGenerated)),
            )
            .stage(
                StageDefinition::new("seed_questions", DetailType::SeedQuestionsGenerated).input(
                    completed(DetailType::BlockStandardizationCompleted).with(
                        &format!("metadata.{}", keys::SEED_QUESTIONS_LIST),
                        vec![Matcher::exists()],
                    ),
                ),
            )
            .stage(
                StageDefinition::new("feature_extraction", DetailType::FeatureExtractionCompleted)
                    .input(
                        completed(DetailType::BlockStandardizationCompleted).with(
                            &format!("metadata.{}", keys::FEATURE_TYPES),
                            vec![Matcher::exists()],
                        ),
                    ),
            )
            .build()
    }

    pub fn output_source(&self) -> &str {
        &self.output_source
    }

    pub fn dead_letter_path(&self) -> Option<&PathBuf> {
        self.dead_letter_path.as_ref()
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn enabled_stages(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter().filter(|stage| stage.enabled)
    }

    pub fn stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// A copy with one stage's enabled flag changed.
    pub fn with_stage_enabled(mut self, name: &str, enabled: bool) -> Self {
        for stage in self.stages.iter_mut().filter(|s| s.name == name) {
            stage.enabled = enabled;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    output_source: String,
    dead_letter_path: Option<PathBuf>,
    stages: Vec<StageDefinition>,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self {
            output_source: DEFAULT_OUTPUT_SOURCE.to_string(),
            dead_letter_path: None,
            stages: Vec::new(),
        }
    }
}

impl TopologyBuilder {
    pub fn output_source(mut self, source: impl Into<String>) -> Self {
        self.output_source = source.into();
        self
    }

    pub fn dead_letter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dead_letter_path = Some(path.into());
        self
    }

    pub fn stage(mut self, stage: StageDefinition) -> Self {
        self.stages.push(stage);
        self
    }

    /// Applies a change to every stage added so far.
    pub fn map_stages(mut self, f: impl Fn(StageDefinition) -> StageDefinition) -> Self {
        self.stages = self.stages.into_iter().map(f).collect();
        self
    }

    pub fn build(self) -> Topology {
        Topology {
            output_source: self.output_source,
            dead_letter_path: self.dead_letter_path,
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::time::Duration;

    #[test]
    fn standard_topology_has_six_enabled_stages() {
        let topology = Topology::standard("docs", "jdtest/");
        let names: Vec<_> = topology.enabled_stages().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "document_extraction",
                "block_standardization",
                "document_summary",
                "block_refinement",
                "seed_questions",
                "feature_extraction"
            ]
        );
        assert_eq!(topology.output_source(), DEFAULT_OUTPUT_SOURCE);
        assert_eq!(topology.stage("document_extraction").map(|s| s.inputs.len()), Some(2));
    }

    #[test]
    fn disabling_a_stage_keeps_it_in_the_table() {
        let topology = Topology::standard("docs", "jdtest/").with_stage_enabled("seed_questions", false);
        assert_eq!(topology.stages().len(), 6);
        assert_eq!(topology.enabled_stages().count(), 5);
    }

    #[test]
    fn from_config_applies_naming_and_overrides() {
        let cfg = parse_config(
            r#"
output_source: stitch.test
naming: { prefix: stitch, suffix: dev }
defaults: { visibility_timeout_secs: 30, handler_timeout_secs: 20, max_receive_count: 3 }
stages:
  - name: document_summary
    output_detail_type: DocumentSummaryGenerated
    inputs:
      - detail_type: [BlockStandardizationCompleted]
    overrides: { workers: 4, visibility_timeout_secs: 90 }
"#,
        )
        .unwrap();

        let topology = Topology::from_config(&cfg);
        let stage = &topology.stages()[0];
        assert_eq!(topology.output_source(), "stitch.test");
        assert_eq!(stage.queue_name, "stitch-document_summary-queue-dev");
        assert_eq!(stage.handler, "document_summary");
        assert_eq!(stage.worker.visibility_timeout, Duration::from_secs(90));
        assert_eq!(stage.queue.max_receive_count, 3);
        assert_eq!(stage.worker.workers, 4);
    }
}
