// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::consts::{
    DEFAULT_HANDLER_TIMEOUT_SECS, DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_MAX_RECEIVE_COUNT,
    DEFAULT_OUTPUT_SOURCE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETENTION_SECS,
    DEFAULT_VISIBILITY_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use crate::config::{validate_topology, HandlerMap, Topology};
use crate::errors::ConfigError;
use crate::events::DetailType;
use crate::routing::EventPattern;

/// Top-level pipeline configuration file.
///
/// # Example
/// ```yaml
/// variables:
///   bucket: docs
///   enable_features: true
/// naming:
///   prefix: stitch
///   suffix: dev
/// defaults:
///   workers: 2
///   max_receive_count: 5
/// dead_letter:
///   path: ./dead-letters.jsonl
/// stages:
///   - name: document_extraction
///     output_detail_type: DocumentExtractionCompleted
///     inputs:
///       - source: [storage]
///         detail_type: [ObjectCreated]
///         detail:
///           bucket: { name: ["${bucket}"] }
///   - name: feature_extraction
///     enabled: ${enable_features}
///     output_detail_type: FeatureExtractionCompleted
///     inputs:
///       - detail_type: [BlockStandardizationCompleted]
///         metadata:
///           feature_types: [{ exists: true }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Values for `${name}` placeholders anywhere else in the file
    #[serde(default)]
    pub variables: BTreeMap<String, YamlValue>,
    #[serde(default)]
    pub naming: NamingConfig,
    pub output_source: Option<String>,
    #[serde(default)]
    pub defaults: StageTuning,
    #[serde(default)]
    pub dead_letter: DeadLetterConfig,
    pub stages: Vec<StageConfig>,
}

impl Config {
    pub fn get_output_source(&self) -> &str {
        self.output_source.as_deref().unwrap_or(DEFAULT_OUTPUT_SOURCE)
    }
}

/// Queue naming convention shared by every stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamingConfig {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl NamingConfig {
    /// `{prefix}-{stage}-queue-{suffix}`; the bare stage name when neither
    /// part is configured.
    pub fn queue_name(&self, stage: &str) -> String {
        if self.prefix.is_none() && self.suffix.is_none() {
            return stage.to_string();
        }
        let mut name = String::new();
        if let Some(prefix) = &self.prefix {
            name.push_str(prefix);
            name.push('-');
        }
        name.push_str(stage);
        name.push_str("-queue");
        if let Some(suffix) = &self.suffix {
            name.push('-');
            name.push_str(suffix);
        }
        name
    }
}

/// Queue and worker settings. Used both as the file-wide `defaults` and as
/// per-stage `overrides`; unset values fall through to the built-in
/// defaults in `config::consts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StageTuning {
    pub workers: Option<usize>,
    pub visibility_timeout_secs: Option<u64>,
    pub handler_timeout_secs: Option<u64>,
    pub retention_secs: Option<u64>,
    pub max_receive_count: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub max_poll_interval_ms: Option<u64>,
}

impl StageTuning {
    /// Values set here win; anything unset is taken from `fallback`.
    pub fn or(&self, fallback: &StageTuning) -> StageTuning {
        StageTuning {
            workers: self.workers.or(fallback.workers),
            visibility_timeout_secs: self
                .visibility_timeout_secs
                .or(fallback.visibility_timeout_secs),
            handler_timeout_secs: self.handler_timeout_secs.or(fallback.handler_timeout_secs),
            retention_secs: self.retention_secs.or(fallback.retention_secs),
            max_receive_count: self.max_receive_count.or(fallback.max_receive_count),
            poll_interval_ms: self.poll_interval_ms.or(fallback.poll_interval_ms),
            max_poll_interval_ms: self.max_poll_interval_ms.or(fallback.max_poll_interval_ms),
        }
    }

    pub fn get_workers(&self) -> usize {
        self.workers.unwrap_or(DEFAULT_WORKERS)
    }

    pub fn get_visibility_timeout(&self) -> Duration {
        Duration::from_secs(
            self.visibility_timeout_secs
                .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT_SECS),
        )
    }

    pub fn get_handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs.unwrap_or(DEFAULT_HANDLER_TIMEOUT_SECS))
    }

    pub fn get_retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs.unwrap_or(DEFAULT_RETENTION_SECS))
    }

    pub fn get_max_receive_count(&self) -> u32 {
        self.max_receive_count.unwrap_or(DEFAULT_MAX_RECEIVE_COUNT)
    }

    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn get_max_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.max_poll_interval_ms
                .unwrap_or(DEFAULT_MAX_POLL_INTERVAL_MS),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeadLetterConfig {
    /// JSON-lines file for dead-lettered items; kept in memory when unset
    pub path: Option<PathBuf>,
}

/// One stage of the pipeline.
///
/// # Fields
/// * `name` - Unique stage name, also the base of its queue name
/// * `enabled` - Disabled stages get no queue and no route bindings
/// * `handler` - Registered handler name (defaults to `name`)
/// * `output_detail_type` - `detail_type` of the completion envelope
/// * `inputs` - Patterns routing envelopes into this stage (OR-composed)
/// * `overrides` - Per-stage queue/worker tuning
/// * `secrets` - Secret names handed to the handler
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub handler: Option<String>,
    pub output_detail_type: DetailType,
    #[serde(default)]
    pub inputs: Vec<EventPattern>,
    #[serde(default)]
    pub overrides: StageTuning,
    #[serde(default)]
    pub secrets: Vec<String>,
}

impl StageConfig {
    pub fn get_handler(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.name)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Load a config from a YAML file, resolving `${name}` placeholders.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse config text, resolving `${name}` placeholders from `variables`
/// and then the process environment.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut document: YamlValue = serde_yaml::from_str(content)?;

    let variables: BTreeMap<String, YamlValue> = match &document {
        YamlValue::Mapping(root) => match root.get("variables") {
            Some(vars) => serde_yaml::from_value(vars.clone())?,
            None => BTreeMap::new(),
        },
        _ => BTreeMap::new(),
    };

    if let YamlValue::Mapping(root) = &mut document {
        for (key, value) in root.iter_mut() {
            if key.as_str() == Some("variables") {
                continue;
            }
            substitute(value, &variables)?;
        }
    }

    Ok(serde_yaml::from_value(document)?)
}

/// Load the config, build its topology and validate it against the
/// registered handlers.
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
    handlers: &HandlerMap,
) -> Result<Topology, ConfigError> {
    let cfg = load_config(path)?;
    let topology = Topology::from_config(&cfg);
    validate_topology(&topology, handlers).map_err(ConfigError::Validation)?;
    Ok(topology)
}

fn substitute(
    value: &mut YamlValue,
    variables: &BTreeMap<String, YamlValue>,
) -> Result<(), ConfigError> {
    match value {
        YamlValue::String(text) => {
            if let Some(resolved) = resolve_template(text, variables)? {
                *value = resolved;
            }
        }
        YamlValue::Sequence(items) => {
            for item in items {
                substitute(item, variables)?;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                substitute(item, variables)?;
            }
        }
        YamlValue::Tagged(tagged) => substitute(&mut tagged.value, variables)?,
        YamlValue::Null | YamlValue::Bool(_) | YamlValue::Number(_) => {}
    }
    Ok(())
}

/// `None` when `text` holds no placeholder. A string that is exactly one
/// placeholder takes the variable's typed value; otherwise placeholders are
/// interpolated as text.
fn resolve_template(
    text: &str,
    variables: &BTreeMap<String, YamlValue>,
) -> Result<Option<YamlValue>, ConfigError> {
    if !text.contains("${") {
        return Ok(None);
    }

    if let Some(name) = text
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.contains("${") && !name.contains('}'))
    {
        return lookup(name.trim(), variables).map(Some);
    }

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::UnterminatedPlaceholder(text.to_string()))?;
        let resolved = lookup(after[..end].trim(), variables)?;
        output.push_str(&render_scalar(&resolved));
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(Some(YamlValue::String(output)))
}

fn lookup(name: &str, variables: &BTreeMap<String, YamlValue>) -> Result<YamlValue, ConfigError> {
    if let Some(value) = variables.get(name) {
        return Ok(value.clone());
    }
    match std::env::var(name) {
        // environment values are typed the way YAML would read them
        Ok(raw) => Ok(serde_yaml::from_str(&raw).unwrap_or(YamlValue::String(raw))),
        Err(_) => Err(ConfigError::UndefinedVariable(name.to_string())),
    }
}

fn render_scalar(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
variables:
  bucket: docs
  prefix: "jdtest/"
  enable_seed_questions: false
naming:
  prefix: stitch
  suffix: dev
defaults:
  workers: 3
dead_letter:
  path: /tmp/dead.jsonl
stages:
  - name: document_extraction
    output_detail_type: DocumentExtractionCompleted
    inputs:
      - source: [storage]
        detail_type: ["Object Created"]
        detail:
          bucket: { name: ["${bucket}"] }
          object:
            key: [{ prefix: "${prefix}" }]
  - name: seed_questions
    enabled: ${enable_seed_questions}
    handler: seed_questions
    output_detail_type: SeedQuestionsGenerated
    inputs:
      - detail_type: [BlockStandardizationCompleted]
        metadata:
          seed_questions_list: [{ exists: true }]
    overrides:
      workers: 1
      handler_timeout_secs: 60
    secrets: [OPENAI_API_KEY]
"#;

    #[test]
    fn parse_basic_config() {
        let cfg = parse_config(BASIC).unwrap();
        assert_eq!(cfg.stages.len(), 2);
        assert_eq!(cfg.get_output_source(), DEFAULT_OUTPUT_SOURCE);
        assert_eq!(cfg.defaults.get_workers(), 3);
        assert_eq!(cfg.dead_letter.path, Some(PathBuf::from("/tmp/dead.jsonl")));

        let extraction = &cfg.stages[0];
        assert!(extraction.enabled);
        assert_eq!(extraction.get_handler(), "document_extraction");
        assert_eq!(extraction.inputs.len(), 1);
        assert_eq!(
            extraction.inputs[0].exact_detail_types(),
            vec![DetailType::ObjectCreated]
        );
    }

    #[test]
    fn whole_string_placeholder_keeps_its_type() {
        let cfg = parse_config(BASIC).unwrap();
        assert!(!cfg.stages[1].enabled);
    }

    #[test]
    fn placeholders_inside_patterns_are_resolved() {
        let cfg = parse_config(BASIC).unwrap();
        let expected: EventPattern = serde_yaml::from_str(
            r#"
source: [storage]
detail_type: ["Object Created"]
detail:
  bucket: { name: [docs] }
  object:
    key: [{ prefix: "jdtest/" }]
"#,
        )
        .unwrap();
        assert_eq!(cfg.stages[0].inputs[0], expected);
    }

    #[test]
    fn stage_overrides_fall_back_to_defaults() {
        let cfg = parse_config(BASIC).unwrap();
        let tuning = cfg.stages[1].overrides.or(&cfg.defaults);
        assert_eq!(tuning.get_workers(), 1);
        assert_eq!(tuning.get_handler_timeout(), Duration::from_secs(60));
        assert_eq!(
            tuning.get_visibility_timeout(),
            Duration::from_secs(DEFAULT_VISIBILITY_TIMEOUT_SECS)
        );
        assert_eq!(tuning.get_max_receive_count(), DEFAULT_MAX_RECEIVE_COUNT);
        assert_eq!(cfg.stages[1].secrets, vec!["OPENAI_API_KEY"]);
    }

    #[test]
    fn queue_names_follow_naming_convention() {
        let naming = NamingConfig {
            prefix: Some("stitch".into()),
            suffix: Some("dev".into()),
        };
        assert_eq!(naming.queue_name("block_refinement"), "stitch-block_refinement-queue-dev");
        assert_eq!(NamingConfig::default().queue_name("block_refinement"), "block_refinement");
    }

    #[test]
    fn embedded_placeholders_are_interpolated() {
        let vars = BTreeMap::from([
            ("env".to_string(), YamlValue::from("dev")),
            ("n".to_string(), YamlValue::from(3)),
        ]);
        let resolved = resolve_template("stitch-${env}-${n}", &vars).unwrap();
        assert_eq!(resolved, Some(YamlValue::from("stitch-dev-3")));
        assert_eq!(resolve_template("plain", &vars).unwrap(), None);
    }

    #[test]
    fn environment_is_consulted_after_variables() {
        std::env::set_var("STITCH_PIPELINE_TEST_WORKERS", "4");
        let resolved = resolve_template("${STITCH_PIPELINE_TEST_WORKERS}", &BTreeMap::new()).unwrap();
        assert_eq!(resolved, Some(YamlValue::from(4)));
    }

    #[test]
    fn undefined_and_unterminated_placeholders_fail() {
        let vars = BTreeMap::new();
        assert!(matches!(
            resolve_template("${STITCH_PIPELINE_SURELY_UNDEFINED}", &vars),
            Err(ConfigError::UndefinedVariable(_))
        ));
        assert!(matches!(
            resolve_template("prefix-${oops", &vars),
            Err(ConfigError::UnterminatedPlaceholder(_))
        ));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_config_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), BASIC).unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.naming.queue_name("x"), "stitch-x-queue-dev");
    }
}
