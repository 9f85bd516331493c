// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::io::Write;
    use std::time::Duration;

    use crate::backends::local::LocalHandlerFactory;
    use crate::config::{load_and_validate_config, load_config, Topology};
    use crate::errors::{ConfigError, ValidationError};
    use crate::events::{DetailType, EventEnvelope, IngestionDetail};

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    /// The shipped pipeline config loads, validates and names its queues
    #[test]
    fn shipped_config_loads_and_validates() {
        let topology = load_and_validate_config(
            "configs/stitch-pipeline.yaml",
            &LocalHandlerFactory::handler_map(),
        )
        .unwrap();

        assert_eq!(topology.stages().len(), 6);
        assert_eq!(topology.enabled_stages().count(), 6);
        assert_eq!(topology.output_source(), "stitch.worker");
        assert!(topology.dead_letter_path().is_some());

        let extraction = topology.stage("document_extraction").unwrap();
        assert_eq!(extraction.queue_name, "stitch-document_extraction-queue-local");
        assert_eq!(extraction.inputs.len(), 2);
        assert_eq!(extraction.worker.poll_interval, Duration::from_millis(50));

        let seed = topology.stage("seed_questions").unwrap();
        assert_eq!(seed.worker.workers, 1);
        assert_eq!(seed.secrets, vec!["OPENAI_API_KEY"]);
        assert_eq!(seed.output_detail_type, DetailType::SeedQuestionsGenerated);
    }

    /// Substituted bucket and prefix end up in the extraction pattern
    #[test]
    fn shipped_config_routes_watched_uploads() {
        let cfg = load_config("configs/stitch-pipeline.yaml").unwrap();
        let topology = Topology::from_config(&cfg);
        let extraction = topology.stage("document_extraction").unwrap();

        let watched =
            EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "jdtest/a.pdf"));
        let elsewhere =
            EventEnvelope::object_created("storage", &IngestionDetail::new("docs", "other/a.pdf"));

        assert!(extraction.inputs[0].matches(&watched));
        assert!(!extraction.inputs[0].matches(&elsewhere));
    }

    /// A boolean variable switches a stage off without removing it
    #[test]
    fn variable_disables_a_stage() {
        let file = write_config(
            r#"
variables:
  summary_enabled: false
stages:
  - name: document_extraction
    output_detail_type: DocumentExtractionCompleted
    inputs:
      - detail_type: [ObjectCreated]
  - name: document_summary
    enabled: ${summary_enabled}
    output_detail_type: DocumentSummaryGenerated
    inputs:
      - detail_type: [DocumentExtractionCompleted]
"#,
        );

        let topology =
            load_and_validate_config(file.path(), &LocalHandlerFactory::handler_map()).unwrap();
        assert_eq!(topology.stages().len(), 2);
        assert_eq!(topology.enabled_stages().count(), 1);
        assert!(!topology.stage("document_summary").unwrap().enabled);
    }

    /// Unknown handlers and zero workers are reported together
    #[test]
    fn invalid_stage_table_reports_every_problem() {
        let file = write_config(
            r#"
stages:
  - name: ocr
    handler: tesseract
    output_detail_type: OcrCompleted
    overrides: { workers: 0 }
    inputs:
      - detail_type: [DocumentExtractionCompleted]
"#,
        );

        let err = load_and_validate_config(file.path(), &LocalHandlerFactory::handler_map())
            .unwrap_err();
        let ConfigError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.contains(&ValidationError::UnknownHandler {
            stage: "ocr".to_string(),
            handler: "tesseract".to_string(),
        }));
        assert!(errors.contains(&ValidationError::ZeroWorkers {
            stage: "ocr".to_string()
        }));
    }

    /// A placeholder with no variable and no environment value fails the load
    #[test]
    fn unresolved_placeholder_fails_the_load() {
        let file = write_config(
            r#"
stages:
  - name: document_extraction
    output_detail_type: DocumentExtractionCompleted
    inputs:
      - detail: { bucket: { name: ["${STITCH_TEST_SURELY_UNSET_BUCKET}"] } }
"#,
        );

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UndefinedVariable(_))
        ));
    }

    /// A missing file names its path
    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("configs/does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("does-not-exist.yaml"));
    }
}
